//! # taskqueue-adapter-storage-fs
//!
//! Filesystem persistence adapter.
//!
//! ## Responsibilities
//! - Implement the [`TemplateStore`](taskqueue_app::ports::TemplateStore) and
//!   [`QueueStore`](taskqueue_app::ports::QueueStore) port traits
//! - Read template definition files, skipping corrupt ones
//! - Write catalogs and saved queues atomically (temporary file + rename)
//!
//! ## Dependency rule
//! Depends on `taskqueue-app` (for port traits) and `taskqueue-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
mod files;
pub mod queue_store;
pub mod template_store;

pub use error::StorageError;
pub use queue_store::FsQueueStore;
pub use template_store::{FsTemplateStore, USER_CATALOG_FILE};
