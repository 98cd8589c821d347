//! # taskqueue-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceAccess` — read, write and watch device properties
//!   - `ProcessRunner` — run external scripts
//!   - `TemplateStore` — read template files, persist user templates
//!   - `QueueStore` — persist queues, read collections
//! - Define **driving/inbound** use-cases:
//!   - `TemplateManager` — the template catalog
//!   - `QueueService` — save, restore and populate queues
//!   - `QueueExecutor` — run the queue, with pause/resume/abort
//! - Run individual actions (`ActionRunner`) with retries, timeouts and abort
//! - Provide **in-process infrastructure** (executor event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `taskqueue-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actions;
pub mod event_bus;
pub mod executor;
pub mod ports;
pub mod services;
pub mod shared_queue;

#[cfg(test)]
mod test_support;
