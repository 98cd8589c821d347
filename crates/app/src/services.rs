//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod queue_service;
pub mod template_manager;

pub use queue_service::{QueueService, populate};
pub use template_manager::TemplateManager;
