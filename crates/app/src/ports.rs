//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod device_access;
pub mod process_runner;
pub mod queue_store;
pub mod template_store;

pub use device_access::DeviceAccess;
pub use process_runner::{
    ExitKind, OutputLine, OutputStream, ProcessCommand, ProcessExit, ProcessRunner,
};
pub use queue_store::QueueStore;
pub use template_store::{TemplateDocument, TemplateStore};
