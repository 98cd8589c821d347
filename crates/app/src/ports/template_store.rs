//! Template store port — where template definition files come from.

use std::future::Future;

use serde_json::Value;

use taskqueue_domain::error::TaskQueueError;

/// A parsed definition file, still untyped.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDocument {
    /// Where the document came from, for diagnostics.
    pub source: String,
    pub content: Value,
}

/// Reads system and user template documents and persists user templates.
///
/// Implementations skip unreadable or corrupt files (logging them) rather
/// than failing the whole listing.
pub trait TemplateStore: Send + Sync {
    fn system_documents(
        &self,
    ) -> impl Future<Output = Result<Vec<TemplateDocument>, TaskQueueError>> + Send;

    fn user_documents(
        &self,
    ) -> impl Future<Output = Result<Vec<TemplateDocument>, TaskQueueError>> + Send;

    /// Replace the consolidated user catalog.
    fn write_user_catalog(
        &self,
        catalog: &Value,
    ) -> impl Future<Output = Result<(), TaskQueueError>> + Send;

    /// Remove the individual file of a user template. Returns `false` when
    /// there was none.
    fn remove_user_template(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<bool, TaskQueueError>> + Send;
}
