//! Filesystem implementation of [`TemplateStore`].
//!
//! System templates are every `*.json` file of the system directory. User
//! templates live in the user directory: the consolidated catalog
//! `user_templates.json` plus any individual `<id>.json` file.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde_json::Value;

use taskqueue_app::ports::{TemplateDocument, TemplateStore};
use taskqueue_domain::error::TaskQueueError;

use crate::error::StorageError;
use crate::files::{json_files, read_json, write_json};

/// File name of the consolidated user catalog.
pub const USER_CATALOG_FILE: &str = "user_templates.json";

/// Template store reading definition files from two directories.
#[derive(Debug, Clone)]
pub struct FsTemplateStore {
    system_dir: PathBuf,
    user_dir: PathBuf,
}

impl FsTemplateStore {
    #[must_use]
    pub fn new(system_dir: impl Into<PathBuf>, user_dir: impl Into<PathBuf>) -> Self {
        Self {
            system_dir: system_dir.into(),
            user_dir: user_dir.into(),
        }
    }

    #[must_use]
    pub fn system_dir(&self) -> &Path {
        &self.system_dir
    }

    #[must_use]
    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    /// Path of the individual file a user template id maps to, if the id is
    /// a plain file stem.
    fn user_template_path(&self, id: &str) -> Option<PathBuf> {
        let file_name = format!("{id}.json");
        let plain = !id.is_empty()
            && Path::new(&file_name).file_name().and_then(|n| n.to_str()) == Some(file_name.as_str());
        plain.then(|| self.user_dir.join(file_name))
    }
}

/// Parse every JSON file of `dir`, skipping the ones that fail.
async fn read_documents(dir: &Path) -> Result<Vec<TemplateDocument>, StorageError> {
    let mut documents = Vec::new();
    for path in json_files(dir).await? {
        match read_json::<Value>(&path).await {
            Ok(content) => documents.push(TemplateDocument {
                source: path.display().to_string(),
                content,
            }),
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "skipping unreadable template file");
            }
        }
    }
    tracing::debug!(dir = %dir.display(), count = documents.len(), "template files read");
    Ok(documents)
}

impl TemplateStore for FsTemplateStore {
    fn system_documents(
        &self,
    ) -> impl Future<Output = Result<Vec<TemplateDocument>, TaskQueueError>> + Send {
        let dir = self.system_dir.clone();
        async move { Ok(read_documents(&dir).await?) }
    }

    fn user_documents(
        &self,
    ) -> impl Future<Output = Result<Vec<TemplateDocument>, TaskQueueError>> + Send {
        let dir = self.user_dir.clone();
        async move { Ok(read_documents(&dir).await?) }
    }

    fn write_user_catalog(
        &self,
        catalog: &Value,
    ) -> impl Future<Output = Result<(), TaskQueueError>> + Send {
        let path = self.user_dir.join(USER_CATALOG_FILE);
        let catalog = catalog.clone();
        async move {
            write_json(&path, &catalog).await?;
            tracing::debug!(file = %path.display(), "user catalog written");
            Ok(())
        }
    }

    fn remove_user_template(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<bool, TaskQueueError>> + Send {
        let path = self.user_template_path(id);
        async move {
            let Some(path) = path else {
                return Ok(false);
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(err) => Err(StorageError::io(&path)(err).into()),
            }
        }
    }
}
