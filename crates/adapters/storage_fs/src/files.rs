//! JSON file helpers shared by the stores.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let bytes = tokio::fs::read(path).await.map_err(StorageError::io(path))?;
    serde_json::from_slice(&bytes).map_err(StorageError::json(path))
}

/// Write through a sibling temporary file renamed into place, so readers
/// never observe a half-written document.
pub(crate) async fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(StorageError::json(path))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StorageError::io(parent))?;
    }
    let staging = staging_path(path);
    tokio::fs::write(&staging, &bytes)
        .await
        .map_err(StorageError::io(&staging))?;
    if let Err(err) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(StorageError::io(path)(err));
    }
    Ok(())
}

/// `*.json` files of a directory in file-name order. A missing directory
/// lists as empty.
pub(crate) async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "template directory does not exist");
            return Ok(Vec::new());
        }
        Err(err) => return Err(StorageError::io(dir)(err)),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(StorageError::io(dir))? {
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_json && is_file {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(".tmp");
    path.with_file_name(name)
}
