//! File-based Template Store Adapter
//!
//! Reads template documents from a directory. A template with id `dmv`
//! lives at `dmv.json`, `dmv.yaml` or `dmv.yml`, checked in that order.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::ports::{StoreError, TemplateStore};

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Directory of template documents.
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    base_path: PathBuf,
}

impl FileTemplateStore {
    /// Create a store over `base_path`.
    ///
    /// # Example
    /// ```ignore
    /// let store = FileTemplateStore::new("./templates");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn is_safe_id(template_id: &str) -> bool {
        !template_id.is_empty()
            && template_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !template_id.contains("..")
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn fetch(&self, template_id: &str) -> Result<Vec<u8>, StoreError> {
        if !Self::is_safe_id(template_id) {
            return Err(StoreError::NotFound(template_id.to_string()));
        }

        for ext in EXTENSIONS {
            let path = self.base_path.join(format!("{}.{}", template_id, ext));
            match fs::read(&path).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::Unavailable(e.to_string())),
            }
        }
        Err(StoreError::NotFound(template_id.to_string()))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut dir = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut ids = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
        {
            let path = entry.path();
            let known = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
            if let (true, Some(stem)) = (known, path.file_stem().and_then(|s| s.to_str())) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
