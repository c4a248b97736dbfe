use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{Store, StoreError};

const EXTENSION: &str = "json";

/// One JSON file per record at `<base_dir>/<category>/<id>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn record_path(&self, category: &str, id: &str) -> PathBuf {
        self.base_dir.join(category).join(format!("{id}.{EXTENSION}"))
    }
}

#[async_trait]
impl Store for FileStore {
    async fn list(&self, category: &str) -> Result<Vec<String>, StoreError> {
        let empty = || StoreError::NotFoundOrEmpty(category.to_string());
        let io = |source: std::io::Error| StoreError::List { category: category.to_string(), source };

        let mut entries = match fs::read_dir(self.base_dir.join(category)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(empty()),
            Err(e) => return Err(io(e)),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        if ids.is_empty() { Err(empty()) } else { Ok(ids) }
    }

    async fn read(&self, category: &str, id: &str) -> Result<Value, StoreError> {
        let raw = fs::read_to_string(self.record_path(category, id)).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound { category: category.to_string(), id: id.to_string() }
            } else {
                StoreError::Read { category: category.to_string(), id: id.to_string(), source }
            }
        })?;

        // Unparsable records read as empty objects and fail validation downstream
        Ok(serde_json::from_str(&raw).unwrap_or_else(|error| {
            tracing::debug!(category, id, %error, "Stored record is not valid JSON");
            Value::Object(Map::new())
        }))
    }

    async fn update(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let write_error = |reason: String| StoreError::Write {
            category: category.to_string(),
            id: id.to_string(),
            reason,
        };

        // Updates never create: a record deleted mid-ping stays deleted
        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.record_path(category, id))
            .await
            .map_err(|e| write_error(format!("could not open for updating, it may not exist: {e}")))?;

        file.write_all(record.to_string().as_bytes()).await.map_err(|e| write_error(e.to_string()))?;
        file.flush().await.map_err(|e| write_error(e.to_string()))
    }
}
