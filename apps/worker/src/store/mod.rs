/// Record persistence consumed by the monitoring engine
///
/// The API layer owns the records; the engine only lists, reads and writes
/// back the fields it derives. Records are untyped JSON objects keyed by
/// category and id.
pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No records found in category '{0}'")]
    NotFoundOrEmpty(String),

    #[error("Failed to list category '{category}': {source}")]
    List {
        category: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Record '{category}/{id}' not found")]
    NotFound { category: String, id: String },

    #[error("Failed to read '{category}/{id}': {source}")]
    Read {
        category: String,
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{category}/{id}': {reason}")]
    Write { category: String, id: String, reason: String },
}

/// Category/id keyed record store
#[async_trait]
pub trait Store: Send + Sync {
    /// List every id in a category
    async fn list(&self, category: &str) -> Result<Vec<String>, StoreError>;

    /// Read one record
    async fn read(&self, category: &str, id: &str) -> Result<Value, StoreError>;

    /// Overwrite an existing record
    async fn update(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError>;
}
