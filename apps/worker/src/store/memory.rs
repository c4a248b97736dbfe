use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Store, StoreError};

/// In-process store, keyed by `(category, id)`
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub async fn insert(&self, category: &str, id: &str, record: Value) {
        self.records.write().await.insert((category.to_string(), id.to_string()), record);
    }

    /// Snapshot of a record, if present
    pub async fn get(&self, category: &str, id: &str) -> Option<Value> {
        self.records.read().await.get(&(category.to_string(), id.to_string())).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(&self, category: &str) -> Result<Vec<String>, StoreError> {
        let ids: Vec<String> = self
            .records
            .read()
            .await
            .keys()
            .filter(|(cat, _)| cat == category)
            .map(|(_, id)| id.clone())
            .collect();

        if ids.is_empty() { Err(StoreError::NotFoundOrEmpty(category.to_string())) } else { Ok(ids) }
    }

    async fn read(&self, category: &str, id: &str) -> Result<Value, StoreError> {
        self.get(category, id)
            .await
            .ok_or_else(|| StoreError::NotFound { category: category.to_string(), id: id.to_string() })
    }

    async fn update(&self, category: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&(category.to_string(), id.to_string())) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::Write {
                category: category.to_string(),
                id: id.to_string(),
                reason: "record does not exist".to_string(),
            }),
        }
    }
}
