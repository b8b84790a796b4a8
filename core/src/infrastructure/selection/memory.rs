use std::collections::HashMap;
use std::sync::RwLock;

use tracing::error;

use crate::domain::common::entities::ListFilterError;
use crate::domain::selection::entities::PersistedSelection;
use crate::domain::selection::ports::SelectionStore;

/// Session-style selection store holding JSON-serialized selections in
/// process memory. Suitable for single-process deployments and tests; a
/// distributed deployment would put the same JSON in its session backend.
#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for MemorySelectionStore {
    async fn read(&self, key: &str) -> Result<Option<PersistedSelection>, ListFilterError> {
        let entries = self.entries.read().map_err(|e| {
            error!("Selection store lock poisoned: {}", e);
            ListFilterError::StoreRead(e.to_string())
        })?;
        match entries.get(key) {
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                error!("Stored selection under '{}' is not decodable: {}", key, e);
                ListFilterError::Decode(e.to_string())
            }),
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, selection: &PersistedSelection) -> Result<(), ListFilterError> {
        let value = serde_json::to_value(selection).map_err(|e| {
            error!("Selection under '{}' is not serializable: {}", key, e);
            ListFilterError::StoreWrite(e.to_string())
        })?;
        let mut entries = self.entries.write().map_err(|e| {
            error!("Selection store lock poisoned: {}", e);
            ListFilterError::StoreWrite(e.to_string())
        })?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ListFilterError> {
        let mut entries = self.entries.write().map_err(|e| {
            error!("Selection store lock poisoned: {}", e);
            ListFilterError::StoreDelete(e.to_string())
        })?;
        entries.remove(key);
        Ok(())
    }
}
