//! Record store seam
//!
//! The id→record table is the only shared mutable structure in the system.
//! It sits behind a narrow get/set/delete/list interface so the in-process
//! map can later be swapped for a durable store without touching the
//! orchestrator's phase logic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::record::DeploymentRecord;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<DeploymentRecord>;
    async fn set(&self, record: DeploymentRecord);
    async fn delete(&self, id: &str);
    async fn list(&self) -> Vec<DeploymentRecord>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, DeploymentRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &str) -> Option<DeploymentRecord> {
        self.records.read().await.get(id).cloned()
    }

    async fn set(&self, record: DeploymentRecord) {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record);
    }

    async fn delete(&self, id: &str) {
        self.records.write().await.remove(id);
    }

    async fn list(&self) -> Vec<DeploymentRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }
}
