use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Addresses one stage artifact lineage: run, job, stage label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub run_id: String,
    pub job_id: String,
    pub stage: String,
}

impl SnapshotKey {
    pub fn new(run_id: &str, job_id: &str, stage: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            job_id: job_id.to_string(),
            stage: stage.to_string(),
        }
    }
}

/// One immutable stage artifact. Versions within a key only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub version: u32,
    pub recorded_at: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

/// Versioned, immutable artifact store keyed by run/job/stage. Later stages
/// read only the latest snapshot for a key; earlier versions stay available
/// for replay and audit.
pub trait SnapshotStore: Send + Sync {
    fn put(&self, key: &SnapshotKey, payload: Value) -> Result<u32, StoreError>;
    fn latest(&self, key: &SnapshotKey) -> Result<Option<StoredSnapshot>, StoreError>;
    fn version_count(&self, key: &SnapshotKey) -> Result<usize, StoreError>;
    fn keys_for_run(&self, run_id: &str) -> Result<Vec<SnapshotKey>, StoreError>;
}

/// In-memory store backing a single process; content lives for the lifetime
/// of the service.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<BTreeMap<SnapshotKey, Vec<StoredSnapshot>>>,
}

impl MemorySnapshotStore {
    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<SnapshotKey, Vec<StoredSnapshot>>>, StoreError>
    {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("snapshot mutex poisoned".to_string()))
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn put(&self, key: &SnapshotKey, payload: Value) -> Result<u32, StoreError> {
        let mut guard = self.guard()?;
        let lineage = guard.entry(key.clone()).or_default();
        let version = lineage.last().map(|snapshot| snapshot.version + 1).unwrap_or(1);
        lineage.push(StoredSnapshot {
            version,
            recorded_at: Utc::now(),
            payload,
        });
        Ok(version)
    }

    fn latest(&self, key: &SnapshotKey) -> Result<Option<StoredSnapshot>, StoreError> {
        let guard = self.guard()?;
        Ok(guard.get(key).and_then(|lineage| lineage.last().cloned()))
    }

    fn version_count(&self, key: &SnapshotKey) -> Result<usize, StoreError> {
        let guard = self.guard()?;
        Ok(guard.get(key).map(Vec::len).unwrap_or(0))
    }

    fn keys_for_run(&self, run_id: &str) -> Result<Vec<SnapshotKey>, StoreError> {
        let guard = self.guard()?;
        Ok(guard
            .keys()
            .filter(|key| key.run_id == run_id)
            .cloned()
            .collect())
    }
}
