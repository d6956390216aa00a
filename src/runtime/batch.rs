use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::BatchError;
use crate::runtime::output::OutputArtifact;
use crate::template::InputSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Cancelled | BatchStatus::Failed)
    }
}

/// Outcome of one job: the inputs it ran with and what it produced.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub index: usize,
    pub inputs: InputSet,
    pub outputs: Vec<OutputArtifact>,
}

/// Live state of one batch.
///
/// Only the driving task changes status and appends results; other tasks may
/// raise the cancel flag and take snapshots.
#[derive(Debug)]
pub struct BatchState {
    pub job_id: String,
    pub server_address: String,
    pub total: usize,
    cancelled: AtomicBool,
    status: RwLock<BatchStatus>,
    results: RwLock<Vec<JobResult>>,
    error: RwLock<Option<String>>,
}

/// Point-in-time copy of a batch, safe to hand out.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSnapshot {
    pub job_id: String,
    pub status: BatchStatus,
    pub total: usize,
    pub completed: usize,
    pub server_address: String,
    pub results: Vec<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchState {
    pub fn new(job_id: String, server_address: String, total: usize) -> Self {
        Self {
            job_id,
            server_address,
            total,
            cancelled: AtomicBool::new(false),
            status: RwLock::new(BatchStatus::Pending),
            results: RwLock::new(Vec::with_capacity(total)),
            error: RwLock::new(None),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub async fn status(&self) -> BatchStatus {
        *self.status.read().await
    }

    pub(crate) async fn set_status(&self, status: BatchStatus) {
        *self.status.write().await = status;
    }

    pub(crate) async fn fail(&self, message: String) {
        *self.error.write().await = Some(message);
        self.set_status(BatchStatus::Failed).await;
    }

    pub(crate) async fn push_result(&self, result: JobResult) {
        self.results.write().await.push(result);
    }

    pub async fn results(&self) -> Vec<JobResult> {
        self.results.read().await.clone()
    }

    pub async fn snapshot(&self) -> BatchSnapshot {
        // status first: results are pushed before a terminal status is set
        let status = self.status().await;
        let error = self.error.read().await.clone();
        let results = self.results().await;
        BatchSnapshot {
            job_id: self.job_id.clone(),
            status,
            total: self.total,
            completed: results.len(),
            server_address: self.server_address.clone(),
            results,
            error,
        }
    }
}

/// Id-keyed registry of running and recently finished batches.
#[derive(Debug, Clone, Default)]
pub struct BatchRegistry {
    entries: Arc<DashMap<String, Arc<BatchState>>>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, state: BatchState) -> Arc<BatchState> {
        let state = Arc::new(state);
        self.entries.insert(state.job_id.clone(), state.clone());
        state
    }

    pub fn get(&self, job_id: &str) -> Result<Arc<BatchState>, BatchError> {
        self.entries
            .get(job_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BatchError::NotFound(job_id.to_string()))
    }

    pub fn remove(&self, job_id: &str) {
        self.entries.remove(job_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops the entry once `grace` has elapsed.
    pub fn expire_after(&self, job_id: &str, grace: Duration) {
        let entries = self.entries.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if entries.remove(&job_id).is_some() {
                debug!(%job_id, "Batch entry expired");
            }
        });
    }
}

/// `batch_<unix seconds>_<6 hex chars>`
pub fn new_job_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("batch_{}_{}", secs, &suffix[..6])
}
