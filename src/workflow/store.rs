//! In-memory workflow store.
//!
//! Checkpoints are keyed by workflow id. Reads on different workflows run
//! concurrently; writes to one workflow are serialized by its own lock, so
//! two tasks advancing the same workflow never interleave stages.

use crate::error::GradeflowError;
use crate::workflow::state::{Stage, WorkflowState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// One line in a workflow listing.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub title: String,
    pub current_step: Stage,
    pub completed: bool,
    pub awaiting_review: bool,
    pub updated_at: DateTime<Utc>,
}

/// Keyed store of live workflow states.
#[derive(Default)]
pub struct WorkflowStore {
    workflows: RwLock<HashMap<String, Arc<Mutex<WorkflowState>>>>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh state, returning its per-workflow handle.
    pub async fn insert(&self, state: WorkflowState) -> Arc<Mutex<WorkflowState>> {
        let handle = Arc::new(Mutex::new(state));
        let id = handle.lock().await.id.clone();
        self.workflows.write().await.insert(id, Arc::clone(&handle));
        handle
    }

    /// Handle for one workflow. The map lock is released before the caller
    /// locks the workflow itself.
    pub async fn get(&self, id: &str) -> Result<Arc<Mutex<WorkflowState>>, GradeflowError> {
        self.workflows
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GradeflowError::NotFound(id.to_string()))
    }

    /// Point-in-time copy of one workflow's state.
    pub async fn snapshot(&self, id: &str) -> Result<WorkflowState, GradeflowError> {
        let handle = self.get(id).await?;
        let state = handle.lock().await;
        Ok(state.clone())
    }

    /// Summaries of every stored workflow, most recently updated first.
    pub async fn list(&self) -> Vec<WorkflowSummary> {
        let handles: Vec<Arc<Mutex<WorkflowState>>> =
            self.workflows.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let state = handle.lock().await;
            summaries.push(WorkflowSummary {
                id: state.id.clone(),
                title: state.title.clone(),
                current_step: state.current_step,
                completed: state.completed,
                awaiting_review: state.awaiting_review(),
                updated_at: state.updated_at,
            });
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Drop a workflow. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.workflows.write().await.remove(id).is_some()
    }
}
