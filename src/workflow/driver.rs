//! Workflow driver: the operation surface over the machine and the store.
//!
//! Callers start a workflow, advance it, supply reviewer feedback while it
//! is suspended, and fetch state, report, or listings by id. Each advance
//! holds the workflow's own lock for the duration, so concurrent callers
//! on the same id are serialized while other workflows proceed.

use crate::error::{GradeflowError, Result};
use crate::models::{HumanFeedback, Report};
use crate::workflow::machine::WorkflowMachine;
use crate::workflow::state::{DocumentInput, WorkflowState};
use crate::workflow::store::{WorkflowStore, WorkflowSummary};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

pub struct WorkflowDriver {
    machine: WorkflowMachine,
    store: WorkflowStore,
}

impl WorkflowDriver {
    pub fn new(machine: WorkflowMachine) -> Self {
        Self {
            machine,
            store: WorkflowStore::new(),
        }
    }

    /// Register a new workflow for the given document. Returns its id;
    /// nothing runs until the first [`advance`](Self::advance).
    pub async fn start(&self, title: impl Into<String>, input: DocumentInput) -> String {
        let id = Uuid::new_v4().to_string();
        let state = WorkflowState::new(&id, title, input);
        self.store.insert(state).await;
        info!("Started workflow {}", id);
        id
    }

    /// Run the workflow until it completes, suspends for review, or a stage
    /// fails. Returns a snapshot of the state afterwards; inspect
    /// `current_step` and `error` to see where it stopped.
    pub async fn advance(&self, id: &str) -> Result<WorkflowState> {
        let handle = self.store.get(id).await?;
        let mut state = handle.lock().await;
        self.machine.advance(&mut state).await;
        Ok(state.clone())
    }

    /// Record reviewer feedback, keyed by question id. Accepted any time
    /// before finalization; applied when the workflow advances past review.
    /// Rejected wholesale if any key names an unknown question.
    pub async fn supply_human_feedback(
        &self,
        id: &str,
        feedback: HashMap<String, HumanFeedback>,
    ) -> Result<()> {
        let handle = self.store.get(id).await?;
        let mut state = handle.lock().await;

        if state.completed {
            return Err(GradeflowError::Input(format!(
                "workflow {} is already completed",
                id
            )));
        }
        for question_id in feedback.keys() {
            if !state.questions.iter().any(|q| q.id == *question_id) {
                return Err(GradeflowError::NotFound(format!(
                    "question {} in workflow {}",
                    question_id, id
                )));
            }
        }

        state.human_feedback.extend(feedback);
        Ok(())
    }

    /// Point-in-time copy of a workflow's state.
    pub async fn state(&self, id: &str) -> Result<WorkflowState> {
        self.store.snapshot(id).await
    }

    /// The generated report, once the workflow has produced one.
    pub async fn report(&self, id: &str) -> Result<Report> {
        let state = self.store.snapshot(id).await?;
        state.report.ok_or_else(|| {
            GradeflowError::Input(format!(
                "workflow {} has not generated a report yet (currently at {})",
                id, state.current_step
            ))
        })
    }

    /// Summaries of every known workflow.
    pub async fn list(&self) -> Vec<WorkflowSummary> {
        self.store.list().await
    }
}
