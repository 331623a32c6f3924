//! The evaluation workflow: state, machine, store, and driver.
//!
//! A run moves through ingest, evaluate, check_confidence, an optional
//! human_review suspension, finalize, and generate_report. State is
//! checkpointed in the store after every advance; a suspended or failed
//! run resumes from its recorded stage.

pub mod driver;
pub mod machine;
pub mod state;
pub mod store;

pub use driver::WorkflowDriver;
pub use machine::{build_report, MachineConfig, WorkflowMachine};
pub use state::{DocumentInput, Stage, WorkflowState};
pub use store::{WorkflowStore, WorkflowSummary};
