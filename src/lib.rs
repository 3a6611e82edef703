pub mod config;
pub mod ingest;
pub mod label;
pub mod progress;
pub mod record;
pub mod remote;
pub mod results;
pub mod template;
pub mod workflow;

pub use record::{Record, RecordSet, SelectionSet};
pub use remote::{GenerationOptions, GenerationResult, GenerationService, RemoteError};
pub use workflow::{Mode, Workflow, WorkflowEvent, WorkflowState};

#[cfg(test)]
mod tests;
