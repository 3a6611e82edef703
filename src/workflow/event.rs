use crate::{ingest::DecodeError, remote::RemoteError};

/// Which pipeline a newly selected file goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Decode locally and wait for the operator to pick rows.
    Preview,
    /// Send the file to the service without decoding it.
    Direct,
}

/// Why a workflow cycle ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("could not read spreadsheet: {0}")]
    Decode(#[from] DecodeError),
    #[error("generation failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("operation was cancelled")]
    Cancelled,
}

/// Transition notifications published by [`super::Workflow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    IngestionStarted {
        file: String,
        size: usize,
        mode: Mode,
    },
    RecordsReady {
        records: usize,
    },
    SelectionChanged {
        selected: usize,
        total: usize,
    },
    /// `records` is `None` when the raw file is submitted.
    GenerationStarted {
        records: Option<usize>,
    },
    Completed {
        artifacts: usize,
        archive: Option<String>,
    },
    Failed {
        reason: FailureReason,
    },
    Reset,
}
