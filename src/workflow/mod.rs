//! Upload and generation workflow
//!
//! [`Workflow`] owns the single [`WorkflowState`] of an operator session and is
//! the only thing that writes it. Views borrow the state through
//! [`Workflow::state`] and follow transitions through [`Workflow::subscribe`].
//!
//! ```text
//! Idle ──file──▶ Ingesting ──preview──▶ AwaitingSelection ──generate──▶ Generating
//!                    │                                                    │
//!                    └──────────────direct──────────────────────────────▶─┤
//!                                                                         ▼
//!                                  Failed ◀──────────────────────── Completed
//! ```
//!
//! A new file may be selected from any state except `Generating`.

use async_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::{
    ingest::{self, RawFile},
    record::{RecordSet, SelectionSet},
    remote::{GenerationOptions, GenerationResult, GenerationService},
    results::ResultView,
};

mod event;

pub use event::{FailureReason, Mode, WorkflowEvent};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Ingesting,
    AwaitingSelection {
        records: RecordSet,
        selection: SelectionSet,
    },
    Generating,
    Completed(GenerationResult),
    Failed(FailureReason),
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Ingesting => "ingesting",
            WorkflowState::AwaitingSelection { .. } => "awaiting_selection",
            WorkflowState::Generating => "generating",
            WorkflowState::Completed(_) => "completed",
            WorkflowState::Failed(_) => "failed",
        }
    }

    fn in_flight(&self) -> bool {
        matches!(self, WorkflowState::Ingesting | WorkflowState::Generating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("a generation request is already in flight")]
    Busy,
    #[error("no records are awaiting selection")]
    NotAwaitingSelection,
    #[error("select at least one record before generating")]
    EmptySelection,
    #[error("record {0} does not exist")]
    UnknownRecord(usize),
    #[error("there is no failure to acknowledge")]
    NotFailed,
}

fn emit(events: Option<&Sender<WorkflowEvent>>, event: WorkflowEvent) {
    if let Some(events) = events {
        // Nobody listening is fine.
        events.try_send(event).ok();
    }
}

/// One ingest or generate call. Dropping it while a request is still in
/// flight moves the state to `Failed(Cancelled)`.
struct Cycle<'a> {
    state: &'a mut WorkflowState,
    events: Option<&'a Sender<WorkflowEvent>>,
}

impl Cycle<'_> {
    fn enter(&mut self, state: WorkflowState, event: WorkflowEvent) {
        debug!(from = self.state.name(), to = state.name(), "transition");
        *self.state = state;
        emit(self.events, event);
    }

    fn fail(&mut self, reason: FailureReason) {
        warn!(%reason, "workflow failed");
        self.enter(
            WorkflowState::Failed(reason.clone()),
            WorkflowEvent::Failed { reason },
        );
    }

    fn finish(&mut self, outcome: Result<GenerationResult, FailureReason>) {
        match outcome {
            Ok(result) => {
                let event = WorkflowEvent::Completed {
                    artifacts: result.artifacts.len(),
                    archive: result.archive.clone(),
                };
                self.enter(WorkflowState::Completed(result), event);
            }
            Err(reason) => self.fail(reason),
        }
    }
}

impl Drop for Cycle<'_> {
    fn drop(&mut self) {
        if self.state.in_flight() {
            self.fail(FailureReason::Cancelled);
        }
    }
}

pub struct Workflow<S> {
    service: S,
    options: GenerationOptions,
    state: WorkflowState,
    events: Option<Sender<WorkflowEvent>>,
}

impl<S: GenerationService> Workflow<S> {
    pub fn new(service: S, options: GenerationOptions) -> Self {
        Self {
            service,
            options,
            state: WorkflowState::Idle,
            events: None,
        }
    }

    /// Start publishing transitions. A later call replaces the previous
    /// subscriber.
    pub fn subscribe(&mut self) -> Receiver<WorkflowEvent> {
        let (sender, receiver) = async_channel::unbounded();
        self.events = Some(sender);
        receiver
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: GenerationOptions) {
        self.options = options;
    }

    pub fn records(&self) -> Option<&RecordSet> {
        match &self.state {
            WorkflowState::AwaitingSelection { records, .. } => Some(records),
            _ => None,
        }
    }

    pub fn selection(&self) -> Option<&SelectionSet> {
        match &self.state {
            WorkflowState::AwaitingSelection { selection, .. } => Some(selection),
            _ => None,
        }
    }

    /// The latest generation result, ready for display.
    pub fn results(&self) -> Option<ResultView> {
        match &self.state {
            WorkflowState::Completed(result) => Some(ResultView::from(result)),
            _ => None,
        }
    }

    /// Begin a new cycle with `file`, discarding any records, selection or
    /// result of the previous one.
    pub async fn ingest(
        &mut self,
        file: RawFile,
        mode: Mode,
    ) -> Result<&WorkflowState, WorkflowError> {
        if matches!(self.state, WorkflowState::Generating) {
            return Err(WorkflowError::Busy);
        }
        info!(file = file.name, size = file.size(), ?mode, "ingest file");
        let mut cycle = Cycle {
            state: &mut self.state,
            events: self.events.as_ref(),
        };
        cycle.enter(
            WorkflowState::Ingesting,
            WorkflowEvent::IngestionStarted {
                file: file.name.clone(),
                size: file.size(),
                mode,
            },
        );
        if let Err(error) = file.ensure_spreadsheet() {
            cycle.fail(error.into());
            drop(cycle);
            return Ok(&self.state);
        }

        match mode {
            Mode::Preview => match ingest::decode_async(&file).await {
                Ok(records) => {
                    let count = records.len();
                    cycle.enter(
                        WorkflowState::AwaitingSelection {
                            records,
                            selection: SelectionSet::new(),
                        },
                        WorkflowEvent::RecordsReady { records: count },
                    );
                }
                Err(error) => cycle.fail(error.into()),
            },
            Mode::Direct => {
                cycle.enter(
                    WorkflowState::Generating,
                    WorkflowEvent::GenerationStarted { records: None },
                );
                let outcome = self
                    .service
                    .submit_file(&file, &self.options)
                    .await
                    .map_err(FailureReason::from);
                cycle.finish(outcome);
            }
        }
        drop(cycle);
        Ok(&self.state)
    }

    fn selection_mut(&mut self) -> Result<(&RecordSet, &mut SelectionSet), WorkflowError> {
        match &mut self.state {
            WorkflowState::AwaitingSelection { records, selection } => Ok((&*records, selection)),
            _ => Err(WorkflowError::NotAwaitingSelection),
        }
    }

    fn selection_changed(&self) {
        if let WorkflowState::AwaitingSelection { records, selection } = &self.state {
            emit(
                self.events.as_ref(),
                WorkflowEvent::SelectionChanged {
                    selected: selection.len(),
                    total: records.len(),
                },
            );
        }
    }

    /// Add records to the selection. Nothing changes if any id is unknown.
    pub fn select(&mut self, ids: impl IntoIterator<Item = usize>) -> Result<(), WorkflowError> {
        let (records, selection) = self.selection_mut()?;
        let ids = ids.into_iter().collect::<Vec<_>>();
        if let Some(&unknown) = ids.iter().find(|&&id| !records.contains(id)) {
            return Err(WorkflowError::UnknownRecord(unknown));
        }
        for id in ids {
            selection.insert(id);
        }
        self.selection_changed();
        Ok(())
    }

    pub fn deselect(&mut self, ids: impl IntoIterator<Item = usize>) -> Result<(), WorkflowError> {
        let (_, selection) = self.selection_mut()?;
        for id in ids {
            selection.remove(id);
        }
        self.selection_changed();
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<(), WorkflowError> {
        let (records, selection) = self.selection_mut()?;
        *selection = SelectionSet::all(records);
        self.selection_changed();
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<(), WorkflowError> {
        let (_, selection) = self.selection_mut()?;
        selection.clear();
        self.selection_changed();
        Ok(())
    }

    /// Submit the selected records. The selection must not be empty.
    pub async fn generate(&mut self) -> Result<&WorkflowState, WorkflowError> {
        let records = match &self.state {
            WorkflowState::AwaitingSelection { selection, .. } if selection.is_empty() => {
                return Err(WorkflowError::EmptySelection);
            }
            WorkflowState::AwaitingSelection { records, selection } => records.selected(selection),
            WorkflowState::Generating => return Err(WorkflowError::Busy),
            _ => return Err(WorkflowError::NotAwaitingSelection),
        };
        info!(records = records.len(), options = ?self.options, "generate selection");
        let mut cycle = Cycle {
            state: &mut self.state,
            events: self.events.as_ref(),
        };
        cycle.enter(
            WorkflowState::Generating,
            WorkflowEvent::GenerationStarted {
                records: Some(records.len()),
            },
        );
        let outcome = self
            .service
            .submit_records(&records, &self.options)
            .await
            .map_err(FailureReason::from);
        cycle.finish(outcome);
        drop(cycle);
        Ok(&self.state)
    }

    /// Return from `Failed` to `Idle`.
    pub fn acknowledge(&mut self) -> Result<(), WorkflowError> {
        if !matches!(self.state, WorkflowState::Failed(_)) {
            return Err(WorkflowError::NotFailed);
        }
        self.state = WorkflowState::Idle;
        emit(self.events.as_ref(), WorkflowEvent::Reset);
        Ok(())
    }
}
