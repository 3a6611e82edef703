use crate::{
    ingest::{DecodeError, RawFile},
    remote::{GenerationOptions, GenerationService as _, RemoteError, local::LocalService},
    workflow::{FailureReason, Mode, Workflow, WorkflowError, WorkflowEvent, WorkflowState},
};

use super::{handsets, xlsx};

fn workflow() -> Workflow<LocalService> {
    Workflow::new(LocalService::new(), GenerationOptions::default())
}

fn drain(events: &async_channel::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

#[tokio::test]
async fn test_preview_then_generate_selection() {
    let mut workflow = workflow();
    let state = workflow.ingest(handsets(4), Mode::Preview).await.unwrap();
    assert_eq!(state.name(), "awaiting_selection");
    assert_eq!(workflow.records().unwrap().len(), 4);
    assert!(workflow.selection().unwrap().is_empty());

    workflow.select([1, 3]).unwrap();
    workflow.generate().await.unwrap();
    let view = workflow.results().unwrap();
    assert_eq!(view.len(), 2);
    assert_eq!(view.get(1).unwrap().id, "barcode_label_359827134400000_1.png");
    assert_eq!(view.get(2).unwrap().id, "barcode_label_359827134400002_2.png");
    assert_eq!(view.get(1).unwrap().content_type, "image/png");
    assert!(view.archive.is_some());

    let body = workflow
        .service()
        .download_artifact(&view.get(2).unwrap().id)
        .await
        .unwrap();
    let label: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(label["imei"], "359827134400002");
    assert_eq!(label["color"], "SHINY GOLD");
}

#[tokio::test]
async fn test_direct_pipeline_yields_one_artifact_per_record() {
    let mut workflow = workflow();
    let state = workflow.ingest(handsets(10), Mode::Direct).await.unwrap();
    let WorkflowState::Completed(result) = state else {
        panic!("unexpected state {state:?}");
    };
    assert_eq!(result.artifacts.len(), 10);
    assert!(result.archive.is_some());
    assert!(workflow.records().is_none());
    assert!(workflow.selection().is_none());

    let stats = workflow.service().archive_stats().await.unwrap();
    assert_eq!((stats.png_files, stats.pdf_files, stats.sessions), (10, 1, 1));
}

#[tokio::test]
async fn test_direct_pipeline_without_archive() {
    let options = GenerationOptions {
        produce_archive: false,
        ..Default::default()
    };
    let mut workflow = Workflow::new(LocalService::new(), options);
    workflow.ingest(handsets(3), Mode::Direct).await.unwrap();
    let view = workflow.results().unwrap();
    assert_eq!(view.len(), 3);
    assert!(view.archive.is_none());
}

#[tokio::test]
async fn test_empty_selection_cannot_generate() {
    let mut workflow = workflow();
    workflow.ingest(handsets(2), Mode::Preview).await.unwrap();
    assert_eq!(workflow.generate().await, Err(WorkflowError::EmptySelection));

    workflow.select_all().unwrap();
    workflow.clear_selection().unwrap();
    assert_eq!(workflow.generate().await, Err(WorkflowError::EmptySelection));
    assert_eq!(workflow.state().name(), "awaiting_selection");
}

#[tokio::test]
async fn test_generate_requires_records() {
    let mut workflow = workflow();
    assert_eq!(
        workflow.generate().await,
        Err(WorkflowError::NotAwaitingSelection)
    );
    assert_eq!(workflow.select([1]), Err(WorkflowError::NotAwaitingSelection));
}

#[tokio::test]
async fn test_unknown_ids_leave_selection_untouched() {
    let mut workflow = workflow();
    workflow.ingest(handsets(3), Mode::Preview).await.unwrap();
    workflow.select([2]).unwrap();
    assert_eq!(workflow.select([1, 9]), Err(WorkflowError::UnknownRecord(9)));
    assert_eq!(workflow.selection().unwrap().ids().collect::<Vec<_>>(), [2]);

    workflow.deselect([2, 9]).unwrap();
    assert!(workflow.selection().unwrap().is_empty());
}

#[tokio::test]
async fn test_new_file_discards_previous_cycle() {
    let mut workflow = workflow();
    workflow.ingest(handsets(3), Mode::Preview).await.unwrap();
    workflow.select_all().unwrap();
    workflow.generate().await.unwrap();
    assert!(workflow.results().is_some());

    // From Completed.
    workflow.ingest(handsets(5), Mode::Preview).await.unwrap();
    assert!(workflow.results().is_none());
    assert_eq!(workflow.records().unwrap().len(), 5);
    assert!(workflow.selection().unwrap().is_empty());

    // From AwaitingSelection with a pending selection.
    workflow.select([4, 5]).unwrap();
    let other = xlsx("other.xlsx", &["imei"], &[&["1"]]);
    workflow.ingest(other, Mode::Preview).await.unwrap();
    assert_eq!(workflow.records().unwrap().len(), 1);
    assert!(workflow.selection().unwrap().is_empty());

    // From Failed.
    workflow
        .ingest(RawFile::new("broken.xlsx", &b"not a workbook"[..]), Mode::Preview)
        .await
        .unwrap();
    assert!(matches!(
        workflow.state(),
        WorkflowState::Failed(FailureReason::Decode(DecodeError::CorruptFile(_)))
    ));
    workflow.ingest(handsets(2), Mode::Preview).await.unwrap();
    assert_eq!(workflow.records().unwrap().len(), 2);
}

#[tokio::test]
async fn test_direct_pipeline_clears_records() {
    let mut workflow = workflow();
    workflow.ingest(handsets(3), Mode::Preview).await.unwrap();
    workflow.select_all().unwrap();
    workflow.ingest(handsets(2), Mode::Direct).await.unwrap();
    assert!(workflow.records().is_none());
    assert_eq!(workflow.results().unwrap().len(), 2);
}

#[tokio::test]
async fn test_remote_failure_ends_in_failed() {
    let mut workflow = workflow();
    workflow.ingest(handsets(2), Mode::Preview).await.unwrap();
    workflow.select_all().unwrap();
    workflow.service().set_offline(true);
    let state = workflow.generate().await.unwrap();
    assert!(matches!(
        state,
        WorkflowState::Failed(FailureReason::Remote(RemoteError::Unreachable(_)))
    ));

    workflow.acknowledge().unwrap();
    assert_eq!(*workflow.state(), WorkflowState::Idle);
    assert_eq!(workflow.acknowledge(), Err(WorkflowError::NotFailed));
}

#[tokio::test]
async fn test_rejected_options_end_in_failed() {
    let options = GenerationOptions {
        grid_cols: 0,
        ..Default::default()
    };
    let mut workflow = Workflow::new(LocalService::new(), options);
    let state = workflow.ingest(handsets(2), Mode::Direct).await.unwrap();
    assert!(matches!(
        state,
        WorkflowState::Failed(FailureReason::Remote(RemoteError::BadStatus {
            status: 400,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_huge_grid_is_forwarded_unclamped() {
    let options = GenerationOptions {
        grid_cols: 70_000,
        grid_rows: 70_000,
        ..Default::default()
    };
    let mut workflow = Workflow::new(LocalService::new(), options);
    let state = workflow.ingest(handsets(2), Mode::Direct).await.unwrap();
    let WorkflowState::Completed(result) = state else {
        panic!("unexpected state {state:?}");
    };
    assert_eq!(result.artifacts.len(), 2);
    let archive = result.archive.clone().unwrap();
    let body = workflow.service().download_archive(&archive).await.unwrap();
    let sheet: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(sheet["pages"], 1);
    assert_eq!(sheet["grid_cols"], 70_000);
}

#[tokio::test]
async fn test_unsupported_file_type_fails() {
    let mut workflow = workflow();
    let file = RawFile::new("labels.csv", &b"imei,model\n1,A\n"[..]);
    let state = workflow.ingest(file, Mode::Direct).await.unwrap();
    assert_eq!(
        *state,
        WorkflowState::Failed(FailureReason::Decode(DecodeError::UnsupportedMediaType(
            "text/csv".to_owned()
        )))
    );
    let stats = workflow.service().archive_stats().await.unwrap();
    assert_eq!(stats.sessions, 0);
}

#[tokio::test]
async fn test_transitions_are_published() {
    let mut workflow = workflow();
    let events = workflow.subscribe();
    workflow.ingest(handsets(3), Mode::Preview).await.unwrap();
    workflow.select_all().unwrap();
    workflow.generate().await.unwrap();

    let events = drain(&events);
    assert_eq!(events.len(), 5, "{events:?}");
    assert!(matches!(
        &events[0],
        WorkflowEvent::IngestionStarted { file, size, mode: Mode::Preview }
            if file == "handsets.xlsx" && *size > 0
    ));
    assert_eq!(events[1], WorkflowEvent::RecordsReady { records: 3 });
    assert_eq!(
        events[2],
        WorkflowEvent::SelectionChanged {
            selected: 3,
            total: 3
        }
    );
    assert_eq!(
        events[3],
        WorkflowEvent::GenerationStarted { records: Some(3) }
    );
    assert!(matches!(
        &events[4],
        WorkflowEvent::Completed {
            artifacts: 3,
            archive: Some(_)
        }
    ));
}

#[tokio::test]
async fn test_failure_and_reset_are_published() {
    let mut workflow = workflow();
    let events = workflow.subscribe();
    workflow.service().set_offline(true);
    workflow.ingest(handsets(1), Mode::Direct).await.unwrap();
    workflow.acknowledge().unwrap();

    let events = drain(&events);
    assert!(matches!(
        events.as_slice(),
        [
            WorkflowEvent::IngestionStarted {
                mode: Mode::Direct,
                ..
            },
            WorkflowEvent::GenerationStarted { records: None },
            WorkflowEvent::Failed {
                reason: FailureReason::Remote(RemoteError::Unreachable(_))
            },
            WorkflowEvent::Reset,
        ]
    ));
}
