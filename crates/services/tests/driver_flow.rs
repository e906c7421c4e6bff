use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use services::fakes::{
    exam_content as exam, selected, signed_in_store, FakeExamApi, RecordingPresentation,
};
use exam_core::model::OptionCode;
use exam_core::time::fixed_clock;
use exam_core::{IntegritySignal, SessionState, SubmissionTrigger};
use services::{
    ExamSession, HistoryService, SessionCommand, SessionDriver, SessionHandle, SessionView,
    SignalHub, SubmissionPipeline,
};

struct Rig {
    handle: SessionHandle,
    grader: Arc<FakeExamApi>,
    presentation: Arc<RecordingPresentation>,
    signals: Arc<SignalHub>,
    history: HistoryService,
}

fn rig(grader: FakeExamApi, count: u64, duration_secs: u32) -> Rig {
    let grader = Arc::new(grader);
    let store = Arc::new(signed_in_store());
    let presentation = Arc::new(RecordingPresentation::default());
    let signals = Arc::new(SignalHub::new());
    let history = HistoryService::new(store.clone());
    let pipeline = SubmissionPipeline::new(grader.clone(), store).with_clock(fixed_clock());
    let session = ExamSession::new(exam(count, duration_secs), fixed_clock());
    let handle = SessionDriver::new(session, pipeline, presentation.clone(), signals.clone())
        .with_history(history.clone())
        .spawn();
    Rig {
        handle,
        grader,
        presentation,
        signals,
        history,
    }
}

async fn until(handle: &SessionHandle, ready: impl FnMut(&SessionView) -> bool) -> SessionView {
    let mut view = handle.view();
    let snapshot = view.wait_for(ready).await.expect("driver stopped");
    snapshot.clone()
}

async fn send_all(handle: &SessionHandle, commands: &[SessionCommand]) {
    for command in commands {
        assert!(handle.send(*command).await);
    }
}

#[tokio::test(start_paused = true)]
async fn confirmed_flow_completes_and_records_attempt() {
    let rig = rig(FakeExamApi::new(), 3, 120);
    send_all(
        &rig.handle,
        &[
            SessionCommand::Start,
            SessionCommand::Select(OptionCode::A),
            SessionCommand::Next,
            SessionCommand::Select(OptionCode::C),
            SessionCommand::Next,
            SessionCommand::Next,
        ],
    )
    .await;
    let view = until(&rig.handle, |v| {
        matches!(v.state, SessionState::AwaitingConfirmation { .. })
    })
    .await;
    assert_eq!(view.question_index, 2);

    rig.handle.send(SessionCommand::Confirm).await;
    let view = until(&rig.handle, |v| v.report.is_some()).await;

    assert!(matches!(view.state, SessionState::Completed { .. }));
    assert_eq!(selected(&rig.grader.payloads()[0]), ["a", "c", ""]);
    assert_eq!(rig.history.attended_count().await.unwrap(), 1);
    assert_eq!(rig.presentation.entered.load(Ordering::SeqCst), 1);
    assert_eq!(rig.presentation.exited.load(Ordering::SeqCst), 1);

    let session = rig.handle.shutdown().await.unwrap();
    assert_eq!(session.submissions_issued(), 1);
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_submits_automatically() {
    let rig = rig(FakeExamApi::new(), 5, 5);
    send_all(
        &rig.handle,
        &[
            SessionCommand::Start,
            SessionCommand::Select(OptionCode::D),
            SessionCommand::JumpTo(3),
            SessionCommand::Select(OptionCode::B),
        ],
    )
    .await;

    let view = until(&rig.handle, |v| v.report.is_some()).await;
    let report = view.report.unwrap();
    assert_eq!(report.trigger, SubmissionTrigger::TimeExpired);
    assert_eq!(report.answered, 2);
    assert_eq!(report.time_remaining_secs, 0);
    assert_eq!(selected(&rig.grader.payloads()[0]), ["d", "", "", "b", ""]);

    // The tick task is gone; nothing more is ever submitted.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(rig.grader.payloads().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn input_is_refused_while_a_submission_is_outstanding() {
    let hold = Arc::new(Notify::new());
    let rig = rig(FakeExamApi::new().gated(hold.clone()), 2, 60);
    send_all(
        &rig.handle,
        &[
            SessionCommand::Start,
            SessionCommand::RequestConfirmation,
            SessionCommand::Confirm,
        ],
    )
    .await;
    until(&rig.handle, |v| v.state == SessionState::Submitting).await;

    rig.handle.send(SessionCommand::Confirm).await;
    rig.handle.send(SessionCommand::Select(OptionCode::A)).await;
    let view = until(&rig.handle, |v| v.notice.is_some()).await;
    assert_eq!(view.state, SessionState::Submitting);

    hold.notify_one();
    let view = until(&rig.handle, |v| v.report.is_some()).await;
    assert_eq!(view.progress.answered, 0);
    assert_eq!(rig.grader.payloads().len(), 1);
    assert_eq!(selected(&rig.grader.payloads()[0]), ["", ""]);
}

#[tokio::test(start_paused = true)]
async fn integrity_listener_lives_only_while_session_is_live() {
    let rig = rig(FakeExamApi::new(), 2, 60);
    assert_eq!(rig.signals.listener_count(), 0);

    rig.handle.send(SessionCommand::Start).await;
    until(&rig.handle, |v| v.state.is_live()).await;
    assert_eq!(rig.signals.listener_count(), 1);

    rig.signals.emit(IntegritySignal::VisibilityLost);
    rig.signals.emit(IntegritySignal::FocusLost);
    until(&rig.handle, |v| v.warning_active).await;

    rig.handle.send(SessionCommand::AcknowledgeWarning).await;
    until(&rig.handle, |v| !v.warning_active).await;

    send_all(
        &rig.handle,
        &[SessionCommand::RequestConfirmation, SessionCommand::Confirm],
    )
    .await;
    until(&rig.handle, |v| v.report.is_some()).await;
    assert_eq!(rig.signals.listener_count(), 0);
    assert_eq!(rig.signals.emit(IntegritySignal::FocusLost), 0);
}

#[tokio::test(start_paused = true)]
async fn reset_discards_an_outstanding_submission() {
    let hold = Arc::new(Notify::new());
    let rig = rig(FakeExamApi::new().gated(hold.clone()), 2, 60);
    send_all(
        &rig.handle,
        &[
            SessionCommand::Start,
            SessionCommand::Select(OptionCode::C),
            SessionCommand::RequestConfirmation,
            SessionCommand::Confirm,
        ],
    )
    .await;
    until(&rig.handle, |v| v.state == SessionState::Submitting).await;

    rig.handle.send(SessionCommand::Reset).await;
    let view = until(&rig.handle, |v| v.state == SessionState::NotStarted).await;
    assert_eq!(view.progress.answered, 0);
    assert!(!view.warning_active);

    hold.notify_one();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rig.handle.snapshot().state, SessionState::NotStarted);
    assert_eq!(rig.history.attended_count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn refused_fullscreen_does_not_block_the_session() {
    let grader = Arc::new(FakeExamApi::new());
    let store = Arc::new(signed_in_store());
    let presentation = Arc::new(RecordingPresentation {
        refuse: true,
        ..RecordingPresentation::default()
    });
    let pipeline = SubmissionPipeline::new(grader, store);
    let session = ExamSession::new(exam(1, 30), fixed_clock());
    let handle = SessionDriver::new(session, pipeline, presentation.clone(), Arc::new(SignalHub::new()))
        .spawn();

    handle.send(SessionCommand::Start).await;
    let view = until(&handle, |v| v.state.is_live()).await;
    assert_eq!(view.time_remaining_secs, 30);
    assert_eq!(presentation.entered.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn view_counts_down_once_per_second() {
    let rig = rig(FakeExamApi::new(), 1, 90);
    rig.handle.send(SessionCommand::Start).await;
    until(&rig.handle, |v| v.state.is_live()).await;

    let view = until(&rig.handle, |v| v.time_remaining_secs == 87).await;
    assert_eq!(view.clock_label(), "01:27");
    assert!(rig.grader.payloads().is_empty());
}
