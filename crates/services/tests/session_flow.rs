use std::sync::Arc;

use services::fakes::{exam_content as exam, score, selected, signed_in_store, FakeExamApi};
use exam_core::model::{ExamId, OptionCode};
use exam_core::time::fixed_clock;
use exam_core::{SessionState, SubmissionErrorKind, SubmissionTrigger};
use services::session::TickReaction;
use services::{
    ApiError, ContentService, ExamSession, HistoryService, SubmissionPipeline, SubmissionRequest,
};
use storage::repository::InMemoryRepository;

fn pipeline(grader: &Arc<FakeExamApi>) -> SubmissionPipeline {
    SubmissionPipeline::new(grader.clone(), Arc::new(signed_in_store())).with_clock(fixed_clock())
}

#[tokio::test]
async fn confirmed_session_submits_every_question_once() {
    let grader = Arc::new(FakeExamApi::new().then(Ok(score(2.0, 3.0))));
    let pipeline = pipeline(&grader);
    let mut session = ExamSession::new(exam(3, 120), fixed_clock());
    session.start().unwrap();

    session.select_option(OptionCode::A).unwrap();
    session.next().unwrap();
    session.select_option(OptionCode::C).unwrap();
    session.next().unwrap();
    session.next().unwrap();
    assert!(matches!(
        session.state(),
        SessionState::AwaitingConfirmation { current_index: 2, .. }
    ));

    let request = session.confirm_submission().unwrap().unwrap();
    assert_eq!(session.state(), &SessionState::Submitting);
    let state = session.complete_with(&pipeline, &request).await;
    assert!(matches!(state, SessionState::Completed { .. }));

    let payloads = grader.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(selected(&payloads[0]), ["a", "c", ""]);
    let report = session.report().unwrap();
    assert_eq!(report.trigger, SubmissionTrigger::UserConfirmed);
    assert!((report.result.percentage - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn expiry_submits_partial_answers_without_confirmation() {
    let grader = Arc::new(FakeExamApi::new());
    let pipeline = pipeline(&grader);
    let mut session = ExamSession::new(exam(5, 4), fixed_clock());
    let token = session.start().unwrap();

    session.select_option(OptionCode::B).unwrap();
    session.jump_to(4).unwrap();
    session.select_option(OptionCode::A).unwrap();

    let mut request = None;
    for _ in 0..4 {
        if let TickReaction::Submit(r) = session.tick(token) {
            request = Some(r);
        }
    }
    let request = request.expect("time ran out");
    assert_eq!(session.state(), &SessionState::Submitting);
    assert_eq!(session.trigger(), Some(SubmissionTrigger::TimeExpired));

    session.complete_with(&pipeline, &request).await;
    assert_eq!(selected(&grader.payloads()[0]), ["b", "", "", "", "a"]);
    assert!(session.report().unwrap().timed_out());
}

#[tokio::test]
async fn expiry_and_confirmation_in_one_step_issue_one_request() {
    let grader = Arc::new(FakeExamApi::new());
    let pipeline = pipeline(&grader);
    let mut session = ExamSession::new(exam(2, 1), fixed_clock());
    let token = session.start().unwrap();
    session.request_confirmation().unwrap();

    let TickReaction::Submit(request) = session.tick(token) else {
        panic!("expected expiry");
    };
    assert!(session.confirm_submission().unwrap().is_none());
    session.complete_with(&pipeline, &request).await;

    assert_eq!(grader.payloads().len(), 1);
    assert_eq!(session.submissions_issued(), 1);
}

#[test]
fn payload_marks_unanswered_positions() {
    let content = exam(4, 60);
    let mut session = ExamSession::new(content.clone(), fixed_clock());
    session.start().unwrap();
    session.select_option(OptionCode::B).unwrap();
    session.jump_to(2).unwrap();
    session.select_option(OptionCode::D).unwrap();

    let request = SubmissionRequest::build(&content, session.answers()).unwrap();
    assert_eq!(selected(request.payload()), ["b", "", "d", ""]);
    let ids: Vec<u64> = request
        .payload()
        .answers
        .iter()
        .map(|entry| entry.question_id.value())
        .collect();
    assert_eq!(ids, [1, 2, 3, 4]);
}

#[tokio::test]
async fn network_failure_keeps_answers_for_a_manual_retry() {
    let grader = Arc::new(
        FakeExamApi::new()
            .then(Err(ApiError::Transport("connection reset".into())))
            .then(Ok(score(1.0, 2.0))),
    );
    let pipeline = pipeline(&grader);
    let mut session = ExamSession::new(exam(2, 60), fixed_clock());
    session.start().unwrap();
    session.select_option(OptionCode::D).unwrap();
    session.request_confirmation().unwrap();

    let request = session.confirm_submission().unwrap().unwrap();
    session.complete_with(&pipeline, &request).await;
    assert_eq!(
        session.state(),
        &SessionState::Failed {
            kind: SubmissionErrorKind::Network
        }
    );
    assert_eq!(session.answers().answer(0), Some(OptionCode::D));
    assert_eq!(grader.payloads().len(), 1);

    let retry = session.retry_submission().unwrap().unwrap();
    session.complete_with(&pipeline, &retry).await;
    assert!(matches!(session.state(), SessionState::Completed { .. }));
    let payloads = grader.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);
}

#[tokio::test]
async fn signed_out_submission_fails_with_authorization() {
    let grader = Arc::new(FakeExamApi::new());
    let pipeline = SubmissionPipeline::new(grader.clone(), Arc::new(InMemoryRepository::new()));
    let mut session = ExamSession::new(exam(1, 60), fixed_clock());
    session.start().unwrap();
    session.request_confirmation().unwrap();

    let request = session.confirm_submission().unwrap().unwrap();
    session.complete_with(&pipeline, &request).await;
    assert_eq!(
        session.state(),
        &SessionState::Failed {
            kind: SubmissionErrorKind::Authorization
        }
    );
    assert!(grader.payloads().is_empty());
    assert!(session.retry_submission().is_err());
}

#[tokio::test]
async fn fetched_exam_runs_to_a_recorded_attempt() {
    let response = serde_json::from_value(serde_json::json!({
        "id": 1,
        "name": "Python Basics",
        "questions": [
            {"id": 11, "question": "len([]) == ?", "option_a": "0", "option_b": "1"},
            {"id": 12, "question": "type(1.0)?", "option_a": "int", "option_b": "float"}
        ]
    }))
    .unwrap();
    let grader = Arc::new(FakeExamApi::with_exam(response).then(Ok(score(2.0, 2.0))));
    let store = Arc::new(signed_in_store());
    let content = ContentService::new(grader.clone(), store.clone())
        .load(ExamId::new(1))
        .await
        .unwrap();
    // No duration on the wire: the fallback table gives exam 1 ten minutes.
    assert_eq!(content.duration_secs(), 600);

    let pipeline = SubmissionPipeline::new(grader.clone(), store.clone());
    let history = HistoryService::new(store);
    let mut session = ExamSession::new(Arc::new(content), fixed_clock());
    session.start().unwrap();
    session.select_option(OptionCode::A).unwrap();
    session.next().unwrap();
    session.select_option(OptionCode::B).unwrap();
    session.next().unwrap();
    let request = session.confirm_submission().unwrap().unwrap();
    session.complete_with(&pipeline, &request).await;

    history.record_session(&session).await.unwrap();
    assert_eq!(history.attended_count().await.unwrap(), 1);
    let recent = history.recent(5).await.unwrap();
    assert_eq!(recent[0].exam_name, "Python Basics");
    assert!((recent[0].percentage - 100.0).abs() < f64::EPSILON);
    assert_eq!(grader.fetch_count(), 1);
}
