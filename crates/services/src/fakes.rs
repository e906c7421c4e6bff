//! Test doubles and fixtures for this crate's unit and integration tests.
//!
//! Compiled for `cfg(test)` and behind the `test-util` feature.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use exam_core::model::{
    Credentials, ExamContent, ExamId, ExamMeta, OptionCode, Question, QuestionId, QuestionOption,
};
use storage::repository::InMemoryRepository;

use crate::api::{ExamApi, ExamResponse, SubmissionPayload, SubmissionResponse};
use crate::error::{ApiError, PresentationError};
use crate::sessions::Presentation;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// # Panics
///
/// Never in practice; the token is not blank.
#[must_use]
pub fn credentials() -> Credentials {
    Credentials::new("test-token", None).expect("fixture token is not blank")
}

/// Credential store holding [`credentials`].
#[must_use]
pub fn signed_in_store() -> InMemoryRepository {
    InMemoryRepository::with_credentials(credentials())
}

/// Exam bank response with `questions` four-option questions.
///
/// # Panics
///
/// Panics if the fixture no longer matches the wire format.
#[must_use]
pub fn exam_json(id: u64, questions: u64, duration_minutes: Option<u32>) -> ExamResponse {
    let questions: Vec<_> = (1..=questions)
        .map(|qid| {
            json!({
                "id": qid,
                "question": format!("Question {qid}"),
                "option_a": "first",
                "option_b": "second",
                "option_c": "third",
                "option_d": "fourth",
            })
        })
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "name": format!("Exam {id}"),
        "duration_minutes": duration_minutes,
        "questions": questions,
    }))
    .expect("fixture matches the exam wire format")
}

/// Content with `count` four-option questions, ids starting at 1.
///
/// # Panics
///
/// Panics if `count` is zero.
#[must_use]
pub fn exam_content(count: u64, duration_secs: u32) -> Arc<ExamContent> {
    let questions = (1..=count)
        .map(|id| {
            let options = OptionCode::ALL
                .iter()
                .map(|code| QuestionOption::new(*code, format!("option {code}")))
                .collect();
            Question::new(QuestionId::new(id), format!("Question {id}"), options)
                .expect("fixture question is valid")
        })
        .collect();
    let meta = ExamMeta {
        id: ExamId::new(42),
        name: "Sample".into(),
        duration_secs: Some(duration_secs),
    };
    Arc::new(ExamContent::new(meta, questions, duration_secs).expect("fixture exam is valid"))
}

/// Success body with only the obtained marks set.
#[must_use]
pub fn graded(obtained: f64) -> SubmissionResponse {
    SubmissionResponse {
        obtained_marks: Some(obtained),
        ..SubmissionResponse::default()
    }
}

#[must_use]
pub fn score(obtained: f64, total: f64) -> SubmissionResponse {
    SubmissionResponse {
        obtained_marks: Some(obtained),
        total_marks: Some(total),
        ..SubmissionResponse::default()
    }
}

/// The `selected_option` values of a payload, in question order.
#[must_use]
pub fn selected(payload: &SubmissionPayload) -> Vec<String> {
    payload
        .answers
        .iter()
        .map(|entry| entry.selected_option.clone())
        .collect()
}

//
// ─── EXAM BANK ─────────────────────────────────────────────────────────────────
//

/// Scripted exam bank that records every request it receives.
#[derive(Default)]
pub struct FakeExamApi {
    exam: Option<ExamResponse>,
    fetch_failures: Mutex<VecDeque<ApiError>>,
    submissions: Mutex<VecDeque<Result<SubmissionResponse, ApiError>>>,
    gate: Option<Arc<Notify>>,
    fetches: AtomicUsize,
    payloads: Mutex<Vec<SubmissionPayload>>,
    last_authorization: Mutex<Option<String>>,
}

impl FakeExamApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_exam(exam: ExamResponse) -> Self {
        Self {
            exam: Some(exam),
            ..Self::default()
        }
    }

    /// Fail the next fetch with `err`. Without a queued failure or an exam,
    /// fetches answer `NotFound`.
    #[must_use]
    pub fn failing_fetch(self, err: ApiError) -> Self {
        lock(&self.fetch_failures).push_back(err);
        self
    }

    /// Queue the outcome of the next submission. Unscripted submissions
    /// score one mark.
    pub fn push_submission(&self, outcome: Result<SubmissionResponse, ApiError>) {
        lock(&self.submissions).push_back(outcome);
    }

    /// Builder form of [`FakeExamApi::push_submission`].
    #[must_use]
    pub fn then(self, outcome: Result<SubmissionResponse, ApiError>) -> Self {
        self.push_submission(outcome);
        self
    }

    /// Hold every submission until the gate is notified.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        lock(&self.payloads).len()
    }

    pub fn payloads(&self) -> Vec<SubmissionPayload> {
        lock(&self.payloads).clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        lock(&self.last_authorization).clone()
    }
}

#[async_trait]
impl ExamApi for FakeExamApi {
    async fn fetch_exam(
        &self,
        exam_id: ExamId,
        credentials: &Credentials,
    ) -> Result<ExamResponse, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_authorization) = Some(credentials.authorization_header());
        if let Some(err) = lock(&self.fetch_failures).pop_front() {
            return Err(err);
        }
        self.exam.clone().ok_or(ApiError::NotFound {
            detail: format!("exam {exam_id} not found"),
        })
    }

    async fn submit_answers(
        &self,
        payload: &SubmissionPayload,
        credentials: &Credentials,
    ) -> Result<SubmissionResponse, ApiError> {
        lock(&self.payloads).push(payload.clone());
        *lock(&self.last_authorization) = Some(credentials.authorization_header());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let scripted = lock(&self.submissions).pop_front();
        scripted.unwrap_or_else(|| Ok(graded(1.0)))
    }
}

//
// ─── PRESENTATION ──────────────────────────────────────────────────────────────
//

/// Counts fullscreen requests. Refuses them when `refuse` is set.
#[derive(Default)]
pub struct RecordingPresentation {
    pub refuse: bool,
    pub entered: AtomicUsize,
    pub exited: AtomicUsize,
}

#[async_trait]
impl Presentation for RecordingPresentation {
    async fn request_fullscreen(&self) -> Result<(), PresentationError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(PresentationError::Unavailable("denied".into()));
        }
        Ok(())
    }

    async fn release_fullscreen(&self) -> Result<(), PresentationError> {
        self.exited.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
