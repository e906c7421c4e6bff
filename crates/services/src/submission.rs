use std::sync::Arc;

use tracing::{info, warn};

use exam_core::model::{AnswerStore, ExamContent, SubmissionResult};
use exam_core::Clock;
use storage::repository::CredentialStore;

use crate::api::{AnswerEntry, ExamApi, SubmissionPayload};
use crate::error::SubmissionError;

/// A payload ready to send, along with what is needed to read the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    payload: SubmissionPayload,
    question_count: usize,
}

impl SubmissionRequest {
    /// One entry per question in question order. Unanswered questions carry
    /// the no-answer marker.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::PayloadMismatch` if the store does not hold
    /// exactly one slot per question.
    pub fn build(exam: &ExamContent, answers: &AnswerStore) -> Result<Self, SubmissionError> {
        if answers.len() != exam.question_count() {
            return Err(SubmissionError::PayloadMismatch {
                entries: answers.len(),
                questions: exam.question_count(),
            });
        }
        let entries = exam
            .questions()
            .iter()
            .zip(answers.iter())
            .map(|(question, selected)| AnswerEntry::new(question.id(), selected))
            .collect();
        Ok(Self {
            payload: SubmissionPayload {
                exam_id: exam.exam_id(),
                answers: entries,
            },
            question_count: exam.question_count(),
        })
    }

    #[must_use]
    pub fn payload(&self) -> &SubmissionPayload {
        &self.payload
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_count
    }
}

/// Sends a session's answers to the grading service.
#[derive(Clone)]
pub struct SubmissionPipeline {
    api: Arc<dyn ExamApi>,
    credentials: Arc<dyn CredentialStore>,
    clock: Clock,
}

impl SubmissionPipeline {
    #[must_use]
    pub fn new(api: Arc<dyn ExamApi>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            api,
            credentials,
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Issue exactly one grading request.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::MissingCredentials` without sending anything
    /// when no token is stored, and the classified remote failure otherwise.
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResult, SubmissionError> {
        let exam_id = request.payload.exam_id;
        let credentials = self
            .credentials
            .load()
            .await?
            .ok_or(SubmissionError::MissingCredentials)?;

        info!(%exam_id, entries = request.payload.answers.len(), "submitting answers");
        match self.api.submit_answers(&request.payload, &credentials).await {
            Ok(response) => {
                let result = response.into_result(request.question_count, self.clock.now());
                info!(%exam_id, percentage = result.percentage, "submission graded");
                Ok(result)
            }
            Err(err) => {
                let err = SubmissionError::from(err);
                warn!(%exam_id, kind = ?err.kind(), error = %err, "submission failed");
                Err(err)
            }
        }
    }
}
