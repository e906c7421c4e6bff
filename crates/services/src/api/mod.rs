//! Exam bank and grading service collaborator.

mod config;
mod http;
pub mod wire;

use async_trait::async_trait;

use exam_core::model::{Credentials, ExamId};

use crate::error::ApiError;

pub use config::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use http::{classify_status, HttpExamApi};
pub use wire::{AnswerEntry, ExamResponse, SubmissionPayload, SubmissionResponse, NO_ANSWER};

/// Remote endpoints a session talks to.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` classified from the response or transport failure.
    async fn fetch_exam(
        &self,
        exam_id: ExamId,
        credentials: &Credentials,
    ) -> Result<ExamResponse, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` classified from the response or transport failure.
    async fn submit_answers(
        &self,
        payload: &SubmissionPayload,
        credentials: &Credentials,
    ) -> Result<SubmissionResponse, ApiError>;
}
