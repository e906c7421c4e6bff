//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{AnswerError, ContentError, ExamId, OptionCode};
use exam_core::navigator::NavigationError;
use exam_core::SubmissionErrorKind;
use storage::repository::StorageError;

/// Errors from the exam-bank HTTP collaborator, classified by response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiError {
    #[error("unauthorized ({status}): {detail}")]
    Unauthorized { status: u16, detail: String },
    #[error("not found: {detail}")]
    NotFound { detail: String },
    #[error("request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("service unavailable ({status}): {detail}")]
    Unavailable { status: u16, detail: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Errors emitted by the configuration layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid base URL: {raw}")]
    InvalidBaseUrl { raw: String },
    #[error("invalid value for {var}: {raw}")]
    InvalidValue { var: &'static str, raw: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while fetching session content.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentFetchError {
    #[error("not signed in")]
    MissingCredentials,
    #[error("credentials rejected: {0}")]
    Unauthorized(String),
    #[error("exam {exam_id} not found")]
    NotFound { exam_id: ExamId },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid exam content: {0}")]
    Content(#[from] ContentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ContentFetchError {
    /// The fetched exam had zero questions.
    #[must_use]
    pub fn is_no_content(&self) -> bool {
        matches!(self, ContentFetchError::Content(ContentError::NoQuestions))
    }

    /// 401/403 map to `Unauthorized` and 404 to `NotFound`. Any other
    /// status or transport failure on a fetch maps to `Network`.
    pub(crate) fn from_api(exam_id: ExamId, err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized { detail, .. } => ContentFetchError::Unauthorized(detail),
            ApiError::NotFound { .. } => ContentFetchError::NotFound { exam_id },
            ApiError::Rejected { status, detail } | ApiError::Unavailable { status, detail } => {
                ContentFetchError::Network(format!("{status}: {detail}"))
            }
            ApiError::Transport(msg) | ApiError::Decode(msg) => ContentFetchError::Network(msg),
        }
    }
}

/// Errors emitted by the submission pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("not signed in")]
    MissingCredentials,
    #[error("credentials rejected: {0}")]
    Unauthorized(String),
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("payload has {entries} entries for {questions} questions")]
    PayloadMismatch { entries: usize, questions: usize },
    #[error("network error: {0}")]
    Network(String),
    #[error("grading service unavailable ({status}): {detail}")]
    Unavailable { status: u16, detail: String },
    #[error("unreadable grading response: {0}")]
    MalformedResponse(String),
    #[error("credential store error: {0}")]
    Credentials(String),
    #[error("submission task ended unexpectedly")]
    Interrupted,
}

impl SubmissionError {
    #[must_use]
    pub fn kind(&self) -> SubmissionErrorKind {
        match self {
            SubmissionError::MissingCredentials | SubmissionError::Unauthorized(_) => {
                SubmissionErrorKind::Authorization
            }
            SubmissionError::Rejected(_) | SubmissionError::PayloadMismatch { .. } => {
                SubmissionErrorKind::Validation
            }
            SubmissionError::Network(_)
            | SubmissionError::Unavailable { .. }
            | SubmissionError::MalformedResponse(_)
            | SubmissionError::Credentials(_)
            | SubmissionError::Interrupted => SubmissionErrorKind::Network,
        }
    }
}

impl From<ApiError> for SubmissionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized { detail, .. } => SubmissionError::Unauthorized(detail),
            ApiError::NotFound { detail } | ApiError::Rejected { detail, .. } => {
                SubmissionError::Rejected(detail)
            }
            ApiError::Unavailable { status, detail } => {
                SubmissionError::Unavailable { status, detail }
            }
            ApiError::Transport(msg) => SubmissionError::Network(msg),
            ApiError::Decode(msg) => SubmissionError::MalformedResponse(msg),
        }
    }
}

impl From<StorageError> for SubmissionError {
    fn from(err: StorageError) -> Self {
        SubmissionError::Credentials(err.to_string())
    }
}

/// Errors emitted by the session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    #[error("question index {index} is out of range (question count {count})")]
    OutOfRange { index: usize, count: usize },
    #[error("question {index} has no option {code}")]
    UnknownOption { index: usize, code: OptionCode },
    #[error("a {kind:?} failure cannot be retried")]
    RetryNotAllowed { kind: SubmissionErrorKind },
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PresentationError {
    #[error("presentation unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by the attempt history service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("session has not completed")]
    NotCompleted,
    #[error(transparent)]
    Storage(#[from] StorageError),
}
