#![forbid(unsafe_code)]

pub mod api;
pub mod content;
pub mod error;
pub mod history;
pub mod sessions;
pub mod submission;

#[cfg(any(test, feature = "test-util"))]
pub mod fakes;

pub use exam_core::Clock;
pub use sessions as session;

pub use api::{ApiConfig, ExamApi, HttpExamApi, SubmissionPayload};
pub use content::{ContentService, DurationPolicy};
pub use error::{
    ApiError, ConfigError, ContentFetchError, HistoryError, PresentationError, SessionError,
    SubmissionError,
};
pub use history::{AttemptListItem, HistoryService};
pub use submission::{SubmissionPipeline, SubmissionRequest};

pub use sessions::{
    ExamSession, NoPresentation, Presentation, SessionCommand, SessionDriver, SessionHandle,
    SessionView, SignalHub,
};
