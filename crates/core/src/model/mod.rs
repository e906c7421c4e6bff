mod answers;
mod credentials;
mod ids;
mod question;
mod result;

pub use ids::{ExamId, ParseIdError, QuestionId};

pub use answers::{AnswerError, AnswerStore};
pub use credentials::{Credentials, CredentialsError, DEFAULT_TOKEN_TYPE};
pub use question::{ContentError, ExamContent, ExamMeta, OptionCode, Question, QuestionOption};
pub use result::{PerformanceLevel, QuestionOutcome, SessionReport, SubmissionResult};
