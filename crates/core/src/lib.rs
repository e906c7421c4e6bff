#![forbid(unsafe_code)]

pub mod error;
pub mod integrity;
pub mod model;
pub mod navigator;
pub mod state;
pub mod time;
pub mod timer;

pub use error::Error;
pub use integrity::{IntegrityMonitor, IntegritySignal};
pub use navigator::{NavStep, NavigationError, QuestionNavigator};
pub use state::{SessionState, SubmissionErrorKind, SubmissionTrigger};
pub use time::Clock;
pub use timer::{CountdownTimer, TickOutcome, TimerPhase, TimerToken};
