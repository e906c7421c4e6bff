mod controller;
mod driver;
mod progress;
mod signals;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{ExamSession, TickReaction};
pub use driver::{
    NoPresentation, Presentation, SessionCommand, SessionDriver, SessionHandle, TimerHandle,
    TICK_PERIOD,
};
pub use progress::{PanelEntry, QuestionStatus, SessionProgress};
pub use signals::{SignalHub, SignalSubscription};
pub use view::SessionView;
