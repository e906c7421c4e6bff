use exam_core::model::{OptionCode, QuestionOption, SessionReport};
use exam_core::time::format_clock;
use exam_core::SessionState;

use super::controller::ExamSession;
use super::progress::{PanelEntry, SessionProgress};

/// Snapshot of a session for rendering.
///
/// Built after every processed event, so a renderer never has to reach into
/// the session itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub state: SessionState,
    pub exam_name: String,
    pub question_index: usize,
    pub question_count: usize,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
    pub selected: Option<OptionCode>,
    pub time_remaining_secs: u32,
    pub panel: Vec<PanelEntry>,
    pub progress: SessionProgress,
    pub warning_active: bool,
    pub last_error: Option<String>,
    /// Why the most recent command was refused, if it was.
    pub notice: Option<String>,
    pub report: Option<SessionReport>,
}

impl SessionView {
    #[must_use]
    pub fn of(session: &ExamSession, notice: Option<String>) -> Self {
        let (prompt, options) = session
            .current_question()
            .map(|question| (question.prompt().to_string(), question.options().to_vec()))
            .unwrap_or_default();
        Self {
            state: session.state().clone(),
            exam_name: session.exam().name().to_string(),
            question_index: session.current_index(),
            question_count: session.exam().question_count(),
            prompt,
            options,
            selected: session.selected(),
            time_remaining_secs: session.seconds_remaining(),
            panel: session.question_panel(),
            progress: session.progress(),
            warning_active: session.warning_active(),
            last_error: session.last_error().map(str::to_string),
            notice,
            report: session.report(),
        }
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn clock_label(&self) -> String {
        format_clock(self.time_remaining_secs)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::exam_content;
    use exam_core::time::fixed_clock;

    #[test]
    fn view_reflects_the_displayed_question() {
        let mut session = ExamSession::new(exam_content(3, 95), fixed_clock());
        session.start().unwrap();
        session.jump_to(1).unwrap();
        session.select_option(OptionCode::C).unwrap();

        let view = SessionView::of(&session, None);
        assert_eq!(view.question_index, 1);
        assert_eq!(view.prompt, "Question 2");
        assert_eq!(view.options.len(), 4);
        assert_eq!(view.selected, Some(OptionCode::C));
        assert_eq!(view.clock_label(), "01:35");
        assert_eq!(view.progress.answered, 1);
        assert!(!view.is_finished());
    }
}
