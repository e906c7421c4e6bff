use std::sync::Arc;

use tracing::{debug, info, warn};

use exam_core::model::{
    AnswerStore, ExamContent, OptionCode, Question, SessionReport, SubmissionResult,
};
use exam_core::{
    Clock, CountdownTimer, IntegrityMonitor, IntegritySignal, NavStep, QuestionNavigator,
    SessionState, SubmissionTrigger, TickOutcome, TimerToken,
};

use super::progress::{PanelEntry, QuestionStatus, SessionProgress};
use crate::error::{SessionError, SubmissionError};
use crate::submission::{SubmissionPipeline, SubmissionRequest};

/// What a delivered timer tick did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReaction {
    Ignored,
    Remaining { secs: u32 },
    /// Time ran out. The request must be sent exactly once.
    Submit(SubmissionRequest),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at one exam.
///
/// Owns the answers, navigator, timer and integrity monitor, and is the only
/// thing that moves them between states. Side effects (scheduling ticks,
/// sending requests, presentation) are left to the host, which acts on the
/// values returned here.
pub struct ExamSession {
    exam: Arc<ExamContent>,
    clock: Clock,
    state: SessionState,
    answers: AnswerStore,
    navigator: QuestionNavigator,
    timer: CountdownTimer,
    integrity: IntegrityMonitor,
    trigger: Option<SubmissionTrigger>,
    pending: Option<SubmissionRequest>,
    submissions_issued: u32,
    last_error: Option<String>,
}

impl ExamSession {
    #[must_use]
    pub fn new(exam: Arc<ExamContent>, clock: Clock) -> Self {
        Self {
            answers: AnswerStore::new(exam.question_count()),
            navigator: QuestionNavigator::for_exam(&exam),
            timer: CountdownTimer::new(exam.duration_secs()),
            integrity: IntegrityMonitor::new(),
            state: SessionState::NotStarted,
            trigger: None,
            pending: None,
            submissions_issued: 0,
            last_error: None,
            exam,
            clock,
        }
    }

    /// Begin the attempt: clear answers, show the first question, start the
    /// countdown and begin observing integrity signals.
    ///
    /// Returns the token that every tick for this session must carry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session has not
    /// started yet.
    pub fn start(&mut self) -> Result<TimerToken, SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(self.invalid("start"));
        }
        self.answers = AnswerStore::new(self.exam.question_count());
        self.navigator = QuestionNavigator::for_exam(&self.exam);
        let Some(token) = self.timer.start(self.clock.now()) else {
            return Err(self.invalid("start"));
        };
        self.integrity.arm();
        self.state = SessionState::InProgress {
            current_index: 0,
            time_remaining_secs: self.timer.seconds_remaining(),
        };
        info!(
            exam_id = %self.exam.exam_id(),
            questions = self.exam.question_count(),
            duration_secs = self.exam.duration_secs(),
            "session started"
        );
        Ok(token)
    }

    /// Record `code` for the displayed question. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside a live session and
    /// `SessionError::UnknownOption` if the question has no such option.
    pub fn select_option(&mut self, code: OptionCode) -> Result<(), SessionError> {
        if !self.state.is_live() {
            return Err(self.invalid("answer"));
        }
        let index = self.navigator.current();
        let offered = self
            .exam
            .question(index)
            .is_some_and(|question| question.has_option(code));
        if !offered {
            return Err(SessionError::UnknownOption { index, code });
        }
        self.answers.record_answer(index, code)?;
        self.navigator.sync(&self.answers);
        debug!(index, %code, "answer recorded");
        Ok(())
    }

    /// Advance one question. On the last question this asks for confirmation
    /// instead.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside a live session.
    pub fn next(&mut self) -> Result<NavStep, SessionError> {
        match self.state {
            SessionState::InProgress { .. } => {
                let step = self.navigator.next(&self.answers);
                if step == NavStep::Exhausted {
                    self.await_confirmation();
                } else {
                    self.refresh();
                }
                Ok(step)
            }
            SessionState::AwaitingConfirmation { .. } => Ok(NavStep::Exhausted),
            _ => Err(self.invalid("advance")),
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress.
    pub fn previous(&mut self) -> Result<NavStep, SessionError> {
        self.require_in_progress("go back")?;
        let step = self.navigator.previous(&self.answers);
        self.refresh();
        Ok(step)
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress and
    /// `SessionError::OutOfRange` for an index past the last question. The
    /// position is unchanged on error.
    pub fn jump_to(&mut self, index: usize) -> Result<NavStep, SessionError> {
        self.require_in_progress("jump")?;
        let count = self.exam.question_count();
        if index >= count {
            return Err(SessionError::OutOfRange { index, count });
        }
        let step = self.navigator.jump_to(index, &self.answers)?;
        self.refresh();
        Ok(step)
    }

    /// Ask for confirmation from any question, not only the last.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress.
    pub fn request_confirmation(&mut self) -> Result<(), SessionError> {
        self.require_in_progress("request confirmation")?;
        self.await_confirmation();
        Ok(())
    }

    /// Back to answering from the confirmation prompt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless awaiting confirmation.
    pub fn cancel_confirmation(&mut self) -> Result<(), SessionError> {
        let SessionState::AwaitingConfirmation { .. } = self.state else {
            return Err(self.invalid("cancel confirmation"));
        };
        self.state = SessionState::InProgress {
            current_index: self.navigator.current(),
            time_remaining_secs: self.timer.seconds_remaining(),
        };
        Ok(())
    }

    /// The user confirmed. Returns the request to send, or `None` if a
    /// submission is already underway.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless awaiting confirmation
    /// or already submitting.
    pub fn confirm_submission(&mut self) -> Result<Option<SubmissionRequest>, SessionError> {
        match self.state {
            SessionState::AwaitingConfirmation { .. } => {
                self.begin_submission(SubmissionTrigger::UserConfirmed)
            }
            SessionState::Submitting => Ok(None),
            _ => Err(self.invalid("submit")),
        }
    }

    /// Apply one timer tick.
    pub fn tick(&mut self, token: TimerToken) -> TickReaction {
        if !self.state.is_live() {
            return TickReaction::Ignored;
        }
        match self.timer.tick(token, self.clock.now()) {
            TickOutcome::Ignored => TickReaction::Ignored,
            TickOutcome::Running { remaining_secs } => {
                self.refresh();
                TickReaction::Remaining {
                    secs: remaining_secs,
                }
            }
            TickOutcome::Expired => {
                info!(exam_id = %self.exam.exam_id(), "time expired");
                match self.begin_submission(SubmissionTrigger::TimeExpired) {
                    Ok(Some(request)) => TickReaction::Submit(request),
                    Ok(None) => TickReaction::Ignored,
                    Err(err) => {
                        warn!(error = %err, "automatic submission could not start");
                        TickReaction::Ignored
                    }
                }
            }
        }
    }

    fn begin_submission(
        &mut self,
        trigger: SubmissionTrigger,
    ) -> Result<Option<SubmissionRequest>, SessionError> {
        if self.state == SessionState::Submitting {
            return Ok(None);
        }
        if !self.state.is_live() {
            return Err(self.invalid("submit"));
        }
        self.timer.stop();
        self.integrity.disarm();
        self.trigger = Some(trigger);

        let request = match SubmissionRequest::build(&self.exam, &self.answers) {
            Ok(request) => request,
            Err(err) => {
                self.fail(&err);
                return Err(err.into());
            }
        };
        self.pending = Some(request.clone());
        self.submissions_issued += 1;
        self.state = SessionState::Submitting;
        info!(
            exam_id = %self.exam.exam_id(),
            ?trigger,
            answered = self.answers.count_answered(),
            "submission started"
        );
        Ok(Some(request))
    }

    /// Apply the grading outcome. Returns `false` if the session was not
    /// waiting for one.
    pub fn finish_submission(&mut self, outcome: Result<SubmissionResult, SubmissionError>) -> bool {
        if self.state != SessionState::Submitting {
            debug!(state = self.state.name(), "ignoring late submission outcome");
            return false;
        }
        match outcome {
            Ok(result) => {
                info!(
                    exam_id = %self.exam.exam_id(),
                    percentage = result.percentage,
                    "session completed"
                );
                self.last_error = None;
                self.state = SessionState::Completed { result };
            }
            Err(err) => self.fail(&err),
        }
        true
    }

    /// Resend the payload of a failed submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RetryNotAllowed` for authorization failures and
    /// `SessionError::InvalidTransition` unless the session has failed.
    pub fn retry_submission(&mut self) -> Result<Option<SubmissionRequest>, SessionError> {
        match self.state {
            SessionState::Failed { kind } if kind.is_retryable() => {
                let request = match self.pending.clone() {
                    Some(request) => request,
                    None => SubmissionRequest::build(&self.exam, &self.answers)?,
                };
                self.pending = Some(request.clone());
                self.submissions_issued += 1;
                self.state = SessionState::Submitting;
                info!(exam_id = %self.exam.exam_id(), "retrying submission");
                Ok(Some(request))
            }
            SessionState::Failed { kind } => Err(SessionError::RetryNotAllowed { kind }),
            SessionState::Submitting => Ok(None),
            _ => Err(self.invalid("retry")),
        }
    }

    /// Send `request` through `pipeline` and apply the outcome.
    pub async fn complete_with(
        &mut self,
        pipeline: &SubmissionPipeline,
        request: &SubmissionRequest,
    ) -> &SessionState {
        let outcome = pipeline.submit(request).await;
        self.finish_submission(outcome);
        &self.state
    }

    /// Returns `true` if the signal raised the warning.
    pub fn observe_integrity(&mut self, signal: IntegritySignal) -> bool {
        let raised = self.integrity.observe(signal);
        if raised {
            warn!(?signal, "exam view left during session");
        }
        raised
    }

    pub fn acknowledge_warning(&mut self) {
        self.integrity.acknowledge();
    }

    /// Stop the countdown and integrity observation.
    pub fn teardown(&mut self) {
        self.timer.stop();
        self.integrity.disarm();
    }

    /// Discard this attempt and return a fresh, unstarted one over the same
    /// exam.
    #[must_use]
    pub fn reset(mut self) -> Self {
        self.teardown();
        Self::new(self.exam, self.clock)
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn exam(&self) -> &Arc<ExamContent> {
        &self.exam
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.navigator.current()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.exam.question(self.navigator.current())
    }

    #[must_use]
    pub fn selected(&self) -> Option<OptionCode> {
        self.navigator.selected()
    }

    #[must_use]
    pub fn seconds_remaining(&self) -> u32 {
        self.timer.seconds_remaining()
    }

    #[must_use]
    pub fn timer_token(&self) -> Option<TimerToken> {
        self.timer.token()
    }

    #[must_use]
    pub fn warning_active(&self) -> bool {
        self.integrity.warning_active()
    }

    #[must_use]
    pub fn integrity_armed(&self) -> bool {
        self.integrity.is_armed()
    }

    #[must_use]
    pub fn trigger(&self) -> Option<SubmissionTrigger> {
        self.trigger
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Grading requests handed out so far, retries included.
    #[must_use]
    pub fn submissions_issued(&self) -> u32 {
        self.submissions_issued
    }

    /// Whether the host should hold the exam view in fullscreen.
    #[must_use]
    pub fn wants_fullscreen(&self) -> bool {
        self.state.is_live() || self.state == SessionState::Submitting
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::new(self.answers.len(), self.answers.count_answered())
    }

    /// One entry per question, in order.
    #[must_use]
    pub fn question_panel(&self) -> Vec<PanelEntry> {
        let current = self.navigator.current();
        (0..self.answers.len())
            .map(|index| {
                let status = if index == current {
                    QuestionStatus::Current
                } else if self.answers.is_answered(index) {
                    QuestionStatus::Answered
                } else {
                    QuestionStatus::Unanswered
                };
                PanelEntry { index, status }
            })
            .collect()
    }

    /// Result screen data, once completed.
    #[must_use]
    pub fn report(&self) -> Option<SessionReport> {
        let SessionState::Completed { result } = &self.state else {
            return None;
        };
        Some(SessionReport {
            exam_name: self.exam.name().to_string(),
            result: result.clone(),
            trigger: self.trigger.unwrap_or(SubmissionTrigger::UserConfirmed),
            time_used_secs: self.timer.elapsed_secs(),
            time_remaining_secs: self.timer.seconds_remaining(),
            answered: self.answers.count_answered(),
            question_count: self.answers.len(),
        })
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }

    fn require_in_progress(&self, action: &'static str) -> Result<(), SessionError> {
        match self.state {
            SessionState::InProgress { .. } => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    fn await_confirmation(&mut self) {
        self.state = SessionState::AwaitingConfirmation {
            current_index: self.navigator.current(),
            time_remaining_secs: self.timer.seconds_remaining(),
        };
    }

    fn refresh(&mut self) {
        let index = self.navigator.current();
        let remaining = self.timer.seconds_remaining();
        if let SessionState::InProgress {
            current_index,
            time_remaining_secs,
        }
        | SessionState::AwaitingConfirmation {
            current_index,
            time_remaining_secs,
        } = &mut self.state
        {
            *current_index = index;
            *time_remaining_secs = remaining;
        }
    }

    fn fail(&mut self, err: &SubmissionError) {
        self.last_error = Some(err.to_string());
        self.state = SessionState::Failed { kind: err.kind() };
    }
}
