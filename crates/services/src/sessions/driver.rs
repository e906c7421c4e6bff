use std::future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use exam_core::model::{OptionCode, SubmissionResult};
use exam_core::TimerToken;

use super::controller::{ExamSession, TickReaction};
use super::signals::{SignalHub, SignalSubscription};
use super::view::SessionView;
use crate::error::{PresentationError, SessionError, SubmissionError};
use crate::history::HistoryService;
use crate::submission::{SubmissionPipeline, SubmissionRequest};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 32;

/// User input forwarded to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Select(OptionCode),
    Next,
    Previous,
    JumpTo(usize),
    RequestConfirmation,
    CancelConfirmation,
    Confirm,
    Retry,
    AcknowledgeWarning,
    Reset,
    Shutdown,
}

//
// ─── PRESENTATION ──────────────────────────────────────────────────────────────
//

/// Host hook for fullscreen presentation. Failures are logged and ignored.
#[async_trait]
pub trait Presentation: Send + Sync {
    /// # Errors
    ///
    /// Returns `PresentationError` if the host refuses.
    async fn request_fullscreen(&self) -> Result<(), PresentationError>;

    /// # Errors
    ///
    /// Returns `PresentationError` if the host refuses.
    async fn release_fullscreen(&self) -> Result<(), PresentationError>;
}

/// For hosts without a fullscreen mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPresentation;

#[async_trait]
impl Presentation for NoPresentation {
    async fn request_fullscreen(&self) -> Result<(), PresentationError> {
        Ok(())
    }

    async fn release_fullscreen(&self) -> Result<(), PresentationError> {
        Ok(())
    }
}

//
// ─── TIMER TASK ────────────────────────────────────────────────────────────────
//

/// Periodic tick source for one timer token. Aborted on cancel or drop.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    #[must_use]
    pub fn spawn(
        token: TimerToken,
        period: Duration,
        ticks: mpsc::UnboundedSender<TimerToken>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(token).is_err() {
                    break;
                }
            }
        });
        Self { task }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

//
// ─── DRIVER ────────────────────────────────────────────────────────────────────
//

type SubmissionTask = JoinHandle<Result<SubmissionResult, SubmissionError>>;

/// Runs an `ExamSession` against real time.
///
/// Serialises user commands, timer ticks, integrity signals and submission
/// outcomes through one loop, so the session never sees two events at once.
pub struct SessionDriver {
    session: ExamSession,
    pipeline: SubmissionPipeline,
    presentation: Arc<dyn Presentation>,
    signals: Arc<SignalHub>,
    history: Option<HistoryService>,
    tick_period: Duration,
    view: watch::Sender<SessionView>,
    notice: Option<String>,
    ticks_tx: mpsc::UnboundedSender<TimerToken>,
    ticks_rx: mpsc::UnboundedReceiver<TimerToken>,
    timer: Option<TimerHandle>,
    subscription: Option<SignalSubscription>,
    in_flight: Option<SubmissionTask>,
    fullscreen: bool,
}

impl SessionDriver {
    #[must_use]
    pub fn new(
        session: ExamSession,
        pipeline: SubmissionPipeline,
        presentation: Arc<dyn Presentation>,
        signals: Arc<SignalHub>,
    ) -> Self {
        let (view, _) = watch::channel(SessionView::of(&session, None));
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        Self {
            session,
            pipeline,
            presentation,
            signals,
            history: None,
            tick_period: TICK_PERIOD,
            view,
            notice: None,
            ticks_tx,
            ticks_rx,
            timer: None,
            subscription: None,
            in_flight: None,
            fullscreen: false,
        }
    }

    /// Record completed attempts.
    #[must_use]
    pub fn with_history(mut self, history: HistoryService) -> Self {
        self.history = Some(history);
        self
    }

    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// Run on a new task.
    #[must_use]
    pub fn spawn(self) -> SessionHandle {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let view = self.subscribe();
        let task = tokio::spawn(self.run(rx));
        SessionHandle {
            commands,
            view,
            task,
        }
    }

    /// Process events until `Shutdown` arrives or every command sender is
    /// dropped. Returns the session in its final state.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) -> ExamSession {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(token) = self.ticks_rx.recv() => self.on_tick(token),
                Some(signal) = next_signal(&mut self.subscription) => {
                    self.session.observe_integrity(signal);
                }
                joined = join_submission(&mut self.in_flight) => {
                    self.on_submission_done(joined).await;
                }
            }
            self.sync_presentation().await;
            self.publish();
        }
        self.stop_sources();
        self.session.teardown();
        if self.fullscreen {
            self.leave_fullscreen().await;
        }
        info!(state = self.session.state().name(), "session driver stopped");
        self.session
    }

    fn handle(&mut self, command: SessionCommand) {
        self.notice = None;
        let outcome = match command {
            SessionCommand::Start => self.session.start().map(|token| self.arm(token)),
            SessionCommand::Select(code) => self.session.select_option(code),
            SessionCommand::Next => self.session.next().map(drop),
            SessionCommand::Previous => self.session.previous().map(drop),
            SessionCommand::JumpTo(index) => self.session.jump_to(index).map(drop),
            SessionCommand::RequestConfirmation => self.session.request_confirmation(),
            SessionCommand::CancelConfirmation => self.session.cancel_confirmation(),
            SessionCommand::Confirm => self
                .session
                .confirm_submission()
                .map(|request| self.dispatch(request)),
            SessionCommand::Retry => self
                .session
                .retry_submission()
                .map(|request| self.dispatch(request)),
            SessionCommand::AcknowledgeWarning => {
                self.session.acknowledge_warning();
                Ok(())
            }
            SessionCommand::Reset => {
                self.reset();
                Ok(())
            }
            SessionCommand::Shutdown => Ok(()),
        };
        if let Err(err) = outcome {
            self.reject(command, &err);
        }
    }

    fn reject(&mut self, command: SessionCommand, err: &SessionError) {
        debug!(?command, error = %err, "command rejected");
        self.notice = Some(err.to_string());
    }

    fn arm(&mut self, token: TimerToken) {
        self.timer = Some(TimerHandle::spawn(
            token,
            self.tick_period,
            self.ticks_tx.clone(),
        ));
        self.subscription = Some(self.signals.subscribe());
    }

    fn stop_sources(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.subscription = None;
    }

    fn dispatch(&mut self, request: Option<SubmissionRequest>) {
        let Some(request) = request else {
            return;
        };
        self.stop_sources();
        let pipeline = self.pipeline.clone();
        self.in_flight = Some(tokio::spawn(async move { pipeline.submit(&request).await }));
    }

    fn on_tick(&mut self, token: TimerToken) {
        match self.session.tick(token) {
            TickReaction::Submit(request) => self.dispatch(Some(request)),
            TickReaction::Remaining { secs } => debug!(remaining_secs = secs, "tick"),
            TickReaction::Ignored => debug!("stale tick ignored"),
        }
    }

    async fn on_submission_done(
        &mut self,
        joined: Result<Result<SubmissionResult, SubmissionError>, JoinError>,
    ) {
        self.in_flight = None;
        let outcome = joined.unwrap_or_else(|err| {
            warn!(error = %err, "submission task did not finish");
            Err(SubmissionError::Interrupted)
        });
        if !self.session.finish_submission(outcome) {
            return;
        }
        if let Some(history) = &self.history {
            if self.session.report().is_some() {
                if let Err(err) = history.record_session(&self.session).await {
                    warn!(error = %err, "could not record attempt");
                }
            }
        }
    }

    fn reset(&mut self) {
        self.stop_sources();
        // An in-flight request is left to finish; its outcome is discarded.
        self.in_flight = None;
        self.session.teardown();
        self.session = ExamSession::new(Arc::clone(self.session.exam()), self.session.clock());
        info!(exam_id = %self.session.exam().exam_id(), "session reset");
    }

    async fn sync_presentation(&mut self) {
        let wanted = self.session.wants_fullscreen();
        if wanted == self.fullscreen {
            return;
        }
        if wanted {
            if let Err(err) = self.presentation.request_fullscreen().await {
                warn!(error = %err, "fullscreen request refused");
            }
            self.fullscreen = true;
        } else {
            self.leave_fullscreen().await;
        }
    }

    async fn leave_fullscreen(&mut self) {
        if let Err(err) = self.presentation.release_fullscreen().await {
            warn!(error = %err, "could not leave fullscreen");
        }
        self.fullscreen = false;
    }

    fn publish(&self) {
        self.view
            .send_replace(SessionView::of(&self.session, self.notice.clone()));
    }
}

async fn next_signal(
    subscription: &mut Option<SignalSubscription>,
) -> Option<exam_core::IntegritySignal> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => future::pending().await,
    }
}

async fn join_submission(
    task: &mut Option<SubmissionTask>,
) -> Result<Result<SubmissionResult, SubmissionError>, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => future::pending().await,
    }
}

//
// ─── HANDLE ────────────────────────────────────────────────────────────────────
//

/// Host side of a spawned driver.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<ExamSession>,
}

impl SessionHandle {
    /// Returns `false` once the driver has stopped.
    pub async fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    #[must_use]
    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Stop the driver and take back the session.
    ///
    /// # Errors
    ///
    /// Returns `JoinError` if the driver task panicked.
    pub async fn shutdown(self) -> Result<ExamSession, JoinError> {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
        self.task.await
    }
}
