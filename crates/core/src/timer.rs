use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::time::elapsed_secs;

/// Ticks between wall-clock resynchronisations.
pub const RESYNC_EVERY_TICKS: u32 = 10;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifies one running period of one timer.
///
/// Tokens are unique across all timers in the process, so a tick scheduled for a
/// stopped or discarded timer can never be accepted by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    fn allocate() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Expired,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale token, or the timer is not running.
    Ignored,
    Running { remaining_secs: u32 },
    /// Remaining time reached zero. Returned once per timer.
    Expired,
}

/// One-second countdown with a single expiry notification.
///
/// The timer does not schedule anything itself; the host delivers ticks
/// carrying the token handed out by [`CountdownTimer::start`].
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    duration_secs: u32,
    remaining_secs: u32,
    phase: TimerPhase,
    started_at: Option<DateTime<Utc>>,
    ticks: u32,
    active: Option<TimerToken>,
}

impl CountdownTimer {
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            phase: TimerPhase::Idle,
            started_at: None,
            ticks: 0,
            active: None,
        }
    }

    /// Start the countdown.
    ///
    /// Starting a running timer is a no-op that returns the current token.
    /// A stopped or expired timer stays that way and returns `None`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<TimerToken> {
        match self.phase {
            TimerPhase::Idle => {
                let token = TimerToken::allocate();
                self.phase = TimerPhase::Running;
                self.started_at = Some(now);
                self.active = Some(token);
                Some(token)
            }
            TimerPhase::Running => self.active,
            TimerPhase::Expired | TimerPhase::Stopped => None,
        }
    }

    /// Apply one tick.
    ///
    /// Each accepted tick removes exactly one second. Every
    /// [`RESYNC_EVERY_TICKS`] ticks the count is compared with the wall clock and
    /// lowered to it if the ticks have fallen behind.
    pub fn tick(&mut self, token: TimerToken, now: DateTime<Utc>) -> TickOutcome {
        if self.phase != TimerPhase::Running || self.active != Some(token) {
            return TickOutcome::Ignored;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % RESYNC_EVERY_TICKS == 0 {
            self.resync(now);
        }

        if self.remaining_secs == 0 {
            self.phase = TimerPhase::Expired;
            self.active = None;
            return TickOutcome::Expired;
        }

        TickOutcome::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    /// Lower the remaining time to what the wall clock says, never raising it.
    pub fn resync(&mut self, now: DateTime<Utc>) {
        let Some(started_at) = self.started_at else {
            return;
        };
        let elapsed = u32::try_from(elapsed_secs(started_at, now)).unwrap_or(u32::MAX);
        let by_wall_clock = self.duration_secs.saturating_sub(elapsed);
        self.remaining_secs = self.remaining_secs.min(by_wall_clock);
    }

    /// Stop the countdown. Ticks already in flight are ignored afterwards.
    ///
    /// Returns `true` if the timer was running.
    pub fn stop(&mut self) -> bool {
        self.active = None;
        if self.phase == TimerPhase::Running {
            self.phase = TimerPhase::Stopped;
            return true;
        }
        if self.phase == TimerPhase::Idle {
            self.phase = TimerPhase::Stopped;
        }
        false
    }

    #[must_use]
    pub fn seconds_remaining(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.duration_secs.saturating_sub(self.remaining_secs)
    }

    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    #[must_use]
    pub fn token(&self) -> Option<TimerToken> {
        self.active
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }
}
