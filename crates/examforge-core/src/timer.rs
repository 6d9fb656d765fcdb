//! Countdown timer for an exam session.
//!
//! `SessionTimer` is a plain state object: something else decides when a
//! second has elapsed and calls [`SessionTimer::tick`]. In the CLI that is a
//! [`ticker`] polled from the session's event loop.

use std::fmt;
use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Length of one timer tick.
pub const TICK: Duration = Duration::from_secs(1);

/// Callback invoked once when the countdown reaches zero.
pub type ExpiryCallback = Box<dyn FnMut() + Send>;

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; carries the remaining seconds.
    Running(u32),
    /// This tick brought the countdown to zero.
    Expired,
    /// The timer is stopped or already expired; nothing changed.
    Idle,
}

#[derive(Default)]
pub struct SessionTimer {
    remaining: u32,
    running: bool,
    expired: bool,
    on_expire: Option<ExpiryCallback>,
}

impl fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTimer")
            .field("remaining", &self.remaining)
            .field("running", &self.running)
            .field("expired", &self.expired)
            .field("on_expire", &self.on_expire.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the expiry callback, replacing any previous one.
    pub fn on_expire(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_expire = Some(Box::new(callback));
    }

    /// Reset to `total_seconds` and start counting down.
    ///
    /// Starting at zero expires immediately.
    pub fn start(&mut self, total_seconds: u32) {
        self.remaining = total_seconds;
        self.expired = false;
        self.running = true;
        if total_seconds == 0 {
            self.expire();
        }
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> Tick {
        if !self.running || self.expired {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expire();
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    /// Halt ticking; remaining time is kept.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Remaining time as `m:ss`.
    pub fn display(&self) -> String {
        format_time(self.remaining)
    }

    fn expire(&mut self) {
        self.expired = true;
        self.running = false;
        tracing::info!("exam timer expired");
        if let Some(callback) = self.on_expire.as_mut() {
            callback();
        }
    }
}

/// Format seconds as `minutes:seconds`, seconds zero-padded.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// A one-second interval whose first tick lands one second from now.
///
/// Missed ticks are delayed, never fired in a burst.
pub fn ticker() -> Interval {
    let mut interval = interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
