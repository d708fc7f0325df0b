//! Trailing-edge debounce
//!
//! Pure state machine over caller-supplied timestamps (milliseconds), so the
//! same logic drives `setTimeout` in the browser and plain loops in tests.
//! Every notification pushes the deadline to `now + window`; the scan fires
//! once the window passes without a new notification.

use serde::{Deserialize, Serialize};

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DebounceStats {
    pub notifications: u64,
    pub fired: u64,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: f64,
    deadline: Option<f64>,
    stats: DebounceStats,
}

impl Debouncer {
    /// Negative or non-finite windows are treated as zero
    pub fn new(window: f64) -> Self {
        let window = if window.is_finite() && window > 0.0 { window } else { 0.0 };
        Self {
            window,
            deadline: None,
            stats: DebounceStats::default(),
        }
    }

    /// Record a notification at `now`. Returns the (new) deadline.
    pub fn notify(&mut self, now: f64) -> f64 {
        self.stats.notifications += 1;
        let deadline = now + self.window;
        self.deadline = Some(deadline);
        deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Fire if the window has elapsed. Clears the pending deadline on fire.
    pub fn take_due(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => self.fire(),
            _ => false,
        }
    }

    /// Fire any pending deadline regardless of time (host timer elapsed)
    pub fn take_pending(&mut self) -> bool {
        if self.deadline.is_some() {
            self.fire()
        } else {
            false
        }
    }

    /// Drop a pending deadline without firing
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn stats(&self) -> DebounceStats {
        self.stats
    }

    fn fire(&mut self) -> bool {
        self.deadline = None;
        self.stats.fired += 1;
        true
    }
}
