// Session timers: silence timeout and hard deadline
// Owned by the session and polled on the controller task, so a cancelled
// timer can never fire after cancel returns.

use serde::Serialize;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// The two timers a session can arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Re-armed on every non-empty partial
    Silence,
    /// Absolute deadline from engine start
    HardTimeout,
}

/// Handle returned by [`TimerService::schedule`]
///
/// Identifies one scheduling; re-scheduling the same kind invalidates older
/// handles, so cancelling a stale handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    kind: TimerKind,
    id: u64,
}

impl TimerHandle {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    id: u64,
    deadline: Instant,
}

/// Schedules and cancels the per-session timers
#[derive(Debug, Default)]
pub struct TimerService {
    next_id: u64,
    silence: Option<PendingTimer>,
    hard_timeout: Option<PendingTimer>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: TimerKind) -> &Option<PendingTimer> {
        match kind {
            TimerKind::Silence => &self.silence,
            TimerKind::HardTimeout => &self.hard_timeout,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<PendingTimer> {
        match kind {
            TimerKind::Silence => &mut self.silence,
            TimerKind::HardTimeout => &mut self.hard_timeout,
        }
    }

    /// Arm `kind` to fire `delay` from now, replacing any pending one
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerHandle {
        self.next_id += 1;
        let id = self.next_id;
        *self.slot_mut(kind) = Some(PendingTimer {
            id,
            deadline: Instant::now() + delay,
        });
        TimerHandle { kind, id }
    }

    /// Cancel a scheduled timer
    ///
    /// Returns true if the timer was still pending. Fired, cancelled or
    /// superseded handles are ignored.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let slot = self.slot_mut(handle.kind);
        if slot.as_ref().is_some_and(|pending| pending.id == handle.id) {
            *slot = None;
            return true;
        }
        false
    }

    /// Cancel every pending timer
    pub fn cancel_all(&mut self) {
        self.silence = None;
        self.hard_timeout = None;
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.silence.is_some() || self.hard_timeout.is_some()
    }

    /// Deadline of a pending timer
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.slot(kind).map(|p| p.deadline)
    }

    /// Earliest pending timer; silence wins an exact tie
    fn next_due(&self) -> Option<(TimerKind, Instant)> {
        match (self.silence, self.hard_timeout) {
            (Some(s), Some(h)) if h.deadline < s.deadline => Some((TimerKind::HardTimeout, h.deadline)),
            (Some(s), _) => Some((TimerKind::Silence, s.deadline)),
            (None, Some(h)) => Some((TimerKind::HardTimeout, h.deadline)),
            (None, None) => None,
        }
    }

    /// Wait for the earliest pending timer and mark it fired
    ///
    /// Never resolves when nothing is pending. Cancel-safe: if the future is
    /// dropped before the deadline the timer stays armed.
    pub async fn fired(&mut self) -> TimerKind {
        let Some((kind, deadline)) = self.next_due() else {
            return std::future::pending().await;
        };
        sleep_until(deadline).await;
        *self.slot_mut(kind) = None;
        kind
    }
}

#[cfg(test)]
#[path = "timer_test.rs"]
mod tests;
