//! Completion Poller - bounded, cancellable retry scheduling.
//!
//! The poller never sleeps itself. It hands out [`RetryHandle`]s carrying a
//! deadline; the observer loop waits on the armed deadline of the current
//! turn and runs the completion check when it passes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::ObserverConfig;

/// Why a retry was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Armed after a mutation batch while recording.
    Debounce,
    /// Armed after an inconclusive completion check.
    Poll,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debounce => f.write_str("debounce"),
            Self::Poll => f.write_str("poll"),
        }
    }
}

/// A scheduled re-check.
///
/// Clones share the validity flag, so cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct RetryHandle {
    id: u64,
    reason: RetryReason,
    deadline: Instant,
    valid: Arc<AtomicBool>,
}

impl RetryHandle {
    fn new(id: u64, reason: RetryReason, deadline: Instant) -> Self {
        Self {
            id,
            reason,
            deadline,
            valid: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn reason(&self) -> RetryReason {
        self.reason
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Check if the retry is still armed (not cancelled).
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    /// Cancel the retry.
    pub fn cancel(&self) {
        self.valid.store(false, Ordering::SeqCst);
        debug!("Retry {} ({}) cancelled", self.id, self.reason);
    }
}

/// The single pending-retry slot of a turn.
#[derive(Debug, Default)]
pub struct RetrySlot {
    current: Option<RetryHandle>,
    next_id: u64,
}

impl RetrySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a retry `delay` from `now`, never later than `limit`.
    ///
    /// Any previously armed retry is cancelled first.
    pub fn arm(&mut self, reason: RetryReason, delay: Duration, now: Instant, limit: Instant) -> RetryHandle {
        self.cancel();
        self.next_id += 1;
        let deadline = (now + delay).min(limit);
        let handle = RetryHandle::new(self.next_id, reason, deadline);
        debug!(
            "Retry {} ({}) armed in {:?}",
            handle.id,
            reason,
            deadline.saturating_duration_since(now)
        );
        self.current = Some(handle.clone());
        handle
    }

    /// Cancel the armed retry, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }

    pub fn current(&self) -> Option<&RetryHandle> {
        self.current.as_ref().filter(|h| h.is_valid())
    }

    pub fn is_armed(&self) -> bool {
        self.current().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.current().map(RetryHandle::deadline)
    }

    /// Disarm and return the retry when its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<RetryHandle> {
        let due = self.current().is_some_and(|h| h.deadline() <= now);
        if due { self.current.take() } else { None }
    }
}

/// Timing policy for completion checks.
#[derive(Debug, Clone, Copy)]
pub struct CompletionPoller {
    debounce: Duration,
    poll_interval: Duration,
    max_wait: Duration,
}

impl CompletionPoller {
    pub fn new(config: &ObserverConfig) -> Self {
        Self {
            debounce: config.debounce,
            poll_interval: config.poll_interval,
            max_wait: config.max_wait,
        }
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Latest deadline any retry of a turn started at `started_at` may have.
    pub fn limit_for(&self, started_at: Instant) -> Instant {
        started_at + self.max_wait
    }

    /// Whether a turn started at `started_at` has used up its wait budget.
    pub fn is_expired(&self, started_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(started_at) >= self.max_wait
    }

    /// Re-arm after a mutation batch.
    pub fn arm_debounce(&self, slot: &mut RetrySlot, started_at: Instant, now: Instant) -> RetryHandle {
        slot.arm(RetryReason::Debounce, self.debounce, now, self.limit_for(started_at))
    }

    /// Re-arm after an inconclusive check.
    pub fn arm_poll(&self, slot: &mut RetrySlot, started_at: Instant, now: Instant) -> RetryHandle {
        slot.arm(RetryReason::Poll, self.poll_interval, now, self.limit_for(started_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poller() -> CompletionPoller {
        CompletionPoller::new(&ObserverConfig {
            debounce: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(1000),
            max_wait: Duration::from_millis(10_000),
            highlight_nodes: false,
        })
    }

    #[test]
    fn test_arm_cancels_previous() {
        let start = Instant::now();
        let mut slot = RetrySlot::new();
        let first = slot.arm(RetryReason::Debounce, Duration::from_secs(3), start, start + Duration::from_secs(60));
        let second = slot.arm(RetryReason::Poll, Duration::from_secs(1), start, start + Duration::from_secs(60));

        assert!(!first.is_valid());
        assert!(second.is_valid());
        assert_ne!(first.id(), second.id());
        assert_eq!(slot.deadline(), Some(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_cancel_invalidates_clones() {
        let start = Instant::now();
        let mut slot = RetrySlot::new();
        let handle = slot.arm(RetryReason::Poll, Duration::from_secs(1), start, start + Duration::from_secs(60));
        let clone = handle.clone();
        slot.cancel();
        assert!(!handle.is_valid());
        assert!(!clone.is_valid());
        assert!(!slot.is_armed());
        assert_eq!(slot.deadline(), None);
    }

    #[test]
    fn test_deadline_clamped_to_limit() {
        let start = Instant::now();
        let mut slot = RetrySlot::new();
        let handle = slot.arm(RetryReason::Debounce, Duration::from_secs(3), start, start + Duration::from_secs(2));
        assert_eq!(handle.deadline(), start + Duration::from_secs(2));
    }

    #[test]
    fn test_take_due() {
        let start = Instant::now();
        let mut slot = RetrySlot::new();
        slot.arm(RetryReason::Poll, Duration::from_secs(1), start, start + Duration::from_secs(60));

        assert!(slot.take_due(start).is_none());
        assert!(slot.is_armed());

        let due = slot.take_due(start + Duration::from_secs(1)).unwrap();
        assert_eq!(due.reason(), RetryReason::Poll);
        assert!(!slot.is_armed());
        assert!(slot.take_due(start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_poller_never_arms_past_max_wait() {
        let poller = poller();
        let start = Instant::now();
        let mut slot = RetrySlot::new();

        // Mutations keep arriving right before the budget runs out.
        let late = start + Duration::from_millis(9_500);
        let handle = poller.arm_debounce(&mut slot, start, late);
        assert_eq!(handle.deadline(), start + Duration::from_millis(10_000));

        let handle = poller.arm_poll(&mut slot, start, start + Duration::from_millis(2_000));
        assert_eq!(handle.deadline(), start + Duration::from_millis(3_000));
    }

    #[test]
    fn test_is_expired() {
        let poller = poller();
        let start = Instant::now();
        assert!(!poller.is_expired(start, start + Duration::from_millis(9_999)));
        assert!(poller.is_expired(start, start + Duration::from_millis(10_000)));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(RetryReason::Debounce.to_string(), "debounce");
        assert_eq!(RetryReason::Poll.to_string(), "poll");
    }
}
