//! Tick-based event queue for delayed game effects.
//!
//! Every scheduled event carries the session's cancellation token as it was
//! when the event was queued. Cancelling the token (on stop or restart) makes
//! all outstanding events stale; stale events are dropped instead of fired.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one run of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionToken(Arc<AtomicBool>);

impl SessionToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct Scheduled<E> {
    due: u64,
    seq: u64,
    token: SessionToken,
    event: E,
}

#[derive(Debug)]
pub struct Scheduler<E> {
    now: u64,
    seq: u64,
    token: SessionToken,
    queue: Vec<Scheduled<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Scheduler {
            now: 0,
            seq: 0,
            token: SessionToken::new(),
            queue: Vec::new(),
        }
    }

    /// Current tick.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn token(&self) -> SessionToken {
        self.token.clone()
    }

    /// Queue `event` to fire `delay` ticks from now. A delay of zero fires on
    /// the next `advance`.
    pub fn schedule(&mut self, delay: u64, event: E) {
        self.seq += 1;
        self.queue.push(Scheduled {
            due: self.now + delay.max(1),
            seq: self.seq,
            token: self.token.clone(),
            event,
        });
    }

    /// Move to the next tick and return every live event now due, in the
    /// order they were scheduled.
    pub fn advance(&mut self) -> Vec<E> {
        self.now += 1;
        let now = self.now;

        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.queue).into_iter().partition(|s| s.due <= now);
        self.queue = pending;

        due.sort_by_key(|s| (s.due, s.seq));
        due.into_iter()
            .filter(|s| !s.token.is_cancelled())
            .map(|s| s.event)
            .collect()
    }

    /// Whether any live event matches `pred`.
    pub fn has_pending(&self, pred: impl Fn(&E) -> bool) -> bool {
        self.queue
            .iter()
            .any(|s| !s.token.is_cancelled() && pred(&s.event))
    }

    pub fn is_idle(&self) -> bool {
        !self.has_pending(|_| true)
    }

    /// Cancel everything outstanding and hand out a fresh token for the next
    /// run. The clock keeps counting.
    pub fn cancel_all(&mut self) {
        self.token.cancel();
        self.queue.clear();
        self.token = SessionToken::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_fire_after_their_delay() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(2, "reveal");
        scheduler.schedule(1, "ai");
        assert_eq!(scheduler.advance(), vec!["ai"]);
        assert!(scheduler.has_pending(|e| *e == "reveal"));
        assert_eq!(scheduler.advance(), vec!["reveal"]);
        assert!(scheduler.is_idle());
        assert!(scheduler.advance().is_empty());
    }

    #[test]
    fn test_same_tick_events_keep_schedule_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(3, 1);
        scheduler.schedule(3, 2);
        scheduler.schedule(0, 0);
        assert_eq!(scheduler.advance(), vec![0]);
        scheduler.advance();
        assert_eq!(scheduler.advance(), vec![1, 2]);
    }

    #[test]
    fn test_cancel_discards_outstanding_events() {
        let mut scheduler = Scheduler::new();
        let old = scheduler.token();
        scheduler.schedule(1, "stale");
        scheduler.cancel_all();
        assert!(old.is_cancelled());
        assert!(!scheduler.token().is_cancelled());
        assert!(scheduler.advance().is_empty());

        scheduler.schedule(1, "fresh");
        assert_eq!(scheduler.advance(), vec!["fresh"]);
    }

    #[test]
    fn test_cancelled_token_silences_queued_events() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1, "late");
        scheduler.token().cancel();
        assert!(scheduler.is_idle());
        assert!(scheduler.advance().is_empty());
    }
}
