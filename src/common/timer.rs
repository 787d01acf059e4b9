//! Deferred events driven by the session tick
//!
//! Timers never run on their own thread. The owner calls
//! [`DeferredTimers::drain_due`] with the current session time on every tick
//! and handles whatever events have come due.

use std::time::Duration;

/// Handle to a scheduled event, used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<E> {
    handle: TimerHandle,
    due: Duration,
    event: E,
}

/// A set of pending events ordered by due time
#[derive(Debug)]
pub struct DeferredTimers<E> {
    pending: Vec<Pending<E>>,
    next_id: u64,
}

impl<E> Default for DeferredTimers<E> {
    fn default() -> Self {
        DeferredTimers {
            pending: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> DeferredTimers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to fire once `delay` has elapsed after `now`
    pub fn schedule(&mut self, now: Duration, delay: Duration, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        let due = now.saturating_add(delay);
        // Keep sorted by due time; equal due times fire in scheduling order
        let at = self.pending.partition_point(|p| p.due <= due);
        self.pending.insert(at, Pending { handle, due, event });
        handle
    }

    /// Cancel a pending event. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.pending.iter().position(|p| p.handle == handle) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove and return every event due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: Duration) -> Vec<E> {
        let split = self.pending.partition_point(|p| p.due <= now);
        self.pending.drain(..split).map(|p| p.event).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
