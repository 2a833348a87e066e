//! One-shot timers for the session's event loop

use std::time::{Duration, Instant};

/// Handle for a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Delayed one-shot timers, polled from the same thread as the session
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId;
    /// Returns false if the timer already fired or was cancelled
    fn cancel(&mut self, id: TimerId) -> bool;
    /// Remove and return every timer whose deadline has passed, earliest first
    fn expired(&mut self) -> Vec<TimerId>;
}

/// Pending timers ordered by deadline (ties keep scheduling order)
#[derive(Debug)]
struct TimerQueue<T: Ord + Copy> {
    next_id: u64,
    pending: Vec<(T, TimerId)>,
}

impl<T: Ord + Copy> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<T: Ord + Copy> TimerQueue<T> {
    fn push(&mut self, deadline: T) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let pos = self.pending.partition_point(|(d, _)| *d <= deadline);
        self.pending.insert(pos, (deadline, id));
        id
    }

    fn remove(&mut self, id: TimerId) -> bool {
        match self.pending.iter().position(|(_, t)| *t == id) {
            Some(pos) => {
                self.pending.remove(pos);
                true
            }
            None => false,
        }
    }

    fn drain_until(&mut self, now: T) -> Vec<TimerId> {
        let due = self.pending.partition_point(|(d, _)| *d <= now);
        self.pending.drain(..due).map(|(_, id)| id).collect()
    }

    fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Scheduler on the monotonic system clock
#[derive(Debug, Default)]
pub struct SystemScheduler {
    timers: TimerQueue<Instant>,
}

impl SystemScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for SystemScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.timers.push(Instant::now() + delay)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(id)
    }

    fn expired(&mut self) -> Vec<TimerId> {
        self.timers.drain_until(Instant::now())
    }
}

/// Scheduler on a virtual clock that only moves when `advance` is called
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    timers: TimerQueue<Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Time elapsed on the virtual clock
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.timers.push(self.now + delay)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(id)
    }

    fn expired(&mut self) -> Vec<TimerId> {
        self.timers.drain_until(self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_fires_after_delay() {
        let mut scheduler = ManualScheduler::new();
        let id = scheduler.schedule(Duration::from_millis(3000));

        scheduler.advance(Duration::from_millis(2999));
        assert!(scheduler.expired().is_empty());

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(scheduler.expired(), vec![id]);
        assert!(scheduler.expired().is_empty());
    }

    #[test]
    fn test_manual_cancel() {
        let mut scheduler = ManualScheduler::new();
        let id = scheduler.schedule(Duration::from_millis(10));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));

        scheduler.advance(Duration::from_secs(1));
        assert!(scheduler.expired().is_empty());
    }

    #[test]
    fn test_manual_deadline_order() {
        let mut scheduler = ManualScheduler::new();
        let late = scheduler.schedule(Duration::from_millis(200));
        let early = scheduler.schedule(Duration::from_millis(100));
        let tie = scheduler.schedule(Duration::from_millis(100));

        scheduler.advance(Duration::from_millis(500));
        assert_eq!(scheduler.expired(), vec![early, tie, late]);
    }

    #[test]
    fn test_system_zero_delay_is_due() {
        let mut scheduler = SystemScheduler::new();
        let id = scheduler.schedule(Duration::ZERO);
        assert_eq!(scheduler.expired(), vec![id]);
        assert_eq!(scheduler.pending(), 0);
    }
}
