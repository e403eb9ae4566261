//! Deferred-task scheduling.
//!
//! Every periodic or delayed piece of charger work is identified by a small
//! `Copy` task id. At most one instance of a given id is pending at any time:
//! scheduling an id that is already pending is a no-op, which is what makes
//! "start EOC polling if it is not already running" a single call.
//!
//! [`TimerQueue`] is a pure, allocation-free implementation driven by an
//! external clock. The firmware runner advances it with
//! `embassy_time::Instant::now()`; tests advance it by hand.

use embassy_time::{Duration, Instant};

/// Deferred-task scheduler.
pub trait Scheduler<T> {
    /// Run `task` once after `delay`. No-op if `task` is already pending.
    ///
    /// Returns `true` if a new entry was armed.
    fn schedule_after(&mut self, task: T, delay: Duration) -> bool;

    /// Run `task` every `period`, first after one period. No-op if `task`
    /// is already pending.
    fn schedule_periodic(&mut self, task: T, period: Duration) -> bool;

    /// Drop any pending instance of `task`.
    fn cancel(&mut self, task: T);

    /// Drop any pending instance of `task` and wait until an instance that
    /// is currently executing has finished.
    ///
    /// Single-executor schedulers run tasks to completion, so nothing can be
    /// executing while the caller runs and this is the same as
    /// [`cancel`](Scheduler::cancel).
    fn cancel_and_wait(&mut self, task: T) {
        self.cancel(task);
    }

    /// Whether an instance of `task` is pending.
    fn is_pending(&self, task: T) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Entry<T> {
    task: T,
    deadline: Instant,
    period: Option<Duration>,
}

/// Fixed-capacity deadline queue holding at most `N` distinct tasks.
#[derive(Debug)]
pub struct TimerQueue<T, const N: usize> {
    now: Instant,
    entries: heapless::Vec<Entry<T>, N>,
}

impl<T: Copy + PartialEq, const N: usize> TimerQueue<T, N> {
    /// Empty queue with its clock at tick 0.
    pub const fn new() -> Self {
        Self {
            now: Instant::from_ticks(0),
            entries: heapless::Vec::new(),
        }
    }

    /// Current queue time.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Move the queue clock forward. Moving it backwards is ignored.
    pub fn advance_to(&mut self, now: Instant) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Take the earliest task whose deadline has passed.
    ///
    /// One-shot entries are removed; periodic entries are re-armed one
    /// period after the current queue time. Ties resolve in scheduling
    /// order.
    pub fn pop_expired(&mut self) -> Option<T> {
        let now = self.now;
        let (index, _) = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(_, e)| e.deadline)?;
        let entry = self.entries.get_mut(index)?;
        let task = entry.task;
        match entry.period {
            Some(period) => entry.deadline = deadline_after(now, period),
            None => {
                self.entries.remove(index);
            }
        }
        Some(task)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn arm(&mut self, task: T, delay: Duration, period: Option<Duration>) -> bool {
        if self.is_pending(task) {
            return false;
        }
        let entry = Entry {
            task,
            deadline: deadline_after(self.now, delay),
            period,
        };
        self.entries.push(entry).is_ok()
    }
}

fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or(Instant::MAX)
}

impl<T: Copy + PartialEq, const N: usize> Default for TimerQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + PartialEq, const N: usize> Scheduler<T> for TimerQueue<T, N> {
    fn schedule_after(&mut self, task: T, delay: Duration) -> bool {
        self.arm(task, delay, None)
    }

    fn schedule_periodic(&mut self, task: T, period: Duration) -> bool {
        self.arm(task, period, Some(period))
    }

    fn cancel(&mut self, task: T) {
        self.entries.retain(|e| e.task != task);
    }

    fn is_pending(&self, task: T) -> bool {
        self.entries.iter().any(|e| e.task == task)
    }
}
