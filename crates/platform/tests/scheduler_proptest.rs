//! Property-based tests for the deadline queue and the temperature window.

use embassy_time::{Duration, Instant};
use platform::{Boundary, Scheduler, TemperatureWindow, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    A,
    B,
    C,
}

const JOBS: [Job; 3] = [Job::A, Job::B, Job::C];

proptest::proptest! {
    /// Scheduling the same id any number of times leaves exactly one entry.
    #[test]
    fn at_most_one_instance_per_task(delays in proptest::collection::vec(0u64..10_000, 1..20)) {
        let mut q: TimerQueue<Job, 4> = TimerQueue::new();
        for d in &delays {
            q.schedule_after(Job::A, Duration::from_millis(*d));
        }
        assert_eq!(q.len(), 1);
        q.advance_to(Instant::from_millis(10_000));
        assert_eq!(q.pop_expired(), Some(Job::A));
        assert_eq!(q.pop_expired(), None);
    }

    /// Nothing pops before its deadline and tasks pop in deadline order.
    #[test]
    fn pops_in_deadline_order(delays in proptest::collection::vec(1u64..5_000, 3)) {
        let mut q: TimerQueue<Job, 4> = TimerQueue::new();
        for (job, d) in JOBS.iter().zip(&delays) {
            q.schedule_after(*job, Duration::from_millis(*d));
        }
        let earliest = delays.iter().copied().min().unwrap_or(1);
        q.advance_to(Instant::from_millis(earliest - 1));
        assert_eq!(q.pop_expired(), None);

        q.advance_to(Instant::from_millis(5_000));
        let mut last = 0u64;
        while let Some(job) = q.pop_expired() {
            let idx = JOBS.iter().position(|j| *j == job).unwrap();
            let d = delays[idx];
            assert!(d >= last, "{:?} popped out of order", job);
            last = d;
        }
        assert!(q.is_empty());
    }

    /// A temperature inside the window never reports a crossing.
    #[test]
    fn inside_window_is_quiet(low in -400i32..400, width in 0i32..600, offset in 0i32..600) {
        let high = low + width;
        let w = TemperatureWindow::both(low, high);
        let t = low + offset.min(width);
        assert_eq!(w.crossing(t), None);
        assert_eq!(w.crossing(high + 1), Some(Boundary::Warm));
        assert_eq!(w.crossing(low - 1), Some(Boundary::Cool));
    }
}
