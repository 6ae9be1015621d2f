//! Cancellable repeating timers.
//!
//! The session controller owns exactly one recurring task (the live poll) and
//! must be able to disarm it deterministically. It does so through the
//! [`Scheduler`] trait:
//!
//! - [`TokioScheduler`] spawns one `tokio::time::interval` task per timer and
//!   reports each tick as a [`TimerId`] on an mpsc channel. Cancelling aborts
//!   the task, so no orphaned tick can be delivered after a cancel returns
//!   except one already sitting in the channel. The controller ignores ids
//!   it no longer owns.
//! - [`ManualScheduler`] keeps a virtual clock for tests. Time only moves
//!   when the test calls [`ManualScheduler::advance`].

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle for one armed timer. Never reused within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// Source of repeating timer ticks.
pub trait Scheduler {
    /// Arm a timer that first fires one `period` from now, then every
    /// `period` until cancelled.
    fn schedule_repeating(&mut self, period: Duration) -> TimerId;

    /// Disarm a timer. Unknown or already-cancelled ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

// ---------------------------------------------------------------------------
// Tokio
// ---------------------------------------------------------------------------

/// Production scheduler backed by tokio tasks.
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
    ticks: mpsc::UnboundedSender<TimerId>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    /// Create a scheduler spawning onto `runtime`, plus the receiver on which
    /// ticks arrive.
    pub fn new(runtime: tokio::runtime::Handle) -> (Self, mpsc::UnboundedReceiver<TimerId>) {
        let (ticks, rx) = mpsc::unbounded_channel();
        (
            Self {
                runtime,
                ticks,
                tasks: HashMap::new(),
                next_id: 0,
            },
            rx,
        )
    }

    /// Number of timers currently armed.
    pub fn armed(&self) -> usize {
        self.tasks.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let ticks = self.ticks.clone();
        let task = self.runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(id).is_err() {
                    break;
                }
            }
        });
        tracing::debug!(timer = id.0, period_ms = period.as_millis() as u64, "timer armed");
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
            tracing::debug!(timer = id.0, "timer cancelled");
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Manual (virtual clock)
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    /// id → (period, next due time)
    armed: BTreeMap<TimerId, (Duration, Duration)>,
    cancelled: u64,
}

/// Deterministic scheduler for tests.
///
/// Clones share state, so a test can keep one handle while the controller
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the virtual clock forward and return every tick that came due,
    /// in firing order. A timer fires once per elapsed period.
    pub fn advance(&self, by: Duration) -> Vec<TimerId> {
        let mut state = self.state.borrow_mut();
        let target = state.now + by;
        let mut fired = Vec::new();
        loop {
            let next = state
                .armed
                .iter()
                .filter(|(_, (_, due))| *due <= target)
                .min_by_key(|(id, (_, due))| (*due, **id))
                .map(|(id, (period, due))| (*id, *period, *due));
            match next {
                Some((id, period, due)) => {
                    fired.push(id);
                    state.now = due;
                    state.armed.insert(id, (period, due + period));
                }
                None => break,
            }
        }
        state.now = target;
        fired
    }

    /// Number of timers currently armed.
    pub fn armed(&self) -> usize {
        self.state.borrow().armed.len()
    }

    /// Total number of successful cancellations so far.
    pub fn cancelled(&self) -> u64 {
        self.state.borrow().cancelled
    }

    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = TimerId(state.next_id);
        let due = state.now + period;
        state.armed.insert(id, (period, due));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        let mut state = self.state.borrow_mut();
        if state.armed.remove(&id).is_some() {
            state.cancelled += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(5_000);

    #[test]
    fn manual_fires_once_per_period() {
        let mut sched = ManualScheduler::new();
        let id = sched.schedule_repeating(PERIOD);
        assert!(sched.advance(Duration::from_millis(4_999)).is_empty());
        assert_eq!(sched.advance(Duration::from_millis(1)), vec![id]);
        assert_eq!(sched.advance(PERIOD * 3), vec![id, id, id]);
    }

    #[test]
    fn manual_cancel_stops_ticks() {
        let mut sched = ManualScheduler::new();
        let id = sched.schedule_repeating(PERIOD);
        sched.cancel(id);
        sched.cancel(id);
        assert_eq!(sched.cancelled(), 1);
        assert_eq!(sched.armed(), 0);
        assert!(sched.advance(PERIOD * 10).is_empty());
    }

    #[test]
    fn manual_interleaves_timers_by_due_time() {
        let mut sched = ManualScheduler::new();
        let slow = sched.schedule_repeating(Duration::from_millis(300));
        let fast = sched.schedule_repeating(Duration::from_millis(200));
        assert_eq!(
            sched.advance(Duration::from_millis(600)),
            vec![fast, slow, fast, slow, fast]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_ticks_and_cancels() {
        let (mut sched, mut rx) = TokioScheduler::new(tokio::runtime::Handle::current());
        let id = sched.schedule_repeating(PERIOD);
        assert_eq!(sched.armed(), 1);

        tokio::time::sleep(PERIOD + Duration::from_millis(1)).await;
        assert_eq!(rx.recv().await, Some(id));

        sched.cancel(id);
        assert_eq!(sched.armed(), 0);
        tokio::time::sleep(PERIOD * 3).await;
        assert!(rx.try_recv().is_err());
    }
}
