//! A logical clock with a task queue.
//!
//! Nothing runs until the clock is advanced. Advancing the clock runs every task whose deadline
//! has been reached in deadline order, breaking ties by the order in which tasks were scheduled.
//! Tasks may schedule more tasks; those run during the same advance if they are already due.
//!
//! # Example
//!
//! ```
//! use mgmt_sim::deterministic::{Config, Scheduler};
//! use std::{cell::Cell, rc::Rc, time::Duration};
//!
//! let scheduler = Scheduler::new(Config::default());
//! let ran = Rc::new(Cell::new(false));
//! scheduler.schedule(Duration::from_millis(5), {
//!     let ran = ran.clone();
//!     move || ran.set(true)
//! });
//!
//! scheduler.advance_clocks(Duration::from_millis(1), 4);
//! assert!(!ran.get());
//! scheduler.advance_clocks(Duration::from_millis(1), 1);
//! assert!(ran.get());
//! ```

use std::{
    cell::RefCell,
    collections::BinaryHeap,
    rc::Rc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::trace;

/// Configuration for the [Scheduler].
#[derive(Clone, Debug)]
pub struct Config {
    /// Time at which the logical clock starts.
    pub start: SystemTime,
}

impl Default for Config {
    fn default() -> Self {
        Self { start: UNIX_EPOCH }
    }
}

type Task = Box<dyn FnOnce()>;

struct Alarm {
    deadline: SystemTime,
    id: u64,
    task: Task,
}

impl PartialEq for Alarm {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for Alarm {}

impl PartialOrd for Alarm {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Alarm {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse the ordering for min-heap
        (other.deadline, other.id).cmp(&(self.deadline, self.id))
    }
}

struct Inner {
    now: SystemTime,
    next_id: u64,
    alarms: BinaryHeap<Alarm>,
}

/// Handle to a shared logical clock and task queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<Inner>>,
}

/// Milliseconds since the epoch, saturating at `u64::MAX`.
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Adds `delay` to `time`, clamping to the latest instant the platform can represent.
fn saturating_add(time: SystemTime, delay: Duration) -> SystemTime {
    if let Some(sum) = time.checked_add(delay) {
        return sum;
    }
    let mut result = time;
    let mut step = delay;
    while !step.is_zero() {
        match result.checked_add(step) {
            Some(next) => result = next,
            None => step /= 2,
        }
    }
    result
}

impl Scheduler {
    pub fn new(cfg: Config) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                now: cfg.start,
                next_id: 0,
                alarms: BinaryHeap::new(),
            })),
        }
    }

    /// Current logical time.
    pub fn now(&self) -> SystemTime {
        self.inner.borrow().now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.borrow().alarms.len()
    }

    /// Schedules `task` to run once the clock has moved `delay` past the current time.
    ///
    /// Deadlines beyond the representable range are clamped to its end.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) {
        let deadline = saturating_add(self.now(), delay);
        self.schedule_at(deadline, task);
    }

    /// Schedules `task` to run once the clock reaches `deadline`.
    ///
    /// A deadline in the past runs on the next advance.
    pub fn schedule_at(&self, deadline: SystemTime, task: impl FnOnce() + 'static) {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.alarms.push(Alarm {
            deadline,
            id,
            task: Box::new(task),
        });
    }

    /// Pops the next task due at or before `target`, moving the clock to its deadline.
    fn next_due(&self, target: SystemTime) -> Option<Task> {
        let mut inner = self.inner.borrow_mut();
        if inner.alarms.peek()?.deadline > target {
            return None;
        }
        let alarm = inner.alarms.pop()?;
        if alarm.deadline > inner.now {
            inner.now = alarm.deadline;
        }
        Some(alarm.task)
    }

    /// Moves the clock forward by `step`, running every task that becomes due.
    ///
    /// The clock stops at the end of the representable range. Returns the number of tasks run.
    pub fn advance(&self, step: Duration) -> usize {
        let target = saturating_add(self.now(), step);
        let mut ran = 0;
        while let Some(task) = self.next_due(target) {
            task();
            ran += 1;
        }
        self.inner.borrow_mut().now = target;
        trace!(now = epoch_millis(target), ran, "clock advanced");
        ran
    }

    /// Advances the clock by `step`, `repetitions` times.
    pub fn advance_clocks(&self, step: Duration, repetitions: usize) {
        for _ in 0..repetitions {
            self.advance(step);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
