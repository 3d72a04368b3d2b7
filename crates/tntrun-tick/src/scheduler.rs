//! The tick task queue.
//!
//! Tasks are ordered by `(due tick, scheduling order)`, so tasks due on the
//! same tick fire in the order they were scheduled. There is no priority
//! scheme.
//!
//! Due tasks are popped one at a time with [`TickScheduler::pop_due`]. A
//! task cancelled by the handler of an earlier task in the same tick is
//! therefore never returned.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::trace;

/// Ticks per second of the host engine.
pub const TICKS_PER_SECOND: u32 = 20;

/// Identifies one scheduled task. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// A task returned by [`TickScheduler::pop_due`].
#[derive(Debug, Clone, PartialEq)]
pub struct DueTask<T> {
    pub id: TaskId,
    /// `true` if the task stays scheduled after this firing.
    pub repeating: bool,
    pub payload: T,
}

#[derive(Debug)]
struct Entry<T> {
    id: TaskId,
    period: Option<u64>,
    payload: T,
}

/// Queue key: due tick, then scheduling sequence.
type Key = (u64, u64);

/// Single-threaded tick task queue.
///
/// `T` is the task payload. Payloads identify *what* to do (for arenas:
/// which arena, which kind of tick), never hold references to the thing
/// they act on.
#[derive(Debug)]
pub struct TickScheduler<T> {
    current_tick: u64,
    next_id: u64,
    next_seq: u64,
    queue: BTreeMap<Key, Entry<T>>,
    index: HashMap<TaskId, Key>,
}

impl<T: Clone> TickScheduler<T> {
    pub fn new() -> Self {
        Self {
            current_tick: 0,
            next_id: 1,
            next_seq: 0,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Runs `payload` once, `delay_ticks` from now (at least one tick).
    pub fn run_after(&mut self, delay_ticks: u32, payload: T) -> TaskId {
        self.insert(delay_ticks, None, payload)
    }

    /// Runs `payload` every `period_ticks` (at least one), first firing one
    /// period from now, until cancelled.
    pub fn run_every(&mut self, period_ticks: u32, payload: T) -> TaskId {
        let period = u64::from(period_ticks.max(1));
        self.insert(period_ticks, Some(period), payload)
    }

    /// Cancels a task. Returns `false` if it already fired (one-shot) or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.index.remove(&id) {
            Some(key) => {
                self.queue.remove(&key);
                trace!(task = %id, "task cancelled");
                true
            }
            None => false,
        }
    }

    /// Returns `true` while a task is still scheduled.
    pub fn is_live(&self, id: TaskId) -> bool {
        self.index.contains_key(&id)
    }

    /// Advances the clock by one tick. Call [`Self::pop_due`] until it
    /// returns `None` afterwards.
    pub fn begin_tick(&mut self) -> u64 {
        self.current_tick += 1;
        self.current_tick
    }

    /// Pops the next task due on or before the current tick.
    ///
    /// Repeating tasks are re-queued one period later before being
    /// returned, so they stay live (and cancellable) while their handler
    /// runs.
    pub fn pop_due(&mut self) -> Option<DueTask<T>> {
        let (&key, _) = self.queue.first_key_value()?;
        if key.0 > self.current_tick {
            return None;
        }
        let entry = self.queue.remove(&key)?;
        let repeating = entry.period.is_some();

        match entry.period {
            Some(period) => {
                let next_key = (self.current_tick + period, self.bump_seq());
                self.index.insert(entry.id, next_key);
                self.queue.insert(
                    next_key,
                    Entry {
                        id: entry.id,
                        period: entry.period,
                        payload: entry.payload.clone(),
                    },
                );
            }
            None => {
                self.index.remove(&entry.id);
            }
        }

        Some(DueTask {
            id: entry.id,
            repeating,
            payload: entry.payload,
        })
    }

    /// Advances one tick and drains every due task.
    ///
    /// Convenience for callers that don't cancel tasks from inside
    /// handlers.
    pub fn advance(&mut self) -> Vec<DueTask<T>> {
        self.begin_tick();
        let mut due = Vec::new();
        while let Some(task) = self.pop_due() {
            due.push(task);
        }
        due
    }

    /// Cancels everything.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.index.clear();
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Number of live tasks.
    pub fn pending(&self) -> usize {
        self.index.len()
    }

    fn insert(&mut self, delay_ticks: u32, period: Option<u64>, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let due = self.current_tick + u64::from(delay_ticks.max(1));
        let key = (due, self.bump_seq());
        self.queue.insert(key, Entry { id, period, payload });
        self.index.insert(id, key);
        trace!(task = %id, due, repeating = period.is_some(), "task scheduled");
        id
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl<T: Clone> Default for TickScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
