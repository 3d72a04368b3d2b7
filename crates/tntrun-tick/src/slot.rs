use crate::{TaskId, TickScheduler};

/// Holds at most one live task of a given kind.
///
/// Storing a new task into an occupied slot cancels the old one first, so
/// a kind of timer can never run twice at once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimerSlot {
    task: Option<TaskId>,
}

impl TimerSlot {
    pub const fn empty() -> Self {
        Self { task: None }
    }

    /// Cancels the current task (if any) and stores `task`.
    pub fn replace<T: Clone>(&mut self, scheduler: &mut TickScheduler<T>, task: TaskId) {
        self.cancel(scheduler);
        self.task = Some(task);
    }

    /// Cancels the current task (if any). Idempotent.
    pub fn cancel<T: Clone>(&mut self, scheduler: &mut TickScheduler<T>) {
        if let Some(id) = self.task.take() {
            scheduler.cancel(id);
        }
    }

    /// `true` if `id` is the task this slot currently owns.
    pub fn owns(&self, id: TaskId) -> bool {
        self.task == Some(id)
    }

    /// Forgets a one-shot task that just fired.
    pub fn release(&mut self, id: TaskId) {
        if self.owns(id) {
            self.task = None;
        }
    }

    pub fn is_set(&self) -> bool {
        self.task.is_some()
    }

    pub fn task(&self) -> Option<TaskId> {
        self.task
    }
}
