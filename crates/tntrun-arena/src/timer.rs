//! Scheduled arena work.
//!
//! A task names its arena instead of pointing at it. When it fires, the
//! manager looks the arena up again; a task whose arena is gone, or whose
//! id no longer matches the arena's slot, does nothing.

use tntrun_tick::{TickScheduler, TimerSlot};
use tntrun_types::PlayerId;

/// What to do when a task fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Lobby countdown, once per second.
    Countdown,
    /// "3", "2", "1", "GO!", once per second.
    PreStart,
    /// Removes the block under every player, once per second.
    Mechanics,
    /// Fires once, a while after the round ended.
    ResetDelay,
    /// Fires once, after a failed world restore.
    ResetRetry,
    /// Eliminates a player who died, once the engine has respawned them.
    Eliminate(PlayerId),
}

/// A scheduled piece of arena work, addressed by arena name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaTask {
    /// Name of the arena to look up when the task fires.
    pub arena: String,
    pub kind: TaskKind,
}

impl ArenaTask {
    pub fn new(arena: &str, kind: TaskKind) -> Self {
        Self {
            arena: arena.to_string(),
            kind,
        }
    }
}

/// One slot per kind of arena timer.
///
/// The reset slot is shared by the post-round delay and the restore
/// retry; they never run at the same time.
#[derive(Debug, Default, Clone)]
pub struct ArenaTimers {
    pub countdown: TimerSlot,
    pub pre_start: TimerSlot,
    pub mechanics: TimerSlot,
    pub reset: TimerSlot,
}

impl ArenaTimers {
    /// Cancels every slot. Slots that are already empty are skipped.
    pub fn cancel_all(&mut self, scheduler: &mut TickScheduler<ArenaTask>) {
        self.countdown.cancel(scheduler);
        self.pre_start.cancel(scheduler);
        self.mechanics.cancel(scheduler);
        self.reset.cancel(scheduler);
    }

    /// Number of slots holding a task the scheduler still knows about.
    pub fn live(&self, scheduler: &TickScheduler<ArenaTask>) -> usize {
        [self.countdown, self.pre_start, self.mechanics, self.reset]
            .iter()
            .filter_map(TimerSlot::task)
            .filter(|id| scheduler.is_live(*id))
            .count()
    }
}
