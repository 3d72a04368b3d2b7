//! Tick scheduling for TnT Run.
//!
//! Two pieces live here:
//!
//! - [`TickScheduler`]: the task queue. Offers "run once after N ticks"
//!   and "run every N ticks until cancelled". Tasks are plain values, not
//!   closures; whoever owns the scheduler pops due tasks each tick and
//!   dispatches them. [`TimerSlot`] owns at most one live task of a kind.
//! - [`TickClock`]: decides *when* a tick happens in real time (20 Hz by
//!   default) and drops ticks it cannot keep up with.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(event) = events.recv() => { /* player actions */ }
//!         _ = clock.wait_for_tick() => {
//!             scheduler.begin_tick();
//!             while let Some(task) = scheduler.pop_due() {
//!                 dispatch(task);
//!             }
//!             clock.finish_tick();
//!         }
//!     }
//! }
//! ```

mod clock;
mod scheduler;
mod slot;

pub use clock::{ClockConfig, Tick, TickClock, TickMetrics};
pub use scheduler::{DueTask, TaskId, TickScheduler, TICKS_PER_SECOND};
pub use slot::TimerSlot;
