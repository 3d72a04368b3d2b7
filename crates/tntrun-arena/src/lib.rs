//! Arena lifecycle management for TnT Run.
//!
//! An arena is one configured game room. It admits players, counts down,
//! runs a round in which the floor disappears under their feet, announces
//! a winner and restores its world for the next round.
//!
//! # Key types
//!
//! - [`Arena`]: one room: roster, votes, timers, state machine
//! - [`ArenaManager`]: owns every arena, the tick scheduler, the world
//!   backups and the definition store; dispatches timer tasks by name
//! - [`ArenaStatus`]: lifecycle state
//! - [`ArenaTimings`]: countdown length and the fixed delays
//! - [`ArenaStore`]: one definition file per arena

mod arena;
mod config;
mod error;
mod manager;
mod store;
mod timer;

pub use arena::{Arena, ArenaCtx, SavedPlayer};
pub use config::{ArenaStatus, ArenaTimings, PRE_START_STEPS};
pub use error::ArenaError;
pub use manager::{ArenaManager, TEMPLATE_FILE_STEM};
pub use store::ArenaStore;
pub use timer::{ArenaTask, ArenaTimers, TaskKind};
