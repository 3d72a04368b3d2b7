//! Error types for the arena layer.

use std::path::PathBuf;

use tntrun_types::{PlayerId, TypesError};
use tntrun_world::WorldError;

use crate::ArenaStatus;

/// Errors that can occur during arena operations.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("arena '{0}' does not exist")]
    NotFound(String),

    #[error("arena '{0}' already exists")]
    AlreadyExists(String),

    /// Arena names are limited to ASCII letters and digits.
    #[error("invalid arena name '{0}': only letters and numbers are allowed")]
    InvalidName(String),

    #[error("arena '{0}' is full")]
    Full(String),

    #[error("player {player} is already in arena '{arena}'")]
    AlreadyInArena { player: PlayerId, arena: String },

    #[error("player {0} is not in an arena")]
    NotInArena(PlayerId),

    /// The arena is in a state that doesn't allow this operation.
    #[error("arena '{arena}' is {status}, cannot {operation}")]
    InvalidState {
        arena: String,
        status: ArenaStatus,
        operation: &'static str,
    },

    #[error("arena '{arena}' needs at least {need} players, has {have}")]
    NotEnoughPlayers { arena: String, have: usize, need: u32 },

    #[error("spawn slot {slot} is out of range 1..={max}")]
    InvalidSlot { slot: u32, max: u32 },

    /// The arena refused the player for a reason it does not report
    /// (player offline, for example).
    #[error("could not join arena '{0}'")]
    JoinRejected(String),

    #[error(transparent)]
    Definition(#[from] TypesError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error("arena store i/o error at {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
