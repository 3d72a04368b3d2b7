//! Shared data types for TnT Run.
//!
//! The vocabulary spoken between the arena logic and the game engine
//! ([`PlayerId`], [`Vec3`], [`Location`], [`BlockKind`] and friends), the
//! on-disk shape of an arena ([`ArenaDefinition`]) and the [`Codec`] that
//! turns definitions into files.
//!
//! # Architecture
//!
//! ```text
//! Host engine (players, worlds) ← Types → Arena logic → Definition files
//! ```

mod codec;
mod definition;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use definition::{ArenaDefinition, ArenaTemplate, SpawnPoint};
pub use error::TypesError;
pub use types::{
    clamp_safe_y, BlockKind, BlockPos, GameMode, LobbyItem, Location,
    PlayerId, Sound, Vec3, MAX_SAFE_Y, MIN_SAFE_Y,
};
