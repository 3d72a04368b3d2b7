//! Host game engine contract for TnT Run.
//!
//! TnT Run doesn't implement a game server. It runs inside one, and talks to
//! it only through the [`Host`] trait defined here: player identity and
//! position, inventory, effects, chat/titles/sounds, and world management.
//!
//! # How it fits in the stack
//!
//! ```text
//! Arena layer (above)  ← drives players and worlds through Host
//!     ↕
//! Host contract (this crate)  ← what the engine must provide
//!     ↕
//! Types (below)  ← PlayerId, Location, BlockKind, ...
//! ```
//!
//! # Feature flags
//!
//! - `memory`: [`MemoryHost`], an in-memory engine used by tests and the
//!   demo binary.

mod error;
mod host;
#[cfg(feature = "memory")]
mod memory;

pub use error::HostError;
pub use host::Host;
#[cfg(feature = "memory")]
pub use memory::{MemoryHost, MemoryPlayer, WorldOp};
