//! Arena world backup and restore.
//!
//! An arena world is snapshotted once, when an admin finishes setting it
//! up, and restored from that snapshot after every game. Both operations
//! copy whole world directories; nothing here understands the world format.
//!
//! Restore is written to be retried: each step checks its own
//! precondition (world loaded? directory present?) so a half-finished
//! attempt can simply be run again.

mod backups;
mod copy;
mod error;

pub use backups::WorldBackups;
pub use copy::{copy_world_dir, is_transient};
pub use error::WorldError;
