//! Unified error type for the TnT Run plugin.

use std::io;
use std::path::PathBuf;

use tntrun_arena::ArenaError;
use tntrun_host::HostError;
use tntrun_types::TypesError;
use tntrun_world::WorldError;

use crate::ConfigError;

/// Top-level error wrapping every layer's error.
///
/// The `#[from]` conversions let `?` lift any layer's error into this one.
#[derive(Debug, thiserror::Error)]
pub enum TntRunError {
    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot create data folder {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The plugin task has stopped and no longer takes events.
    #[error("plugin is not running")]
    Stopped,
}
