//! Error types for the host contract.

/// Errors the host engine reports for player and world operations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No world with this folder name exists on disk.
    #[error("world {0} does not exist")]
    WorldNotFound(String),

    /// The world exists but is not loaded.
    #[error("world {0} is not loaded")]
    WorldNotLoaded(String),

    /// The engine refused or failed to load the world.
    #[error("failed to load world {world}: {reason}")]
    LoadFailed { world: String, reason: String },

    /// The engine refused or failed to unload the world (for example, it
    /// still has players in it).
    #[error("failed to unload world {world}: {reason}")]
    UnloadFailed { world: String, reason: String },

    /// Flushing the world to disk failed.
    #[error("failed to save world {world}: {reason}")]
    SaveFailed { world: String, reason: String },

    /// The player is not connected.
    #[error("player {0} is offline")]
    PlayerOffline(tntrun_types::PlayerId),
}
