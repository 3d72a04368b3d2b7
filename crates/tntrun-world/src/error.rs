use std::path::PathBuf;

use tntrun_host::HostError;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("no backup for world '{0}'")]
    MissingBackup(String),

    /// Players were still inside the world. They have been moved out; the
    /// caller should retry later.
    #[error("world '{world}' still has {count} player(s) in it")]
    Occupied { world: String, count: usize },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl WorldError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for failures that go away on their own (players leaving).
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Occupied { .. })
    }
}
