//! Plugin configuration.
//!
//! Read from `<data_dir>/config.json` when it exists. Every field is
//! optional in the file; missing ones take their default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tntrun_arena::ArenaTimings;
use tntrun_tick::{ClockConfig, TICKS_PER_SECOND};
use tracing::{info, warn};

/// Name of the configuration file inside the data folder.
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Plugin data folder. Arena definitions live in `<data_dir>/arenas`.
    pub data_dir: PathBuf,

    /// Folder holding the engine's world directories.
    pub worlds_dir: PathBuf,

    /// Folder holding world snapshots taken when setup completes.
    pub backups_dir: PathBuf,

    /// Speed of the run loop's clock. The engine runs at 20.
    pub tick_rate_hz: u32,

    #[serde(flatten)]
    pub timings: ArenaTimings,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self::in_dir("plugin_data/TnTRun")
    }
}

impl PluginConfig {
    /// Maximum countdown length accepted from the file, in seconds.
    pub const MAX_COUNTDOWN_SECONDS: u32 = 300;

    /// Default settings rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            backups_dir: data_dir.join("backups"),
            worlds_dir: PathBuf::from("worlds"),
            data_dir,
            tick_rate_hz: TICKS_PER_SECOND,
            timings: ArenaTimings::default(),
        }
    }

    /// Loads `<data_dir>/config.json`, falling back to defaults when the
    /// file does not exist. The result is [`validated`](Self::validated).
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data_dir = data_dir.as_ref();
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::in_dir(data_dir));
        }

        let bytes = fs::read(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        // Paths left out of the file follow the data folder they were
        // loaded from.
        let defaults = Self::default();
        if config.data_dir == defaults.data_dir {
            config.data_dir = data_dir.to_path_buf();
        }
        if config.backups_dir == defaults.backups_dir {
            config.backups_dir = config.data_dir.join("backups");
        }
        Ok(config.validated())
    }

    /// Clamps out-of-range values.
    pub fn validated(mut self) -> Self {
        let rate = self.tick_rate_hz.clamp(1, ClockConfig::MAX_TICK_RATE_HZ);
        if rate != self.tick_rate_hz {
            warn!(rate = self.tick_rate_hz, clamped = rate, "tick_rate_hz out of range, clamping");
            self.tick_rate_hz = rate;
        }

        let t = &mut self.timings;
        let countdown = t.countdown_seconds.clamp(1, Self::MAX_COUNTDOWN_SECONDS);
        if countdown != t.countdown_seconds {
            warn!(
                seconds = t.countdown_seconds,
                clamped = countdown,
                "countdown_seconds out of range, clamping"
            );
            t.countdown_seconds = countdown;
        }
        for (field, value) in [
            ("end_delay_ticks", &mut t.end_delay_ticks),
            ("reset_retry_ticks", &mut t.reset_retry_ticks),
            ("elimination_delay_ticks", &mut t.elimination_delay_ticks),
        ] {
            if *value == 0 {
                warn!(field, "delay of 0 ticks, using 1");
                *value = 1;
            }
        }
        self
    }

    /// Where arena definition files are stored.
    pub fn arenas_dir(&self) -> PathBuf {
        self.data_dir.join("arenas")
    }

    /// Clock settings for the run loop.
    pub fn clock(&self) -> ClockConfig {
        ClockConfig::with_rate(self.tick_rate_hz)
    }
}
