//! # TnT Run
//!
//! A last-player-standing minigame: the floor disappears under every
//! player's feet and whoever stays up longest wins.
//!
//! This crate ties the layers together. [`TntRun`] owns a [`Host`]
//! (the game engine), the [`ArenaManager`] and its timers, and reacts to
//! `/tr` commands and engine events.
//!
//! ```text
//! engine events ─┐
//!                ├─► TntRun ─► ArenaManager ─► Arena ─► Host
//! tick clock ────┘                 │
//!                                  └─► TickScheduler / WorldBackups
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use tntrun::prelude::*;
//!
//! let config = PluginConfig::load("plugin_data/TnTRun")?;
//! let mut plugin = TntRun::new(my_engine, config);
//! plugin.enable()?;
//! let (handle, task) = plugin.spawn(256);
//! handle.send(HostEvent::Command { player, admin: false, args: vec!["join".into()] }).await?;
//! ```

mod commands;
mod config;
mod error;
mod listener;
mod plugin;

pub use commands::{Command, CommandError, CommandOutcome, Menu, Sender};
pub use config::{ConfigError, PluginConfig, CONFIG_FILE};
pub use error::TntRunError;
pub use listener::{DamageCause, EventOutcome, HostEvent};
pub use plugin::{ArenaSummary, PluginHandle, TntRun};

pub use tntrun_arena::{Arena, ArenaError, ArenaManager, ArenaStatus, ArenaTimings};
pub use tntrun_host::{Host, HostError};
pub use tntrun_tick::TICKS_PER_SECOND;
pub use tntrun_types::{BlockKind, GameMode, LobbyItem, Location, PlayerId, Vec3};

/// Everything needed to embed the plugin.
pub mod prelude {
    pub use crate::{
        ArenaStatus, CommandOutcome, DamageCause, EventOutcome, Host, HostEvent, Location, Menu,
        PlayerId, PluginConfig, PluginHandle, Sender, TntRun, TntRunError, Vec3,
    };
}
