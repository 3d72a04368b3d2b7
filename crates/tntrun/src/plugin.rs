//! The plugin: owns the host, the arena manager and the setup sessions,
//! and runs them on a tokio task.
//!
//! Like the engine it lives in, everything runs on one logical thread.
//! [`TntRun::spawn`] moves the plugin into a task that interleaves engine
//! events (received through an mpsc channel) with clock ticks. Callers talk
//! to it through a [`PluginHandle`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tntrun_arena::{ArenaManager, ArenaStatus, ArenaStore};
use tntrun_host::Host;
use tntrun_tick::{TickClock, TickMetrics};
use tntrun_types::{Location, PlayerId};
use tntrun_world::WorldBackups;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{EventOutcome, HostEvent, PluginConfig, TntRunError};

/// An admin editing an arena, and where to send them back afterwards.
#[derive(Debug, Clone)]
pub(crate) struct SetupSession {
    pub(crate) arena: String,
    pub(crate) return_to: Location,
}

/// A one-line view of an arena, for status queries and the arena picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaSummary {
    pub name: String,
    pub status: ArenaStatus,
    /// Runners on the roster, spectators excluded.
    pub players: usize,
    pub max_players: u32,
}

/// The TnT Run plugin.
pub struct TntRun<H: Host> {
    pub(crate) host: H,
    pub(crate) manager: ArenaManager,
    pub(crate) setup_sessions: HashMap<PlayerId, SetupSession>,
    config: PluginConfig,
}

impl<H: Host> TntRun<H> {
    /// Nothing is read from disk until [`TntRun::enable`].
    pub fn new(host: H, config: PluginConfig) -> Self {
        let manager = ArenaManager::new(
            ArenaStore::json(config.arenas_dir()),
            WorldBackups::new(&config.worlds_dir, &config.backups_dir),
            config.timings,
        );
        Self {
            host,
            manager,
            setup_sessions: HashMap::new(),
            config,
        }
    }

    /// Creates the data folders, picks up the new-arena template
    /// (`default_arena.json` in the data folder) and loads every arena.
    /// Returns how many arenas were loaded.
    pub fn enable(&mut self) -> Result<usize, TntRunError> {
        create_dir(&self.config.data_dir)?;
        create_dir(&self.config.arenas_dir())?;
        create_dir(&self.config.backups_dir)?;

        self.manager.load_template(&self.config.data_dir);
        let loaded = self.manager.load_arenas(&mut self.host);
        info!(
            arenas = loaded,
            data_dir = %self.config.data_dir.display(),
            "TnT Run enabled"
        );
        Ok(loaded)
    }

    /// Returns admins from their setup sessions, sends every player home
    /// and saves every arena.
    pub fn disable(&mut self) -> Result<(), TntRunError> {
        let sessions: Vec<(PlayerId, SetupSession)> = self.setup_sessions.drain().collect();
        for (player, session) in sessions {
            debug!(arena = %session.arena, %player, "ending setup session on disable");
            self.send_back(&player, &session.return_to);
        }
        self.manager.shutdown(&mut self.host)?;
        info!("TnT Run disabled");
        Ok(())
    }

    /// Runs one engine tick.
    pub fn tick(&mut self) {
        self.manager.tick(&mut self.host);
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn manager(&self) -> &ArenaManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ArenaManager {
        &mut self.manager
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// The arena an admin is setting up.
    pub fn setup_session(&self, player: &PlayerId) -> Option<&str> {
        self.setup_sessions.get(player).map(|s| s.arena.as_str())
    }

    pub(crate) fn end_setup_session(&mut self, player: &PlayerId) -> Option<SetupSession> {
        self.setup_sessions.remove(player)
    }

    /// Every arena, sorted by name.
    pub fn summaries(&self) -> Vec<ArenaSummary> {
        self.manager
            .arenas()
            .into_iter()
            .map(|a| ArenaSummary {
                name: a.name().to_string(),
                status: a.status(),
                players: a.player_count(),
                max_players: a.max_players(),
            })
            .collect()
    }

    pub fn into_host(self) -> H {
        self.host
    }
}

impl<H: Host + Send + 'static> TntRun<H> {
    /// Moves the plugin into a tokio task. The task runs until
    /// [`PluginHandle::shutdown`] is called or every handle is dropped,
    /// then disables the plugin and hands the host back.
    ///
    /// `channel_size` bounds the event queue; senders wait when it is full.
    pub fn spawn(self, channel_size: usize) -> (PluginHandle, JoinHandle<Result<H, TntRunError>>) {
        let (tx, rx) = mpsc::channel(channel_size);
        let task = tokio::spawn(self.run(rx));
        (PluginHandle { sender: tx }, task)
    }

    async fn run(mut self, mut receiver: mpsc::Receiver<PluginCommand>) -> Result<H, TntRunError> {
        let mut clock = TickClock::new(self.config.clock());
        info!(rate = clock.tick_rate_hz(), "plugin loop started");

        loop {
            tokio::select! {
                command = receiver.recv() => match command {
                    Some(PluginCommand::Event { event, reply }) => {
                        let outcome = self.handle_event(event);
                        if let Some(reply) = reply {
                            let _ = reply.send(outcome);
                        }
                    }
                    Some(PluginCommand::Summaries { reply }) => {
                        let _ = reply.send(self.summaries());
                    }
                    Some(PluginCommand::Shutdown) | None => break,
                },
                _ = clock.wait_for_tick() => {
                    self.tick();
                    clock.finish_tick();
                }
            }
        }

        log_metrics(clock.metrics());
        self.disable()?;
        Ok(self.host)
    }
}

fn log_metrics(metrics: &TickMetrics) {
    info!(
        ticks = metrics.ticks,
        late = metrics.late_ticks,
        dropped = metrics.dropped_ticks,
        slowest_us = metrics.slowest_tick.as_micros() as u64,
        "plugin loop stopped"
    );
}

fn create_dir(path: &Path) -> Result<(), TntRunError> {
    fs::create_dir_all(path).map_err(|source| TntRunError::DataDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Requests sent to the plugin task.
pub(crate) enum PluginCommand {
    /// An engine event. The outcome is sent back if `reply` is set.
    Event {
        event: HostEvent,
        reply: Option<oneshot::Sender<EventOutcome>>,
    },
    Summaries {
        reply: oneshot::Sender<Vec<ArenaSummary>>,
    },
    Shutdown,
}

/// Handle to a running plugin task. Cheap to clone.
#[derive(Clone)]
pub struct PluginHandle {
    sender: mpsc::Sender<PluginCommand>,
}

impl PluginHandle {
    /// Delivers an event and waits for the outcome.
    pub async fn send(&self, event: HostEvent) -> Result<EventOutcome, TntRunError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(PluginCommand::Event {
                event,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| TntRunError::Stopped)?;
        reply_rx.await.map_err(|_| TntRunError::Stopped)
    }

    /// Delivers an event without waiting for it to be handled.
    pub async fn post(&self, event: HostEvent) -> Result<(), TntRunError> {
        self.sender
            .send(PluginCommand::Event { event, reply: None })
            .await
            .map_err(|_| TntRunError::Stopped)
    }

    /// Every arena's status, sorted by name.
    pub async fn summaries(&self) -> Result<Vec<ArenaSummary>, TntRunError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(PluginCommand::Summaries { reply: reply_tx })
            .await
            .map_err(|_| TntRunError::Stopped)?;
        reply_rx.await.map_err(|_| TntRunError::Stopped)
    }

    /// Asks the plugin task to disable the plugin and stop.
    pub async fn shutdown(&self) -> Result<(), TntRunError> {
        self.sender
            .send(PluginCommand::Shutdown)
            .await
            .map_err(|_| TntRunError::Stopped)
    }
}
