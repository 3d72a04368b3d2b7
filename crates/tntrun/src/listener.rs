//! Reactions to engine events.
//!
//! The engine reports what players do as [`HostEvent`]s. Each event is
//! handled to completion before the next one, in the same loop that runs
//! the ticks, and the returned [`EventOutcome`] tells the engine whether
//! to go ahead with the action.

use tntrun_arena::ArenaStatus;
use tntrun_host::Host;
use tntrun_types::{LobbyItem, Location, PlayerId, Vec3};
use tracing::{debug, warn};

use crate::{CommandOutcome, Menu, Sender, TntRun};

const FELL_INTO_VOID: &str = "You fell into the void and were eliminated!";

/// Why a player is taking damage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DamageCause {
    Fall,
    /// Hit by another player.
    Player(PlayerId),
    Other,
}

/// Something a player did, as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// `/tr <args>`.
    Command {
        player: PlayerId,
        admin: bool,
        args: Vec<String>,
    },
    /// Used a lobby item.
    Interact { player: PlayerId, item: LobbyItem },
    /// About to disconnect. Still online while this is handled.
    Quit { player: PlayerId },
    /// Moved from `from` to `to`. The engine has already applied the move.
    Move { player: PlayerId, from: Vec3, to: Vec3 },
    Death { player: PlayerId },
    Damage { player: PlayerId, cause: DamageCause },
    BlockBreak { player: PlayerId },
    BlockPlace { player: PlayerId },
}

impl HostEvent {
    pub fn player(&self) -> &PlayerId {
        match self {
            Self::Command { player, .. }
            | Self::Interact { player, .. }
            | Self::Quit { player }
            | Self::Move { player, .. }
            | Self::Death { player }
            | Self::Damage { player, .. }
            | Self::BlockBreak { player }
            | Self::BlockPlace { player } => player,
        }
    }
}

/// What the engine should do with the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    /// Cancel the action (damage, block edits, item use).
    Cancel,
    /// Show the player a menu.
    Show(Menu),
}

impl<H: Host> TntRun<H> {
    pub fn handle_event(&mut self, event: HostEvent) -> EventOutcome {
        match event {
            HostEvent::Command {
                player,
                admin,
                args,
            } => match self.execute(&Sender { player, admin }, args.as_slice()) {
                CommandOutcome::Show(menu) => EventOutcome::Show(menu),
                CommandOutcome::Done | CommandOutcome::Failed => EventOutcome::Continue,
            },
            HostEvent::Interact { player, item } => self.on_interact(&player, item),
            HostEvent::Quit { player } => {
                self.on_quit(&player);
                EventOutcome::Continue
            }
            HostEvent::Move { player, from, to } => {
                self.on_move(&player, from, to);
                EventOutcome::Continue
            }
            HostEvent::Death { player } => {
                self.on_death(&player);
                EventOutcome::Continue
            }
            HostEvent::Damage { player, cause } => self.on_damage(&player, &cause),
            HostEvent::BlockBreak { player } | HostEvent::BlockPlace { player } => {
                if self.arena_status_of(&player).is_some() {
                    EventOutcome::Cancel
                } else {
                    EventOutcome::Continue
                }
            }
        }
    }

    fn arena_status_of(&self, player: &PlayerId) -> Option<(String, ArenaStatus)> {
        self.manager
            .arena_of(player)
            .map(|a| (a.name().to_string(), a.status()))
    }

    fn on_interact(&mut self, player: &PlayerId, item: LobbyItem) -> EventOutcome {
        let Some((_, status)) = self.arena_status_of(player) else {
            return EventOutcome::Continue;
        };
        if !matches!(status, ArenaStatus::Waiting | ArenaStatus::Countdown) {
            return EventOutcome::Continue;
        }
        match item {
            LobbyItem::Leave => {
                if self.manager.leave(&mut self.host, player).is_ok() {
                    self.host.send_message(player, "You left the arena.");
                }
                EventOutcome::Cancel
            }
            LobbyItem::Vote => EventOutcome::Show(self.vote_menu()),
        }
    }

    fn on_quit(&mut self, player: &PlayerId) {
        if let Ok(arena) = self.manager.leave(&mut self.host, player) {
            debug!(%arena, %player, "player quit while in arena");
        }
        if let Some(session) = self.end_setup_session(player) {
            let in_setup = self
                .manager
                .get_arena(&session.arena)
                .is_some_and(|a| a.status() == ArenaStatus::Setup);
            if in_setup {
                if let Err(e) = self.manager.set_setup_mode(&mut self.host, &session.arena, false) {
                    warn!(arena = %session.arena, %player, error = %e, "could not leave setup after admin quit");
                }
            }
        }
    }

    fn on_move(&mut self, player: &PlayerId, from: Vec3, to: Vec3) {
        let Some((name, status)) = self.arena_status_of(player) else {
            return;
        };
        match status {
            ArenaStatus::Countdown if from.changed_column(to) => self.snap_to_spawn(player, &name, to),
            ArenaStatus::Playing if to.y < 0.0 => {
                let result = self.manager.with_arena(&mut self.host, &name, |arena, ctx| {
                    arena.eliminate_player(ctx, player, FELL_INTO_VOID)
                });
                if let Err(e) = result {
                    warn!(arena = %name, %player, error = %e, "void elimination failed");
                }
            }
            ArenaStatus::Playing => {
                if let Some(arena) = self.manager.get_arena(&name) {
                    arena.break_block_under(&mut self.host, player);
                }
            }
            _ => {}
        }
    }

    /// Puts a player counting down in the arena world back on the nearest
    /// spawn point.
    fn snap_to_spawn(&mut self, player: &PlayerId, arena: &str, to: Vec3) {
        let Some(arena) = self.manager.get_arena(arena) else {
            return;
        };
        let Some(location) = self.host.location(player) else {
            return;
        };
        if location.world != arena.world() {
            return;
        }
        let Some(spawn) = arena.nearest_spawn(to) else {
            return;
        };
        let target = Location {
            pos: spawn,
            ..location
        };
        if let Err(e) = self.host.teleport(player, &target) {
            warn!(arena = %arena.name(), %player, error = %e, "could not hold player on spawn");
        }
    }

    fn on_death(&mut self, player: &PlayerId) {
        let Some((name, _)) = self.arena_status_of(player) else {
            return;
        };
        let result = self
            .manager
            .with_arena(&mut self.host, &name, |arena, ctx| arena.schedule_elimination(ctx, player));
        if let Err(e) = result {
            warn!(arena = %name, %player, error = %e, "could not schedule elimination");
        }
    }

    fn on_damage(&mut self, player: &PlayerId, cause: &DamageCause) -> EventOutcome {
        let Some((_, status)) = self.arena_status_of(player) else {
            return EventOutcome::Continue;
        };
        let cancel = match (status, cause) {
            (_, DamageCause::Fall) => true,
            (ArenaStatus::Waiting | ArenaStatus::Countdown | ArenaStatus::Ending, _) => true,
            (ArenaStatus::Playing, DamageCause::Player(_)) => true,
            _ => false,
        };
        if cancel {
            EventOutcome::Cancel
        } else {
            EventOutcome::Continue
        }
    }
}
