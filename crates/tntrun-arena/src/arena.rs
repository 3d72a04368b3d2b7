//! One arena: roster, votes, timers and the round state machine.
//!
//! Every transition method re-checks its precondition and returns early
//! when it does not hold. Timer handlers additionally check that the firing
//! task is the one their slot owns, so a task that survived a cancel (or a
//! late duplicate) is a no-op.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::Rng;
use tntrun_host::Host;
use tntrun_tick::{TaskId, TickScheduler};
use tntrun_types::{
    ArenaDefinition, BlockKind, GameMode, Location, LobbyItem, PlayerId, Sound, SpawnPoint, Vec3,
};
use tntrun_world::{WorldBackups, WorldError};
use tracing::{debug, error, info, warn};

use crate::{ArenaError, ArenaStatus, ArenaTask, ArenaTimers, ArenaTimings, TaskKind, PRE_START_STEPS};

/// Everything an arena touches besides itself.
pub struct ArenaCtx<'a> {
    pub host: &'a mut dyn Host,
    pub scheduler: &'a mut TickScheduler<ArenaTask>,
    pub backups: &'a WorldBackups,
}

/// Where a player was, and in which mode, before joining.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPlayer {
    pub location: Location,
    pub game_mode: GameMode,
}

/// One game room.
///
/// Built from an [`ArenaDefinition`] and owned by the manager. Runtime
/// state (roster, votes, timers) never leaves this struct; only
/// [`Arena::definition`] is persisted.
#[derive(Debug)]
pub struct Arena {
    name: String,
    world: String,
    min_players: u32,
    max_players: u32,
    lobby_world: String,
    lobby_position: Option<Vec3>,
    spawn_positions: BTreeMap<u32, Vec3>,
    block_type: String,

    status: ArenaStatus,
    players: BTreeSet<PlayerId>,
    spectators: BTreeSet<PlayerId>,
    saved: HashMap<PlayerId, SavedPlayer>,
    /// Home locations of the last roster, kept while the world restore is
    /// pending so stragglers can be sent back.
    homes: HashMap<PlayerId, Location>,
    /// Votes in cast order. A player appears at most once.
    votes: Vec<(PlayerId, String)>,
    countdown_time: u32,
    pre_start_time: u32,

    timers: ArenaTimers,
    timings: ArenaTimings,
}

impl Arena {
    /// A Waiting arena. Spawn heights are clamped into the safe range.
    pub fn new(name: impl Into<String>, definition: ArenaDefinition, timings: ArenaTimings) -> Self {
        let definition = definition.with_safe_spawns();
        Self {
            name: name.into(),
            world: definition.world,
            min_players: definition.min_players,
            max_players: definition.max_players,
            lobby_world: definition.lobby_world,
            lobby_position: definition.lobby_position,
            spawn_positions: definition
                .spawn_positions
                .into_iter()
                .map(|s| (s.slot, s.pos))
                .collect(),
            block_type: definition.block_type,
            status: ArenaStatus::Waiting,
            players: BTreeSet::new(),
            spectators: BTreeSet::new(),
            saved: HashMap::new(),
            homes: HashMap::new(),
            votes: Vec::new(),
            countdown_time: 0,
            pre_start_time: 0,
            timers: ArenaTimers::default(),
            timings,
        }
    }

    /// The persisted part of the arena.
    pub fn definition(&self) -> ArenaDefinition {
        ArenaDefinition {
            world: self.world.clone(),
            min_players: self.min_players,
            max_players: self.max_players,
            lobby_world: self.lobby_world.clone(),
            lobby_position: self.lobby_position,
            spawn_positions: self
                .spawn_positions
                .iter()
                .map(|(&slot, &pos)| SpawnPoint { slot, pos })
                .collect(),
            block_type: self.block_type.clone(),
        }
    }

    // -- Accessors --

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Folder name of the world the round is played in.
    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn status(&self) -> ArenaStatus {
        self.status
    }

    /// Players needed before the countdown starts.
    pub fn min_players(&self) -> u32 {
        self.min_players
    }

    /// Roster cap.
    pub fn max_players(&self) -> u32 {
        self.max_players
    }

    /// Empty when no lobby is configured.
    pub fn lobby_world(&self) -> &str {
        &self.lobby_world
    }

    pub fn lobby_position(&self) -> Option<Vec3> {
        self.lobby_position
    }

    /// Spawn slots, keyed by their 1-based number.
    pub fn spawn_positions(&self) -> &BTreeMap<u32, Vec3> {
        &self.spawn_positions
    }

    /// The floor block as configured, lowercase.
    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// The configured floor block, `Tnt` when the name is unknown.
    pub fn block_kind(&self) -> BlockKind {
        BlockKind::from_name(&self.block_type)
    }

    /// Active runners. Eliminated players are no longer in here.
    pub fn players(&self) -> &BTreeSet<PlayerId> {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    /// Whether the roster has reached `max_players`.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    /// Watchers. They never count towards the roster.
    pub fn spectators(&self) -> &BTreeSet<PlayerId> {
        &self.spectators
    }

    /// Where `player` goes back to when they leave. Only present while
    /// they are on the roster.
    pub fn saved_player(&self, player: &PlayerId) -> Option<&SavedPlayer> {
        self.saved.get(player)
    }

    /// The map `player` voted for, if any.
    pub fn vote_of(&self, player: &PlayerId) -> Option<&str> {
        self.votes
            .iter()
            .find(|(p, _)| p == player)
            .map(|(_, map)| map.as_str())
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Seconds left on the lobby countdown, 0 when none is running.
    pub fn countdown_time(&self) -> u32 {
        self.countdown_time
    }

    /// Pre-start steps left ("3", "2", "1", "GO!").
    pub fn pre_start_time(&self) -> u32 {
        self.pre_start_time
    }

    /// The arena's timer slots, for checking what is scheduled.
    pub fn timers(&self) -> &ArenaTimers {
        &self.timers
    }

    fn has_enough_players(&self) -> bool {
        self.players.len() >= self.min_players as usize
    }

    // -- Roster --

    /// Admits a player. Returns `false` unless the arena is waiting, has
    /// room, and the player is online and not already in it.
    pub fn join_player(&mut self, ctx: &mut ArenaCtx<'_>, player: &PlayerId) -> bool {
        if !self.status.is_joinable() || self.is_full() || self.players.contains(player) {
            return false;
        }
        let Some(location) = ctx.host.location(player) else {
            return false;
        };
        let game_mode = ctx.host.game_mode(player).unwrap_or_default();
        self.saved.insert(player.clone(), SavedPlayer { location, game_mode });
        self.players.insert(player.clone());

        ctx.host.clear_inventory(player);
        ctx.host.reset_experience(player);
        ctx.host.set_game_mode(player, GameMode::Adventure);

        let target = self.lobby_location(ctx.host).or_else(|| self.random_spawn(ctx.host));
        match target {
            Some(to) => {
                if let Err(e) = ctx.host.teleport(player, &to) {
                    warn!(arena = %self.name, %player, error = %e, "join teleport failed");
                }
            }
            None => warn!(arena = %self.name, %player, "no lobby or spawn to send joining player to"),
        }

        ctx.host.give_item(player, LobbyItem::Leave);
        ctx.host.give_item(player, LobbyItem::Vote);

        self.broadcast_message(
            ctx.host,
            &format!(
                "{player} joined the arena! ({}/{})",
                self.players.len(),
                self.max_players
            ),
        );
        info!(arena = %self.name, %player, players = self.players.len(), "player joined");

        if self.has_enough_players() {
            self.start_countdown(ctx);
        }
        true
    }

    /// Takes a player out of the roster and sends them back where they
    /// came from. No-op if they are not in the arena.
    ///
    /// Ends the round if this leaves one player or none while playing.
    pub fn remove_player(&mut self, ctx: &mut ArenaCtx<'_>, player: &PlayerId, eliminated: bool) {
        if !self.detach_player(ctx, player, eliminated) {
            return;
        }
        self.end_if_decided(ctx);
    }

    /// Removes a player as a loser: no leave announcement, `message` to
    /// them, and a sound for everyone still in.
    pub fn eliminate_player(&mut self, ctx: &mut ArenaCtx<'_>, player: &PlayerId, message: &str) -> bool {
        if !self.detach_player(ctx, player, true) {
            return false;
        }
        ctx.host.send_message(player, message);
        for other in &self.players {
            ctx.host.play_sound(other, Sound::BlazeShoot);
        }
        info!(arena = %self.name, %player, remaining = self.players.len(), "player eliminated");
        self.end_if_decided(ctx);
        true
    }

    /// Schedules the elimination of a player who just died.
    pub fn schedule_elimination(&mut self, ctx: &mut ArenaCtx<'_>, player: &PlayerId) -> bool {
        if !self.players.contains(player) {
            return false;
        }
        ctx.scheduler.run_after(
            self.timings.elimination_delay_ticks,
            ArenaTask::new(&self.name, TaskKind::Eliminate(player.clone())),
        );
        true
    }

    fn detach_player(&mut self, ctx: &mut ArenaCtx<'_>, player: &PlayerId, eliminated: bool) -> bool {
        if !self.players.remove(player) {
            return false;
        }
        ctx.host.clear_inventory(player);
        ctx.host.set_immobile(player, false);
        self.send_home(ctx.host, player);
        self.votes.retain(|(p, _)| p != player);

        if !eliminated {
            self.broadcast_message(
                ctx.host,
                &format!(
                    "{player} left the arena! ({}/{})",
                    self.players.len(),
                    self.max_players
                ),
            );
            info!(arena = %self.name, %player, players = self.players.len(), "player left");
        }
        true
    }

    fn end_if_decided(&mut self, ctx: &mut ArenaCtx<'_>) {
        if self.status == ArenaStatus::Playing && self.players.len() <= 1 {
            self.end_game(ctx);
        }
    }

    /// Restores a player's saved location and game mode, consuming the
    /// record. Returns the location they were sent to.
    fn send_home(&mut self, host: &mut dyn Host, player: &PlayerId) -> Option<Location> {
        let saved = self.saved.remove(player)?;
        let target = if host.is_world_loaded(&saved.location.world) {
            saved.location
        } else {
            debug!(arena = %self.name, %player, world = %saved.location.world, "home world not loaded, using default spawn");
            host.default_spawn()
        };
        if let Err(e) = host.teleport(player, &target) {
            warn!(arena = %self.name, %player, error = %e, "could not send player home");
        }
        host.set_game_mode(player, saved.game_mode);
        Some(target)
    }

    pub fn add_spectator(&mut self, player: &PlayerId) -> bool {
        if self.players.contains(player) {
            return false;
        }
        self.spectators.insert(player.clone())
    }

    pub fn remove_spectator(&mut self, player: &PlayerId) -> bool {
        self.spectators.remove(player)
    }

    // -- Votes --

    /// Records a vote. Only roster members may vote, and only while the
    /// arena is waiting. A second vote replaces the first.
    pub fn add_vote(&mut self, player: &PlayerId, map: &str) -> bool {
        if self.status != ArenaStatus::Waiting || !self.players.contains(player) {
            return false;
        }
        self.votes.retain(|(p, _)| p != player);
        self.votes.push((player.clone(), map.to_string()));
        true
    }

    /// The map with the most votes. On a tie, the map that reached the
    /// winning count first.
    pub fn most_voted_map(&self) -> Option<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut best: Option<(&str, usize)> = None;
        for (_, map) in &self.votes {
            let count = counts.entry(map.as_str()).or_default();
            *count += 1;
            if best.is_none_or(|(_, top)| *count > top) {
                best = Some((map.as_str(), *count));
            }
        }
        best.map(|(map, _)| map.to_string())
    }

    // -- Transitions --

    /// Waiting → Countdown, if enough players joined.
    pub fn start_countdown(&mut self, ctx: &mut ArenaCtx<'_>) {
        if self.status != ArenaStatus::Waiting || !self.has_enough_players() {
            return;
        }
        self.status = ArenaStatus::Countdown;
        self.countdown_time = self.timings.countdown_seconds.max(1);
        self.play_sound_all(ctx.host, Sound::AnvilUse);

        let task = ctx.scheduler.run_every(
            ArenaTimings::STEP_TICKS,
            ArenaTask::new(&self.name, TaskKind::Countdown),
        );
        self.timers.countdown.replace(ctx.scheduler, task);
        info!(arena = %self.name, seconds = self.countdown_time, "countdown started");
    }

    /// End of the countdown: freezes everyone on a spawn and starts the
    /// pre-start sequence. Falls back to Waiting without enough players.
    pub fn start_game(&mut self, ctx: &mut ArenaCtx<'_>) {
        if self.status != ArenaStatus::Countdown {
            return;
        }
        self.timers.countdown.cancel(ctx.scheduler);
        self.countdown_time = 0;

        if !self.has_enough_players() {
            self.broadcast_message(ctx.host, "Not enough players to start the game!");
            self.status = ArenaStatus::Waiting;
            info!(arena = %self.name, "start aborted, not enough players");
            return;
        }

        let spawns = self.start_spawns(ctx.host);
        for (player, spawn) in self.players.iter().zip(spawns) {
            if let Some(to) = spawn {
                if let Err(e) = ctx.host.teleport(player, &to) {
                    warn!(arena = %self.name, %player, error = %e, "start teleport failed");
                }
            }
            ctx.host.clear_inventory(player);
            ctx.host.set_immobile(player, true);
        }
        self.broadcast_title(ctx.host, "Get Ready!", "");
        self.broadcast_message(ctx.host, "The game is starting!");

        self.pre_start_time = PRE_START_STEPS;
        let task = ctx.scheduler.run_every(
            ArenaTimings::STEP_TICKS,
            ArenaTask::new(&self.name, TaskKind::PreStart),
        );
        self.timers.pre_start.replace(ctx.scheduler, task);
        debug!(arena = %self.name, "pre-start sequence started");
    }

    fn finish_start(&mut self, ctx: &mut ArenaCtx<'_>) {
        self.timers.pre_start.cancel(ctx.scheduler);
        self.pre_start_time = 0;

        self.broadcast_title(ctx.host, "GO!", "");
        for player in &self.players {
            ctx.host.set_immobile(player, false);
        }
        self.play_sound_all(ctx.host, Sound::Explode);
        self.status = ArenaStatus::Playing;

        let task = ctx.scheduler.run_every(
            ArenaTimings::STEP_TICKS,
            ArenaTask::new(&self.name, TaskKind::Mechanics),
        );
        self.timers.mechanics.replace(ctx.scheduler, task);
        info!(arena = %self.name, players = self.players.len(), "round started");
    }

    /// Playing → Ending. Announces the winner (if exactly one player is
    /// left) and schedules the reset.
    pub fn end_game(&mut self, ctx: &mut ArenaCtx<'_>) {
        if self.status != ArenaStatus::Playing {
            return;
        }
        self.status = ArenaStatus::Ending;
        self.cancel_all_tasks(ctx.scheduler);

        let winner = (self.players.len() == 1)
            .then(|| self.players.first().cloned())
            .flatten();
        match &winner {
            Some(winner) => {
                self.broadcast_title(ctx.host, &format!("{winner} wins!"), "");
                self.broadcast_message(ctx.host, &format!("{winner} has won the game!"));
                ctx.host.play_sound(winner, Sound::LevelUp);
            }
            None => {
                self.broadcast_title(ctx.host, "Game Over!", "");
                self.broadcast_message(ctx.host, "The game has ended with no winner!");
            }
        }

        let task = ctx.scheduler.run_after(
            self.timings.end_delay_ticks,
            ArenaTask::new(&self.name, TaskKind::ResetDelay),
        );
        self.timers.reset.replace(ctx.scheduler, task);
        info!(arena = %self.name, winner = ?winner.as_ref().map(PlayerId::as_str), "round ended");
    }

    /// Any state → Resetting → Waiting.
    ///
    /// Sends everyone home, clears the roster, then restores the world
    /// from its backup. If the restore fails the arena stays Resetting and
    /// a retry is scheduled.
    pub fn reset_arena(&mut self, ctx: &mut ArenaCtx<'_>) {
        self.cancel_all_tasks(ctx.scheduler);

        let players = std::mem::take(&mut self.players);
        for player in &players {
            ctx.host.clear_inventory(player);
            ctx.host.set_immobile(player, false);
            if let Some(home) = self.send_home(ctx.host, player) {
                self.homes.insert(player.clone(), home);
            }
        }
        self.saved.clear();
        self.spectators.clear();
        self.votes.clear();
        self.countdown_time = 0;
        self.pre_start_time = 0;
        self.status = ArenaStatus::Resetting;
        info!(arena = %self.name, sent_home = players.len(), "arena resetting");

        self.attempt_restore(ctx);
    }

    /// Cancels every timer this arena owns.
    pub fn cancel_all_tasks(&mut self, scheduler: &mut TickScheduler<ArenaTask>) {
        self.timers.cancel_all(scheduler);
    }

    fn attempt_restore(&mut self, ctx: &mut ArenaCtx<'_>) {
        let homes = &self.homes;
        let result = ctx
            .backups
            .restore(&mut *ctx.host, &self.world, |p| homes.get(p).cloned());

        match result {
            Ok(()) => {
                self.homes.clear();
                self.status = ArenaStatus::Waiting;
                info!(arena = %self.name, world = %self.world, "arena reset complete");
            }
            Err(e) => {
                match &e {
                    WorldError::Occupied { count, .. } => {
                        info!(arena = %self.name, world = %self.world, count, "arena world busy, will retry reset");
                    }
                    WorldError::MissingBackup(_) => {
                        error!(arena = %self.name, world = %self.world, "no world backup, arena cannot be reset until setup is completed");
                    }
                    _ => {
                        warn!(arena = %self.name, world = %self.world, error = %e, "world restore failed, will retry");
                    }
                }
                let task = ctx.scheduler.run_after(
                    self.timings.reset_retry_ticks,
                    ArenaTask::new(&self.name, TaskKind::ResetRetry),
                );
                self.timers.reset.replace(ctx.scheduler, task);
            }
        }
    }

    // -- Timer handlers --

    pub(crate) fn on_countdown_tick(&mut self, ctx: &mut ArenaCtx<'_>, task: TaskId) {
        if !self.timers.countdown.owns(task) || self.status != ArenaStatus::Countdown {
            ctx.scheduler.cancel(task);
            return;
        }

        if !self.has_enough_players() {
            self.timers.countdown.cancel(ctx.scheduler);
            self.countdown_time = 0;
            self.status = ArenaStatus::Waiting;
            self.broadcast_message(ctx.host, "Not enough players, countdown cancelled.");
            info!(arena = %self.name, players = self.players.len(), "countdown cancelled");
            return;
        }

        let left = self.countdown_time;
        if left <= 5 || left % 5 == 0 {
            self.broadcast_title(ctx.host, &format!("Starting in {left} seconds!"), "");
            self.broadcast_message(ctx.host, &format!("Game starting in {left} seconds!"));
            self.play_sound_all(ctx.host, Sound::Click);
        }

        self.countdown_time = left.saturating_sub(1);
        if self.countdown_time == 0 {
            self.start_game(ctx);
        }
    }

    pub(crate) fn on_pre_start_tick(&mut self, ctx: &mut ArenaCtx<'_>, task: TaskId) {
        if !self.timers.pre_start.owns(task) {
            ctx.scheduler.cancel(task);
            return;
        }
        if self.status != ArenaStatus::Countdown || !self.has_enough_players() {
            self.broadcast_message(ctx.host, "Not enough players, the game was cancelled.");
            warn!(arena = %self.name, status = %self.status, players = self.players.len(), "pre-start aborted");
            self.reset_arena(ctx);
            return;
        }

        self.pre_start_time = self.pre_start_time.saturating_sub(1);
        match self.pre_start_time {
            0 => self.finish_start(ctx),
            n @ 1..=3 => {
                self.broadcast_title(ctx.host, &n.to_string(), "");
                self.play_sound_all(ctx.host, Sound::Click);
            }
            _ => {}
        }
    }

    pub(crate) fn on_mechanics_tick(&mut self, ctx: &mut ArenaCtx<'_>, task: TaskId) {
        if !self.timers.mechanics.owns(task) || self.status != ArenaStatus::Playing {
            ctx.scheduler.cancel(task);
            return;
        }
        let players: Vec<PlayerId> = self.players.iter().cloned().collect();
        for player in &players {
            if ctx.host.is_online(player) {
                self.break_block_under(ctx.host, player);
            }
        }
    }

    pub(crate) fn on_reset_delay(&mut self, ctx: &mut ArenaCtx<'_>, task: TaskId) {
        if !self.timers.reset.owns(task) {
            return;
        }
        self.timers.reset.release(task);
        if self.status == ArenaStatus::Ending {
            self.reset_arena(ctx);
        }
    }

    pub(crate) fn on_reset_retry(&mut self, ctx: &mut ArenaCtx<'_>, task: TaskId) {
        if !self.timers.reset.owns(task) {
            return;
        }
        self.timers.reset.release(task);
        if self.status == ArenaStatus::Resetting {
            debug!(arena = %self.name, "retrying world restore");
            self.attempt_restore(ctx);
        }
    }

    pub(crate) fn on_eliminate(&mut self, ctx: &mut ArenaCtx<'_>, player: &PlayerId) {
        if self.players.contains(player) && ctx.host.is_online(player) {
            self.eliminate_player(ctx, player, "You died and were eliminated!");
        }
    }

    // -- World interaction --

    /// Removes the block under a player, unless it is air or the player is
    /// not in the arena world. Returns `true` if a block was removed.
    pub fn break_block_under(&self, host: &mut dyn Host, player: &PlayerId) -> bool {
        let Some(location) = host.location(player) else {
            return false;
        };
        if location.world != self.world {
            return false;
        }
        let below = location.pos.block_below();
        if host.block_at(&self.world, below).is_air() {
            return false;
        }
        host.set_block(&self.world, below, BlockKind::Air);
        host.play_sound_at(&self.world, below, Sound::BlockBreak);
        true
    }

    /// The spawn point closest to `pos` on the horizontal plane.
    pub fn nearest_spawn(&self, pos: Vec3) -> Option<Vec3> {
        self.spawn_positions
            .values()
            .copied()
            .min_by(|a, b| {
                a.horizontal_distance(pos)
                    .total_cmp(&b.horizontal_distance(pos))
            })
            .map(Vec3::with_safe_y)
    }

    fn lobby_location(&self, host: &dyn Host) -> Option<Location> {
        let pos = self.lobby_position?;
        if self.lobby_world.is_empty() || !host.is_world_loaded(&self.lobby_world) {
            return None;
        }
        Some(Location::new(self.lobby_world.as_str(), pos))
    }

    fn random_spawn(&self, host: &dyn Host) -> Option<Location> {
        if self.spawn_positions.is_empty() {
            return self.world_spawn(host);
        }
        let index = rand::rng().random_range(0..self.spawn_positions.len());
        self.spawn_positions
            .values()
            .nth(index)
            .map(|pos| Location::new(self.world.as_str(), pos.with_safe_y()))
    }

    fn world_spawn(&self, host: &dyn Host) -> Option<Location> {
        host.world_spawn(&self.world).map(|mut loc| {
            loc.pos = loc.pos.with_safe_y();
            loc
        })
    }

    /// One spawn per roster player, in roster order, cycling through the
    /// slots when there are more players than spawns.
    fn start_spawns(&self, host: &dyn Host) -> Vec<Option<Location>> {
        let slots: Vec<Vec3> = self.spawn_positions.values().copied().collect();
        (0..self.players.len())
            .map(|i| match slots.get(i % slots.len().max(1)) {
                Some(pos) => Some(Location::new(self.world.as_str(), pos.with_safe_y())),
                None => self.world_spawn(host),
            })
            .collect()
    }

    // -- Configuration --

    /// Enters or leaves setup mode.
    ///
    /// Entering is refused while a round is running. Waiting players are
    /// sent home first. Leaving setup snapshots the world and then returns
    /// the arena to Waiting; if the snapshot fails the arena stays in
    /// Setup and the error is returned.
    pub fn set_setup_mode(&mut self, ctx: &mut ArenaCtx<'_>, setup: bool) -> Result<(), ArenaError> {
        if setup {
            match self.status {
                ArenaStatus::Setup => return Ok(()),
                status if status.is_running() => {
                    return Err(ArenaError::InvalidState {
                        arena: self.name.clone(),
                        status,
                        operation: "enter setup",
                    });
                }
                _ => {}
            }
            let players: Vec<PlayerId> = self.players.iter().cloned().collect();
            for player in &players {
                self.detach_player(ctx, player, false);
            }
            self.cancel_all_tasks(ctx.scheduler);
            self.votes.clear();
            self.status = ArenaStatus::Setup;
            info!(arena = %self.name, "setup mode on");
            return Ok(());
        }

        if self.status != ArenaStatus::Setup {
            return Ok(());
        }
        // Stays in Setup until a snapshot exists to reset from.
        ctx.backups.backup(&mut *ctx.host, &self.world)?;
        self.status = ArenaStatus::Waiting;
        self.homes.clear();
        info!(arena = %self.name, "setup mode off");
        Ok(())
    }

    /// Sets a spawn slot. Standing in another world moves the whole arena
    /// to that world.
    pub fn set_spawn_position(&mut self, slot: u32, pos: Vec3, world: &str) {
        self.spawn_positions.insert(slot, pos.with_safe_y());
        if self.world != world {
            info!(arena = %self.name, from = %self.world, to = %world, "arena world changed");
            self.world = world.to_string();
        }
    }

    pub fn set_lobby_position(&mut self, world: &str, pos: Vec3) {
        self.lobby_world = world.to_string();
        self.lobby_position = Some(pos);
    }

    pub fn set_block_type(&mut self, name: &str) {
        self.block_type = name.to_lowercase();
    }

    // -- Broadcasts --

    fn audience(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter().chain(self.spectators.iter())
    }

    pub fn broadcast_message(&self, host: &mut dyn Host, message: &str) {
        for player in self.audience() {
            host.send_message(player, message);
        }
    }

    pub fn broadcast_title(&self, host: &mut dyn Host, title: &str, subtitle: &str) {
        for player in self.audience() {
            host.send_title(player, title, subtitle);
        }
    }

    fn play_sound_all(&self, host: &mut dyn Host, sound: Sound) {
        for player in &self.players {
            host.play_sound(player, sound);
        }
    }
}
