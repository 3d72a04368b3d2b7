//! Arena manager: owns every arena and drives their timers.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::Path;

use rand::Rng;
use tntrun_host::Host;
use tntrun_tick::{DueTask, TickScheduler};
use tntrun_types::{clamp_safe_y, ArenaDefinition, ArenaTemplate, Codec, JsonCodec, Location, PlayerId, SpawnPoint, Vec3};
use tntrun_world::WorldBackups;
use tracing::{debug, info, warn};

use crate::{Arena, ArenaCtx, ArenaError, ArenaStatus, ArenaStore, ArenaTask, ArenaTimings, TaskKind};

/// Radius of the ring of default spawns laid out for new arenas.
const DEFAULT_SPAWN_RADIUS: f64 = 5.0;

/// Spawn height used when the arena world's spawn is unknown.
const FALLBACK_SPAWN_Y: f64 = 64.0;

/// File stem of the template applied to new arenas.
pub const TEMPLATE_FILE_STEM: &str = "default_arena";

/// Owns every arena, the scheduler their timers run on, the world
/// backups and the definition store.
///
/// This is the entry point for everything above the arena layer (command
/// façade, event listener). Nothing else keeps references to arenas;
/// scheduled tasks name their arena and are resolved here when they fire.
pub struct ArenaManager<C: Codec = JsonCodec> {
    arenas: HashMap<String, Arena>,
    scheduler: TickScheduler<ArenaTask>,
    backups: WorldBackups,
    store: ArenaStore<C>,
    timings: ArenaTimings,
    template: Option<ArenaTemplate>,
}

impl<C: Codec> ArenaManager<C> {
    pub fn new(store: ArenaStore<C>, backups: WorldBackups, timings: ArenaTimings) -> Self {
        Self {
            arenas: HashMap::new(),
            scheduler: TickScheduler::new(),
            backups,
            store,
            timings,
            template: None,
        }
    }

    /// Loads the new-arena template from `dir`, replacing the current one.
    /// A missing or unreadable template leaves none in place; the latter
    /// is logged. Returns whether a template is active.
    pub fn load_template(&mut self, dir: &Path) -> bool {
        self.template = match self.store.load_template(dir, TEMPLATE_FILE_STEM) {
            Ok(template) => template,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "could not load arena template, using built-in defaults");
                None
            }
        };
        if self.template.is_some() {
            info!(dir = %dir.display(), "arena template loaded");
        }
        self.template.is_some()
    }

    /// Replaces the template used by [`ArenaManager::create_arena`].
    pub fn set_template(&mut self, template: Option<ArenaTemplate>) {
        self.template = template;
    }

    pub fn template(&self) -> Option<&ArenaTemplate> {
        self.template.as_ref()
    }

    /// Loads every stored definition. Bad definitions are skipped with a
    /// warning. Returns the number of arenas loaded.
    pub fn load_arenas(&mut self, host: &mut dyn Host) -> usize {
        let definitions = match self.store.load_all() {
            Ok(found) => found,
            Err(e) => {
                warn!(dir = %self.store.dir().display(), error = %e, "could not read arena definitions");
                return 0;
            }
        };
        if definitions.is_empty() {
            info!("no arena definitions found");
        }

        let mut loaded = 0;
        for (name, definition) in definitions {
            let definition = match definition.and_then(|d| {
                d.validate()?;
                Ok(d)
            }) {
                Ok(d) => d,
                Err(e) => {
                    warn!(arena = %name, error = %e, "skipping arena with invalid definition");
                    continue;
                }
            };
            if self.arenas.contains_key(&name) {
                warn!(arena = %name, "duplicate arena definition skipped");
                continue;
            }

            preload_world(host, &name, &definition.world, "arena");
            if definition.has_lobby() && definition.lobby_world != definition.world {
                preload_world(host, &name, &definition.lobby_world, "lobby");
            }

            self.arenas
                .insert(name.clone(), Arena::new(name.as_str(), definition, self.timings));
            info!(arena = %name, "arena loaded");
            loaded += 1;
        }
        loaded
    }

    /// Creates, stores and registers a new arena.
    ///
    /// Spawns default to a ring around the world spawn. When a template is
    /// loaded, its lobby, block type and spawn slots take precedence.
    pub fn create_arena(
        &mut self,
        host: &mut dyn Host,
        name: &str,
        world: &str,
        min_players: u32,
        max_players: u32,
    ) -> Result<(), ArenaError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ArenaError::InvalidName(name.to_string()));
        }
        if self.arenas.contains_key(name) {
            return Err(ArenaError::AlreadyExists(name.to_string()));
        }
        let mut definition = ArenaDefinition::new(world, min_players, max_players);
        definition.validate()?;

        let y = safe_spawn_y(host, world);
        definition.spawn_positions = (0..max_players)
            .map(|i| {
                let angle = 2.0 * PI * f64::from(i) / f64::from(max_players);
                SpawnPoint {
                    slot: i + 1,
                    pos: Vec3::new(
                        (angle.sin() * DEFAULT_SPAWN_RADIUS).round(),
                        y,
                        (angle.cos() * DEFAULT_SPAWN_RADIUS).round(),
                    ),
                }
            })
            .collect();
        if let Some(template) = &self.template {
            template.apply(&mut definition);
            if definition.has_lobby() && definition.lobby_world != definition.world {
                preload_world(host, name, &definition.lobby_world, "lobby");
            }
        }

        self.store.save(name, &definition)?;
        self.arenas
            .insert(name.to_string(), Arena::new(name, definition, self.timings));
        info!(arena = %name, %world, min_players, max_players, "arena created");
        Ok(())
    }

    pub fn get_arena(&self, name: &str) -> Option<&Arena> {
        self.arenas.get(name)
    }

    pub fn get_arena_mut(&mut self, name: &str) -> Option<&mut Arena> {
        self.arenas.get_mut(name)
    }

    /// Every arena, sorted by name.
    pub fn arenas(&self) -> Vec<&Arena> {
        let mut all: Vec<&Arena> = self.arenas.values().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    /// Every arena name, sorted.
    pub fn arena_names(&self) -> Vec<String> {
        self.arenas().into_iter().map(|a| a.name().to_string()).collect()
    }

    /// A random arena that is waiting and has room, if any.
    pub fn random_arena(&self) -> Option<&Arena> {
        let open: Vec<&Arena> = self
            .arenas()
            .into_iter()
            .filter(|a| a.status().is_joinable() && !a.is_full())
            .collect();
        if open.is_empty() {
            return None;
        }
        Some(open[rand::rng().random_range(0..open.len())])
    }

    /// The arena a player is playing in.
    pub fn arena_of(&self, player: &PlayerId) -> Option<&Arena> {
        self.arenas.values().find(|a| a.has_player(player))
    }

    /// Writes the arena's definition to the store.
    pub fn save_arena(&self, name: &str) -> Result<(), ArenaError> {
        let arena = self.arena(name)?;
        self.store.save(name, &arena.definition())
    }

    /// Saves every arena. A failure is logged and does not stop the others;
    /// the first one is returned.
    pub fn save_all_arenas(&self) -> Result<(), ArenaError> {
        let mut first_error = None;
        for arena in self.arenas() {
            if let Err(e) = self.store.save(arena.name(), &arena.definition()) {
                warn!(arena = %arena.name(), error = %e, "failed to save arena");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Runs `f` against an arena together with the context it needs to
    /// act on the host and its timers.
    pub fn with_arena<R>(
        &mut self,
        host: &mut dyn Host,
        name: &str,
        f: impl FnOnce(&mut Arena, &mut ArenaCtx<'_>) -> R,
    ) -> Result<R, ArenaError> {
        let Self {
            arenas,
            scheduler,
            backups,
            ..
        } = self;
        let arena = arenas
            .get_mut(name)
            .ok_or_else(|| ArenaError::NotFound(name.to_string()))?;
        let mut ctx = ArenaCtx {
            host,
            scheduler,
            backups,
        };
        Ok(f(arena, &mut ctx))
    }

    // -- Player routing --

    /// Puts a player in an arena: the named one, or a random open one.
    /// A player is in at most one arena at a time. Returns the arena name.
    pub fn join(
        &mut self,
        host: &mut dyn Host,
        player: &PlayerId,
        arena: Option<&str>,
    ) -> Result<String, ArenaError> {
        if let Some(current) = self.arena_of(player) {
            return Err(ArenaError::AlreadyInArena {
                player: player.clone(),
                arena: current.name().to_string(),
            });
        }

        let name = match arena {
            Some(name) => {
                let arena = self.arena(name)?;
                if !arena.status().is_joinable() {
                    return Err(ArenaError::InvalidState {
                        arena: name.to_string(),
                        status: arena.status(),
                        operation: "join",
                    });
                }
                if arena.is_full() {
                    return Err(ArenaError::Full(name.to_string()));
                }
                name.to_string()
            }
            None => self
                .random_arena()
                .map(|a| a.name().to_string())
                .ok_or_else(|| ArenaError::NotFound("any open arena".to_string()))?,
        };

        let joined = self.with_arena(host, &name, |arena, ctx| arena.join_player(ctx, player))?;
        if !joined {
            return Err(ArenaError::JoinRejected(name));
        }
        Ok(name)
    }

    /// Takes a player out of whatever arena they are in. Returns the arena
    /// name.
    pub fn leave(&mut self, host: &mut dyn Host, player: &PlayerId) -> Result<String, ArenaError> {
        let name = self
            .arena_of(player)
            .map(|a| a.name().to_string())
            .ok_or_else(|| ArenaError::NotInArena(player.clone()))?;
        self.with_arena(host, &name, |arena, ctx| arena.remove_player(ctx, player, false))?;
        Ok(name)
    }

    /// Records a player's vote for an existing arena's map.
    pub fn vote(&mut self, player: &PlayerId, map: &str) -> Result<(), ArenaError> {
        if !self.arenas.contains_key(map) {
            return Err(ArenaError::NotFound(map.to_string()));
        }
        let name = self
            .arena_of(player)
            .map(|a| a.name().to_string())
            .ok_or_else(|| ArenaError::NotInArena(player.clone()))?;
        let arena = self.arena_mut(&name)?;
        if !arena.add_vote(player, map) {
            return Err(ArenaError::InvalidState {
                arena: name,
                status: arena.status(),
                operation: "vote",
            });
        }
        Ok(())
    }

    // -- Admin operations --

    /// Starts the countdown of a waiting arena with enough players.
    pub fn force_start(&mut self, host: &mut dyn Host, name: &str) -> Result<(), ArenaError> {
        let arena = self.arena(name)?;
        if arena.status() != ArenaStatus::Waiting {
            return Err(ArenaError::InvalidState {
                arena: name.to_string(),
                status: arena.status(),
                operation: "force-start",
            });
        }
        if arena.player_count() < arena.min_players() as usize {
            return Err(ArenaError::NotEnoughPlayers {
                arena: name.to_string(),
                have: arena.player_count(),
                need: arena.min_players(),
            });
        }
        self.with_arena(host, name, |arena, ctx| arena.start_countdown(ctx))
    }

    /// Ends a running round, or resets an arena still counting down.
    pub fn force_stop(&mut self, host: &mut dyn Host, name: &str) -> Result<(), ArenaError> {
        let status = self.arena(name)?.status();
        match status {
            ArenaStatus::Playing => self.with_arena(host, name, |arena, ctx| arena.end_game(ctx)),
            ArenaStatus::Countdown => self.with_arena(host, name, |arena, ctx| arena.reset_arena(ctx)),
            status => Err(ArenaError::InvalidState {
                arena: name.to_string(),
                status,
                operation: "force-stop",
            }),
        }
    }

    /// Resets an arena whatever its state.
    pub fn force_clear(&mut self, host: &mut dyn Host, name: &str) -> Result<(), ArenaError> {
        self.with_arena(host, name, |arena, ctx| arena.reset_arena(ctx))
    }

    // -- Configuration (persisted after each change) --

    /// Enters or leaves setup mode. The definition is saved only when the
    /// switch succeeded.
    pub fn set_setup_mode(&mut self, host: &mut dyn Host, name: &str, setup: bool) -> Result<(), ArenaError> {
        self.with_arena(host, name, |arena, ctx| arena.set_setup_mode(ctx, setup))??;
        self.save_arena(name)
    }

    /// Sets spawn `slot` (1-based, up to the arena's max players) to a
    /// location.
    pub fn set_spawn_position(&mut self, name: &str, slot: u32, at: &Location) -> Result<(), ArenaError> {
        let arena = self.arena_mut(name)?;
        if slot < 1 || slot > arena.max_players() {
            return Err(ArenaError::InvalidSlot {
                slot,
                max: arena.max_players(),
            });
        }
        arena.set_spawn_position(slot, at.pos, &at.world);
        self.save_arena(name)
    }

    pub fn set_lobby_position(&mut self, name: &str, at: &Location) -> Result<(), ArenaError> {
        self.arena_mut(name)?.set_lobby_position(&at.world, at.pos);
        self.save_arena(name)
    }

    pub fn set_block_type(&mut self, name: &str, block: &str) -> Result<(), ArenaError> {
        self.arena_mut(name)?.set_block_type(block);
        self.save_arena(name)
    }

    // -- Ticking --

    /// Advances the scheduler by one tick and runs every task that is due.
    pub fn tick(&mut self, host: &mut dyn Host) {
        self.scheduler.begin_tick();
        while let Some(task) = self.scheduler.pop_due() {
            self.dispatch(host, task);
        }
    }

    fn dispatch(&mut self, host: &mut dyn Host, due: DueTask<ArenaTask>) {
        let Self {
            arenas,
            scheduler,
            backups,
            ..
        } = self;
        let ArenaTask { arena: name, kind } = due.payload;
        let Some(arena) = arenas.get_mut(&name) else {
            debug!(arena = %name, task = %due.id, "task for unknown arena dropped");
            if due.repeating {
                scheduler.cancel(due.id);
            }
            return;
        };
        let mut ctx = ArenaCtx {
            host,
            scheduler,
            backups,
        };
        match kind {
            TaskKind::Countdown => arena.on_countdown_tick(&mut ctx, due.id),
            TaskKind::PreStart => arena.on_pre_start_tick(&mut ctx, due.id),
            TaskKind::Mechanics => arena.on_mechanics_tick(&mut ctx, due.id),
            TaskKind::ResetDelay => arena.on_reset_delay(&mut ctx, due.id),
            TaskKind::ResetRetry => arena.on_reset_retry(&mut ctx, due.id),
            TaskKind::Eliminate(player) => arena.on_eliminate(&mut ctx, &player),
        }
    }

    /// Stops every timer, sends every player home and saves every arena.
    ///
    /// Arenas that are idle (waiting with nobody in them, or in setup)
    /// are left as they are.
    pub fn shutdown(&mut self, host: &mut dyn Host) -> Result<(), ArenaError> {
        for name in self.arena_names() {
            self.with_arena(host, &name, |arena, ctx| {
                let idle = arena.player_count() == 0
                    && matches!(arena.status(), ArenaStatus::Waiting | ArenaStatus::Setup);
                if idle {
                    arena.cancel_all_tasks(ctx.scheduler);
                } else {
                    arena.reset_arena(ctx);
                }
            })?;
        }
        self.scheduler.clear();
        info!(arenas = self.arenas.len(), "arena manager shut down");
        self.save_all_arenas()
    }

    pub fn scheduler(&self) -> &TickScheduler<ArenaTask> {
        &self.scheduler
    }

    pub fn backups(&self) -> &WorldBackups {
        &self.backups
    }

    pub fn store(&self) -> &ArenaStore<C> {
        &self.store
    }

    pub fn timings(&self) -> ArenaTimings {
        self.timings
    }

    fn arena(&self, name: &str) -> Result<&Arena, ArenaError> {
        self.arenas
            .get(name)
            .ok_or_else(|| ArenaError::NotFound(name.to_string()))
    }

    fn arena_mut(&mut self, name: &str) -> Result<&mut Arena, ArenaError> {
        self.arenas
            .get_mut(name)
            .ok_or_else(|| ArenaError::NotFound(name.to_string()))
    }
}

fn preload_world(host: &mut dyn Host, arena: &str, world: &str, role: &str) {
    if host.is_world_loaded(world) {
        return;
    }
    match host.load_world(world) {
        Ok(()) => debug!(%arena, %world, role, "world pre-loaded"),
        Err(e) => warn!(%arena, %world, role, error = %e, "failed to pre-load world, arena may not work"),
    }
}

/// Spawn height for a new arena: the world spawn's Y, clamped, or 64.
fn safe_spawn_y(host: &mut dyn Host, world: &str) -> f64 {
    if !host.is_world_loaded(world) {
        if let Err(e) = host.load_world(world) {
            warn!(%world, error = %e, "could not load world for spawn height");
        }
    }
    host.world_spawn(world)
        .map(|spawn| clamp_safe_y(spawn.pos.y.floor()))
        .unwrap_or(FALLBACK_SPAWN_Y)
}
