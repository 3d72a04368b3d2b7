//! In-memory engine double.
//!
//! [`MemoryHost`] implements [`Host`] with plain maps. It records every
//! message, title and sound per player so tests can assert on what a
//! player saw, and it can be told to fail specific world operations.
//!
//! When built with [`MemoryHost::with_worlds_dir`], each world's blocks are
//! persisted to `<worlds_dir>/<world>/blocks.json` on save and read back on
//! load. That makes directory-level backup and restore observable: restore
//! a backup folder, reload the world, and the blocks come back.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tntrun_types::{
    BlockKind, BlockPos, GameMode, Location, LobbyItem, PlayerId, Sound, Vec3,
};

use crate::{Host, HostError};

/// File inside a world folder holding its block data.
const BLOCKS_FILE: &str = "blocks.json";

/// World operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldOp {
    Load,
    Unload,
    Save,
}

/// Everything the memory host tracks about one player.
#[derive(Debug, Clone)]
pub struct MemoryPlayer {
    pub online: bool,
    pub location: Location,
    pub game_mode: GameMode,
    /// Hotbar contents by slot.
    pub items: BTreeMap<u8, LobbyItem>,
    /// `true` while something other than a lobby item is in the inventory.
    pub has_gear: bool,
    pub experience: u32,
    pub immobile: bool,
    pub messages: Vec<String>,
    pub titles: Vec<String>,
    pub sounds: Vec<Sound>,
}

#[derive(Debug, Clone, Default)]
struct MemoryWorld {
    loaded: bool,
    spawn: Vec3,
    blocks: HashMap<BlockPos, BlockKind>,
}

/// An in-memory [`Host`].
#[derive(Debug, Clone)]
pub struct MemoryHost {
    players: HashMap<PlayerId, MemoryPlayer>,
    worlds: HashMap<String, MemoryWorld>,
    default_world: String,
    worlds_dir: Option<PathBuf>,
    failing: HashSet<(String, WorldOp)>,
    block_sounds: Vec<(String, BlockPos, Sound)>,
}

impl MemoryHost {
    /// A host whose default world is `default_world`, loaded, spawning at
    /// `(0, 64, 0)`.
    pub fn new(default_world: &str) -> Self {
        let mut host = Self {
            players: HashMap::new(),
            worlds: HashMap::new(),
            default_world: default_world.to_string(),
            worlds_dir: None,
            failing: HashSet::new(),
            block_sounds: Vec::new(),
        };
        host.add_world(default_world, Vec3::new(0.0, 64.0, 0.0));
        host
    }

    /// Persists world blocks under `dir` on save, and reads them on load.
    pub fn with_worlds_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.worlds_dir = Some(dir.into());
        self
    }

    /// Adds a loaded world.
    pub fn add_world(&mut self, name: &str, spawn: Vec3) {
        self.worlds.insert(
            name.to_string(),
            MemoryWorld {
                loaded: true,
                spawn,
                blocks: HashMap::new(),
            },
        );
    }

    /// Adds a world that exists but is not loaded.
    pub fn add_unloaded_world(&mut self, name: &str, spawn: Vec3) {
        self.add_world(name, spawn);
        if let Some(world) = self.worlds.get_mut(name) {
            world.loaded = false;
        }
    }

    /// Makes every future `op` on `world` fail until [`Self::clear_failure`].
    pub fn fail(&mut self, world: &str, op: WorldOp) {
        self.failing.insert((world.to_string(), op));
    }

    pub fn clear_failure(&mut self, world: &str, op: WorldOp) {
        self.failing.remove(&(world.to_string(), op));
    }

    /// Connects a player at a location in survival mode.
    pub fn connect(&mut self, player: &PlayerId, location: Location) {
        self.players.insert(
            player.clone(),
            MemoryPlayer {
                online: true,
                location,
                game_mode: GameMode::Survival,
                items: BTreeMap::new(),
                has_gear: true,
                experience: 30,
                immobile: false,
                messages: Vec::new(),
                titles: Vec::new(),
                sounds: Vec::new(),
            },
        );
    }

    /// Marks a player offline. Their record is kept for assertions.
    pub fn disconnect(&mut self, player: &PlayerId) {
        if let Some(p) = self.players.get_mut(player) {
            p.online = false;
        }
    }

    pub fn player(&self, player: &PlayerId) -> Option<&MemoryPlayer> {
        self.players.get(player)
    }

    /// Moves a player within their current world without any checks, the
    /// way client movement does.
    pub fn walk_to(&mut self, player: &PlayerId, pos: Vec3) {
        if let Some(p) = self.players.get_mut(player) {
            p.location.pos = pos;
        }
    }

    /// Places a player anywhere, bypassing the loaded-world check.
    pub fn place(&mut self, player: &PlayerId, location: Location) {
        if let Some(p) = self.players.get_mut(player) {
            p.location = location;
        }
    }

    /// Fills a square floor of `kind` centred on the origin.
    pub fn fill_floor(&mut self, world: &str, y: i32, radius: i32, kind: BlockKind) {
        if let Some(w) = self.worlds.get_mut(world) {
            for x in -radius..=radius {
                for z in -radius..=radius {
                    w.blocks.insert(BlockPos::new(x, y, z), kind);
                }
            }
        }
    }

    /// Number of non-air blocks in a world.
    pub fn solid_blocks(&self, world: &str) -> usize {
        self.worlds
            .get(world)
            .map(|w| w.blocks.values().filter(|b| !b.is_air()).count())
            .unwrap_or(0)
    }

    /// Sounds played at block positions, in order.
    pub fn block_sounds(&self) -> &[(String, BlockPos, Sound)] {
        &self.block_sounds
    }

    /// Every chat message a player received, in order.
    pub fn messages(&self, player: &PlayerId) -> &[String] {
        self.players
            .get(player)
            .map(|p| p.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Every title a player was shown, in order.
    pub fn titles(&self, player: &PlayerId) -> &[String] {
        self.players
            .get(player)
            .map(|p| p.titles.as_slice())
            .unwrap_or(&[])
    }

    fn is_failing(&self, world: &str, op: WorldOp) -> bool {
        self.failing.contains(&(world.to_string(), op))
    }

    fn world_dir(&self, world: &str) -> Option<PathBuf> {
        self.worlds_dir.as_ref().map(|dir| dir.join(world))
    }

    fn online_mut(&mut self, player: &PlayerId) -> Option<&mut MemoryPlayer> {
        self.players.get_mut(player).filter(|p| p.online)
    }
}

fn write_blocks(dir: &Path, blocks: &HashMap<BlockPos, BlockKind>) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    let entries: Vec<(BlockPos, BlockKind)> = blocks.iter().map(|(p, b)| (*p, *b)).collect();
    let bytes = serde_json::to_vec(&entries).map_err(|e| e.to_string())?;
    fs::write(dir.join(BLOCKS_FILE), bytes).map_err(|e| e.to_string())
}

fn read_blocks(dir: &Path) -> Result<HashMap<BlockPos, BlockKind>, String> {
    let path = dir.join(BLOCKS_FILE);
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let bytes = fs::read(&path).map_err(|e| e.to_string())?;
    let entries: Vec<(BlockPos, BlockKind)> =
        serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
    Ok(entries.into_iter().collect())
}

impl Host for MemoryHost {
    fn is_online(&self, player: &PlayerId) -> bool {
        self.players.get(player).is_some_and(|p| p.online)
    }

    fn location(&self, player: &PlayerId) -> Option<Location> {
        self.players
            .get(player)
            .filter(|p| p.online)
            .map(|p| p.location.clone())
    }

    fn game_mode(&self, player: &PlayerId) -> Option<GameMode> {
        self.players
            .get(player)
            .filter(|p| p.online)
            .map(|p| p.game_mode)
    }

    fn set_game_mode(&mut self, player: &PlayerId, mode: GameMode) {
        if let Some(p) = self.online_mut(player) {
            p.game_mode = mode;
        }
    }

    fn teleport(&mut self, player: &PlayerId, to: &Location) -> Result<(), HostError> {
        if !self.is_world_loaded(&to.world) {
            return Err(HostError::WorldNotLoaded(to.world.clone()));
        }
        let p = self
            .online_mut(player)
            .ok_or_else(|| HostError::PlayerOffline(player.clone()))?;
        p.location = to.clone();
        Ok(())
    }

    fn clear_inventory(&mut self, player: &PlayerId) {
        if let Some(p) = self.online_mut(player) {
            p.items.clear();
            p.has_gear = false;
        }
    }

    fn reset_experience(&mut self, player: &PlayerId) {
        if let Some(p) = self.online_mut(player) {
            p.experience = 0;
        }
    }

    fn give_item(&mut self, player: &PlayerId, item: LobbyItem) {
        if let Some(p) = self.online_mut(player) {
            p.items.insert(item.slot(), item);
        }
    }

    fn set_immobile(&mut self, player: &PlayerId, immobile: bool) {
        if let Some(p) = self.online_mut(player) {
            p.immobile = immobile;
        }
    }

    fn send_message(&mut self, player: &PlayerId, message: &str) {
        if let Some(p) = self.online_mut(player) {
            p.messages.push(message.to_string());
        }
    }

    fn send_title(&mut self, player: &PlayerId, title: &str, _subtitle: &str) {
        if let Some(p) = self.online_mut(player) {
            p.titles.push(title.to_string());
        }
    }

    fn play_sound(&mut self, player: &PlayerId, sound: Sound) {
        if let Some(p) = self.online_mut(player) {
            p.sounds.push(sound);
        }
    }

    fn play_sound_at(&mut self, world: &str, pos: BlockPos, sound: Sound) {
        self.block_sounds.push((world.to_string(), pos, sound));
    }

    fn is_world_loaded(&self, world: &str) -> bool {
        self.worlds.get(world).is_some_and(|w| w.loaded)
    }

    fn load_world(&mut self, world: &str) -> Result<(), HostError> {
        if self.is_failing(world, WorldOp::Load) {
            return Err(HostError::LoadFailed {
                world: world.to_string(),
                reason: "injected failure".into(),
            });
        }
        let Some(state) = self.worlds.get(world) else {
            return Err(HostError::WorldNotFound(world.to_string()));
        };
        if state.loaded {
            return Ok(());
        }
        let dir = self.world_dir(world);
        if let Some(dir) = &dir {
            if !dir.exists() {
                return Err(HostError::WorldNotFound(world.to_string()));
            }
        }
        let blocks = match &dir {
            Some(dir) => Some(read_blocks(dir).map_err(|reason| HostError::LoadFailed {
                world: world.to_string(),
                reason,
            })?),
            None => None,
        };
        if let Some(state) = self.worlds.get_mut(world) {
            if let Some(blocks) = blocks {
                state.blocks = blocks;
            }
            state.loaded = true;
        }
        tracing::debug!(%world, "memory host loaded world");
        Ok(())
    }

    fn unload_world(&mut self, world: &str) -> Result<(), HostError> {
        if !self.is_world_loaded(world) {
            return Err(HostError::WorldNotLoaded(world.to_string()));
        }
        if self.is_failing(world, WorldOp::Unload) {
            return Err(HostError::UnloadFailed {
                world: world.to_string(),
                reason: "injected failure".into(),
            });
        }
        if !self.players_in_world(world).is_empty() {
            return Err(HostError::UnloadFailed {
                world: world.to_string(),
                reason: "world has players".into(),
            });
        }
        if world == self.default_world {
            return Err(HostError::UnloadFailed {
                world: world.to_string(),
                reason: "cannot unload the default world".into(),
            });
        }
        if let Some(state) = self.worlds.get_mut(world) {
            state.loaded = false;
        }
        Ok(())
    }

    fn save_world(&mut self, world: &str) -> Result<(), HostError> {
        if !self.is_world_loaded(world) {
            return Err(HostError::WorldNotLoaded(world.to_string()));
        }
        if self.is_failing(world, WorldOp::Save) {
            return Err(HostError::SaveFailed {
                world: world.to_string(),
                reason: "injected failure".into(),
            });
        }
        if let (Some(dir), Some(state)) = (self.world_dir(world), self.worlds.get(world)) {
            write_blocks(&dir, &state.blocks).map_err(|reason| HostError::SaveFailed {
                world: world.to_string(),
                reason,
            })?;
        }
        Ok(())
    }

    fn world_spawn(&self, world: &str) -> Option<Location> {
        self.worlds
            .get(world)
            .filter(|w| w.loaded)
            .map(|w| Location::new(world, w.spawn))
    }

    fn default_spawn(&self) -> Location {
        let spawn = self
            .worlds
            .get(&self.default_world)
            .map(|w| w.spawn)
            .unwrap_or_default();
        Location::new(self.default_world.clone(), spawn)
    }

    fn players_in_world(&self, world: &str) -> Vec<PlayerId> {
        let mut found: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(_, p)| p.online && p.location.world == world)
            .map(|(id, _)| id.clone())
            .collect();
        found.sort();
        found
    }

    fn block_at(&self, world: &str, pos: BlockPos) -> BlockKind {
        self.worlds
            .get(world)
            .filter(|w| w.loaded)
            .and_then(|w| w.blocks.get(&pos).copied())
            .unwrap_or(BlockKind::Air)
    }

    fn set_block(&mut self, world: &str, pos: BlockPos, block: BlockKind) {
        if let Some(w) = self.worlds.get_mut(world).filter(|w| w.loaded) {
            if block.is_air() {
                w.blocks.remove(&pos);
            } else {
                w.blocks.insert(pos, block);
            }
        }
    }
}
