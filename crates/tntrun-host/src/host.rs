//! The `Host` trait: everything TnT Run needs from the game engine.
//!
//! The engine owns players and worlds. Arena logic never stores engine
//! objects; it keeps [`PlayerId`]s and world names and asks the host each
//! time it needs to act.
//!
//! Fire-and-forget operations (chat, sounds, inventory) return nothing: if a
//! player went offline in between, the engine simply drops the request.
//! Operations whose failure changes what the caller does next (teleports,
//! world load/unload/save) return `Result`.

use tntrun_types::{BlockKind, BlockPos, GameMode, Location, LobbyItem, PlayerId, Sound};

use crate::HostError;

/// The engine API consumed by arenas, the world backup protocol and the
/// command façade.
///
/// All calls happen on the engine's main thread, between ticks, so the
/// trait takes `&mut self` and needs no internal locking.
pub trait Host {
    // -- Players --

    /// Returns `true` if the player is connected.
    fn is_online(&self, player: &PlayerId) -> bool;

    /// Current location, or `None` if the player is offline.
    fn location(&self, player: &PlayerId) -> Option<Location>;

    /// Current game mode, or `None` if the player is offline.
    fn game_mode(&self, player: &PlayerId) -> Option<GameMode>;

    fn set_game_mode(&mut self, player: &PlayerId, mode: GameMode);

    /// Moves a player to a location.
    ///
    /// # Errors
    /// Fails if the player is offline or the target world is not loaded.
    fn teleport(&mut self, player: &PlayerId, to: &Location) -> Result<(), HostError>;

    /// Empties the main inventory and the armor slots.
    fn clear_inventory(&mut self, player: &PlayerId);

    /// Sets experience level and progress to zero.
    fn reset_experience(&mut self, player: &PlayerId);

    /// Places a lobby item in its hotbar slot.
    fn give_item(&mut self, player: &PlayerId, item: LobbyItem);

    /// Freezes (or unfreezes) a player in place.
    fn set_immobile(&mut self, player: &PlayerId, immobile: bool);

    fn send_message(&mut self, player: &PlayerId, message: &str);

    fn send_title(&mut self, player: &PlayerId, title: &str, subtitle: &str);

    /// Plays a sound at the player's position.
    fn play_sound(&mut self, player: &PlayerId, sound: Sound);

    /// Plays a sound at a block position.
    fn play_sound_at(&mut self, world: &str, pos: BlockPos, sound: Sound);

    // -- Worlds --

    fn is_world_loaded(&self, world: &str) -> bool;

    /// Loads a world. Loading an already-loaded world succeeds.
    ///
    /// # Errors
    /// [`HostError::WorldNotFound`] if the world folder is missing,
    /// [`HostError::LoadFailed`] if the engine cannot read it.
    fn load_world(&mut self, world: &str) -> Result<(), HostError>;

    /// Unloads a world without saving it.
    ///
    /// # Errors
    /// [`HostError::WorldNotLoaded`] or [`HostError::UnloadFailed`].
    fn unload_world(&mut self, world: &str) -> Result<(), HostError>;

    /// Flushes a loaded world to disk.
    ///
    /// # Errors
    /// [`HostError::WorldNotLoaded`] or [`HostError::SaveFailed`].
    fn save_world(&mut self, world: &str) -> Result<(), HostError>;

    /// Spawn location of a loaded world.
    fn world_spawn(&self, world: &str) -> Option<Location>;

    /// Spawn location of the server's default world. Always available.
    fn default_spawn(&self) -> Location;

    /// Online players currently in a world.
    fn players_in_world(&self, world: &str) -> Vec<PlayerId>;

    /// Block at a position. Unloaded worlds and unset positions read as air.
    fn block_at(&self, world: &str, pos: BlockPos) -> BlockKind;

    fn set_block(&mut self, world: &str, pos: BlockPos, block: BlockKind);
}
