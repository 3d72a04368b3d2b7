//! Core types shared by the arena logic and the host engine contract.
//!
//! These are plain data: identities, coordinates, game modes, block kinds.
//! None of them know about arenas or timers; they are the words the other
//! crates use to talk to each other.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// The host engine identifies players by their (unique) name, so the
/// newtype wraps a `String`. Wrapping it keeps signatures like
/// `fn remove_player(&mut self, player: &PlayerId)` honest: you can't pass
/// a world name where a player is expected.
///
/// `#[serde(transparent)]` serializes `PlayerId("Steve")` as just
/// `"Steve"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates a player identifier from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the player's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Lowest Y coordinate a player is ever teleported to.
pub const MIN_SAFE_Y: f64 = 1.0;

/// Highest Y coordinate a player is ever teleported to (build height).
pub const MAX_SAFE_Y: f64 = 319.0;

/// Clamps a Y coordinate into the safe build-height range.
pub fn clamp_safe_y(y: f64) -> f64 {
    y.clamp(MIN_SAFE_Y, MAX_SAFE_Y)
}

/// A point in a world. Entity positions are fractional; block positions
/// are derived with [`Vec3::floor`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The same point with its Y coordinate clamped to the safe range.
    pub fn with_safe_y(self) -> Self {
        Self {
            y: clamp_safe_y(self.y),
            ..self
        }
    }

    /// The block containing this point.
    pub fn floor(self) -> BlockPos {
        BlockPos {
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
            z: self.z.floor() as i32,
        }
    }

    /// The block directly beneath an entity standing at this point.
    pub fn block_below(self) -> BlockPos {
        Vec3 {
            y: self.y - 1.0,
            ..self
        }
        .floor()
    }

    /// Horizontal (XZ-plane) distance to another point.
    pub fn horizontal_distance(self, other: Vec3) -> f64 {
        ((self.x - other.x).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }

    /// Returns `true` if `other` lies in a different block column.
    pub fn changed_column(self, other: Vec3) -> bool {
        self.x.floor() != other.x.floor() || self.z.floor() != other.z.floor()
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Integer coordinates of a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A full entity location: world, position and view direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Folder name of the world.
    pub world: String,
    pub pos: Vec3,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    /// A location facing the default direction.
    pub fn new(world: impl Into<String>, pos: Vec3) -> Self {
        Self {
            world: world.into(),
            pos,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Same location with a view direction.
    pub fn facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// The host engine's game modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    /// Restricted mode used while inside an arena: no block breaking or
    /// placing.
    Adventure,
    Spectator,
}

/// Items handed to players waiting in an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LobbyItem {
    /// Leaves the arena when used.
    Leave,
    /// Opens the map vote menu when used.
    Vote,
}

impl LobbyItem {
    /// Hotbar slot the item is placed in.
    pub fn slot(self) -> u8 {
        match self {
            Self::Leave => 0,
            Self::Vote => 4,
        }
    }

    /// Custom name shown on the item.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Leave => "Leave Arena",
            Self::Vote => "Vote for Map",
        }
    }
}

/// Sounds the arena plays to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sound {
    /// Countdown begins, setup entered.
    AnvilUse,
    /// Error feedback.
    AnvilFall,
    /// Countdown and pre-start ticks.
    Click,
    /// "GO!"
    Explode,
    /// Winner announcement.
    LevelUp,
    /// A floor block was removed.
    BlockBreak,
    /// Another player was eliminated.
    BlazeShoot,
    /// Menu opened.
    Pop,
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// The closed set of block kinds the arena logic distinguishes.
///
/// Arena definitions name their floor block with a string (`"tnt"`,
/// `"sand"`, ...). [`BlockKind::from_name`] maps that string onto this enum
/// and falls back to [`BlockKind::Tnt`] for anything unrecognised, so an
/// arena always has a usable floor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Air,
    #[default]
    Tnt,
    Sand,
    Gravel,
    Dirt,
    Stone,
    Grass,
    OakPlanks,
    /// Any solid block outside the arena palette.
    Other,
}

impl BlockKind {
    /// Blocks an arena floor may be built from.
    pub const FLOOR_KINDS: [BlockKind; 7] = [
        Self::Tnt,
        Self::Sand,
        Self::Gravel,
        Self::Dirt,
        Self::Stone,
        Self::Grass,
        Self::OakPlanks,
    ];

    /// Parses a floor block name. Case-insensitive; `"wood"` is accepted as
    /// an alias for oak planks. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tnt" => Some(Self::Tnt),
            "sand" => Some(Self::Sand),
            "gravel" => Some(Self::Gravel),
            "dirt" => Some(Self::Dirt),
            "stone" => Some(Self::Stone),
            "grass" => Some(Self::Grass),
            "planks" | "wood" | "oak_planks" => Some(Self::OakPlanks),
            _ => None,
        }
    }

    /// Resolves a floor block name, defaulting to TNT.
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    /// Canonical name, as written to arena definitions.
    pub fn name(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Tnt => "tnt",
            Self::Sand => "sand",
            Self::Gravel => "gravel",
            Self::Dirt => "dirt",
            Self::Stone => "stone",
            Self::Grass => "grass",
            Self::OakPlanks => "planks",
            Self::Other => "other",
        }
    }

    pub fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::new("Steve")).unwrap();
        assert_eq!(json, "\"Steve\"");
    }

    #[test]
    fn test_player_id_display_is_name() {
        assert_eq!(PlayerId::from("Alex").to_string(), "Alex");
    }

    #[test]
    fn test_clamp_safe_y() {
        assert_eq!(clamp_safe_y(-20.0), MIN_SAFE_Y);
        assert_eq!(clamp_safe_y(64.0), 64.0);
        assert_eq!(clamp_safe_y(1000.0), MAX_SAFE_Y);
    }

    #[test]
    fn test_block_below_floors_fractional_position() {
        let pos = Vec3::new(1.7, 65.0, -0.3);
        assert_eq!(pos.block_below(), BlockPos::new(1, 64, -1));
    }

    #[test]
    fn test_changed_column_ignores_vertical_movement() {
        let from = Vec3::new(0.2, 64.0, 0.2);
        assert!(!from.changed_column(Vec3::new(0.8, 70.0, 0.9)));
        assert!(from.changed_column(Vec3::new(1.1, 64.0, 0.2)));
    }

    #[test]
    fn test_horizontal_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 100.0, 4.0);
        assert_eq!(a.horizontal_distance(b), 5.0);
    }

    #[test]
    fn test_block_kind_parse_known_names() {
        assert_eq!(BlockKind::parse("TNT"), Some(BlockKind::Tnt));
        assert_eq!(BlockKind::parse("sand"), Some(BlockKind::Sand));
        assert_eq!(BlockKind::parse("wood"), Some(BlockKind::OakPlanks));
        assert_eq!(BlockKind::parse("planks"), Some(BlockKind::OakPlanks));
        assert_eq!(BlockKind::parse("bedrock"), None);
    }

    #[test]
    fn test_block_kind_unknown_falls_back_to_tnt() {
        assert_eq!(BlockKind::from_name("diamond_block"), BlockKind::Tnt);
        assert_eq!(BlockKind::from_name(""), BlockKind::Tnt);
    }

    #[test]
    fn test_floor_kinds_round_trip_through_name() {
        for kind in BlockKind::FLOOR_KINDS {
            assert_eq!(BlockKind::parse(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_lobby_item_slots() {
        assert_eq!(LobbyItem::Leave.slot(), 0);
        assert_eq!(LobbyItem::Vote.slot(), 4);
    }

    #[test]
    fn test_game_mode_serializes_lowercase() {
        let json = serde_json::to_string(&GameMode::Adventure).unwrap();
        assert_eq!(json, "\"adventure\"");
    }
}
