//! The persisted shape of an arena's configuration.
//!
//! One [`ArenaDefinition`] is stored per arena. It holds configuration only:
//! rosters, votes, timers and counters are runtime state and never land
//! here.

use serde::{Deserialize, Serialize};

use crate::{BlockKind, TypesError, Vec3};

/// A numbered spawn slot.
///
/// Slots are stored as an ordered list of `{ "slot": 1, "x": .., "y": ..,
/// "z": .. }` records; `#[serde(flatten)]` inlines the coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub slot: u32,
    #[serde(flatten)]
    pub pos: Vec3,
}

/// Configuration record for one arena.
///
/// `world`, `min_players` and `max_players` are required; decoding a record
/// without them fails. Everything else falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaDefinition {
    /// Folder name of the world the match is played in.
    pub world: String,

    /// Players needed before the countdown starts.
    pub min_players: u32,

    /// Hard cap on the roster.
    pub max_players: u32,

    /// World holding the waiting lobby. Empty when no lobby is configured.
    #[serde(default)]
    pub lobby_world: String,

    #[serde(default)]
    pub lobby_position: Option<Vec3>,

    #[serde(default)]
    pub spawn_positions: Vec<SpawnPoint>,

    /// Name of the floor block, resolved via [`BlockKind::from_name`].
    #[serde(default = "default_block_type")]
    pub block_type: String,
}

fn default_block_type() -> String {
    BlockKind::Tnt.name().to_string()
}

impl ArenaDefinition {
    /// Lowest accepted `min_players`.
    pub const MIN_PLAYERS_FLOOR: u32 = 1;
    /// Lowest accepted `max_players`.
    pub const MAX_PLAYERS_FLOOR: u32 = 2;

    /// A definition with no lobby, no spawns and the default block.
    pub fn new(world: impl Into<String>, min_players: u32, max_players: u32) -> Self {
        Self {
            world: world.into(),
            min_players,
            max_players,
            lobby_world: String::new(),
            lobby_position: None,
            spawn_positions: Vec::new(),
            block_type: default_block_type(),
        }
    }

    /// Checks the player bounds and world name.
    ///
    /// # Errors
    /// Returns [`TypesError::InvalidDefinition`] describing the first
    /// problem found.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.world.trim().is_empty() {
            return Err(TypesError::InvalidDefinition("world is empty".into()));
        }
        if self.min_players < Self::MIN_PLAYERS_FLOOR {
            return Err(TypesError::InvalidDefinition(format!(
                "min_players must be at least {}",
                Self::MIN_PLAYERS_FLOOR
            )));
        }
        if self.max_players < Self::MAX_PLAYERS_FLOOR {
            return Err(TypesError::InvalidDefinition(format!(
                "max_players must be at least {}",
                Self::MAX_PLAYERS_FLOOR
            )));
        }
        if self.min_players > self.max_players {
            return Err(TypesError::InvalidDefinition(format!(
                "min_players ({}) exceeds max_players ({})",
                self.min_players, self.max_players
            )));
        }
        Ok(())
    }

    /// Clamps every spawn point's Y coordinate into the safe range.
    pub fn with_safe_spawns(mut self) -> Self {
        for spawn in &mut self.spawn_positions {
            spawn.pos = spawn.pos.with_safe_y();
        }
        self
    }

    /// Whether a lobby is configured.
    pub fn has_lobby(&self) -> bool {
        !self.lobby_world.is_empty() && self.lobby_position.is_some()
    }
}

/// Defaults for newly created arenas, read from `default_arena.<ext>`.
///
/// Every field may be left out. A template spawn replaces the generated
/// spawn of the same slot; slots above the new arena's `max_players` are
/// ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTemplate {
    pub lobby_world: String,
    pub lobby_position: Option<Vec3>,
    pub spawn_positions: Vec<SpawnPoint>,
    pub block_type: Option<String>,
}

impl ArenaTemplate {
    /// Copies the template's lobby, block type and spawns into a fresh
    /// definition. Spawn heights are clamped into the safe range.
    pub fn apply(&self, definition: &mut ArenaDefinition) {
        if !self.lobby_world.is_empty() {
            definition.lobby_world = self.lobby_world.clone();
            definition.lobby_position = self.lobby_position;
        }
        if let Some(block) = self.block_type.as_deref().filter(|b| !b.trim().is_empty()) {
            definition.block_type = block.trim().to_lowercase();
        }
        for spawn in &self.spawn_positions {
            if spawn.slot == 0 || spawn.slot > definition.max_players {
                continue;
            }
            let pos = spawn.pos.with_safe_y();
            match definition.spawn_positions.iter_mut().find(|s| s.slot == spawn.slot) {
                Some(existing) => existing.pos = pos,
                None => definition.spawn_positions.push(SpawnPoint { slot: spawn.slot, pos }),
            }
        }
        definition.spawn_positions.sort_by_key(|s| s.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_definition_is_valid() {
        assert!(ArenaDefinition::new("arena1", 2, 8).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_world() {
        let def = ArenaDefinition::new("  ", 2, 8);
        assert!(matches!(
            def.validate(),
            Err(TypesError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        assert!(ArenaDefinition::new("w", 0, 4).validate().is_err());
        assert!(ArenaDefinition::new("w", 1, 1).validate().is_err());
        assert!(ArenaDefinition::new("w", 5, 4).validate().is_err());
    }

    #[test]
    fn test_missing_required_field_fails_to_decode() {
        let json = r#"{ "world": "w", "min_players": 2 }"#;
        let result: Result<ArenaDefinition, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{ "world": "w", "min_players": 2, "max_players": 4 }"#;
        let def: ArenaDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.block_type, "tnt");
        assert!(def.lobby_world.is_empty());
        assert!(def.lobby_position.is_none());
        assert!(def.spawn_positions.is_empty());
        assert!(!def.has_lobby());
    }

    #[test]
    fn test_spawn_point_is_flat_json() {
        let spawn = SpawnPoint {
            slot: 3,
            pos: Vec3::new(1.0, 64.0, -2.0),
        };
        let json = serde_json::to_value(spawn).unwrap();
        assert_eq!(json["slot"], 3);
        assert_eq!(json["x"], 1.0);
        assert_eq!(json["y"], 64.0);
        assert_eq!(json["z"], -2.0);
    }

    #[test]
    fn test_with_safe_spawns_clamps_y() {
        let mut def = ArenaDefinition::new("w", 2, 4);
        def.spawn_positions.push(SpawnPoint {
            slot: 1,
            pos: Vec3::new(0.0, -40.0, 0.0),
        });
        def.spawn_positions.push(SpawnPoint {
            slot: 2,
            pos: Vec3::new(0.0, 900.0, 0.0),
        });
        let def = def.with_safe_spawns();
        assert_eq!(def.spawn_positions[0].pos.y, 1.0);
        assert_eq!(def.spawn_positions[1].pos.y, 319.0);
    }

    #[test]
    fn test_empty_template_changes_nothing() {
        let template: ArenaTemplate = serde_json::from_str("{}").unwrap();
        let mut def = ArenaDefinition::new("w", 2, 4);
        template.apply(&mut def);
        assert_eq!(def, ArenaDefinition::new("w", 2, 4));
    }

    #[test]
    fn test_template_fills_lobby_block_and_spawns() {
        let json = r#"{
            "lobby_world": "hub",
            "lobby_position": { "x": 1.0, "y": 70.0, "z": 1.0 },
            "block_type": " Sand ",
            "spawn_positions": [
                { "slot": 2, "x": 4.0, "y": 900.0, "z": 4.0 },
                { "slot": 7, "x": 0.0, "y": 64.0, "z": 0.0 }
            ]
        }"#;
        let template: ArenaTemplate = serde_json::from_str(json).unwrap();
        let mut def = ArenaDefinition::new("w", 2, 4);
        def.spawn_positions.push(SpawnPoint {
            slot: 1,
            pos: Vec3::new(0.0, 64.0, 5.0),
        });
        def.spawn_positions.push(SpawnPoint {
            slot: 2,
            pos: Vec3::new(5.0, 64.0, 0.0),
        });
        template.apply(&mut def);

        assert!(def.has_lobby());
        assert_eq!(def.lobby_world, "hub");
        assert_eq!(def.block_type, "sand");
        assert_eq!(def.spawn_positions.len(), 2, "slot 7 is above max_players");
        assert_eq!(def.spawn_positions[0].pos, Vec3::new(0.0, 64.0, 5.0));
        assert_eq!(def.spawn_positions[1].pos, Vec3::new(4.0, 319.0, 4.0));
    }
}
