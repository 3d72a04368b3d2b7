//! Full arena lifecycle against the in-memory host.
//!
//! Every test gets its own temp directory holding the arena definitions,
//! the live worlds and the world backups.

use tempfile::TempDir;
use tntrun_arena::{ArenaError, ArenaManager, ArenaStatus, ArenaStore, ArenaTimings};
use tntrun_host::{Host, MemoryHost, WorldOp};
use tntrun_types::{ArenaDefinition, BlockKind, GameMode, LobbyItem, Location, PlayerId, Vec3};
use tntrun_world::WorldBackups;

const ARENA: &str = "alpha";
const WORLD: &str = "arena";
const FLOOR_RADIUS: i32 = 6;
const FLOOR: usize = 13 * 13;

// Tick landmarks with default timings, counted from the second join.
const COUNTDOWN_TICKS: u32 = 200;
const PRE_START_TICKS: u32 = 80;
const END_DELAY_TICKS: u32 = 100;
const RETRY_TICKS: u32 = 100;

// =========================================================================
// Helpers
// =========================================================================

struct Fixture {
    dir: TempDir,
    host: MemoryHost,
    manager: ArenaManager,
}

impl Fixture {
    fn ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.manager.tick(&mut self.host);
        }
    }

    fn status(&self) -> ArenaStatus {
        self.manager.get_arena(ARENA).unwrap().status()
    }

    fn join(&mut self, player: &PlayerId) -> Result<String, ArenaError> {
        self.manager.join(&mut self.host, player, Some(ARENA))
    }

    fn connect(&mut self, player: &PlayerId) {
        self.host.connect(player, home_of(player));
    }

    /// Two players in, countdown and pre-start done.
    fn start_round(&mut self) -> (PlayerId, PlayerId) {
        let (steve, alex) = (steve(), alex());
        self.connect(&steve);
        self.connect(&alex);
        self.join(&steve).unwrap();
        self.join(&alex).unwrap();
        self.ticks(COUNTDOWN_TICKS + PRE_START_TICKS);
        assert_eq!(self.status(), ArenaStatus::Playing);
        (steve, alex)
    }
}

fn manager_in(dir: &TempDir) -> ArenaManager {
    ArenaManager::new(
        ArenaStore::json(dir.path().join("arenas")),
        WorldBackups::new(dir.path().join("worlds"), dir.path().join("backups")),
        ArenaTimings::default(),
    )
}

/// An arena with min/max players, created and set up (backup taken).
fn fixture(min: u32, max: u32) -> Fixture {
    let mut f = bare_fixture();
    f.manager
        .create_arena(&mut f.host, ARENA, WORLD, min, max)
        .unwrap();
    f.manager.set_setup_mode(&mut f.host, ARENA, true).unwrap();
    f.manager.set_setup_mode(&mut f.host, ARENA, false).unwrap();
    assert!(f.manager.backups().has_backup(WORLD));
    f
}

fn bare_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut host = MemoryHost::new("lobby").with_worlds_dir(dir.path().join("worlds"));
    host.add_world(WORLD, Vec3::new(0.0, 64.0, 0.0));
    host.fill_floor(WORLD, 63, FLOOR_RADIUS, BlockKind::Tnt);
    let manager = manager_in(&dir);
    Fixture { dir, host, manager }
}

fn steve() -> PlayerId {
    PlayerId::from("Steve")
}

fn alex() -> PlayerId {
    PlayerId::from("Alex")
}

fn home_of(player: &PlayerId) -> Location {
    let offset = player.as_str().len() as f64;
    Location::new("lobby", Vec3::new(offset, 64.0, -offset)).facing(90.0, 10.0)
}

// =========================================================================
// Creation and persistence
// =========================================================================

#[test]
fn test_create_arena_lays_out_spawn_ring() {
    let mut f = bare_fixture();
    assert!(!f.manager.load_template(f.dir.path()), "no template file");
    f.manager.create_arena(&mut f.host, ARENA, WORLD, 2, 4).unwrap();

    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.status(), ArenaStatus::Waiting);
    assert_eq!(arena.block_type(), "tnt");
    let spawns = arena.spawn_positions();
    assert_eq!(spawns.len(), 4);
    assert_eq!(spawns[&1], Vec3::new(0.0, 64.0, 5.0));
    assert_eq!(spawns[&2], Vec3::new(5.0, 64.0, 0.0));
    assert_eq!(spawns[&3], Vec3::new(0.0, 64.0, -5.0));
    assert!(f.manager.store().path_for(ARENA).exists());
}

#[test]
fn test_create_arena_rejects_bad_input() {
    let mut f = bare_fixture();
    assert!(matches!(
        f.manager.create_arena(&mut f.host, "bad-name", WORLD, 2, 4),
        Err(ArenaError::InvalidName(_))
    ));
    assert!(matches!(
        f.manager.create_arena(&mut f.host, ARENA, WORLD, 5, 4),
        Err(ArenaError::Definition(_))
    ));
    f.manager.create_arena(&mut f.host, ARENA, WORLD, 2, 4).unwrap();
    assert!(matches!(
        f.manager.create_arena(&mut f.host, ARENA, WORLD, 2, 4),
        Err(ArenaError::AlreadyExists(_))
    ));
}

#[test]
fn test_create_arena_in_unknown_world_uses_fallback_height() {
    let mut f = bare_fixture();
    f.host.add_world("high", Vec3::new(0.0, 500.0, 0.0));
    f.manager.create_arena(&mut f.host, "tall", "high", 2, 2).unwrap();
    f.manager.create_arena(&mut f.host, "void", "missing", 2, 2).unwrap();

    let tall = f.manager.get_arena("tall").unwrap();
    assert!(tall.spawn_positions().values().all(|p| p.y == 319.0));
    let void = f.manager.get_arena("void").unwrap();
    assert!(void.spawn_positions().values().all(|p| p.y == 64.0));
}

#[test]
fn test_create_arena_applies_template() {
    let mut f = bare_fixture();
    let template = serde_json::json!({
        "lobby_world": "lobby",
        "lobby_position": { "x": 2.0, "y": 70.0, "z": 2.0 },
        "block_type": "gravel",
        "spawn_positions": [
            { "slot": 1, "x": 1.0, "y": 900.0, "z": 1.0 },
            { "slot": 3, "x": -3.0, "y": 66.0, "z": 3.0 }
        ]
    });
    std::fs::write(
        f.dir.path().join("default_arena.json"),
        serde_json::to_vec(&template).unwrap(),
    )
    .unwrap();
    assert!(f.manager.load_template(f.dir.path()));

    f.manager.create_arena(&mut f.host, ARENA, WORLD, 2, 4).unwrap();
    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.lobby_world(), "lobby");
    assert_eq!(arena.lobby_position(), Some(Vec3::new(2.0, 70.0, 2.0)));
    assert_eq!(arena.block_kind(), BlockKind::Gravel);

    let spawns = arena.spawn_positions();
    assert_eq!(spawns.len(), 4);
    assert_eq!(spawns[&1], Vec3::new(1.0, 319.0, 1.0));
    assert_eq!(spawns[&2], Vec3::new(5.0, 64.0, 0.0), "ring fills the gaps");
    assert_eq!(spawns[&3], Vec3::new(-3.0, 66.0, 3.0));

    // The stored definition carries the template values.
    let stored = f.manager.store().load_all().unwrap();
    let (_, def) = &stored[0];
    assert_eq!(def.as_ref().unwrap().block_type, "gravel");
}

#[test]
fn test_unreadable_template_falls_back_to_defaults() {
    let mut f = bare_fixture();
    std::fs::write(f.dir.path().join("default_arena.json"), b"[1, 2").unwrap();
    assert!(!f.manager.load_template(f.dir.path()));
    assert!(f.manager.template().is_none());

    f.manager.create_arena(&mut f.host, ARENA, WORLD, 2, 4).unwrap();
    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.block_type(), "tnt");
    assert_eq!(arena.spawn_positions()[&1], Vec3::new(0.0, 64.0, 5.0));
    assert!(arena.lobby_position().is_none());
}

#[test]
fn test_save_and_reload_keeps_configuration() {
    let mut f = bare_fixture();
    f.manager.create_arena(&mut f.host, ARENA, WORLD, 2, 4).unwrap();
    f.manager
        .set_spawn_position(ARENA, 2, &Location::new(WORLD, Vec3::new(3.5, 70.0, -2.5)))
        .unwrap();
    f.manager
        .set_lobby_position(ARENA, &Location::new("lobby", Vec3::new(0.5, 80.0, 0.5)))
        .unwrap();
    f.manager.set_block_type(ARENA, "Sand").unwrap();
    let before = f.manager.get_arena(ARENA).unwrap().definition();

    let mut reloaded = manager_in(&f.dir);
    assert_eq!(reloaded.load_arenas(&mut f.host), 1);

    let after = reloaded.get_arena(ARENA).unwrap().definition();
    assert_eq!(after, before);
    assert_eq!(after.lobby_world, "lobby");
    assert_eq!(after.block_type, "sand");
}

#[test]
fn test_load_skips_invalid_definitions() {
    let f = bare_fixture();
    let store = ArenaStore::json(f.dir.path().join("arenas"));
    store.save("good", &ArenaDefinition::new(WORLD, 2, 4)).unwrap();
    store.save("upside", &ArenaDefinition::new(WORLD, 5, 2)).unwrap();
    store.save("noworld", &ArenaDefinition::new("", 1, 2)).unwrap();
    std::fs::write(f.dir.path().join("arenas/broken.json"), b"{\"world\": 3").unwrap();
    std::fs::write(f.dir.path().join("arenas/partial.json"), b"{\"world\": \"w\"}").unwrap();

    let mut host = f.host.clone();
    let mut manager = manager_in(&f.dir);
    assert_eq!(manager.load_arenas(&mut host), 1);
    assert_eq!(manager.arena_names(), vec!["good".to_string()]);
}

#[test]
fn test_load_preloads_worlds_and_clamps_spawns() {
    let mut f = bare_fixture();
    f.host.add_unloaded_world("lobby2", Vec3::new(0.0, 64.0, 0.0));
    f.host.save_world(WORLD).unwrap();
    f.host.unload_world(WORLD).unwrap();

    let mut def = ArenaDefinition::new(WORLD, 2, 4);
    def.spawn_positions = vec![tntrun_types::SpawnPoint {
        slot: 1,
        pos: Vec3::new(0.0, -40.0, 0.0),
    }];
    def.lobby_world = "lobby2".into();
    def.lobby_position = Some(Vec3::new(0.0, 64.0, 0.0));
    ArenaStore::json(f.dir.path().join("arenas"))
        .save(ARENA, &def)
        .unwrap();

    // lobby2 has no folder on disk, so it fails to load: only a warning.
    let mut manager = manager_in(&f.dir);
    assert_eq!(manager.load_arenas(&mut f.host), 1);
    assert!(f.host.is_world_loaded(WORLD));
    assert!(!f.host.is_world_loaded("lobby2"));
    assert_eq!(manager.get_arena(ARENA).unwrap().spawn_positions()[&1].y, 1.0);
}

// =========================================================================
// Joining
// =========================================================================

#[test]
fn test_join_prepares_player() {
    let mut f = fixture(2, 4);
    let steve = steve();
    f.connect(&steve);

    assert_eq!(f.join(&steve).unwrap(), ARENA);

    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.status(), ArenaStatus::Waiting);
    assert!(arena.has_player(&steve));
    assert_eq!(arena.saved_player(&steve).unwrap().location, home_of(&steve));

    let p = f.host.player(&steve).unwrap();
    assert_eq!(p.game_mode, GameMode::Adventure);
    assert_eq!(p.location.world, WORLD);
    assert!(!p.has_gear);
    assert_eq!(p.experience, 0);
    assert_eq!(p.items.get(&0), Some(&LobbyItem::Leave));
    assert_eq!(p.items.get(&4), Some(&LobbyItem::Vote));
    assert_eq!(
        f.host.messages(&steve).last().unwrap(),
        "Steve joined the arena! (1/4)"
    );
}

#[test]
fn test_join_goes_to_lobby_when_configured() {
    let mut f = fixture(2, 4);
    let lobby = Location::new("lobby", Vec3::new(100.5, 70.0, 100.5));
    f.manager.set_lobby_position(ARENA, &lobby).unwrap();
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();
    assert_eq!(f.host.location(&steve).unwrap().pos, lobby.pos);
}

#[test]
fn test_join_twice_is_rejected() {
    let mut f = fixture(3, 4);
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();
    assert!(matches!(f.join(&steve), Err(ArenaError::AlreadyInArena { .. })));

    let again = f
        .manager
        .with_arena(&mut f.host, ARENA, |arena, ctx| arena.join_player(ctx, &steve))
        .unwrap();
    assert!(!again);
    assert_eq!(f.manager.get_arena(ARENA).unwrap().player_count(), 1);
}

#[test]
fn test_player_is_in_one_arena_at_a_time() {
    let mut f = fixture(2, 4);
    f.manager.create_arena(&mut f.host, "beta", WORLD, 2, 4).unwrap();
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();

    let err = f.manager.join(&mut f.host, &steve, Some("beta")).unwrap_err();
    assert!(matches!(err, ArenaError::AlreadyInArena { arena, .. } if arena == ARENA));
}

#[test]
fn test_join_rejected_unless_waiting() {
    let mut f = fixture(2, 2);
    f.start_round();
    let bob = PlayerId::from("Bob");
    f.connect(&bob);
    assert!(matches!(f.join(&bob), Err(ArenaError::InvalidState { .. })));
    assert_eq!(f.manager.get_arena(ARENA).unwrap().player_count(), 2);
}

#[test]
fn test_roster_never_exceeds_max() {
    let mut f = fixture(4, 4);
    let names = ["a1", "b2", "c3", "d4", "e5"];
    for name in names {
        f.connect(&PlayerId::from(name));
    }
    let joined = names
        .iter()
        .filter(|n| {
            f.manager
                .with_arena(&mut f.host, ARENA, |arena, ctx| {
                    arena.join_player(ctx, &PlayerId::from(**n))
                })
                .unwrap()
        })
        .count();
    assert_eq!(joined, 4);
    assert_eq!(f.manager.get_arena(ARENA).unwrap().player_count(), 4);
}

#[test]
fn test_random_join_picks_open_arena() {
    let mut f = fixture(2, 2);
    f.manager.create_arena(&mut f.host, "beta", WORLD, 2, 4).unwrap();
    f.start_round();

    let bob = PlayerId::from("Bob");
    f.connect(&bob);
    assert_eq!(f.manager.join(&mut f.host, &bob, None).unwrap(), "beta");
}

#[test]
fn test_random_arena_none_when_all_busy() {
    let mut f = fixture(2, 2);
    f.start_round();
    assert!(f.manager.random_arena().is_none());
    let bob = PlayerId::from("Bob");
    f.connect(&bob);
    assert!(matches!(
        f.manager.join(&mut f.host, &bob, None),
        Err(ArenaError::NotFound(_))
    ));
}

#[test]
fn test_leave_restores_player() {
    let mut f = fixture(3, 4);
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();

    assert_eq!(f.manager.leave(&mut f.host, &steve).unwrap(), ARENA);

    let p = f.host.player(&steve).unwrap();
    assert_eq!(p.location, home_of(&steve));
    assert_eq!(p.game_mode, GameMode::Survival);
    assert!(p.items.is_empty());
    assert!(f.manager.arena_of(&steve).is_none());
    assert!(matches!(
        f.manager.leave(&mut f.host, &steve),
        Err(ArenaError::NotInArena(_))
    ));
}

// =========================================================================
// Votes
// =========================================================================

#[test]
fn test_second_vote_is_the_one_that_counts() {
    let mut f = fixture(3, 4);
    f.manager.create_arena(&mut f.host, "beta", WORLD, 2, 4).unwrap();
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();

    f.manager.vote(&steve, ARENA).unwrap();
    f.manager.vote(&steve, "beta").unwrap();

    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.vote_count(), 1);
    assert_eq!(arena.most_voted_map().as_deref(), Some("beta"));
}

#[test]
fn test_vote_for_unknown_map() {
    let mut f = fixture(3, 4);
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();
    assert!(matches!(
        f.manager.vote(&steve, "nowhere"),
        Err(ArenaError::NotFound(_))
    ));
}

#[test]
fn test_leaving_drops_vote() {
    let mut f = fixture(3, 4);
    let (steve, alex) = (steve(), alex());
    f.connect(&steve);
    f.connect(&alex);
    f.join(&steve).unwrap();
    f.join(&alex).unwrap();
    f.manager.vote(&steve, ARENA).unwrap();
    f.manager.leave(&mut f.host, &steve).unwrap();
    assert_eq!(f.manager.get_arena(ARENA).unwrap().most_voted_map(), None);
}

// =========================================================================
// Countdown and start
// =========================================================================

#[test]
fn test_two_players_reach_playing() {
    let mut f = fixture(2, 4);
    let (steve, alex) = (steve(), alex());
    f.connect(&steve);
    f.connect(&alex);

    f.join(&steve).unwrap();
    assert_eq!(f.status(), ArenaStatus::Waiting);
    f.join(&alex).unwrap();
    assert_eq!(f.status(), ArenaStatus::Countdown);
    assert_eq!(f.manager.get_arena(ARENA).unwrap().countdown_time(), 10);

    f.ticks(COUNTDOWN_TICKS - 1);
    assert_eq!(f.manager.get_arena(ARENA).unwrap().countdown_time(), 1);
    assert_eq!(f.manager.get_arena(ARENA).unwrap().pre_start_time(), 0);

    f.ticks(1);
    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.status(), ArenaStatus::Countdown, "pre-start reports countdown");
    assert_eq!(arena.countdown_time(), 0);
    assert_eq!(arena.pre_start_time(), 4);
    assert!(f.host.player(&steve).unwrap().immobile);
    assert_eq!(f.host.location(&steve).unwrap().world, WORLD);

    f.ticks(PRE_START_TICKS - 1);
    assert_eq!(f.status(), ArenaStatus::Countdown);
    f.ticks(1);
    assert_eq!(f.status(), ArenaStatus::Playing);
    assert!(!f.host.player(&alex).unwrap().immobile);

    let titles = f.host.titles(&steve);
    let tail: Vec<&str> = titles[titles.len() - 4..].iter().map(String::as_str).collect();
    assert_eq!(tail, vec!["3", "2", "1", "GO!"]);
}

#[test]
fn test_countdown_announcements() {
    let mut f = fixture(2, 4);
    let (steve, alex) = (steve(), alex());
    f.connect(&steve);
    f.connect(&alex);
    f.join(&steve).unwrap();
    f.join(&alex).unwrap();
    f.ticks(COUNTDOWN_TICKS);

    let announced: Vec<&String> = f
        .host
        .messages(&steve)
        .iter()
        .filter(|m| m.starts_with("Game starting in"))
        .collect();
    let expected: Vec<String> = [10, 5, 4, 3, 2, 1]
        .iter()
        .map(|n| format!("Game starting in {n} seconds!"))
        .collect();
    assert_eq!(announced, expected.iter().collect::<Vec<_>>());
}

#[test]
fn test_countdown_cancelled_when_player_leaves() {
    let mut f = fixture(2, 4);
    let (steve, alex) = (steve(), alex());
    f.connect(&steve);
    f.connect(&alex);
    f.join(&steve).unwrap();
    f.join(&alex).unwrap();
    f.ticks(60);

    f.manager.leave(&mut f.host, &alex).unwrap();
    assert_eq!(f.status(), ArenaStatus::Countdown);
    f.ticks(20);

    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.status(), ArenaStatus::Waiting);
    assert_eq!(arena.countdown_time(), 0);
    assert_eq!(arena.timers().live(f.manager.scheduler()), 0);
    assert_eq!(f.manager.scheduler().pending(), 0);

    // Nothing else happens later.
    f.ticks(400);
    assert_eq!(f.status(), ArenaStatus::Waiting);
}

#[test]
fn test_one_live_timer_per_kind_through_a_round() {
    let mut f = fixture(2, 4);
    let (steve, alex) = (steve(), alex());
    f.connect(&steve);
    f.connect(&alex);
    f.join(&steve).unwrap();
    f.join(&alex).unwrap();

    // Force-start on an arena already counting down is refused and does
    // not add a second countdown.
    assert!(f.manager.force_start(&mut f.host, ARENA).is_err());

    for _ in 0..(COUNTDOWN_TICKS + PRE_START_TICKS + 100) {
        f.ticks(1);
        assert_eq!(f.manager.scheduler().pending(), 1);
        let arena = f.manager.get_arena(ARENA).unwrap();
        assert_eq!(arena.timers().live(f.manager.scheduler()), 1);
    }
}

#[test]
fn test_pre_start_aborts_to_reset_when_player_leaves() {
    let mut f = fixture(2, 4);
    let (steve, alex) = (steve(), alex());
    f.connect(&steve);
    f.connect(&alex);
    f.join(&steve).unwrap();
    f.join(&alex).unwrap();
    f.ticks(COUNTDOWN_TICKS + 20);

    f.manager.leave(&mut f.host, &alex).unwrap();
    f.ticks(20);

    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.status(), ArenaStatus::Waiting);
    assert_eq!(arena.player_count(), 0);
    assert_eq!(arena.pre_start_time(), 0);
    let p = f.host.player(&steve).unwrap();
    assert!(!p.immobile);
    assert_eq!(p.location, home_of(&steve));
}

#[test]
fn test_force_start_needs_enough_players() {
    let mut f = fixture(2, 4);
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();
    assert!(matches!(
        f.manager.force_start(&mut f.host, ARENA),
        Err(ArenaError::NotEnoughPlayers { have: 1, need: 2, .. })
    ));
}

// =========================================================================
// Playing, ending, resetting
// =========================================================================

#[test]
fn test_mechanics_remove_blocks_under_players() {
    let mut f = fixture(2, 4);
    f.start_round();
    assert_eq!(f.host.solid_blocks(WORLD), FLOOR);
    f.ticks(20);
    assert_eq!(f.host.solid_blocks(WORLD), FLOOR - 2);
    // Standing still on air: nothing more to remove.
    f.ticks(20);
    assert_eq!(f.host.solid_blocks(WORLD), FLOOR - 2);
}

#[test]
fn test_single_player_round_when_min_is_one() {
    let mut f = fixture(1, 4);
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();
    assert_eq!(f.status(), ArenaStatus::Countdown);

    f.ticks(COUNTDOWN_TICKS + PRE_START_TICKS);
    assert_eq!(f.status(), ArenaStatus::Playing);

    // Nobody left to win once the only runner falls.
    let eliminated = f
        .manager
        .with_arena(&mut f.host, ARENA, |arena, ctx| {
            arena.eliminate_player(ctx, &steve, "You fell into the void and were eliminated!")
        })
        .unwrap();
    assert!(eliminated);
    assert_eq!(f.status(), ArenaStatus::Ending);
    assert!(!f.host.messages(&steve).iter().any(|m| m.ends_with("has won the game!")));
}

#[test]
fn test_elimination_to_winner_to_reset() {
    let mut f = fixture(2, 4);
    let (steve, alex) = f.start_round();
    f.ticks(20);
    assert!(f.host.solid_blocks(WORLD) < FLOOR);

    let eliminated = f
        .manager
        .with_arena(&mut f.host, ARENA, |arena, ctx| {
            arena.eliminate_player(ctx, &alex, "You fell into the void and were eliminated!")
        })
        .unwrap();
    assert!(eliminated);
    assert_eq!(f.status(), ArenaStatus::Ending);
    assert!(f.host.messages(&steve).contains(&"Steve has won the game!".to_string()));
    assert_eq!(f.host.location(&alex).unwrap(), home_of(&alex));
    assert_eq!(f.host.player(&alex).unwrap().game_mode, GameMode::Survival);

    f.ticks(END_DELAY_TICKS - 1);
    assert_eq!(f.status(), ArenaStatus::Ending);
    f.ticks(1);

    let arena = f.manager.get_arena(ARENA).unwrap();
    assert_eq!(arena.status(), ArenaStatus::Waiting);
    assert!(arena.players().is_empty());
    assert!(arena.spectators().is_empty());
    assert_eq!(arena.vote_count(), 0);
    assert_eq!(arena.countdown_time(), 0);
    assert_eq!(arena.pre_start_time(), 0);
    assert_eq!(f.host.location(&steve).unwrap(), home_of(&steve));
    assert_eq!(f.host.solid_blocks(WORLD), FLOOR, "world restored from backup");
}

#[test]
fn test_disconnect_of_last_opponent_ends_round() {
    let mut f = fixture(2, 4);
    let (steve, alex) = f.start_round();
    f.manager.leave(&mut f.host, &alex).unwrap();
    assert_eq!(f.status(), ArenaStatus::Ending);
    assert!(f.host.titles(&steve).contains(&"Steve wins!".to_string()));
}

#[test]
fn test_delayed_death_elimination() {
    let mut f = fixture(2, 4);
    let (_, alex) = f.start_round();
    let scheduled = f
        .manager
        .with_arena(&mut f.host, ARENA, |arena, ctx| arena.schedule_elimination(ctx, &alex))
        .unwrap();
    assert!(scheduled);

    f.ticks(4);
    assert!(f.manager.get_arena(ARENA).unwrap().has_player(&alex));
    f.ticks(1);
    assert!(!f.manager.get_arena(ARENA).unwrap().has_player(&alex));
    assert!(f
        .host
        .messages(&alex)
        .contains(&"You died and were eliminated!".to_string()));
}

#[test]
fn test_straggler_is_moved_and_reset_retries() {
    let mut f = fixture(2, 4);
    let (_, alex) = f.start_round();
    f.manager.leave(&mut f.host, &alex).unwrap();

    let bob = PlayerId::from("Bob");
    f.host.connect(&bob, Location::new(WORLD, Vec3::new(0.0, 64.0, 0.0)));

    f.ticks(END_DELAY_TICKS);
    assert_eq!(f.status(), ArenaStatus::Resetting);
    assert_eq!(f.host.location(&bob).unwrap(), f.host.default_spawn());

    f.ticks(RETRY_TICKS);
    assert_eq!(f.status(), ArenaStatus::Waiting);
}

#[test]
fn test_reset_keeps_retrying_until_world_unloads() {
    let mut f = fixture(2, 4);
    let (_, alex) = f.start_round();
    f.manager.leave(&mut f.host, &alex).unwrap();
    f.host.fail(WORLD, WorldOp::Unload);

    f.ticks(END_DELAY_TICKS + 3 * RETRY_TICKS);
    assert_eq!(f.status(), ArenaStatus::Resetting);
    assert_eq!(f.manager.scheduler().pending(), 1, "exactly one retry pending");

    f.host.clear_failure(WORLD, WorldOp::Unload);
    f.ticks(RETRY_TICKS);
    assert_eq!(f.status(), ArenaStatus::Waiting);
}

#[test]
fn test_missing_backup_blocks_until_setup_completes() {
    let mut f = bare_fixture();
    f.manager.create_arena(&mut f.host, ARENA, WORLD, 2, 4).unwrap();
    f.manager.force_clear(&mut f.host, ARENA).unwrap();
    assert_eq!(f.status(), ArenaStatus::Resetting);
    f.ticks(RETRY_TICKS);
    assert_eq!(f.status(), ArenaStatus::Resetting);

    f.manager.set_setup_mode(&mut f.host, ARENA, true).unwrap();
    assert_eq!(f.status(), ArenaStatus::Setup);
    assert_eq!(f.manager.scheduler().pending(), 0);
    f.manager.set_setup_mode(&mut f.host, ARENA, false).unwrap();
    assert_eq!(f.status(), ArenaStatus::Waiting);
    assert!(f.manager.backups().has_backup(WORLD));
}

// =========================================================================
// Admin operations
// =========================================================================

#[test]
fn test_force_stop_during_countdown_resets() {
    let mut f = fixture(2, 4);
    let (steve, alex) = (steve(), alex());
    f.connect(&steve);
    f.connect(&alex);
    f.join(&steve).unwrap();
    f.join(&alex).unwrap();

    f.manager.force_stop(&mut f.host, ARENA).unwrap();
    assert_eq!(f.status(), ArenaStatus::Waiting);
    assert!(f.manager.arena_of(&steve).is_none());
    f.ticks(COUNTDOWN_TICKS);
    assert_eq!(f.status(), ArenaStatus::Waiting, "old countdown is dead");
}

#[test]
fn test_force_stop_while_playing_ends_round() {
    let mut f = fixture(2, 4);
    let (steve, _) = f.start_round();
    f.manager.force_stop(&mut f.host, ARENA).unwrap();
    assert_eq!(f.status(), ArenaStatus::Ending);
    assert!(f
        .host
        .messages(&steve)
        .contains(&"The game has ended with no winner!".to_string()));
}

#[test]
fn test_force_stop_idle_arena_is_refused() {
    let mut f = fixture(2, 4);
    assert!(matches!(
        f.manager.force_stop(&mut f.host, ARENA),
        Err(ArenaError::InvalidState { status: ArenaStatus::Waiting, .. })
    ));
}

#[test]
fn test_force_clear_from_playing() {
    let mut f = fixture(2, 4);
    let (steve, alex) = f.start_round();
    f.ticks(20);
    f.manager.force_clear(&mut f.host, ARENA).unwrap();

    assert_eq!(f.status(), ArenaStatus::Waiting);
    assert_eq!(f.manager.scheduler().pending(), 0);
    assert_eq!(f.host.location(&steve).unwrap(), home_of(&steve));
    assert_eq!(f.host.location(&alex).unwrap(), home_of(&alex));
    assert_eq!(f.host.solid_blocks(WORLD), FLOOR);
}

#[test]
fn test_setup_refused_while_running() {
    let mut f = fixture(2, 4);
    f.start_round();
    assert!(matches!(
        f.manager.set_setup_mode(&mut f.host, ARENA, true),
        Err(ArenaError::InvalidState { .. })
    ));
    assert_eq!(f.status(), ArenaStatus::Playing);
}

#[test]
fn test_setup_sends_waiting_players_home() {
    let mut f = fixture(3, 4);
    let steve = steve();
    f.connect(&steve);
    f.join(&steve).unwrap();

    f.manager.set_setup_mode(&mut f.host, ARENA, true).unwrap();
    assert_eq!(f.status(), ArenaStatus::Setup);
    assert!(f.manager.arena_of(&steve).is_none());
    assert_eq!(f.host.location(&steve).unwrap(), home_of(&steve));

    let alex = alex();
    f.connect(&alex);
    assert!(f.join(&alex).is_err());
}

#[test]
fn test_failed_backup_keeps_arena_in_setup() {
    let mut f = bare_fixture();
    f.manager.create_arena(&mut f.host, ARENA, WORLD, 2, 4).unwrap();
    f.manager.set_setup_mode(&mut f.host, ARENA, true).unwrap();

    f.host.fail(WORLD, WorldOp::Save);
    assert!(matches!(
        f.manager.set_setup_mode(&mut f.host, ARENA, false),
        Err(ArenaError::World(_))
    ));
    assert_eq!(f.status(), ArenaStatus::Setup);
    assert!(!f.manager.backups().has_backup(WORLD));

    let steve = steve();
    f.connect(&steve);
    assert!(f.join(&steve).is_err(), "no joins without a snapshot");

    f.host.clear_failure(WORLD, WorldOp::Save);
    f.manager.set_setup_mode(&mut f.host, ARENA, false).unwrap();
    assert_eq!(f.status(), ArenaStatus::Waiting);
    assert!(f.manager.backups().has_backup(WORLD));
    f.join(&steve).unwrap();
}

#[test]
fn test_setspawn_slot_bounds() {
    let mut f = fixture(2, 4);
    let at = Location::new(WORLD, Vec3::new(1.0, 64.0, 1.0));
    assert!(matches!(
        f.manager.set_spawn_position(ARENA, 0, &at),
        Err(ArenaError::InvalidSlot { slot: 0, max: 4 })
    ));
    assert!(matches!(
        f.manager.set_spawn_position(ARENA, 5, &at),
        Err(ArenaError::InvalidSlot { .. })
    ));
    f.manager.set_spawn_position(ARENA, 4, &at).unwrap();
}

#[test]
fn test_config_changes_persist_without_scheduling() {
    let mut f = fixture(2, 4);
    f.manager.set_block_type(ARENA, "Gravel").unwrap();
    f.ticks(10);
    assert_eq!(f.manager.scheduler().pending(), 0);

    let mut reloaded = manager_in(&f.dir);
    reloaded.load_arenas(&mut f.host);
    assert_eq!(reloaded.get_arena(ARENA).unwrap().block_type(), "gravel");
}

#[test]
fn test_shutdown_sends_everyone_home_and_saves() {
    let mut f = fixture(2, 4);
    let (steve, _) = f.start_round();
    f.manager.shutdown(&mut f.host).unwrap();

    assert_eq!(f.manager.scheduler().pending(), 0);
    assert!(f.manager.arena_of(&steve).is_none());
    assert_eq!(f.host.location(&steve).unwrap(), home_of(&steve));
    assert!(f.manager.store().path_for(ARENA).exists());
}
