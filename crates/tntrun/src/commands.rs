//! The `/tr` command.
//!
//! Parsing is separate from execution so the grammar can be tested without
//! a host. Every reply goes to the sender as a chat message.

use tntrun_arena::{ArenaError, ArenaStatus};
use tntrun_host::Host;
use tntrun_types::{BlockKind, Location, PlayerId, Sound};
use tracing::{info, warn};

use crate::plugin::SetupSession;
use crate::{ArenaSummary, TntRun};

const NO_PERMISSION: &str = "You don't have permission to use this command.";
const UNKNOWN: &str = "Unknown command. Use /tr help for a list of commands.";

/// Subcommands only admins may run.
const ADMIN_COMMANDS: &[&str] = &[
    "create",
    "setup",
    "setspawn",
    "typeblock",
    "setlobby",
    "force-start",
    "force-stop",
    "force-clear",
];

/// Who ran a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub player: PlayerId,
    pub admin: bool,
}

impl Sender {
    pub fn player(name: &str) -> Self {
        Self {
            player: PlayerId::from(name),
            admin: false,
        }
    }

    pub fn admin(name: &str) -> Self {
        Self {
            player: PlayerId::from(name),
            admin: true,
        }
    }
}

/// A parsed `/tr` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Create {
        name: String,
        world: String,
        min_players: u32,
        max_players: u32,
    },
    Setup { arena: String },
    SetSpawn { arena: String, slot: u32 },
    TypeBlock { arena: String, block: String },
    SetLobby { arena: String },
    Join { arena: Option<String> },
    /// Opens the arena picker.
    Play,
    Leave,
    Vote { map: Option<String> },
    ForceStart { arena: String },
    ForceStop { arena: String },
    ForceClear { arena: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown subcommand '{0}'")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a number.")]
    InvalidNumber(String),
}

/// A form the host should show the player. Never rendered here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Menu {
    /// The main TnT Run menu. Its "Play" button runs `/tr play`.
    Main,
    /// The arena picker. Picking an entry runs `/tr join <name>`.
    Join { arenas: Vec<ArenaSummary> },
    /// The map vote menu, listing every arena.
    Vote { maps: Vec<String> },
}

/// What came of running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    Failed,
    Show(Menu),
}

impl Command {
    /// Parses the words after `/tr`. An empty list is not a command (the
    /// caller shows the main menu instead).
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, CommandError> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let Some((&sub, rest)) = args.split_first() else {
            return Err(CommandError::Usage("/tr <subcommand>"));
        };
        let arg = |i: usize, usage: &'static str| {
            rest.get(i)
                .map(|s| s.to_string())
                .ok_or(CommandError::Usage(usage))
        };
        let number = |s: String| s.parse::<u32>().map_err(|_| CommandError::InvalidNumber(s));

        let command = match sub {
            "help" => Self::Help,
            "create" => {
                const USAGE: &str = "/tr create <name> <world> <minPlayers> <maxPlayers>";
                Self::Create {
                    name: arg(0, USAGE)?,
                    world: arg(1, USAGE)?,
                    min_players: number(arg(2, USAGE)?)?,
                    max_players: number(arg(3, USAGE)?)?,
                }
            }
            "setup" => Self::Setup {
                arena: arg(0, "/tr setup <name>")?,
            },
            "setspawn" => {
                const USAGE: &str = "/tr setspawn <name> <position>";
                Self::SetSpawn {
                    arena: arg(0, USAGE)?,
                    slot: number(arg(1, USAGE)?)?,
                }
            }
            "typeblock" => {
                const USAGE: &str = "/tr typeblock <name> <blockname>";
                Self::TypeBlock {
                    arena: arg(0, USAGE)?,
                    block: arg(1, USAGE)?,
                }
            }
            "setlobby" => Self::SetLobby {
                arena: arg(0, "/tr setlobby <name>")?,
            },
            "join" => Self::Join {
                arena: rest.first().map(|s| s.to_string()),
            },
            "play" => Self::Play,
            "leave" => Self::Leave,
            "vote" => Self::Vote {
                map: rest.first().map(|s| s.to_string()),
            },
            "force-start" => Self::ForceStart {
                arena: arg(0, "/tr force-start <name>")?,
            },
            "force-stop" => Self::ForceStop {
                arena: arg(0, "/tr force-stop <name>")?,
            },
            "force-clear" => Self::ForceClear {
                arena: arg(0, "/tr force-clear <name>")?,
            },
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

impl<H: Host> TntRun<H> {
    /// Runs `/tr <args>` for `sender`.
    pub fn execute<S: AsRef<str>>(&mut self, sender: &Sender, args: &[S]) -> CommandOutcome {
        let Some(first) = args.first().map(AsRef::as_ref) else {
            return CommandOutcome::Show(Menu::Main);
        };
        if ADMIN_COMMANDS.contains(&first) && !sender.admin {
            self.reply(sender, NO_PERMISSION);
            return CommandOutcome::Failed;
        }
        let command = match Command::parse(args) {
            Ok(command) => command,
            Err(CommandError::Unknown(_)) => {
                self.reply(sender, UNKNOWN);
                return CommandOutcome::Failed;
            }
            Err(e) => {
                self.reply(sender, &e.to_string());
                return CommandOutcome::Failed;
            }
        };
        self.run_command(sender, command)
    }

    /// Runs an already parsed command. Permissions are not checked here.
    pub fn run_command(&mut self, sender: &Sender, command: Command) -> CommandOutcome {
        let player = &sender.player;
        match command {
            Command::Help => {
                self.send_help(sender);
                CommandOutcome::Done
            }
            Command::Create {
                name,
                world,
                min_players,
                max_players,
            } => self.create(sender, &name, &world, min_players, max_players),
            Command::Setup { arena } => self.setup(sender, &arena),
            Command::SetSpawn { arena, slot } => {
                let Some(at) = self.host.location(player) else {
                    return CommandOutcome::Failed;
                };
                match self.manager.set_spawn_position(&arena, slot, &at) {
                    Ok(()) => self.done(
                        sender,
                        &format!("Spawn position {slot} set for arena '{arena}'."),
                    ),
                    Err(ArenaError::InvalidSlot { max, .. }) => {
                        self.fail(sender, &format!("Position must be between 1 and {max}."))
                    }
                    Err(e) => self.fail_with(sender, &e),
                }
            }
            Command::TypeBlock { arena, block } => {
                match self.manager.set_block_type(&arena, &block) {
                    Ok(()) => {
                        if BlockKind::parse(&block).is_none() {
                            self.reply(
                                sender,
                                &format!("Unknown block '{block}', TNT will be used."),
                            );
                        }
                        self.done(sender, &format!("Block type set to '{block}' for arena '{arena}'."))
                    }
                    Err(e) => self.fail_with(sender, &e),
                }
            }
            Command::SetLobby { arena } => {
                let Some(at) = self.host.location(player) else {
                    return CommandOutcome::Failed;
                };
                match self.manager.set_lobby_position(&arena, &at) {
                    Ok(()) => self.done(sender, &format!("Lobby position set for arena '{arena}'.")),
                    Err(e) => self.fail_with(sender, &e),
                }
            }
            Command::Join { arena } => {
                let result = self.manager.join(&mut self.host, player, arena.as_deref());
                match (result, arena) {
                    (Ok(_), _) => CommandOutcome::Done,
                    (Err(e @ (ArenaError::NotFound(_) | ArenaError::AlreadyInArena { .. })), Some(_)) => {
                        self.fail_with(sender, &e)
                    }
                    (Err(ArenaError::InvalidState { .. }), Some(name)) => {
                        self.fail(sender, &format!("Arena '{name}' is not available for joining."))
                    }
                    (Err(_), Some(name)) => self.fail(sender, &format!("Failed to join arena '{name}'.")),
                    (Err(ArenaError::NotFound(_)), None) => self.fail(sender, "No available arenas found."),
                    (Err(e @ ArenaError::AlreadyInArena { .. }), None) => self.fail_with(sender, &e),
                    (Err(_), None) => self.fail(sender, "Failed to join arena."),
                }
            }
            Command::Play => {
                if self.manager.arena_names().is_empty() {
                    self.host.play_sound(player, Sound::AnvilFall);
                    return self.fail(sender, "No arenas available.");
                }
                self.host.play_sound(player, Sound::Pop);
                CommandOutcome::Show(self.join_menu())
            }
            Command::Leave => match self.manager.leave(&mut self.host, player) {
                Ok(_) => self.done(sender, "You left the arena."),
                Err(_) => self.fail(sender, "You are not in an arena."),
            },
            Command::Vote { map: None } => CommandOutcome::Show(self.vote_menu()),
            Command::Vote { map: Some(map) } => match self.manager.vote(player, &map) {
                Ok(()) => self.done(sender, &format!("You voted for '{map}'.")),
                Err(ArenaError::InvalidState { .. }) => self.fail(sender, "Voting is closed."),
                Err(e) => self.fail_with(sender, &e),
            },
            Command::ForceStart { arena } => match self.manager.force_start(&mut self.host, &arena) {
                Ok(()) => self.admin_done(sender, &arena, "start"),
                Err(ArenaError::InvalidState { .. }) => {
                    self.fail(sender, &format!("Arena '{arena}' is not in waiting state."))
                }
                Err(ArenaError::NotEnoughPlayers { need, .. }) => self.fail(
                    sender,
                    &format!("Arena '{arena}' needs at least {need} players to start."),
                ),
                Err(e) => self.fail_with(sender, &e),
            },
            Command::ForceStop { arena } => match self.manager.force_stop(&mut self.host, &arena) {
                Ok(()) => self.admin_done(sender, &arena, "stop"),
                Err(ArenaError::InvalidState { .. }) => {
                    self.fail(sender, &format!("Arena '{arena}' is not active."))
                }
                Err(e) => self.fail_with(sender, &e),
            },
            Command::ForceClear { arena } => match self.manager.force_clear(&mut self.host, &arena) {
                Ok(()) => self.admin_done(sender, &arena, "clear"),
                Err(e) => self.fail_with(sender, &e),
            },
        }
    }

    /// The arena picker: every arena with its status and head count.
    pub fn join_menu(&self) -> Menu {
        Menu::Join {
            arenas: self.summaries(),
        }
    }

    /// The vote menu: every arena name.
    pub fn vote_menu(&self) -> Menu {
        Menu::Vote {
            maps: self.manager.arena_names(),
        }
    }

    fn create(
        &mut self,
        sender: &Sender,
        name: &str,
        world: &str,
        min_players: u32,
        max_players: u32,
    ) -> CommandOutcome {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return self.fail(
                sender,
                "Arena name can only contain letters (a-z, A-Z) and numbers (0-9).",
            );
        }
        if !self.host.is_world_loaded(world) {
            self.reply(sender, &format!("Attempting to load world '{world}'..."));
            if let Err(e) = self.host.load_world(world) {
                warn!(%world, error = %e, "create: world load failed");
                return self.fail(
                    sender,
                    &format!("Failed to load world '{world}'. Make sure it exists and is valid."),
                );
            }
            self.reply(sender, &format!("World '{world}' loaded successfully."));
        }
        if min_players < 1 {
            return self.fail(sender, "Minimum players must be at least 1.");
        }
        if max_players < min_players {
            return self.fail(
                sender,
                "Maximum players must be greater than or equal to minimum players.",
            );
        }

        match self
            .manager
            .create_arena(&mut self.host, name, world, min_players, max_players)
        {
            Ok(()) => {
                self.reply(sender, &format!("Arena '{name}' created successfully!"));
                self.done(sender, &format!("Use /tr setup {name} to set up the arena."))
            }
            Err(e @ ArenaError::AlreadyExists(_)) => self.fail_with(sender, &e),
            Err(e) => self.fail(sender, &format!("Failed to create arena: {e}")),
        }
    }

    /// Starts a setup session, or finishes the one already running for
    /// this arena.
    fn setup(&mut self, sender: &Sender, arena: &str) -> CommandOutcome {
        let player = &sender.player;
        if let Some(session) = self.setup_sessions.get(player) {
            if session.arena != arena {
                let current = session.arena.clone();
                return self.fail(
                    sender,
                    &format!("You are already setting up arena '{current}'. Run /tr setup {current} to finish."),
                );
            }
            return self.finish_setup(sender);
        }

        let Some(world) = self.manager.get_arena(arena).map(|a| a.world().to_string()) else {
            return self.fail(sender, &format!("Arena '{arena}' does not exist."));
        };
        if !self.host.is_world_loaded(&world) {
            if let Err(e) = self.host.load_world(&world) {
                warn!(%arena, %world, error = %e, "setup: arena world load failed");
                return self.fail(sender, "Failed to load arena world.");
            }
        }
        let Some(return_to) = self.host.location(player) else {
            return CommandOutcome::Failed;
        };
        if let Err(e) = self.manager.set_setup_mode(&mut self.host, arena, true) {
            return match e {
                ArenaError::InvalidState { status, .. } => self.fail(
                    sender,
                    &format!("Arena '{arena}' is {status} and cannot be set up now."),
                ),
                e => self.fail_with(sender, &e),
            };
        }

        self.setup_sessions.insert(
            player.clone(),
            SetupSession {
                arena: arena.to_string(),
                return_to,
            },
        );
        if let Some(spawn) = self.host.world_spawn(&world) {
            if let Err(e) = self.host.teleport(player, &spawn) {
                warn!(%arena, %player, error = %e, "setup: teleport to arena world failed");
            }
        }
        self.host.play_sound(player, Sound::AnvilUse);
        info!(%arena, admin = %player, "setup session started");

        self.reply(sender, &format!("You are now setting up arena '{arena}'."));
        self.reply(sender, "Use /tr setspawn <name> <position> to set spawn positions.");
        self.reply(sender, "Use /tr typeblock <name> <blockname> to set the block type.");
        self.reply(sender, "Use /tr setlobby <name> to set the lobby location.");
        self.done(sender, &format!("Run /tr setup {arena} again to finish."))
    }

    /// The session survives a failed finish so the admin can retry.
    fn finish_setup(&mut self, sender: &Sender) -> CommandOutcome {
        let Some(arena) = self.setup_session(&sender.player).map(str::to_string) else {
            return CommandOutcome::Failed;
        };
        if let Err(e) = self.manager.set_setup_mode(&mut self.host, &arena, false) {
            warn!(%arena, admin = %sender.player, error = %e, "setup: could not leave setup mode");
            return self.fail(
                sender,
                &format!("Could not finish setup of '{arena}': {e}. Run /tr setup {arena} to try again."),
            );
        }
        if let Some(session) = self.end_setup_session(&sender.player) {
            self.send_back(&sender.player, &session.return_to);
        }
        self.done(sender, &format!("Setup of arena '{arena}' complete."))
    }

    pub(crate) fn send_back(&mut self, player: &PlayerId, to: &Location) {
        let target = if self.host.is_world_loaded(&to.world) {
            to.clone()
        } else {
            self.host.default_spawn()
        };
        if let Err(e) = self.host.teleport(player, &target) {
            warn!(%player, error = %e, "could not return admin from setup");
        }
    }

    fn send_help(&mut self, sender: &Sender) {
        let mut lines = vec![
            "=== TnTRun Help ===",
            "/tr - Open the main TnTRun menu",
            "/tr help - Show this help message",
            "/tr play - Pick an arena to join",
            "/tr join [arena] - Join a specific arena or random arena",
            "/tr leave - Leave the current arena",
            "/tr vote [map] - Vote for a map",
        ];
        if sender.admin {
            lines.extend([
                "=== Admin Commands ===",
                "/tr create <name> <world> <minPlayers> <maxPlayers> - Create a new arena",
                "/tr setup <name> - Enter or finish setup mode for an arena",
                "/tr setspawn <name> <position> - Set a spawn position",
                "/tr typeblock <name> <blockname> - Set the block type",
                "/tr setlobby <name> - Set the lobby location",
                "/tr force-start <name> - Force start an arena",
                "/tr force-stop <name> - Force stop an arena",
                "/tr force-clear <name> - Force clear an arena",
            ]);
        }
        for line in lines {
            self.reply(sender, line);
        }
    }

    fn reply(&mut self, sender: &Sender, message: &str) {
        self.host.send_message(&sender.player, message);
    }

    fn done(&mut self, sender: &Sender, message: &str) -> CommandOutcome {
        self.reply(sender, message);
        CommandOutcome::Done
    }

    fn admin_done(&mut self, sender: &Sender, arena: &str, action: &str) -> CommandOutcome {
        info!(%arena, admin = %sender.player, action, "forced arena");
        self.done(sender, &format!("Forced arena '{arena}' to {action}."))
    }

    fn fail(&mut self, sender: &Sender, message: &str) -> CommandOutcome {
        self.reply(sender, message);
        CommandOutcome::Failed
    }

    fn fail_with(&mut self, sender: &Sender, err: &ArenaError) -> CommandOutcome {
        let message = match err {
            ArenaError::NotFound(name) => format!("Arena '{name}' does not exist."),
            ArenaError::AlreadyExists(name) => {
                format!("Failed to create arena. '{name}' already exists.")
            }
            ArenaError::AlreadyInArena { arena, .. } => format!("You are already in arena '{arena}'."),
            ArenaError::NotInArena(_) => "You are not in an arena.".to_string(),
            ArenaError::InvalidState {
                status: ArenaStatus::Setup,
                arena,
                ..
            } => format!("Arena '{arena}' is being set up."),
            other => format!("Error: {other}"),
        };
        self.fail(sender, &message)
    }
}
