//! Arena timings and the lifecycle state machine.

use serde::{Deserialize, Serialize};
use tntrun_tick::TICKS_PER_SECOND;

/// Number of one-second steps between the end of the countdown and the
/// start of play ("3", "2", "1", "GO!").
pub const PRE_START_STEPS: u32 = 4;

// ---------------------------------------------------------------------------
// ArenaTimings
// ---------------------------------------------------------------------------

/// Durations used by every arena. Tick values are engine ticks (20 per
/// second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTimings {
    /// Length of the lobby countdown, in seconds.
    pub countdown_seconds: u32,

    /// Delay between the end of a round and the arena reset.
    pub end_delay_ticks: u32,

    /// Delay before retrying a failed world restore.
    pub reset_retry_ticks: u32,

    /// Delay between a player's death and their elimination, so the
    /// engine has finished respawning them.
    pub elimination_delay_ticks: u32,
}

impl ArenaTimings {
    /// Interval of the countdown, pre-start and mechanics timers.
    pub const STEP_TICKS: u32 = TICKS_PER_SECOND;
}

impl Default for ArenaTimings {
    fn default() -> Self {
        Self {
            countdown_seconds: 10,
            end_delay_ticks: 5 * TICKS_PER_SECOND,
            reset_retry_ticks: 5 * TICKS_PER_SECOND,
            elimination_delay_ticks: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// ArenaStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of an arena.
///
/// ```text
/// Waiting → Countdown → Playing → Ending → Resetting → Waiting
///              ↓                                ↑
///           Waiting (not enough players)    any state (force-clear)
///
/// Waiting ⇄ Setup (admin toggle)
/// ```
///
/// - **Waiting**: accepting joins.
/// - **Countdown**: enough players joined, the lobby countdown and then
///   the pre-start sequence are running. Players are frozen during
///   pre-start.
/// - **Playing**: the round is on. Blocks disappear under players.
/// - **Ending**: a winner (or nobody) was announced. Reset follows after
///   a fixed delay.
/// - **Setup**: an admin is editing the arena. No joins.
/// - **Resetting**: players were sent home and the world is being
///   restored from its backup. Stays here until a restore succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArenaStatus {
    #[default]
    Waiting,
    Countdown,
    Playing,
    Ending,
    Setup,
    Resetting,
}

impl ArenaStatus {
    /// Returns `true` if the arena is accepting new players.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` while a round is in progress (countdown included).
    pub fn is_running(self) -> bool {
        matches!(self, Self::Countdown | Self::Playing | Self::Ending)
    }
}

impl std::fmt::Display for ArenaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Waiting => "waiting",
            Self::Countdown => "countdown",
            Self::Playing => "playing",
            Self::Ending => "ending",
            Self::Setup => "setup",
            Self::Resetting => "resetting",
        };
        f.write_str(label)
    }
}
