//! Plays one TnT Run round against the in-memory engine and prints what
//! the winner saw in chat.
//!
//! `RUST_LOG=debug cargo run -p simulated-match` shows every timer.

use std::time::Duration;

use tntrun::prelude::*;
use tntrun::{BlockKind, CONFIG_FILE};
use tntrun_host::MemoryHost;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ARENA_WORLD: &str = "arena";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dir = tempfile::tempdir()?;
    let data_dir = dir.path().join("TnTRun");
    let worlds_dir = dir.path().join("worlds");
    std::fs::create_dir_all(&data_dir)?;

    // A fast clock and a short countdown keep the demo under ten seconds.
    let file = serde_json::json!({
        "worlds_dir": worlds_dir,
        "tick_rate_hz": 100,
        "countdown_seconds": 3,
    });
    std::fs::write(data_dir.join(CONFIG_FILE), serde_json::to_vec_pretty(&file)?)?;
    let config = PluginConfig::load(&data_dir)?;

    let mut host = MemoryHost::new("lobby").with_worlds_dir(&worlds_dir);
    host.add_world(ARENA_WORLD, Vec3::new(0.0, 64.0, 0.0));
    host.fill_floor(ARENA_WORLD, 63, 8, BlockKind::Tnt);

    let admin = PlayerId::from("Op");
    host.connect(&admin, Location::new("lobby", Vec3::new(0.0, 64.0, 0.0)));
    let players: Vec<PlayerId> = ["Steve", "Alex", "Notch"]
        .into_iter()
        .map(PlayerId::from)
        .collect();
    for (i, player) in players.iter().enumerate() {
        host.connect(player, Location::new("lobby", Vec3::new(2.0 * i as f64, 64.0, 4.0)));
    }

    let mut plugin = TntRun::new(host, config);
    plugin.enable()?;
    let (handle, task) = plugin.spawn(256);

    for line in ["create alpha arena 2 4", "setup alpha", "setup alpha"] {
        command(&handle, &admin, true, line).await?;
    }
    for player in &players {
        command(&handle, player, false, "join alpha").await?;
    }
    command(&handle, &players[0], false, "vote alpha").await?;

    wait_for(&handle, ArenaStatus::Playing).await?;
    info!("round started");

    // Everyone takes a step, then two players go down.
    for player in &players {
        handle
            .post(HostEvent::Move {
                player: player.clone(),
                from: Vec3::new(0.0, 64.0, 0.0),
                to: Vec3::new(0.5, 64.0, 0.5),
            })
            .await?;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle
        .post(HostEvent::Move {
            player: players[1].clone(),
            from: Vec3::new(0.0, 2.0, 0.0),
            to: Vec3::new(0.0, -4.0, 0.0),
        })
        .await?;
    handle.post(HostEvent::Death { player: players[2].clone() }).await?;

    wait_for(&handle, ArenaStatus::Waiting).await?;
    for summary in handle.summaries().await? {
        info!(
            arena = %summary.name,
            status = %summary.status,
            players = summary.players,
            max = summary.max_players,
            "arena after the round"
        );
    }

    handle.shutdown().await?;
    let host = task.await??;
    println!("--- chat of {} ---", players[0]);
    for line in host.messages(&players[0]) {
        println!("{line}");
    }
    Ok(())
}

async fn command(
    handle: &PluginHandle,
    player: &PlayerId,
    admin: bool,
    line: &str,
) -> Result<EventOutcome, TntRunError> {
    handle
        .send(HostEvent::Command {
            player: player.clone(),
            admin,
            args: line.split_whitespace().map(String::from).collect(),
        })
        .await
}

/// Polls until some arena reaches `status`, for at most 30 seconds.
async fn wait_for(handle: &PluginHandle, status: ArenaStatus) -> Result<(), Box<dyn std::error::Error>> {
    let poll = async {
        loop {
            let summaries = handle.summaries().await?;
            if summaries.iter().any(|s| s.status == status) {
                return Ok::<_, TntRunError>(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(30), poll).await??;
    Ok(())
}
