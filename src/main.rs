//! Arena Brawl
//!
//! `arena-brawl relay` runs the WebSocket relay (configured from
//! `ARENA_RELAY_*`). `arena-brawl demo [seconds]` plays a scripted local
//! match between two in-process participants.

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arena_brawl::{
    TICK_RATE, VERSION,
    core::hash::short_hex,
    game::{
        archetype::Archetype,
        events::GameEventData,
        input::InputVector,
        state::MatchPhase,
    },
    network::{
        relay::{RelayConfig, RelayServer},
        session::{Session, SessionConfig},
        transport::LocalHub,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Arena Brawl v{}", VERSION);

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("relay") => run_relay().await,
        Some("demo") | None => {
            let seconds = match args.next() {
                Some(s) => s.parse().with_context(|| format!("invalid duration: {}", s))?,
                None => 30,
            };
            demo_match(seconds).await
        }
        Some(other) => bail!("unknown mode `{}` (expected `relay` or `demo`)", other),
    }
}

async fn run_relay() -> Result<()> {
    let config = RelayConfig::from_env();
    info!("Max connections: {}", config.max_connections);
    let server = RelayServer::new(config);

    tokio::select! {
        result = server.run() => result.context("relay failed")?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            server.shutdown();
        }
    }
    Ok(())
}

/// Scripted input for one slot at a given frame.
fn scripted_input(slot: u8, frame: u32) -> InputVector {
    let phase = frame / 45 + slot as u32;
    InputVector {
        up: phase % 4 == 0,
        down: phase % 4 == 2,
        left: slot % 2 == 0 && phase % 3 != 0,
        right: slot % 2 == 1 && phase % 3 != 0,
        fire: frame % 10 == 0,
        dash: frame % 97 == slot as u32,
        ult: frame % 300 == 150,
        jump: frame % 120 == 60,
    }
}

/// Run a local match between two participants over the in-process hub.
async fn demo_match(seconds: u32) -> Result<()> {
    info!("=== Starting Demo Match ===");
    let hub = LocalHub::new();
    let session_id = uuid::Uuid::new_v4().to_string();
    info!("Session: {}", session_id);

    let mut host = Session::create(&hub, &session_id, "a-device", Archetype::Austin, SessionConfig::default()).await?;
    let mut client = Session::join(&hub, &session_id, "b-device", Archetype::Toaster, SessionConfig::default()).await?;

    let dt = 1.0 / TICK_RATE as f32;
    let frames = seconds * TICK_RATE;
    let mut total_events = 0;

    for frame in 0..frames {
        host.frame(dt, scripted_input(1, frame))?;
        client.frame(dt, scripted_input(2, frame))?;

        total_events += host.events().len();
        for event in host.events() {
            match &event.data {
                GameEventData::LevelUp { slot, level } => info!("P{} reached level {}", slot, level),
                GameEventData::UltimateUsed { slot, .. } => info!("P{} unleashed an ultimate", slot),
                GameEventData::RoundOver { round, loser } => info!("Round {} over, P{} lost", round, loser),
                _ => {}
            }
        }

        if frame % (10 * TICK_RATE) == 0 {
            let sim = host.simulation();
            let hp: Vec<String> = sim.active_players().map(|p| format!("P{} {:.0}hp", p.slot, p.hp)).collect();
            info!("Tick {}: {} | {} projectiles", sim.tick, hp.join(", "), sim.projectiles.len());
        }
    }

    info!("=== Match Results ===");
    let sim = host.simulation();
    for p in sim.active_players() {
        info!("P{} {} - level {}, {:.0} hp", p.slot, p.archetype, p.level, p.hp);
    }
    if let MatchPhase::RoundOver { loser } = sim.phase {
        info!("Round {} ended, P{} lost", sim.round, loser);
    }
    info!("Total events: {}", total_events);

    let host_hash = sim.state_hash();
    let client_hash = client.simulation().state_hash();
    info!("Host state hash:   {}", short_hex(&host_hash));
    info!("Client state hash: {}", short_hex(&client_hash));
    if host_hash == client_hash {
        info!("Client mirrors host");
    } else {
        info!("Client lags host by one snapshot");
    }

    if let Some(role) = client.role() {
        info!("b-device finished as {}", role);
    }
    host.leave();
    client.leave();
    Ok(())
}
