//! Blast Arena Demo
//!
//! Runs one authoritative host and two remote peers over the loopback
//! session, throws bombs from every side, and checks that all peers end up
//! with the same world.

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use blast_arena::{
    ArenaConfig, LoopbackSession, TICK_RATE, VERSION,
    core::vec3::{Rotator, Vec3},
    game::{bomb::BombOrigin, level::Tile, skill::SkillKind},
    network::protocol::PeerId,
};

/// Ticks simulated by the demo.
const DEMO_TICKS: u32 = 600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Blast Arena v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = match std::env::args().nth(1) {
        Some(path) => ArenaConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => ArenaConfig::default(),
    };

    demo_arena(&config).await
}

/// Demo function to exercise replication end to end.
async fn demo_arena(config: &ArenaConfig) -> anyhow::Result<()> {
    info!("=== Building Arena ===");

    let level = config.level_grid(13, 15)?;
    let placements = level.layout(&config.grid);
    let walls = placements.iter().filter(|p| p.tile != Tile::Ground).count();
    info!("Level {}x{}: {} placements, {} walls", level.height(), level.width(), placements.len(), walls);

    let mut session = LoopbackSession::from_config(config);
    let remotes = [session.add_remote(), session.add_remote()];

    // One character per peer
    let controllers = [PeerId::HOST, remotes[0], remotes[1]];
    let mut actors = Vec::with_capacity(controllers.len());
    for (i, &controller) in controllers.iter().enumerate() {
        let start = config.grid.cell_to_world(1 + i * 2, 1 + i * 3, 60.0);
        let actor = session.spawn_character(controller, start)?;
        info!("Character {} at {:?} for {}", hex::encode(&actor.0[..4]), start, controller);
        actors.push(actor);
    }

    info!("=== Running {} ticks ===", DEMO_TICKS);

    let mut dispatched = 0;
    let mut skipped = 0;

    for t in 0..DEMO_TICKS {
        for (i, &actor) in actors.iter().enumerate() {
            let angle = ((t as usize * (i + 1) * 7) % 360) as f32;
            let radius = 150.0 + 40.0 * i as f32;
            let position = Vec3::new(
                700.0 + radius * angle.to_radians().cos(),
                600.0 + radius * angle.to_radians().sin(),
                60.0,
            );
            session.move_character(actor, position, Rotator::from_yaw(angle))?;

            if (t as usize + i * 11) % 45 == 0 {
                if session.throw_bomb(actor)?.is_dispatched() {
                    dispatched += 1;
                } else {
                    skipped += 1;
                }
            }
        }

        // Power-ups every 2 seconds
        if t % (TICK_RATE * 2) == 0 {
            let actor = actors[(t / (TICK_RATE * 2)) as usize % actors.len()];
            let level = session.upgrade_skill(actor, SkillKind::BlastRadius)?;
            info!("Tick {}: {} blast radius now {}", t, hex::encode(&actor.0[..4]), level);
        }

        session.pump().await?;
        session.advance();
    }

    // Print final results
    info!("=== Results ===");
    info!("Throws dispatched: {}, skipped: {}", dispatched, skipped);

    for peer in session.peers() {
        let bombs = &peer.state().bombs;
        info!(
            "{}: {} live bombs ({} executed, {} mirrored), {} events, digest {}",
            peer.id(),
            bombs.len(),
            bombs.count(BombOrigin::Executed),
            bombs.count(BombOrigin::Mirrored),
            peer.events().len(),
            hex::encode(peer.digest()),
        );
    }

    if session.converged() {
        info!("CONVERGENCE VERIFIED: all peers agree");
        Ok(())
    } else {
        warn!("CONVERGENCE FAILURE: digests differ");
        bail!("peers diverged")
    }
}
