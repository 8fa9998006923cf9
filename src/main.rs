//! Ember Siege demo runner
//!
//! Plays a scripted session on a manual clock, picks the first upgrade card
//! at every level-up, then checks that a snapshot round trip and a replay
//! both land on the same state hash.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ember_siege::{
    FRAME_MS, TICK_RATE, VERSION,
    core::clock::{Clock, ManualClock, Millis},
    game::{
        events::GameEventData,
        input::InputFrame,
        snapshot::StateSnapshot,
        state::{SessionPhase, SimulationState},
        tick::{replay, SimConfig, Simulation},
    },
};

/// Demo length: three minutes of play.
const DEMO_TICKS: u32 = 180 * TICK_RATE;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Ember Siege v{}", VERSION);
    info!("Tick Rate: {} Hz, frame {} ms", TICK_RATE, FRAME_MS);

    let weapon = std::env::args().nth(1).unwrap_or_else(|| "bow".to_string());
    demo_session(&weapon, 12345)
}

/// Circle the arena: change direction every two seconds.
fn scripted_input(t: u32) -> InputFrame {
    match (t / 120) % 4 {
        0 => InputFrame::new(true, false, false, true),
        1 => InputFrame::new(false, true, false, true),
        2 => InputFrame::new(false, true, true, false),
        _ => InputFrame::new(true, false, true, false),
    }
}

fn demo_session(weapon: &str, seed: u64) -> Result<()> {
    info!("=== Starting Demo Session ({weapon}) ===");

    let config = SimConfig::default();
    let clock = ManualClock::new(0);
    let mut sim = Simulation::new(weapon, seed, config.clone(), &clock).context("starting session")?;
    let initial: SimulationState = sim.state().clone();

    let mut frames: Vec<(Millis, InputFrame)> = Vec::new();
    let mut picks: Vec<(usize, String, String)> = Vec::new();
    let mut kills = 0usize;

    for t in 0..DEMO_TICKS {
        let input = scripted_input(t);
        frames.push((clock.now_ms(), input));
        let result = sim.tick(&input);

        for event in &result.events {
            match &event.data {
                GameEventData::EnemyKilled { .. } => kills += 1,
                GameEventData::AbilityTriggered { ability, level } => {
                    info!("t={}ms {} (level {}) triggered", event.at, ability.name(), level);
                }
                GameEventData::LevelUp { level, card_count, .. } => {
                    info!("t={}ms reached level {} ({} cards)", event.at, level, card_count);
                }
                _ => {}
            }
        }

        if let Some(card) = sim.cards().first().cloned() {
            let category = card.choice.category().key();
            let key = card.choice.key();
            sim.apply_upgrade(category, key)?;
            info!("picked {}", card.name);
            picks.push((frames.len(), category.to_string(), key.to_string()));
        }

        if result.game_over {
            info!("Game over at tick {}", t);
            break;
        }

        if t > 0 && t % (30 * TICK_RATE) == 0 {
            let state = sim.state();
            info!(
                "{}s: {} enemies, hp {:.0}/{:.0}, level {}, score {}",
                state.survival_secs,
                state.enemies.len(),
                state.player.health,
                state.player.max_health,
                state.level,
                state.score
            );
        }
        clock.advance(FRAME_MS);
    }

    let state = sim.state();
    info!("=== Session Results ===");
    info!("Score: {}, level {}, {} kills, {}s survived", state.score, state.level, kills, state.survival_secs);
    let hash = state.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    info!("=== Verifying Snapshot Round Trip ===");
    let bytes = sim.export_state().to_bytes()?;
    sim.import_state(StateSnapshot::from_bytes(&bytes)?)?;
    let restored_hash = sim.state().compute_hash();
    info!("{} bytes, restored hash {}", bytes.len(), hex::encode(restored_hash));
    if restored_hash != hash {
        bail!("snapshot round trip changed the state hash");
    }

    info!("=== Verifying Determinism ===");
    let replay_hash = replay_with_picks(initial, &frames, &picks, &config)?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));
    if replay_hash == hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
    } else {
        warn!("DETERMINISM FAILURE: Hashes differ!");
    }
    Ok(())
}

/// Replay recorded frames, re-applying each upgrade after the frame it followed.
fn replay_with_picks(
    initial: SimulationState,
    frames: &[(Millis, InputFrame)],
    picks: &[(usize, String, String)],
    config: &SimConfig,
) -> Result<[u8; 32]> {
    let mut state = initial;
    let mut start = 0;
    for (end, category, key) in picks {
        state = replay(state, &frames[start..*end], config).0;
        if !matches!(state.phase, SessionPhase::PausedForUpgrade { .. }) {
            bail!("replay diverged before upgrade {key}");
        }
        let category = ember_siege::game::input::UpgradeCategory::from_key(category)?;
        ember_siege::game::progression::apply_upgrade(&mut state, category, key)?;
        start = *end;
    }
    let (state, _) = replay(state, &frames[start..], config);
    Ok(state.compute_hash())
}
