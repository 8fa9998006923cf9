//! Tick throughput on a crowded field.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use ember_siege::core::vec2::Vec2;
use ember_siege::game::ability::AbilityId;
use ember_siege::game::entity::{create_enemy, EnemyType, Weapon};
use ember_siege::game::state::{AbilitySlot, SimulationState};
use ember_siege::game::tick::{tick, SimConfig};
use ember_siege::{InputFrame, FRAME_MS};

/// Late-game state: a full enemy population and every bow ability owned.
fn crowded_state(config: &SimConfig) -> SimulationState {
    let mut state = SimulationState::new(Weapon::Bow, 7, 0, config);
    for id in [AbilityId::Multishot, AbilityId::Piercing, AbilityId::Volley, AbilityId::Lightning] {
        state.player.abilities.insert(id, AbilitySlot { level: 3, last_used: None });
    }
    state.next_level_xp = u64::MAX;
    state.survival_secs = 240;
    state.started_at = -240_000;

    for i in 0..70 {
        let t = EnemyType::ALL[i % EnemyType::ALL.len()];
        let angle = i as f64 * 0.37;
        let position = state.player.position + Vec2::from_angle(angle) * (150.0 + (i % 5) as f64 * 60.0);
        let id = state.next_entity_id();
        let mut enemy = create_enemy(id, t, 240, position, &mut state.rng);
        enemy.health *= 100.0;
        state.enemies.push(enemy);
    }
    state
}

fn bench_tick(c: &mut Criterion) {
    let config = SimConfig::default();
    let base = crowded_state(&config);

    c.bench_function("tick_crowded_70_enemies", |b| {
        b.iter_batched(
            || base.clone(),
            |mut state| {
                let mut now = 0;
                for _ in 0..60 {
                    tick(&mut state, black_box(&InputFrame::IDLE), &config, now);
                    now += FRAME_MS;
                }
                state
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("state_hash", |b| b.iter(|| black_box(&base).compute_hash()));
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
