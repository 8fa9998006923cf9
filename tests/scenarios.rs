//! End-to-end scenarios and properties driven through the public API.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ember_siege::core::clock::{Clock, ManualClock, Millis};
use ember_siege::core::rng::DeterministicRng;
use ember_siege::core::vec2::Vec2;
use ember_siege::game::ability::AbilityId;
use ember_siege::game::combat::{resolve_projectile_hits, resolve_player_contacts};
use ember_siege::game::effects::{ActiveEffect, ActiveEffects, EffectKind};
use ember_siege::game::entity::{
    create_enemy, create_player_projectile, EnemyType, Pierce, Weapon,
};
use ember_siege::game::progression::{
    apply_stat_level, check_level_up, entity_limit, StatKind, MAX_STAT_LEVEL,
};
use ember_siege::game::spawner::try_spawn;
use ember_siege::game::state::{AbilitySlot, PlayerState, SessionPhase, SimulationState};
use ember_siege::game::tick::{tick, SimConfig, Simulation};
use ember_siege::{InputFrame, FRAME_MS, MAX_ENEMY_PROJECTILES, MAX_PLAYER_PROJECTILES};

fn quiet_state(weapon: Weapon, seed: u64) -> SimulationState {
    let mut state = SimulationState::new(weapon, seed, 0, &SimConfig::default());
    // Spawn timer just fired: nothing new arrives for the next two seconds
    state.last_spawn = Some(0);
    state
}

fn place(state: &mut SimulationState, enemy_type: EnemyType, offset: Vec2) -> usize {
    let id = state.next_entity_id();
    let position = state.player.position + offset;
    let enemy = create_enemy(id, enemy_type, state.survival_secs, position, &mut state.rng);
    state.enemies.push(enemy);
    state.enemies.len() - 1
}

/// Enemies that are already dead and get reaped on the next tick.
fn place_corpses(state: &mut SimulationState, count: usize) {
    for i in 0..count {
        let angle = i as f64 * 0.7;
        let idx = place(state, EnemyType::Basic, Vec2::from_angle(angle) * 400.0);
        state.enemies[idx].health = 0.0;
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn adjacent_basic_enemy_deals_contact_damage_without_reward() {
    let config = SimConfig::default();
    let mut state = quiet_state(Weapon::Bow, 1);
    place(&mut state, EnemyType::Basic, Vec2::new(25.0, 0.0));

    tick(&mut state, &InputFrame::IDLE, &config, 16);

    assert_eq!(state.player.health, 90.0);
    assert!(state.enemies.is_empty());
    assert_eq!(state.score, 0);
    assert_eq!(state.xp, 0);
}

#[test]
fn kills_worth_a_level_open_the_upgrade_menu() {
    let config = SimConfig::default();
    let mut state = quiet_state(Weapon::Sword, 2);
    place_corpses(&mut state, 2);

    let result = tick(&mut state, &InputFrame::IDLE, &config, 16);

    assert!(result.leveled_up);
    assert_eq!(state.level, 2);
    assert_eq!(state.xp, 0);
    assert_eq!(state.next_level_xp, 150);
    match &state.phase {
        SessionPhase::PausedForUpgrade { cards } => assert!(!cards.is_empty() && cards.len() <= 3),
        other => panic!("expected upgrade menu, got {:?}", other),
    }
}

#[test]
fn eight_kills_trigger_berserker() {
    let config = SimConfig::default();
    let mut state = quiet_state(Weapon::Sword, 3);
    state.player.abilities.insert(AbilityId::Berserker, AbilitySlot { level: 1, last_used: None });
    place_corpses(&mut state, 8);

    tick(&mut state, &InputFrame::IDLE, &config, 16);

    assert_eq!(
        state.player.effects.berserker(),
        Some((0.6, 0.4)),
        "berserker should be active after eight kills"
    );
}

#[test]
fn taking_damage_resets_the_kill_streak() {
    let config = SimConfig::default();
    let mut state = quiet_state(Weapon::Sword, 4);
    state.player.abilities.insert(AbilityId::Berserker, AbilitySlot { level: 1, last_used: None });
    // Keep the upgrade menu closed so every tick runs
    state.next_level_xp = u64::MAX;

    place_corpses(&mut state, 7);
    tick(&mut state, &InputFrame::IDLE, &config, 16);
    assert_eq!(state.kill_streak, 7);

    place(&mut state, EnemyType::Basic, Vec2::new(20.0, 0.0));
    tick(&mut state, &InputFrame::IDLE, &config, 32);
    assert_eq!(state.kill_streak, 0);

    place_corpses(&mut state, 1);
    tick(&mut state, &InputFrame::IDLE, &config, 48);
    assert_eq!(state.kill_streak, 1);
    assert!(!state.player.effects.contains(EffectKind::Berserker));
}

#[test]
fn shield_pushes_touching_enemies_away() {
    let config = SimConfig::default();
    let mut state = quiet_state(Weapon::Cannon, 5);
    state.player.effects.insert(ActiveEffect::Shield { absorption: 50.0, remaining: 50.0, expires_at: 3_000 });
    let idx = place(&mut state, EnemyType::Tank, Vec2::new(30.0, 0.0));

    let pushed = resolve_player_contacts(&mut state, &config, 0);

    assert_eq!(pushed.len(), 1);
    assert_eq!(state.player.health, 100.0);
    assert!(state.enemies[idx].position.distance(state.player.position) > 100.0);
}

#[test]
fn session_survives_snapshot_and_keeps_playing() {
    let clock = ManualClock::new(0);
    let mut sim = Simulation::new("staff", 42, SimConfig::default(), &clock).unwrap();
    for _ in 0..300 {
        sim.tick(&InputFrame::IDLE);
        if let Some(card) = sim.cards().first().cloned() {
            sim.apply_upgrade(card.choice.category().key(), card.choice.key()).unwrap();
        }
        clock.advance(FRAME_MS);
    }

    let json = sim.export_state().to_json().unwrap();
    let before = sim.state().compute_hash();

    // Resume an hour later on the same clock
    clock.advance(3_600_000);
    let snapshot = ember_siege::game::snapshot::StateSnapshot::from_json(&json).unwrap();
    sim.import_state(snapshot).unwrap();
    assert_eq!(sim.state().started_at, 3_600_000);
    assert_ne!(sim.state().compute_hash(), before);

    let survival = sim.state().survival_secs;
    sim.tick(&InputFrame::IDLE);
    assert_eq!(sim.state().survival_secs, survival);
}

#[test]
fn random_play_respects_caps() {
    let config = SimConfig::default();
    let mut rng = StdRng::seed_from_u64(0xE5);
    let mut state = SimulationState::new(Weapon::Bow, 2024, 0, &config);
    let mut now: Millis = 0;

    for _ in 0..5_000 {
        let before = state.enemies.len();
        let input = InputFrame::from_flags(rng.gen::<u8>());
        tick(&mut state, &input, &config, now);

        if let SessionPhase::PausedForUpgrade { cards } = &state.phase {
            let pick = cards[rng.gen_range(0..cards.len())].choice;
            ember_siege::game::progression::apply_upgrade(&mut state, pick.category(), pick.key()).unwrap();
        }
        if state.is_over() {
            break;
        }

        assert!(state.player.health >= 0.0 && state.player.health <= state.player.max_health);
        assert!(state.projectiles.len() <= MAX_PLAYER_PROJECTILES);
        assert!(state.enemy_projectiles.len() <= MAX_ENEMY_PROJECTILES);
        assert!(state.enemies.len() <= before.max(state.entity_limit));
        now += FRAME_MS;
    }
}

#[test]
fn manual_clock_drives_the_session() {
    let clock = ManualClock::new(500);
    let mut sim = Simulation::new("sword", 8, SimConfig::default(), &clock).unwrap();
    clock.set(10_499);
    sim.tick(&InputFrame::IDLE);
    assert_eq!(sim.state().survival_secs, 9);
    assert_eq!(clock.now_ms(), 10_499);
}

// =============================================================================
// PROPERTIES
// =============================================================================

fn any_enemy_type() -> impl Strategy<Value = EnemyType> {
    prop::sample::select(EnemyType::ALL.to_vec())
}

fn any_stat() -> impl Strategy<Value = StatKind> {
    prop::sample::select(StatKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn spawned_enemies_scale_with_survival_time(enemy_type in any_enemy_type(), secs in 0u32..20_000) {
        let mut rng = DeterministicRng::new(u64::from(secs) + 1);
        let enemy = create_enemy(1, enemy_type, secs, Vec2::new(100.0, 100.0), &mut rng);
        let base = enemy_type.base_stats();
        let t = f64::from(secs);
        prop_assert_eq!(enemy.health, (base.health * (1.0 + t / 30.0 * 0.25)).round());
        prop_assert_eq!(enemy.score_value, (base.score * (1.0 + t / 60.0 * 0.15)).round() as u64);
    }

    #[test]
    fn overflow_xp_is_discarded_on_level_up(overflow in 0u64..10_000) {
        let mut state = SimulationState::new(Weapon::Bow, 1, 0, &SimConfig::default());
        state.xp = state.next_level_xp + overflow;
        prop_assert!(check_level_up(&mut state, 0));
        prop_assert_eq!(state.xp, 0);
    }

    #[test]
    fn stat_upgrades_are_idempotent(kind in any_stat(), level in 1u8..=MAX_STAT_LEVEL) {
        let mut once = PlayerState::new(Weapon::Staff, Vec2::new(700.0, 500.0));
        apply_stat_level(&mut once, kind, level);
        let mut twice = once.clone();
        apply_stat_level(&mut twice, kind, level);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn spawning_never_exceeds_entity_limit(secs in 0u32..600, seed in any::<u64>()) {
        let config = SimConfig::default();
        let mut state = SimulationState::new(Weapon::Cannon, seed, 0, &config);
        state.survival_secs = secs;
        state.entity_limit = entity_limit(secs);
        for round in 0..60 {
            try_spawn(&mut state, &config, round * 10_000);
            prop_assert!(state.enemies.len() <= state.entity_limit);
        }
    }

    #[test]
    fn pierce_damage_decays_geometrically(
        initial in 1.0f64..500.0,
        count in 1u32..6,
        reduction in 0.0f64..0.9,
    ) {
        let config = SimConfig::default();
        let mut state = quiet_state(Weapon::Bow, 6);
        let idx = place(&mut state, EnemyType::Tank, Vec2::new(200.0, 0.0));
        state.enemies[idx].health = 1.0e9;
        let mut bullet = create_player_projectile(1, state.enemies[idx].position, 0.0, 0.0, 10.0, initial, Weapon::Bow);
        bullet.pierce = Some(Pierce { remaining: count, damage_reduction: reduction });
        state.projectiles.push(bullet);

        for k in 1..=count {
            resolve_projectile_hits(&mut state, &config, 0, &[]);
            if k < count {
                prop_assert_eq!(state.projectiles.len(), 1);
                let expected = initial * (1.0 - reduction).powi(k as i32);
                prop_assert!((state.projectiles[0].damage - expected).abs() < 1e-9 * initial.max(1.0));
            } else {
                prop_assert!(state.projectiles.is_empty());
            }
        }
    }

    #[test]
    fn shield_absorbs_until_pool_is_spent(pool in 1.0f64..200.0, hits in prop::collection::vec(1.0f64..40.0, 1..20)) {
        let mut effects = ActiveEffects::new();
        effects.insert(ActiveEffect::Shield { absorption: pool, remaining: pool, expires_at: 10_000 });

        let mut absorbed = 0.0;
        for hit in hits {
            let was_up = absorbed < pool;
            prop_assert_eq!(effects.shield_active(), was_up);
            let took = effects.absorb_with_shield(hit);
            prop_assert_eq!(took, was_up);
            if took {
                absorbed += hit;
            }
        }
        prop_assert_eq!(effects.shield_active(), absorbed < pool);
    }
}
