//! Enemy Spawning
//!
//! Decides when, where and what to spawn from the survival time and the
//! current population. Every random draw comes from the state's RNG.

use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::core::clock::Millis;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::entity::{create_enemy, Enemy, EnemyType};
use crate::game::state::SimulationState;
use crate::game::tick::SimConfig;

/// Configuration for enemy placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Minimum distance from the player
    pub min_player_distance: f64,
    /// Minimum distance from every existing enemy
    pub min_enemy_distance: f64,
    /// Placement attempts before accepting the last sample
    pub max_attempts: u32,
    /// Keep-out margin along the field edges
    pub edge_margin: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            min_player_distance: 200.0,
            min_enemy_distance: 40.0,
            max_attempts: 50,
            edge_margin: 50.0,
        }
    }
}

/// Spawn interval (ms) and batch size for a survival time.
pub fn spawn_schedule(survival_secs: u32) -> (Millis, usize) {
    match survival_secs {
        0..=29 => (2_000, 1),
        30..=59 => (1_500, 1),
        60..=119 => (1_000, 2),
        120..=179 => (800, 3),
        _ => (600, 2),
    }
}

/// Enemy type for one uniform `roll` in [0, 1) at a survival time.
pub fn pick_enemy_type(survival_secs: u32, roll: f64) -> EnemyType {
    let table: &[(f64, EnemyType)] = match survival_secs {
        0..=29 => &[],
        30..=59 => &[(0.6, EnemyType::Fast)],
        60..=119 => &[(0.4, EnemyType::Tank), (0.8, EnemyType::Fast)],
        120..=179 => &[(0.3, EnemyType::Elite), (0.6, EnemyType::Tank), (0.85, EnemyType::Fast)],
        _ => &[
            (0.15, EnemyType::Ai),
            (0.25, EnemyType::Ability),
            (0.35, EnemyType::Ranged),
            (0.5, EnemyType::Elite),
            (0.7, EnemyType::Tank),
            (0.9, EnemyType::Fast),
        ],
    };

    table
        .iter()
        .find(|(threshold, _)| roll < *threshold)
        .map_or(EnemyType::Basic, |(_, t)| *t)
}

/// Sample a spawn point away from the player and existing enemies.
///
/// After `max_attempts` rejected samples the last one is used anyway.
pub fn pick_spawn_position(
    rng: &mut DeterministicRng,
    player: Vec2,
    enemies: &[Enemy],
    width: f64,
    height: f64,
    config: &SpawnConfig,
) -> Vec2 {
    let mut candidate = rng.random_point(width, height, config.edge_margin);
    for attempt in 1..=config.max_attempts.max(1) {
        let far_from_player = candidate.distance(player) >= config.min_player_distance;
        let clear_of_enemies = enemies
            .iter()
            .all(|e| candidate.distance(e.position) >= config.min_enemy_distance);
        if far_from_player && clear_of_enemies {
            return candidate;
        }
        if attempt < config.max_attempts {
            candidate = rng.random_point(width, height, config.edge_margin);
        }
    }
    candidate
}

/// Spawn a batch if the interval elapsed and the population is under the limit.
///
/// Returns the number of enemies created. The batch is truncated at the
/// entity limit.
pub fn try_spawn(state: &mut SimulationState, config: &SimConfig, now: Millis) -> usize {
    let (interval, batch) = spawn_schedule(state.survival_secs);
    let due = state.last_spawn.map_or(true, |t| now - t > interval);
    if !due || state.enemies.len() >= state.entity_limit {
        return 0;
    }

    let mut spawned = 0;
    while spawned < batch && state.enemies.len() < state.entity_limit {
        let position = pick_spawn_position(
            &mut state.rng,
            state.player.position,
            &state.enemies,
            config.field_width,
            config.field_height,
            &config.spawn,
        );
        let enemy_type = pick_enemy_type(state.survival_secs, state.rng.next_f64());
        let id = state.next_entity_id();
        let enemy = create_enemy(id, enemy_type, state.survival_secs, position, &mut state.rng);
        trace!(id, kind = enemy_type.key(), x = position.x, y = position.y, "enemy spawned");
        state.enemies.push(enemy);
        spawned += 1;
    }

    state.last_spawn = Some(now);
    spawned
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Weapon;

    fn new_state() -> SimulationState {
        SimulationState::new(Weapon::Bow, 42, 0, &SimConfig::default())
    }

    #[test]
    fn test_schedule_thresholds() {
        assert_eq!(spawn_schedule(0), (2_000, 1));
        assert_eq!(spawn_schedule(29), (2_000, 1));
        assert_eq!(spawn_schedule(30), (1_500, 1));
        assert_eq!(spawn_schedule(60), (1_000, 2));
        assert_eq!(spawn_schedule(150), (800, 3));
        assert_eq!(spawn_schedule(180), (600, 2));
        assert_eq!(spawn_schedule(10_000), (600, 2));
    }

    #[test]
    fn test_type_table() {
        assert_eq!(pick_enemy_type(10, 0.0), EnemyType::Basic);
        assert_eq!(pick_enemy_type(45, 0.59), EnemyType::Fast);
        assert_eq!(pick_enemy_type(45, 0.6), EnemyType::Basic);
        assert_eq!(pick_enemy_type(90, 0.1), EnemyType::Tank);
        assert_eq!(pick_enemy_type(90, 0.5), EnemyType::Fast);
        assert_eq!(pick_enemy_type(150, 0.2), EnemyType::Elite);
        assert_eq!(pick_enemy_type(150, 0.9), EnemyType::Basic);
        assert_eq!(pick_enemy_type(200, 0.1), EnemyType::Ai);
        assert_eq!(pick_enemy_type(200, 0.2), EnemyType::Ability);
        assert_eq!(pick_enemy_type(200, 0.3), EnemyType::Ranged);
        assert_eq!(pick_enemy_type(200, 0.95), EnemyType::Basic);
    }

    #[test]
    fn test_position_respects_distances() {
        let mut rng = DeterministicRng::new(5);
        let config = SpawnConfig::default();
        let player = Vec2::new(700.0, 500.0);
        for _ in 0..100 {
            let p = pick_spawn_position(&mut rng, player, &[], 1400.0, 1000.0, &config);
            assert!(p.distance(player) >= 200.0);
            assert!(p.x >= 50.0 && p.x <= 1350.0);
            assert!(p.y >= 50.0 && p.y <= 950.0);
        }
    }

    #[test]
    fn test_position_gives_up_after_attempts() {
        // Field too small to ever be 200 px away: last sample is accepted
        let mut rng = DeterministicRng::new(5);
        let config = SpawnConfig::default();
        let p = pick_spawn_position(&mut rng, Vec2::new(100.0, 100.0), &[], 200.0, 200.0, &config);
        assert!(p.x >= 50.0 && p.x <= 150.0);
    }

    #[test]
    fn test_first_spawn_immediate_then_interval() {
        let mut state = new_state();
        let config = SimConfig::default();
        assert_eq!(try_spawn(&mut state, &config, 0), 1);
        assert_eq!(state.last_spawn, Some(0));
        // Interval is strict
        assert_eq!(try_spawn(&mut state, &config, 2_000), 0);
        assert_eq!(try_spawn(&mut state, &config, 2_001), 1);
        assert_eq!(state.enemies.len(), 2);
    }

    #[test]
    fn test_batch_truncated_at_limit() {
        let mut state = new_state();
        let config = SimConfig::default();
        state.survival_secs = 150;
        state.entity_limit = 2;
        assert_eq!(try_spawn(&mut state, &config, 0), 2);
        assert_eq!(state.enemies.len(), 2);
        assert_eq!(try_spawn(&mut state, &config, 10_000), 0);
    }

    #[test]
    fn test_spawned_enemies_scaled() {
        let mut state = new_state();
        let config = SimConfig::default();
        state.survival_secs = 90;
        state.entity_limit = 50;
        try_spawn(&mut state, &config, 0);
        for enemy in &state.enemies {
            let base = enemy.enemy_type().base_stats();
            assert_eq!(enemy.health, (base.health * 1.75).round());
            assert_eq!(enemy.contact_damage, 15.0);
        }
    }
}
