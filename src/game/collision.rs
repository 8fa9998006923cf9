//! Collision Detection
//!
//! Circle-circle overlap, beam (point-to-segment) tests, exhaustive
//! nearest-enemy scans and the enemy soft-separation pass. No spatial
//! index: every query scans the enemy list in order, so ties resolve to
//! the earliest-spawned enemy.

use crate::core::vec2::Vec2;
use crate::game::entity::Enemy;

/// Check if two circles overlap (touching does not count).
#[inline]
pub fn circles_overlap(pos_a: Vec2, radius_a: f64, pos_b: Vec2, radius_b: f64) -> bool {
    pos_a.distance(pos_b) < radius_a + radius_b
}

/// Check if a circle touches a beam of `length` and `width` leaving `start` along `angle`.
///
/// The circle centre must project onto the beam segment and lie within
/// `width / 2 + radius` of its axis.
pub fn beam_hits(start: Vec2, angle: f64, length: f64, width: f64, center: Vec2, radius: f64) -> bool {
    let axis = Vec2::from_angle(angle);
    let offset = center - start;
    let projection = offset.dot(axis);
    if projection < 0.0 || projection > length {
        return false;
    }
    let perpendicular = offset.dot(axis.perpendicular()).abs();
    perpendicular <= width / 2.0 + radius
}

/// Index of the nearest living enemy to `from`.
pub fn nearest_enemy(enemies: &[Enemy], from: Vec2) -> Option<usize> {
    nearest_enemy_where(enemies, from, |_, _| true)
}

/// Index of the nearest living enemy to `from` accepted by `filter`.
///
/// `filter` receives the enemy's index and the enemy itself.
pub fn nearest_enemy_where<F>(enemies: &[Enemy], from: Vec2, mut filter: F) -> Option<usize>
where
    F: FnMut(usize, &Enemy) -> bool,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, enemy) in enemies.iter().enumerate() {
        if enemy.is_dead() || !filter(idx, enemy) {
            continue;
        }
        let d = enemy.position.distance_squared(from);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((idx, d));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Push enemy `idx` out of every neighbour closer than the sum of radii plus `padding`.
///
/// Only the enemy being updated moves, by half the overlap each time, and
/// it is clamped to the field after every push. Neighbours get their turn
/// when they are updated.
pub fn separate_enemy(enemies: &mut [Enemy], idx: usize, padding: f64, width: f64, height: f64) {
    let mut position = enemies[idx].position;
    let radius = enemies[idx].radius;

    for (other_idx, other) in enemies.iter().enumerate() {
        if other_idx == idx {
            continue;
        }
        let delta = position - other.position;
        let distance = delta.length();
        let min_distance = radius + other.radius + padding;
        if distance < min_distance && distance > 0.0 {
            let push = (min_distance - distance) / 2.0;
            position = (position + delta * (push / distance)).clamp_to_field(width, height, radius);
        }
    }

    enemies[idx].position = position;
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::entity::{create_enemy, EnemyType};

    fn enemy_at(id: u32, t: EnemyType, x: f64, y: f64) -> Enemy {
        let mut rng = DeterministicRng::new(1);
        create_enemy(id, t, 0, Vec2::new(x, y), &mut rng)
    }

    #[test]
    fn test_circles_overlap() {
        let a = Vec2::new(0.0, 0.0);
        // Distance 10, combined radius 12
        assert!(circles_overlap(a, 6.0, Vec2::new(10.0, 0.0), 6.0));
        // Touching is not overlapping
        assert!(!circles_overlap(a, 5.0, Vec2::new(10.0, 0.0), 5.0));
        assert!(!circles_overlap(a, 2.0, Vec2::new(20.0, 0.0), 2.0));
    }

    #[test]
    fn test_beam_hits() {
        let start = Vec2::new(0.0, 0.0);
        // Along the axis
        assert!(beam_hits(start, 0.0, 400.0, 15.0, Vec2::new(200.0, 0.0), 10.0));
        // Off to the side: 7.5 + 10 = 17.5 allowed
        assert!(beam_hits(start, 0.0, 400.0, 15.0, Vec2::new(200.0, 17.0), 10.0));
        assert!(!beam_hits(start, 0.0, 400.0, 15.0, Vec2::new(200.0, 18.0), 10.0));
        // Behind the start and past the end
        assert!(!beam_hits(start, 0.0, 400.0, 15.0, Vec2::new(-1.0, 0.0), 10.0));
        assert!(!beam_hits(start, 0.0, 400.0, 15.0, Vec2::new(401.0, 0.0), 10.0));
        // Rotated beam
        let up = std::f64::consts::FRAC_PI_2;
        assert!(beam_hits(start, up, 100.0, 20.0, Vec2::new(5.0, 50.0), 1.0));
    }

    #[test]
    fn test_nearest_enemy_skips_dead_and_ties_first() {
        let mut enemies = vec![
            enemy_at(1, EnemyType::Basic, 10.0, 0.0),
            enemy_at(2, EnemyType::Basic, -10.0, 0.0),
            enemy_at(3, EnemyType::Basic, 5.0, 0.0),
        ];
        assert_eq!(nearest_enemy(&enemies, Vec2::ZERO), Some(2));

        enemies[2].health = 0.0;
        assert_eq!(nearest_enemy(&enemies, Vec2::ZERO), Some(0));
        assert_eq!(nearest_enemy(&[], Vec2::ZERO), None);
    }

    #[test]
    fn test_nearest_enemy_where_filters() {
        let enemies = vec![
            enemy_at(1, EnemyType::Basic, 10.0, 0.0),
            enemy_at(2, EnemyType::Basic, 100.0, 0.0),
        ];
        let found = nearest_enemy_where(&enemies, Vec2::ZERO, |idx, _| idx != 0);
        assert_eq!(found, Some(1));
        let none = nearest_enemy_where(&enemies, Vec2::ZERO, |_, e| e.position.x > 500.0);
        assert_eq!(none, None);
    }

    #[test]
    fn test_separation_is_asymmetric() {
        // Two basics (radius 15) 20 apart: min distance 35, overlap 15
        let mut enemies = vec![
            enemy_at(1, EnemyType::Basic, 500.0, 500.0),
            enemy_at(2, EnemyType::Basic, 520.0, 500.0),
        ];
        separate_enemy(&mut enemies, 0, 5.0, 1400.0, 1000.0);
        assert_eq!(enemies[0].position, Vec2::new(492.5, 500.0));
        assert_eq!(enemies[1].position, Vec2::new(520.0, 500.0));
    }

    #[test]
    fn test_separation_ignores_coincident_and_clamps() {
        let mut enemies = vec![
            enemy_at(1, EnemyType::Basic, 100.0, 100.0),
            enemy_at(2, EnemyType::Basic, 100.0, 100.0),
        ];
        separate_enemy(&mut enemies, 0, 5.0, 1400.0, 1000.0);
        assert_eq!(enemies[0].position, Vec2::new(100.0, 100.0));

        let mut edge = vec![
            enemy_at(1, EnemyType::Basic, 16.0, 500.0),
            enemy_at(2, EnemyType::Basic, 30.0, 500.0),
        ];
        separate_enemy(&mut edge, 0, 5.0, 1400.0, 1000.0);
        assert_eq!(edge[0].position.x, 15.0);
    }
}
