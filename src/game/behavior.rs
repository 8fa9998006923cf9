//! Enemy Behaviour
//!
//! Per-type movement followed by the soft separation pass, then the
//! type's special action: ranged enemies shoot, ability enemies use their
//! skill, AI enemies re-predict where the player is heading.

use std::f64::consts::{FRAC_PI_2, TAU};

use tracing::trace;

use crate::core::clock::Millis;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::collision::separate_enemy;
use crate::game::entity::{Enemy, EnemyKind, EnemyProjectile, EnemySkill};
use crate::game::events::GameEventData;
use crate::game::state::SimulationState;
use crate::game::tick::SimConfig;
use crate::MAX_ENEMY_PROJECTILES;

// ===== Ranged =====
const RANGED_PREFERRED_DISTANCE: f64 = 200.0;
const RANGED_DISTANCE_BAND: f64 = 50.0;
const RANGED_STRAFE_FACTOR: f64 = 0.5;
const RANGED_SHOOT_RANGE: f64 = 300.0;
const RANGED_FIRE_INTERVAL: Millis = 2_000;
const RANGED_BULLET_SPEED: f64 = 6.0;
const RANGED_BULLET_RADIUS: f64 = 4.0;

// ===== Ability =====
const SKILL_COOLDOWN: Millis = 8_000;
const SKILL_SHIELD_POINTS: f64 = 50.0;
const SKILL_SHIELD_DURATION: Millis = 5_000;
const SKILL_DASH_DISTANCE: f64 = 100.0;
const SKILL_HEAL: f64 = 40.0;
const SKILL_TELEPORT_MIN: f64 = 80.0;
const SKILL_TELEPORT_SPREAD: f64 = 40.0;
const BURST_BULLETS: u32 = 6;
const BURST_SPEED: f64 = 4.0;
const BURST_DAMAGE: f64 = 12.0;
const BURST_RADIUS: f64 = 3.0;
const BURST_PROJECTILE_CAP: usize = 40;

// ===== AI =====
const AI_PREDICTION_INTERVAL: Millis = 500;
const AI_PREDICTION_LEAD: f64 = 2.0;
const AI_DODGE_COOLDOWN: Millis = 1_000;
const AI_DODGE_DISTANCE: f64 = 50.0;

/// Advance every enemy: lift expired slows, move, separate, act.
///
/// Enemies are updated newest first; each one is separated against the
/// positions its neighbours have at that moment.
pub fn update_enemies(state: &mut SimulationState, config: &SimConfig, now: Millis) {
    let player_pos = state.player.position;

    for idx in (0..state.enemies.len()).rev() {
        {
            let enemy = &mut state.enemies[idx];
            lift_expired_slow(enemy, now);
            expire_skill_shield(enemy, now);
            move_enemy(enemy, player_pos, now);
        }
        separate_enemy(
            &mut state.enemies,
            idx,
            config.enemy_separation,
            config.field_width,
            config.field_height,
        );
        enemy_action(state, idx, config, now);
    }
}

/// Restore the unslowed speed once the slow window has passed.
pub fn lift_expired_slow(enemy: &mut Enemy, now: Millis) {
    if let Some(slow) = enemy.slow {
        if now >= slow.resume_at {
            enemy.speed = slow.original_speed;
            enemy.slow = None;
        }
    }
}

fn expire_skill_shield(enemy: &mut Enemy, now: Millis) {
    if let EnemyKind::Ability { shield_health, shield_expires_at, .. } = &mut enemy.kind {
        if shield_expires_at.is_some_and(|t| now >= t) {
            *shield_health = 0.0;
            *shield_expires_at = None;
        }
    }
}

/// Move one enemy for a tick according to its type.
pub fn move_enemy(enemy: &mut Enemy, player: Vec2, now: Millis) {
    let to_player = player - enemy.position;
    let distance = to_player.length();
    let heading = enemy.position.direction_to(player);
    let speed = enemy.speed;

    match &mut enemy.kind {
        EnemyKind::Ranged { .. } => {
            if distance > RANGED_PREFERRED_DISTANCE + RANGED_DISTANCE_BAND {
                enemy.position = enemy.position + heading * speed;
            } else if distance < RANGED_PREFERRED_DISTANCE - RANGED_DISTANCE_BAND {
                enemy.position = enemy.position - heading * speed;
            } else {
                let strafe = Vec2::from_angle(to_player.angle() + FRAC_PI_2);
                enemy.position = enemy.position + strafe * (speed * RANGED_STRAFE_FACTOR);
            }
        }

        EnemyKind::Ai { last_dodge, target, last_player_pos, .. } => {
            if last_dodge.map_or(true, |t| now - t > AI_PREDICTION_INTERVAL) {
                let seen = last_player_pos.unwrap_or(player);
                *target = player + (player - seen) * AI_PREDICTION_LEAD;
                *last_player_pos = Some(player);
            }
            let goal = *target;
            if goal.distance(enemy.position) > 0.0 {
                enemy.position = enemy.position + enemy.position.direction_to(goal) * speed;
            }
        }

        EnemyKind::Basic | EnemyKind::Fast | EnemyKind::Tank | EnemyKind::Elite | EnemyKind::Ability { .. } => {
            if distance > 0.0 {
                enemy.position = enemy.position + heading * speed;
            }
        }
    }
}

/// Run the type-specific action of enemy `idx`.
fn enemy_action(state: &mut SimulationState, idx: usize, config: &SimConfig, now: Millis) {
    let player_pos = state.player.position;
    let origin = state.enemies[idx].position;
    let enemy_id = state.enemies[idx].id;

    match state.enemies[idx].kind {
        EnemyKind::Ranged { last_shot, bullet_damage } => {
            let ready = last_shot.map_or(true, |t| now - t > RANGED_FIRE_INTERVAL);
            if !ready || origin.distance(player_pos) > RANGED_SHOOT_RANGE {
                return;
            }
            if state.enemy_projectiles.len() < MAX_ENEMY_PROJECTILES {
                let id = state.next_entity_id();
                state.enemy_projectiles.push(EnemyProjectile::new(
                    id,
                    origin,
                    origin.angle_to(player_pos),
                    RANGED_BULLET_SPEED,
                    bullet_damage,
                    RANGED_BULLET_RADIUS,
                ));
            }
            if let EnemyKind::Ranged { last_shot, .. } = &mut state.enemies[idx].kind {
                *last_shot = Some(now);
            }
        }

        EnemyKind::Ability { skill, last_used, .. } => {
            if last_used.is_some_and(|t| now - t <= SKILL_COOLDOWN) {
                return;
            }
            use_skill(state, idx, skill, config, now);
            if let EnemyKind::Ability { last_used, .. } = &mut state.enemies[idx].kind {
                *last_used = Some(now);
            }
            let position = state.enemies[idx].position;
            state.push_event(now, GameEventData::EnemySkillUsed { enemy_id, skill, position });
        }

        _ => {}
    }
}

/// Apply an ability enemy's skill.
fn use_skill(state: &mut SimulationState, idx: usize, skill: EnemySkill, config: &SimConfig, now: Millis) {
    let player_pos = state.player.position;
    trace!(enemy = state.enemies[idx].id, ?skill, "enemy skill");

    match skill {
        EnemySkill::Shield => {
            if let EnemyKind::Ability { shield_health, shield_expires_at, .. } = &mut state.enemies[idx].kind {
                *shield_health = SKILL_SHIELD_POINTS;
                *shield_expires_at = Some(now + SKILL_SHIELD_DURATION);
            }
        }

        EnemySkill::Dash => {
            let enemy = &mut state.enemies[idx];
            if enemy.position.distance(player_pos) > 0.0 {
                enemy.position = enemy.position + enemy.position.direction_to(player_pos) * SKILL_DASH_DISTANCE;
            }
        }

        EnemySkill::Heal => {
            let enemy = &mut state.enemies[idx];
            // Capped at the time-scaled max health, not the base table value.
            enemy.health = (enemy.health + SKILL_HEAL).min(enemy.max_health);
        }

        EnemySkill::Teleport => {
            let angle = state.rng.next_angle();
            let distance = SKILL_TELEPORT_MIN + state.rng.next_f64() * SKILL_TELEPORT_SPREAD;
            let enemy = &mut state.enemies[idx];
            enemy.position = (player_pos + Vec2::from_angle(angle) * distance).clamp_to_field(
                config.field_width,
                config.field_height,
                enemy.radius,
            );
        }

        EnemySkill::Burst => {
            if state.enemy_projectiles.len() >= BURST_PROJECTILE_CAP {
                return;
            }
            let origin = state.enemies[idx].position;
            for i in 0..BURST_BULLETS {
                let angle = i as f64 / BURST_BULLETS as f64 * TAU;
                let id = state.next_entity_id();
                state.enemy_projectiles.push(EnemyProjectile::new(
                    id,
                    origin,
                    angle,
                    BURST_SPEED,
                    BURST_DAMAGE,
                    BURST_RADIUS,
                ));
            }
        }
    }
}

/// Roll an AI enemy's dodge against a projectile heading along `heading`.
///
/// The roll is drawn for every AI hit, even while the dodge is cooling
/// down. A successful dodge sidesteps 50 px perpendicular to the heading.
pub fn try_dodge(enemy: &mut Enemy, heading: f64, rng: &mut DeterministicRng, now: Millis) -> bool {
    let EnemyKind::Ai { dodge_chance, last_dodge, .. } = &mut enemy.kind else {
        return false;
    };
    let roll = rng.next_f64();
    if roll >= *dodge_chance || last_dodge.is_some_and(|t| now - t <= AI_DODGE_COOLDOWN) {
        return false;
    }
    *last_dodge = Some(now);
    enemy.position = enemy.position + Vec2::from_angle(heading + FRAC_PI_2) * AI_DODGE_DISTANCE;
    true
}

// =============================================================================
// TESTS
// =============================================================================
