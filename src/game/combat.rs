//! Combat Resolver
//!
//! Auto-fire, projectile motion, player contact (shielded or not),
//! projectile hits with their on-hit effects, enemy bullets, death reaping
//! and burn damage-over-time.
//!
//! Removals never happen while a list is being walked: hits mark entities
//! (dead enemies keep `health <= 0`, spent projectiles are flagged) and the
//! lists are compacted afterwards.

use tracing::trace;

use crate::core::clock::Millis;
use crate::core::vec2::Vec2;
use crate::game::ability::{
    level_index, AbilityId, EXPLOSIVE_DAMAGE, EXPLOSIVE_RADIUS, FIRESHOT_BURN_DAMAGE,
    FIRESHOT_BURN_DURATION, MANA_ARC_STEP, MULTISHOT_ARC_STEP, MULTISHOT_DAMAGE_FACTOR,
    MULTISHOT_EXTRA_ARROWS,
};
use crate::game::behavior::try_dodge;
use crate::game::collision::{circles_overlap, nearest_enemy};
use crate::game::effects::EffectKind;
use crate::game::entity::{
    create_player_projectile, BurnPayload, BurnState, EnemyKind, EntityId, Pierce, Projectile,
};
use crate::game::events::{DamageSource, GameEventData};
use crate::game::state::SimulationState;
use crate::game::tick::SimConfig;
use crate::{FRAME_MS, MAX_PLAYER_PROJECTILES};

// =============================================================================
// AUTO-FIRE
// =============================================================================

/// Fire at the nearest living enemy if the weapon is ready.
///
/// Returns the number of projectiles created.
pub fn auto_fire(state: &mut SimulationState, now: Millis) -> usize {
    let player = &state.player;
    let mana = player.effects.mana_extra_projectiles();
    let ready = mana.is_some()
        || player
            .last_shot
            .map_or(true, |t| (now - t) as f64 > 1000.0 / player.fire_rate);
    if !ready || state.projectiles.len() >= MAX_PLAYER_PROJECTILES {
        return 0;
    }
    let Some(target) = nearest_enemy(&state.enemies, player.position) else {
        return 0;
    };

    let origin = player.position;
    let muzzle = player.radius;
    let weapon = player.weapon;
    let speed = weapon.stats().projectile_speed;
    let base_damage = player.damage;
    let angle = origin.angle_to(state.enemies[target].position);
    let berserker = player.effects.berserker();
    let piercing = player.effects.piercing();
    let fireshot = player.ability_level(AbilityId::Fireshot);
    let multishot = player.ability_level(AbilityId::Multishot);

    let mut damage = base_damage;
    if let Some((damage_bonus, _)) = berserker {
        damage *= 1.0 + damage_bonus;
    }
    let overcharge = state.player.effects.consume_overcharge();
    if let Some(shot) = overcharge {
        damage *= shot.damage_multiplier;
    }

    let mut main = new_projectile(state, origin, angle, muzzle, speed, damage);
    main.pierce = match (overcharge, piercing) {
        (Some(shot), piercing) => Some(Pierce {
            remaining: shot.pierce_count,
            damage_reduction: piercing.map_or(0.0, |(_, reduction)| reduction),
        }),
        (None, Some((count, reduction))) => Some(Pierce { remaining: count, damage_reduction: reduction }),
        (None, None) => None,
    };
    if fireshot > 0 {
        main.burn = Some(BurnPayload {
            damage_per_tick: FIRESHOT_BURN_DAMAGE[level_index(fireshot)],
            duration_ms: FIRESHOT_BURN_DURATION,
        });
    }
    let mut fired = push_projectile(state, main);

    if multishot > 0 {
        let extra = MULTISHOT_EXTRA_ARROWS[level_index(multishot)];
        for i in 0..extra {
            let spread = angle + MULTISHOT_ARC_STEP * spread_offset(i, extra);
            let arrow = new_projectile(state, origin, spread, muzzle, speed, base_damage * MULTISHOT_DAMAGE_FACTOR);
            fired += push_projectile(state, arrow);
        }
    }

    if let Some(extra) = mana {
        for i in 0..extra {
            let spread = angle + MANA_ARC_STEP * spread_offset(i, extra);
            let bolt = new_projectile(state, origin, spread, muzzle, speed, damage);
            fired += push_projectile(state, bolt);
        }
    }

    state.player.last_shot = Some(match (berserker, state.player.last_shot) {
        (Some((_, speed_bonus)), Some(last)) => now - ((now - last) as f64 * speed_bonus).round() as Millis,
        _ => now,
    });

    trace!(fired, damage, "auto-fire");
    fired
}

/// `i - count/2 + 0.5`, the fan position of projectile `i` of `count`.
#[inline]
fn spread_offset(i: u32, count: u32) -> f64 {
    i as f64 - count as f64 / 2.0 + 0.5
}

fn new_projectile(
    state: &mut SimulationState,
    origin: Vec2,
    angle: f64,
    muzzle: f64,
    speed: f64,
    damage: f64,
) -> Projectile {
    let id = state.next_entity_id();
    create_player_projectile(id, origin, angle, muzzle, speed, damage, state.player.weapon)
}

/// Add a projectile unless the cap is reached.
fn push_projectile(state: &mut SimulationState, projectile: Projectile) -> usize {
    if state.projectiles.len() >= MAX_PLAYER_PROJECTILES {
        return 0;
    }
    state.projectiles.push(projectile);
    1
}

// =============================================================================
// MOTION
// =============================================================================

/// Move player projectiles; drop those off the field or past the player's range.
pub fn advance_projectiles(state: &mut SimulationState, config: &SimConfig) {
    let range = state.player.range;
    state.projectiles.retain_mut(|p| {
        p.position = p.position + p.velocity;
        p.distance_traveled += p.velocity.length();
        p.position.is_in_field(config.field_width, config.field_height) && p.distance_traveled <= range
    });
}

/// Decay damage flashes by one frame.
pub fn decay_flashes(state: &mut SimulationState) {
    let frame = FRAME_MS as f64;
    if state.player.damage_flash > 0.0 {
        state.player.damage_flash -= frame;
    }
    for enemy in &mut state.enemies {
        if enemy.damage_flash > 0.0 {
            enemy.damage_flash -= frame;
        }
    }
}

// =============================================================================
// PLAYER CONTACT
// =============================================================================

/// Resolve shield knock-backs and body contact for every enemy.
///
/// With a shield up, enemies inside the shield radius are pushed away and
/// drain the shield instead of touching the player. Without one, touching
/// enemies deal their contact damage and vanish without rewards.
/// Returns the ids of enemies pushed by the shield; they skip projectile
/// hits this tick.
pub fn resolve_player_contacts(state: &mut SimulationState, config: &SimConfig, now: Millis) -> Vec<EntityId> {
    let mut pushed = Vec::new();
    let mut touched = Vec::new();
    let player_pos = state.player.position;
    let player_radius = state.player.radius;

    for idx in (0..state.enemies.len()).rev() {
        let (position, radius, contact_damage, id) = {
            let e = &state.enemies[idx];
            (e.position, e.radius, e.contact_damage, e.id)
        };
        let distance = position.distance(player_pos);

        if state.player.effects.shield_active() && distance < config.shield_radius + radius {
            let away = Vec2::from_angle(player_pos.angle_to(position));
            let moved = (position + away * config.shield_push_distance).clamp_to_field(
                config.field_width,
                config.field_height,
                radius,
            );
            state.enemies[idx].position = moved;
            state.player.effects.absorb_with_shield(config.shield_push_cost);
            state.push_event(now, GameEventData::ShieldPush { position: moved });
            pushed.push(id);
            continue;
        }

        if distance < player_radius + radius {
            state.player.take_damage(contact_damage);
            state.kill_streak = 0;
            state.push_event(
                now,
                GameEventData::PlayerDamaged { amount: contact_damage, source: DamageSource::Contact },
            );
            touched.push(id);
        }
    }

    if !touched.is_empty() {
        state.enemies.retain(|e| !touched.contains(&e.id));
    }
    pushed
}

// =============================================================================
// PROJECTILE HITS
// =============================================================================

/// Resolve player projectiles against enemies.
///
/// Each enemy takes at most one projectile per tick (the newest one
/// overlapping it). Enemies listed in `skip` are not hit.
pub fn resolve_projectile_hits(state: &mut SimulationState, config: &SimConfig, now: Millis, skip: &[EntityId]) {
    let mut spent = vec![false; state.projectiles.len()];
    let explosive = state.player.ability_level(AbilityId::Explosive);

    for idx in (0..state.enemies.len()).rev() {
        if state.enemies[idx].is_dead() || skip.contains(&state.enemies[idx].id) {
            continue;
        }

        for j in (0..state.projectiles.len()).rev() {
            if spent[j] {
                continue;
            }
            let (bullet_pos, bullet_radius, heading) = {
                let p = &state.projectiles[j];
                (p.position, p.radius, p.velocity.angle())
            };
            let enemy = &mut state.enemies[idx];
            if !circles_overlap(bullet_pos, bullet_radius, enemy.position, enemy.radius) {
                continue;
            }

            if try_dodge(enemy, heading, &mut state.rng, now) {
                let (enemy_id, position) = (enemy.id, enemy.position);
                state.push_event(now, GameEventData::EnemyDodged { enemy_id, position });
                continue;
            }

            let damage = state.projectiles[j].damage;
            apply_projectile_damage(state, idx, j, damage, config, now);

            if explosive > 0 {
                let i = level_index(explosive);
                explode(state, idx, bullet_pos, EXPLOSIVE_RADIUS[i], EXPLOSIVE_DAMAGE[i], now);
            }

            let projectile = &mut state.projectiles[j];
            let pierced = match projectile.pierce.as_mut() {
                Some(pierce) if pierce.remaining > 0 => {
                    pierce.remaining -= 1;
                    projectile.damage *= 1.0 - pierce.damage_reduction;
                    spent[j] = pierce.remaining == 0;
                    true
                }
                _ => {
                    spent[j] = true;
                    false
                }
            };
            if pierced {
                state.push_event(now, GameEventData::PierceImpact { position: bullet_pos });
            }
            break;
        }
    }

    let mut flags = spent.into_iter();
    state.projectiles.retain(|_| !flags.next().unwrap_or(false));
}

/// Damage enemy `idx` with projectile `j`.
///
/// Ability-enemy shields absorb the whole hit. Otherwise bloodthirst turns
/// the hit into an execution, the burn payload attaches, and vampiric heals
/// the player.
fn apply_projectile_damage(
    state: &mut SimulationState,
    idx: usize,
    j: usize,
    damage: f64,
    config: &SimConfig,
    now: Millis,
) {
    if let EnemyKind::Ability { shield_health, .. } = &mut state.enemies[idx].kind {
        if *shield_health > 0.0 {
            *shield_health -= damage;
            return;
        }
    }

    let executing = state.player.effects.contains(EffectKind::Bloodthirst);
    let burn = state.projectiles[j].burn;
    let enemy = &mut state.enemies[idx];
    let damage = if executing { enemy.health } else { damage };
    enemy.apply_damage(damage);
    if let Some(payload) = burn {
        enemy.burn = Some(BurnState {
            damage_per_tick: payload.damage_per_tick,
            ends_at: now + payload.duration_ms,
            next_tick_at: now + config.burn_interval_ms,
        });
    }
    let position = enemy.position;
    if executing {
        state.push_event(now, GameEventData::BloodthirstKill { position });
    }

    if let Some(life_steal) = state.player.effects.life_steal() {
        let player = &mut state.player;
        player.health = (player.health + damage * life_steal).min(player.max_health);
    }
}

/// Explosive rounds: area damage at the impact point, half for the enemy hit directly.
fn explode(state: &mut SimulationState, primary: usize, center: Vec2, radius: f64, damage: f64, now: Millis) {
    for (idx, enemy) in state.enemies.iter_mut().enumerate() {
        if enemy.is_dead() && idx != primary {
            continue;
        }
        if enemy.position.distance(center) <= radius {
            enemy.apply_damage(if idx == primary { damage * 0.5 } else { damage });
        }
    }
    state.push_event(now, GameEventData::Explosion { position: center, radius });
}

// =============================================================================
// ENEMY PROJECTILES
// =============================================================================

/// Move enemy bullets and resolve hits on the player.
///
/// An active shield widens the hit radius and absorbs the bullet's damage.
pub fn advance_enemy_projectiles(state: &mut SimulationState, config: &SimConfig, now: Millis) {
    let bullets = std::mem::take(&mut state.enemy_projectiles);
    let mut kept = Vec::with_capacity(bullets.len());

    for mut bullet in bullets {
        bullet.position = bullet.position + bullet.velocity;
        if !bullet.position.is_in_field(config.field_width, config.field_height) {
            continue;
        }

        let shielded = state.player.effects.shield_active();
        let reach = if shielded { config.shield_radius } else { state.player.radius };
        if bullet.position.distance(state.player.position) >= bullet.radius + reach {
            kept.push(bullet);
            continue;
        }

        if shielded && state.player.effects.absorb_with_shield(bullet.damage) {
            state.push_event(now, GameEventData::ShieldImpact { position: bullet.position });
        } else {
            state.player.take_damage(bullet.damage);
            state.kill_streak = 0;
            state.push_event(
                now,
                GameEventData::PlayerDamaged { amount: bullet.damage, source: DamageSource::Projectile },
            );
        }
    }

    // Bullets fired while we were iterating stay queued.
    kept.append(&mut state.enemy_projectiles);
    state.enemy_projectiles = kept;
}

// =============================================================================
// DEATH & BURN
// =============================================================================

/// Remove dead enemies, paying out their rewards.
///
/// Every reaped death extends the kill streak. Returns the number reaped.
pub fn reap_dead(state: &mut SimulationState, now: Millis) -> usize {
    if !state.enemies.iter().any(|e| e.is_dead()) {
        return 0;
    }

    let (dead, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut state.enemies)
        .into_iter()
        .partition(|e| e.is_dead());
    state.enemies = alive;

    for enemy in &dead {
        state.score += enemy.score_value;
        state.xp += enemy.xp_value;
        state.kill_streak += 1;
        state.push_event(
            now,
            GameEventData::EnemyKilled {
                enemy_id: enemy.id,
                enemy_type: enemy.enemy_type(),
                score: enemy.score_value,
                xp: enemy.xp_value,
            },
        );
    }
    trace!(count = dead.len(), streak = state.kill_streak, "enemies reaped");
    dead.len()
}

/// Apply due burn ticks and clear finished burns.
pub fn tick_burns(state: &mut SimulationState, config: &SimConfig, now: Millis) {
    let mut ticks = Vec::new();
    for enemy in state.enemies.iter_mut().filter(|e| !e.is_dead()) {
        let Some(burn) = enemy.burn.as_mut() else {
            continue;
        };
        if now >= burn.ends_at {
            enemy.burn = None;
            continue;
        }
        if now >= burn.next_tick_at {
            burn.next_tick_at = now + config.burn_interval_ms;
            let damage = burn.damage_per_tick;
            enemy.apply_damage(damage);
            ticks.push(enemy.position);
        }
    }
    for position in ticks {
        state.push_event(now, GameEventData::BurnTick { position });
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ability::{AbilityId, PIERCING_DAMAGE_REDUCTION};
    use crate::game::effects::ActiveEffect;
    use crate::game::entity::{create_enemy, EnemyProjectile, EnemyType, Weapon};
    use crate::game::state::AbilitySlot;

    fn new_state(weapon: Weapon) -> SimulationState {
        SimulationState::new(weapon, 11, 0, &SimConfig::default())
    }

    fn spawn(state: &mut SimulationState, t: EnemyType, offset: Vec2) -> usize {
        let id = state.next_entity_id();
        let pos = state.player.position + offset;
        let enemy = create_enemy(id, t, 0, pos, &mut state.rng);
        state.enemies.push(enemy);
        state.enemies.len() - 1
    }

    fn own(state: &mut SimulationState, id: AbilityId, level: u8) {
        state.player.abilities.insert(id, AbilitySlot { level, last_used: None });
    }

    /// Projectile sitting on top of enemy `idx`.
    fn bullet_on(state: &mut SimulationState, idx: usize, damage: f64) {
        let id = state.next_entity_id();
        let mut p = create_player_projectile(id, state.enemies[idx].position, 0.0, 0.0, 10.0, damage, state.player.weapon);
        p.velocity = Vec2::new(10.0, 0.0);
        state.projectiles.push(p);
    }

    #[test]
    fn test_auto_fire_needs_target_and_cooldown() {
        let mut state = new_state(Weapon::Bow);
        assert_eq!(auto_fire(&mut state, 0), 0);

        spawn(&mut state, EnemyType::Basic, Vec2::new(100.0, 0.0));
        assert_eq!(auto_fire(&mut state, 0), 1);
        let p = &state.projectiles[0];
        assert_eq!(p.damage, 25.0);
        assert!((p.position.x - 715.0).abs() < 1e-9);
        assert!((p.velocity.x - 10.0).abs() < 1e-9);

        // 1000 / 1.67 = 598.8 ms between shots
        assert_eq!(auto_fire(&mut state, 598), 0);
        assert_eq!(auto_fire(&mut state, 599), 1);
    }

    #[test]
    fn test_auto_fire_berserker_then_overcharge() {
        let mut state = new_state(Weapon::Cannon);
        spawn(&mut state, EnemyType::Tank, Vec2::new(100.0, 0.0));
        state.player.effects.insert(ActiveEffect::Berserker { damage_bonus: 0.6, speed_bonus: 0.4, expires_at: 10_000 });
        state.player.effects.insert(ActiveEffect::Overcharge { shots_remaining: 1, damage_multiplier: 2.0, pierce_count: 3 });

        auto_fire(&mut state, 0);
        let p = &state.projectiles[0];
        assert!((p.damage - 45.0 * 1.6 * 2.0).abs() < 1e-9);
        assert_eq!(p.pierce, Some(Pierce { remaining: 3, damage_reduction: 0.0 }));
        assert!(!state.player.effects.contains(EffectKind::Overcharge));
    }

    #[test]
    fn test_berserker_shortens_cooldown() {
        let mut state = new_state(Weapon::Cannon);
        spawn(&mut state, EnemyType::Tank, Vec2::new(100.0, 0.0));
        state.player.last_shot = Some(0);
        state.player.effects.insert(ActiveEffect::Berserker { damage_bonus: 0.6, speed_bonus: 0.4, expires_at: 100_000 });
        assert_eq!(auto_fire(&mut state, 2_001), 1);
        // elapsed 2001 * 0.4 = 800.4 rounds to 800
        assert_eq!(state.player.last_shot, Some(1_201));
    }

    #[test]
    fn test_multishot_fan() {
        let mut state = new_state(Weapon::Bow);
        own(&mut state, AbilityId::Multishot, 1);
        spawn(&mut state, EnemyType::Basic, Vec2::new(100.0, 0.0));
        assert_eq!(auto_fire(&mut state, 0), 3);
        let angles: Vec<f64> = state.projectiles.iter().map(|p| p.velocity.angle()).collect();
        assert!(angles[0].abs() < 1e-9);
        assert!((angles[1] + MULTISHOT_ARC_STEP / 2.0).abs() < 1e-9);
        assert!((angles[2] - MULTISHOT_ARC_STEP / 2.0).abs() < 1e-9);
        assert!((state.projectiles[1].damage - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_mana_ignores_cooldown() {
        let mut state = new_state(Weapon::Staff);
        spawn(&mut state, EnemyType::Basic, Vec2::new(100.0, 0.0));
        state.player.effects.insert(ActiveEffect::Mana { extra_projectiles: 2, expires_at: 5_000 });
        assert_eq!(auto_fire(&mut state, 0), 3);
        assert_eq!(auto_fire(&mut state, 16), 3);
    }

    #[test]
    fn test_projectile_cap() {
        let mut state = new_state(Weapon::Bow);
        own(&mut state, AbilityId::Multishot, 3);
        spawn(&mut state, EnemyType::Basic, Vec2::new(100.0, 0.0));
        for _ in 0..98 {
            let p = create_player_projectile(0, Vec2::new(5.0, 5.0), 0.0, 0.0, 0.0, 1.0, Weapon::Bow);
            state.projectiles.push(p);
        }
        assert_eq!(auto_fire(&mut state, 0), 2);
        assert_eq!(state.projectiles.len(), MAX_PLAYER_PROJECTILES);
    }

    #[test]
    fn test_projectiles_expire_by_range_and_field() {
        let mut state = new_state(Weapon::Sword);
        let config = SimConfig::default();
        // Sword range 80, speed 12: alive after 6 ticks (72), gone after 7 (84)
        state.projectiles.push(create_player_projectile(1, Vec2::new(700.0, 500.0), 0.0, 0.0, 12.0, 1.0, Weapon::Sword));
        state.projectiles.push(create_player_projectile(2, Vec2::new(1395.0, 500.0), 0.0, 0.0, 12.0, 1.0, Weapon::Sword));
        advance_projectiles(&mut state, &config);
        assert_eq!(state.projectiles.len(), 1);
        for _ in 0..5 {
            advance_projectiles(&mut state, &config);
        }
        assert_eq!(state.projectiles.len(), 1);
        advance_projectiles(&mut state, &config);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_contact_damage_removes_enemy_without_reward() {
        let mut state = new_state(Weapon::Bow);
        let config = SimConfig::default();
        spawn(&mut state, EnemyType::Basic, Vec2::new(29.0, 0.0));
        state.kill_streak = 4;

        resolve_player_contacts(&mut state, &config, 0);
        assert_eq!(state.player.health, 90.0);
        assert!(state.enemies.is_empty());
        assert_eq!(state.score, 0);
        assert_eq!(state.xp, 0);
        assert_eq!(state.kill_streak, 0);
    }

    #[test]
    fn test_shield_pushes_instead_of_contact() {
        let mut state = new_state(Weapon::Bow);
        let config = SimConfig::default();
        let idx = spawn(&mut state, EnemyType::Basic, Vec2::new(20.0, 0.0));
        state.player.effects.insert(ActiveEffect::Shield { absorption: 50.0, remaining: 50.0, expires_at: 3_000 });

        let pushed = resolve_player_contacts(&mut state, &config, 0);
        assert_eq!(pushed, vec![state.enemies[idx].id]);
        assert_eq!(state.player.health, 100.0);
        assert!((state.enemies[idx].position.x - 800.0).abs() < 1e-9);
        match state.player.effects.get(EffectKind::Shield) {
            Some(ActiveEffect::Shield { remaining, .. }) => assert_eq!(*remaining, 45.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_hit_damages_one_enemy_and_removes_projectile() {
        let mut state = new_state(Weapon::Bow);
        let idx = spawn(&mut state, EnemyType::Basic, Vec2::new(200.0, 0.0));
        bullet_on(&mut state, idx, 25.0);
        resolve_projectile_hits(&mut state, &SimConfig::default(), 0, &[]);
        assert_eq!(state.enemies[idx].health, 35.0);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_pierce_decays_geometrically() {
        let mut state = new_state(Weapon::Bow);
        let idx = spawn(&mut state, EnemyType::Tank, Vec2::new(200.0, 0.0));
        bullet_on(&mut state, idx, 100.0);
        state.projectiles[0].pierce = Some(Pierce { remaining: 2, damage_reduction: PIERCING_DAMAGE_REDUCTION });

        resolve_projectile_hits(&mut state, &SimConfig::default(), 0, &[]);
        assert_eq!(state.enemies[idx].health, 20.0);
        assert_eq!(state.projectiles.len(), 1);
        assert!((state.projectiles[0].damage - 20.0).abs() < 1e-9);

        resolve_projectile_hits(&mut state, &SimConfig::default(), 16, &[]);
        assert!((state.enemies[idx].health - 0.0).abs() < 1e-9);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_ability_shield_absorbs_everything() {
        let mut state = new_state(Weapon::Staff);
        own(&mut state, AbilityId::Fireshot, 1);
        let idx = spawn(&mut state, EnemyType::Ability, Vec2::new(200.0, 0.0));
        if let EnemyKind::Ability { shield_health, .. } = &mut state.enemies[idx].kind {
            *shield_health = 10.0;
        }
        bullet_on(&mut state, idx, 30.0);
        resolve_projectile_hits(&mut state, &SimConfig::default(), 0, &[]);
        assert_eq!(state.enemies[idx].health, 120.0);
        assert!(state.enemies[idx].burn.is_none());
        assert!(matches!(state.enemies[idx].kind, EnemyKind::Ability { shield_health, .. } if shield_health == -20.0));
    }

    #[test]
    fn test_bloodthirst_and_vampiric() {
        let mut state = new_state(Weapon::Sword);
        state.player.health = 50.0;
        state.player.effects.insert(ActiveEffect::Bloodthirst { expires_at: 4_000 });
        state.player.effects.insert(ActiveEffect::Vampiric { life_steal: 0.2, expires_at: 8_000 });
        let idx = spawn(&mut state, EnemyType::Tank, Vec2::new(200.0, 0.0));
        bullet_on(&mut state, idx, 1.0);
        resolve_projectile_hits(&mut state, &SimConfig::default(), 0, &[]);
        assert!(state.enemies[idx].is_dead());
        assert_eq!(state.player.health, 74.0);
    }

    #[test]
    fn test_explosive_rounds_half_on_primary() {
        let mut state = new_state(Weapon::Cannon);
        own(&mut state, AbilityId::Explosive, 1);
        let primary = spawn(&mut state, EnemyType::Tank, Vec2::new(200.0, 0.0));
        let nearby = spawn(&mut state, EnemyType::Tank, Vec2::new(240.0, 0.0));
        bullet_on(&mut state, primary, 45.0);
        resolve_projectile_hits(&mut state, &SimConfig::default(), 0, &[]);
        assert_eq!(state.enemies[primary].health, 120.0 - 45.0 - 10.0);
        assert_eq!(state.enemies[nearby].health, 100.0);
    }

    #[test]
    fn test_pushed_enemies_skip_hits() {
        let mut state = new_state(Weapon::Bow);
        let idx = spawn(&mut state, EnemyType::Basic, Vec2::new(200.0, 0.0));
        bullet_on(&mut state, idx, 25.0);
        let id = state.enemies[idx].id;
        resolve_projectile_hits(&mut state, &SimConfig::default(), 0, &[id]);
        assert_eq!(state.enemies[idx].health, 60.0);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_enemy_bullets_shield_then_health() {
        let mut state = new_state(Weapon::Bow);
        let config = SimConfig::default();
        state.player.effects.insert(ActiveEffect::Shield { absorption: 20.0, remaining: 20.0, expires_at: 3_000 });
        let at = state.player.position + Vec2::new(10.0, 0.0);
        for id in 0..3 {
            state.enemy_projectiles.push(EnemyProjectile::new(id, at, 0.0, 0.0, 12.0, 4.0));
        }
        state.kill_streak = 3;

        advance_enemy_projectiles(&mut state, &config, 0);
        // 12 absorbed, 12 more drains the shield, the third one hits health
        assert!(state.enemy_projectiles.is_empty());
        assert!(!state.player.effects.shield_active());
        assert_eq!(state.player.health, 88.0);
        assert_eq!(state.kill_streak, 0);
    }

    #[test]
    fn test_enemy_bullet_outside_player_radius_misses() {
        let mut state = new_state(Weapon::Bow);
        let config = SimConfig::default();
        let at = state.player.position + Vec2::new(40.0, 0.0);
        state.enemy_projectiles.push(EnemyProjectile::new(1, at, 0.0, 0.0, 12.0, 4.0));
        advance_enemy_projectiles(&mut state, &config, 0);
        assert_eq!(state.enemy_projectiles.len(), 1);
        assert_eq!(state.player.health, 100.0);
    }

    #[test]
    fn test_reap_grants_rewards_and_streak() {
        let mut state = new_state(Weapon::Bow);
        let a = spawn(&mut state, EnemyType::Basic, Vec2::new(300.0, 0.0));
        spawn(&mut state, EnemyType::Tank, Vec2::new(-300.0, 0.0));
        state.enemies[a].health = 0.0;
        assert_eq!(reap_dead(&mut state, 0), 1);
        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.score, 100);
        assert_eq!(state.xp, 50);
        assert_eq!(state.kill_streak, 1);
    }

    #[test]
    fn test_burn_ticks_on_cadence() {
        let mut state = new_state(Weapon::Staff);
        let config = SimConfig::default();
        let idx = spawn(&mut state, EnemyType::Tank, Vec2::new(300.0, 0.0));
        state.enemies[idx].burn = Some(BurnState { damage_per_tick: 5.0, ends_at: 3_000, next_tick_at: 500 });

        tick_burns(&mut state, &config, 499);
        assert_eq!(state.enemies[idx].health, 120.0);
        tick_burns(&mut state, &config, 500);
        assert_eq!(state.enemies[idx].health, 115.0);
        tick_burns(&mut state, &config, 516);
        assert_eq!(state.enemies[idx].health, 115.0);
        tick_burns(&mut state, &config, 1_000);
        assert_eq!(state.enemies[idx].health, 110.0);
        tick_burns(&mut state, &config, 3_000);
        assert!(state.enemies[idx].burn.is_none());
    }
}
