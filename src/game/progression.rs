//! Progression Controller
//!
//! XP-driven level-ups, upgrade-card generation, applying stat and ability
//! upgrades, and the time-scaled entity limit that bounds the spawner.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::clock::Millis;
use crate::game::ability::{AbilityId, MAX_ABILITY_LEVEL};
use crate::game::entity::Weapon;
use crate::game::error::{SimError, SimResult};
use crate::game::events::GameEventData;
use crate::game::input::UpgradeCategory;
use crate::game::state::{AbilitySlot, PlayerState, SessionPhase, SimulationState, PLAYER_BASE_HEALTH, PLAYER_BASE_SPEED};

/// Highest level of any stat upgrade.
pub const MAX_STAT_LEVEL: u8 = 5;

/// Cards offered per level-up.
pub const MAX_UPGRADE_CARDS: usize = 3;

// =============================================================================
// STATS
// =============================================================================

/// The five stat upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatKind {
    /// Weapon damage
    Damage,
    /// Shots per second
    FireRate,
    /// Maximum health
    Health,
    /// Movement speed
    Speed,
    /// Projectile range
    Range,
}

impl StatKind {
    /// All stats in card order.
    pub const ALL: [StatKind; 5] = [
        StatKind::Damage,
        StatKind::FireRate,
        StatKind::Health,
        StatKind::Speed,
        StatKind::Range,
    ];

    /// External key.
    pub fn key(self) -> &'static str {
        match self {
            StatKind::Damage => "damage",
            StatKind::FireRate => "fireRate",
            StatKind::Health => "health",
            StatKind::Speed => "speed",
            StatKind::Range => "range",
        }
    }

    /// Parse an external key.
    pub fn from_key(key: &str) -> SimResult<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.key() == key)
            .ok_or_else(|| SimError::UnknownStat(key.to_string()))
    }

    /// Card name without the level numeral.
    pub fn name(self) -> &'static str {
        match self {
            StatKind::Damage => "Weapon Mastery",
            StatKind::FireRate => "Combat Speed",
            StatKind::Health => "Vitality",
            StatKind::Speed => "Agility",
            StatKind::Range => "Reach",
        }
    }

    /// Flat bonus at each level. Each entry replaces the previous one.
    pub fn effects(self) -> [f64; 5] {
        match self {
            StatKind::Damage => [15.0, 25.0, 35.0, 50.0, 70.0],
            StatKind::FireRate => [0.6, 1.2, 1.8, 2.4, 3.0],
            StatKind::Health => [25.0, 50.0, 80.0, 120.0, 170.0],
            StatKind::Speed => [0.3, 0.6, 1.0, 1.5, 2.0],
            StatKind::Range => [50.0, 100.0, 160.0, 230.0, 320.0],
        }
    }

    /// Value before any upgrade.
    pub fn base_value(self, weapon: Weapon) -> f64 {
        let stats = weapon.stats();
        match self {
            StatKind::Damage => stats.damage,
            StatKind::FireRate => stats.fire_rate,
            StatKind::Health => PLAYER_BASE_HEALTH,
            StatKind::Speed => PLAYER_BASE_SPEED,
            StatKind::Range => stats.range,
        }
    }
}

/// Stat value at `level`: the base plus the table entry for that level.
pub fn stat_value(kind: StatKind, weapon: Weapon, level: u8) -> f64 {
    let base = kind.base_value(weapon);
    match level.min(MAX_STAT_LEVEL) {
        0 => base,
        l => base + kind.effects()[(l - 1) as usize],
    }
}

/// Recompute one stat for `level` from the weapon's base.
///
/// Max-health changes move current health by the same delta.
pub fn apply_stat_level(player: &mut PlayerState, kind: StatKind, level: u8) {
    let value = stat_value(kind, player.weapon, level);
    match kind {
        StatKind::Damage => player.damage = value,
        StatKind::FireRate => player.fire_rate = value,
        StatKind::Health => {
            let delta = value - player.max_health;
            player.max_health = value;
            player.health = (player.health + delta).min(player.max_health);
        }
        StatKind::Speed => player.speed = value,
        StatKind::Range => player.range = value,
    }
}

// =============================================================================
// CURVES
// =============================================================================

/// XP needed to leave `level`.
#[inline]
pub fn next_level_xp(level: u32) -> u64 {
    100 + u64::from(level.saturating_sub(1)) * 50
}

/// Maximum concurrent enemies after `survival_secs` seconds.
pub fn entity_limit(survival_secs: u32) -> usize {
    let s = survival_secs as usize;
    if s <= 60 {
        20 + s / 4
    } else if s <= 120 {
        35 + (s - 60) / 3
    } else if s <= 180 {
        50 + (s - 120) / 6
    } else {
        65 + (s - 180) / 15 * 2
    }
}

/// Roman numeral for a level (1..=5).
pub fn roman(level: u8) -> &'static str {
    match level {
        1 => "I",
        2 => "II",
        3 => "III",
        4 => "IV",
        5 => "V",
        _ => "",
    }
}

// =============================================================================
// UPGRADE CARDS
// =============================================================================

/// What a card upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeChoice {
    /// A stat upgrade
    Stat(StatKind),
    /// An ability level
    Ability(AbilityId),
}

impl UpgradeChoice {
    /// Category of this choice.
    pub fn category(self) -> UpgradeCategory {
        match self {
            UpgradeChoice::Stat(_) => UpgradeCategory::Stat,
            UpgradeChoice::Ability(_) => UpgradeCategory::Ability,
        }
    }

    /// External key of the stat or ability.
    pub fn key(self) -> &'static str {
        match self {
            UpgradeChoice::Stat(s) => s.key(),
            UpgradeChoice::Ability(a) => a.key(),
        }
    }
}

/// One offered upgrade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeCard {
    /// The upgrade
    pub choice: UpgradeChoice,
    /// Display name including the next level numeral
    pub name: String,
    /// Level before picking
    pub current_level: u8,
    /// Level cap
    pub max_level: u8,
}

/// Every upgrade the player can still take, in stat, weapon, general order.
pub fn available_upgrades(player: &PlayerState) -> Vec<UpgradeCard> {
    let mut cards = Vec::new();

    for kind in StatKind::ALL {
        let level = player.stat_level(kind);
        if level < MAX_STAT_LEVEL {
            cards.push(UpgradeCard {
                choice: UpgradeChoice::Stat(kind),
                name: format!("{} {}", kind.name(), roman(level + 1)),
                current_level: level,
                max_level: MAX_STAT_LEVEL,
            });
        }
    }

    let weapon_abilities = AbilityId::for_weapon(player.weapon);
    for id in weapon_abilities.into_iter().chain(AbilityId::GENERAL) {
        let level = player.ability_level(id);
        if level < MAX_ABILITY_LEVEL {
            cards.push(UpgradeCard {
                choice: UpgradeChoice::Ability(id),
                name: format!("{} {}", id.name(), roman(level + 1)),
                current_level: level,
                max_level: MAX_ABILITY_LEVEL,
            });
        }
    }

    cards
}

/// Shuffle the available upgrades and keep up to three.
pub fn generate_upgrade_cards(state: &mut SimulationState) -> Vec<UpgradeCard> {
    let mut cards = available_upgrades(&state.player);
    state.rng.shuffle(&mut cards);
    cards.truncate(MAX_UPGRADE_CARDS);
    cards
}

// =============================================================================
// LEVEL UP
// =============================================================================

/// Level up if XP reached the threshold and no menu is open.
///
/// XP resets to zero before cards are drawn, discarding any overflow.
/// With no upgrades left the session keeps playing.
pub fn check_level_up(state: &mut SimulationState, now: Millis) -> bool {
    if state.phase != SessionPhase::Playing || state.xp < state.next_level_xp {
        return false;
    }

    state.level += 1;
    state.next_level_xp = next_level_xp(state.level);
    state.xp = 0;

    let cards = generate_upgrade_cards(state);
    let card_count = cards.len();
    info!(level = state.level, next_xp = state.next_level_xp, card_count, "level up");

    if !cards.is_empty() {
        state.phase = SessionPhase::PausedForUpgrade { cards };
    }
    state.push_event(
        now,
        GameEventData::LevelUp {
            level: state.level,
            next_level_xp: state.next_level_xp,
            card_count,
        },
    );
    true
}

/// Apply an upgrade chosen from the menu and resume play.
///
/// Fails without touching state when the session is not paused for an
/// upgrade, the key is unknown (or belongs to another weapon), or the
/// upgrade is already maxed.
pub fn apply_upgrade(
    state: &mut SimulationState,
    category: UpgradeCategory,
    key: &str,
) -> SimResult<UpgradeChoice> {
    if !matches!(state.phase, SessionPhase::PausedForUpgrade { .. }) {
        return Err(SimError::NotPausedForUpgrade);
    }

    let choice = match category {
        UpgradeCategory::Stat => {
            let kind = StatKind::from_key(key)?;
            let level = state.player.stat_level(kind);
            if level >= MAX_STAT_LEVEL {
                return Err(SimError::UpgradeMaxed(key.to_string()));
            }
            state.player.upgrades.insert(kind, level + 1);
            apply_stat_level(&mut state.player, kind, level + 1);
            UpgradeChoice::Stat(kind)
        }
        UpgradeCategory::Ability => {
            let id = AbilityId::from_key(key, state.player.weapon)?;
            let slot = state
                .player
                .abilities
                .entry(id)
                .or_insert(AbilitySlot { level: 0, last_used: None });
            if slot.level >= MAX_ABILITY_LEVEL {
                return Err(SimError::UpgradeMaxed(key.to_string()));
            }
            slot.level += 1;
            if slot.level == 1 {
                slot.last_used = None;
            }
            UpgradeChoice::Ability(id)
        }
    };

    state.xp = 0;
    state.phase = SessionPhase::Playing;
    debug!(category = category.key(), key, "upgrade applied");
    Ok(choice)
}

/// Stat levels keyed by stat, all zero.
pub fn initial_stat_levels() -> BTreeMap<StatKind, u8> {
    StatKind::ALL.into_iter().map(|k| (k, 0)).collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tick::SimConfig;

    fn new_state(weapon: Weapon) -> SimulationState {
        SimulationState::new(weapon, 99, 0, &SimConfig::default())
    }

    fn paused(state: &mut SimulationState) {
        state.phase = SessionPhase::PausedForUpgrade { cards: Vec::new() };
    }

    #[test]
    fn test_entity_limit_brackets() {
        assert_eq!(entity_limit(0), 20);
        assert_eq!(entity_limit(7), 21);
        assert_eq!(entity_limit(60), 35);
        assert_eq!(entity_limit(61), 35);
        assert_eq!(entity_limit(66), 37);
        assert_eq!(entity_limit(121), 50);
        assert_eq!(entity_limit(181), 65);
        assert_eq!(entity_limit(210), 69);
    }

    #[test]
    fn test_next_level_xp() {
        assert_eq!(next_level_xp(1), 100);
        assert_eq!(next_level_xp(2), 150);
        assert_eq!(next_level_xp(5), 300);
    }

    #[test]
    fn test_stat_value_is_base_derived() {
        assert_eq!(stat_value(StatKind::Damage, Weapon::Bow, 0), 25.0);
        assert_eq!(stat_value(StatKind::Damage, Weapon::Bow, 2), 50.0);
        assert_eq!(stat_value(StatKind::Range, Weapon::Cannon, 5), 620.0);
        assert!((stat_value(StatKind::Speed, Weapon::Staff, 3) - 3.2).abs() < 1e-12);
    }

    #[test]
    fn test_apply_stat_level_twice_is_idempotent() {
        let mut state = new_state(Weapon::Sword);
        apply_stat_level(&mut state.player, StatKind::FireRate, 3);
        let once = state.player.fire_rate;
        apply_stat_level(&mut state.player, StatKind::FireRate, 3);
        assert_eq!(state.player.fire_rate, once);
    }

    #[test]
    fn test_health_upgrade_moves_current_health() {
        let mut state = new_state(Weapon::Sword);
        state.player.health = 60.0;
        apply_stat_level(&mut state.player, StatKind::Health, 1);
        assert_eq!(state.player.max_health, 125.0);
        assert_eq!(state.player.health, 85.0);
        apply_stat_level(&mut state.player, StatKind::Health, 2);
        assert_eq!(state.player.health, 110.0);
    }

    #[test]
    fn test_level_up_discards_overflow() {
        let mut state = new_state(Weapon::Bow);
        state.xp = 130;
        assert!(check_level_up(&mut state, 0));
        assert_eq!(state.level, 2);
        assert_eq!(state.xp, 0);
        assert_eq!(state.next_level_xp, 150);
        match &state.phase {
            SessionPhase::PausedForUpgrade { cards } => assert_eq!(cards.len(), 3),
            other => panic!("expected upgrade menu, got {:?}", other),
        }
        // Menu open: no re-entrant level-up
        state.xp = 500;
        assert!(!check_level_up(&mut state, 0));
        assert_eq!(state.level, 2);
    }

    #[test]
    fn test_no_cards_keeps_playing() {
        let mut state = new_state(Weapon::Staff);
        for kind in StatKind::ALL {
            state.player.upgrades.insert(kind, MAX_STAT_LEVEL);
        }
        for id in AbilityId::for_weapon(Weapon::Staff).into_iter().chain(AbilityId::GENERAL) {
            state.player.abilities.insert(id, AbilitySlot { level: MAX_ABILITY_LEVEL, last_used: None });
        }
        assert!(available_upgrades(&state.player).is_empty());

        state.xp = 100;
        assert!(check_level_up(&mut state, 0));
        assert_eq!(state.level, 2);
        assert_eq!(state.phase, SessionPhase::Playing);
    }

    #[test]
    fn test_cards_exclude_other_weapons_and_maxed() {
        let mut state = new_state(Weapon::Cannon);
        state.player.upgrades.insert(StatKind::Damage, MAX_STAT_LEVEL);
        let cards = available_upgrades(&state.player);
        assert_eq!(cards.len(), 4 + 3 + 9);
        assert!(cards.iter().all(|c| c.choice != UpgradeChoice::Stat(StatKind::Damage)));
        assert!(cards.iter().all(|c| match c.choice {
            UpgradeChoice::Ability(id) => id.weapon().map_or(true, |w| w == Weapon::Cannon),
            UpgradeChoice::Stat(_) => true,
        }));
        let laser = cards.iter().find(|c| c.choice == UpgradeChoice::Ability(AbilityId::Laser));
        assert_eq!(laser.map(|c| c.name.as_str()), Some("Laser Cannon I"));
    }

    #[test]
    fn test_apply_upgrade_requires_pause() {
        let mut state = new_state(Weapon::Bow);
        let err = apply_upgrade(&mut state, UpgradeCategory::Stat, "damage");
        assert_eq!(err, Err(SimError::NotPausedForUpgrade));
        assert_eq!(state.player.damage, 25.0);
    }

    #[test]
    fn test_apply_stat_upgrade() {
        let mut state = new_state(Weapon::Bow);
        paused(&mut state);
        state.xp = 40;
        let choice = apply_upgrade(&mut state, UpgradeCategory::Stat, "damage");
        assert_eq!(choice, Ok(UpgradeChoice::Stat(StatKind::Damage)));
        assert_eq!(state.player.damage, 40.0);
        assert_eq!(state.xp, 0);
        assert_eq!(state.phase, SessionPhase::Playing);
    }

    #[test]
    fn test_apply_ability_upgrade() {
        let mut state = new_state(Weapon::Sword);
        paused(&mut state);
        apply_upgrade(&mut state, UpgradeCategory::Ability, "whirlwind").unwrap();
        let slot = state.player.abilities[&AbilityId::Whirlwind];
        assert_eq!(slot.level, 1);
        assert_eq!(slot.last_used, None);
    }

    #[test]
    fn test_apply_upgrade_rejections_leave_state() {
        let mut state = new_state(Weapon::Sword);
        paused(&mut state);
        let before = state.clone();

        assert!(matches!(
            apply_upgrade(&mut state, UpgradeCategory::Ability, "laser"),
            Err(SimError::UnknownAbility { .. })
        ));
        assert_eq!(
            apply_upgrade(&mut state, UpgradeCategory::Stat, "luck"),
            Err(SimError::UnknownStat("luck".to_string()))
        );

        state.player.abilities.insert(AbilityId::Frost, AbilitySlot { level: 3, last_used: None });
        assert_eq!(
            apply_upgrade(&mut state, UpgradeCategory::Ability, "frost"),
            Err(SimError::UpgradeMaxed("frost".to_string()))
        );
        state.player.abilities.remove(&AbilityId::Frost);
        assert_eq!(state.player, before.player);
        assert_eq!(state.phase, before.phase);
    }

    #[test]
    fn test_roman() {
        assert_eq!(roman(1), "I");
        assert_eq!(roman(4), "IV");
        assert_eq!(roman(9), "");
    }
}
