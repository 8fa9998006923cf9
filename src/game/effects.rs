//! Active Effects
//!
//! Timed buffs attached to the player. At most one effect of each kind is
//! active at a time; what happens when a second trigger arrives depends on
//! the kind (see [`EffectKind::overlap_policy`]).

use serde::{Serialize, Deserialize};

use crate::core::clock::Millis;

/// Effect type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectKind {
    /// Heal over time
    Healing,
    /// Damage-absorbing shield
    Shield,
    /// Damage and fire-rate bonus
    Berserker,
    /// Shots pierce
    Piercing,
    /// Unlimited fire rate with extra projectiles
    Mana,
    /// Next shots are amplified
    Overcharge,
    /// Life steal
    Vampiric,
    /// Every hit kills
    Bloodthirst,
}

/// What to do when an effect of an already-active kind is triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Keep the running instance; drop the new one.
    Suppress,
    /// Overwrite the running instance's parameters and expiry in place.
    Refresh,
}

impl EffectKind {
    /// Overlap policy for this kind.
    ///
    /// The shield and overcharge pools are topped up in place; every
    /// other kind ignores retriggers while active. An overcharge refresh
    /// keeps the unspent shots and adds the new level's count on top.
    pub fn overlap_policy(self) -> OverlapPolicy {
        match self {
            EffectKind::Shield | EffectKind::Overcharge => OverlapPolicy::Refresh,
            _ => OverlapPolicy::Suppress,
        }
    }
}

/// A player buff with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActiveEffect {
    /// Heals `heal_per_second / 60` each tick.
    Healing {
        /// Heal rate
        heal_per_second: f64,
        /// Expiry
        expires_at: Millis,
    },
    /// Absorbs enemy bullets and pushes enemies back.
    Shield {
        /// Pool size at trigger
        absorption: f64,
        /// Pool left
        remaining: f64,
        /// Expiry
        expires_at: Millis,
    },
    /// Multiplies shot damage by `1 + damage_bonus`.
    Berserker {
        /// Damage bonus fraction
        damage_bonus: f64,
        /// Fire-rate bonus fraction
        speed_bonus: f64,
        /// Expiry
        expires_at: Millis,
    },
    /// Shots pierce `pierce_count` enemies.
    Piercing {
        /// Pierce budget per shot
        pierce_count: u32,
        /// Damage lost per pierce
        damage_reduction: f64,
        /// Expiry
        expires_at: Millis,
    },
    /// No fire-rate gate and extra projectiles per shot.
    Mana {
        /// Extra projectiles per shot
        extra_projectiles: u32,
        /// Expiry
        expires_at: Millis,
    },
    /// Amplified shots until the counter runs out. No time expiry.
    Overcharge {
        /// Amplified shots left
        shots_remaining: u32,
        /// Damage multiplier
        damage_multiplier: f64,
        /// Pierce budget per amplified shot
        pierce_count: u32,
    },
    /// Heals the player by a fraction of damage dealt.
    Vampiric {
        /// Fraction of damage returned as health
        life_steal: f64,
        /// Expiry
        expires_at: Millis,
    },
    /// Projectile hits deal the target's full remaining health.
    Bloodthirst {
        /// Expiry
        expires_at: Millis,
    },
}

impl ActiveEffect {
    /// The type tag.
    pub fn kind(&self) -> EffectKind {
        match self {
            ActiveEffect::Healing { .. } => EffectKind::Healing,
            ActiveEffect::Shield { .. } => EffectKind::Shield,
            ActiveEffect::Berserker { .. } => EffectKind::Berserker,
            ActiveEffect::Piercing { .. } => EffectKind::Piercing,
            ActiveEffect::Mana { .. } => EffectKind::Mana,
            ActiveEffect::Overcharge { .. } => EffectKind::Overcharge,
            ActiveEffect::Vampiric { .. } => EffectKind::Vampiric,
            ActiveEffect::Bloodthirst { .. } => EffectKind::Bloodthirst,
        }
    }

    /// Expiry timestamp, if the effect expires by time.
    pub fn expires_at(&self) -> Option<Millis> {
        match *self {
            ActiveEffect::Healing { expires_at, .. }
            | ActiveEffect::Shield { expires_at, .. }
            | ActiveEffect::Berserker { expires_at, .. }
            | ActiveEffect::Piercing { expires_at, .. }
            | ActiveEffect::Mana { expires_at, .. }
            | ActiveEffect::Vampiric { expires_at, .. }
            | ActiveEffect::Bloodthirst { expires_at } => Some(expires_at),
            ActiveEffect::Overcharge { .. } => None,
        }
    }

    fn expires_at_mut(&mut self) -> Option<&mut Millis> {
        match self {
            ActiveEffect::Healing { expires_at, .. }
            | ActiveEffect::Shield { expires_at, .. }
            | ActiveEffect::Berserker { expires_at, .. }
            | ActiveEffect::Piercing { expires_at, .. }
            | ActiveEffect::Mana { expires_at, .. }
            | ActiveEffect::Vampiric { expires_at, .. }
            | ActiveEffect::Bloodthirst { expires_at } => Some(expires_at),
            ActiveEffect::Overcharge { .. } => None,
        }
    }

    /// Whether the effect's time window has closed.
    #[inline]
    pub fn is_expired(&self, now: Millis) -> bool {
        self.expires_at().is_some_and(|t| now >= t)
    }
}

/// Result of [`ActiveEffects::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No instance was active; the effect was added.
    Added,
    /// An instance was active and was overwritten in place.
    Refreshed,
    /// An instance was active and the new effect was dropped.
    Suppressed,
}

/// Amplification taken from an overcharge effect for one shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverchargeShot {
    /// Damage multiplier for the shot
    pub damage_multiplier: f64,
    /// Pierce budget for the shot
    pub pierce_count: u32,
}

/// The player's active effects, at most one per kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffects {
    effects: Vec<ActiveEffect>,
}

impl ActiveEffects {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect, honoring its kind's overlap policy.
    pub fn insert(&mut self, effect: ActiveEffect) -> InsertOutcome {
        let kind = effect.kind();
        match self.effects.iter_mut().find(|e| e.kind() == kind) {
            None => {
                self.effects.push(effect);
                InsertOutcome::Added
            }
            Some(existing) => match kind.overlap_policy() {
                OverlapPolicy::Refresh => {
                    let unspent = match &*existing {
                        ActiveEffect::Overcharge { shots_remaining, .. } => *shots_remaining,
                        _ => 0,
                    };
                    *existing = effect;
                    if let ActiveEffect::Overcharge { shots_remaining, .. } = &mut *existing {
                        *shots_remaining += unspent;
                    }
                    InsertOutcome::Refreshed
                }
                OverlapPolicy::Suppress => InsertOutcome::Suppressed,
            },
        }
    }

    /// The active effect of `kind`, if any.
    pub fn get(&self, kind: EffectKind) -> Option<&ActiveEffect> {
        self.effects.iter().find(|e| e.kind() == kind)
    }

    /// Whether an effect of `kind` is active.
    #[inline]
    pub fn contains(&self, kind: EffectKind) -> bool {
        self.get(kind).is_some()
    }

    /// Remove the effect of `kind`, returning it.
    pub fn remove(&mut self, kind: EffectKind) -> Option<ActiveEffect> {
        let idx = self.effects.iter().position(|e| e.kind() == kind)?;
        Some(self.effects.remove(idx))
    }

    /// Drop every effect whose window has closed, returning their kinds.
    pub fn expire(&mut self, now: Millis) -> Vec<EffectKind> {
        let mut expired = Vec::new();
        self.effects.retain(|e| {
            if e.is_expired(now) {
                expired.push(e.kind());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Whether a shield with pool left is active.
    pub fn shield_active(&self) -> bool {
        matches!(self.get(EffectKind::Shield), Some(ActiveEffect::Shield { remaining, .. }) if *remaining > 0.0)
    }

    /// Drain `amount` from an active shield.
    ///
    /// Returns `false` (and changes nothing) when no shield with pool left
    /// is active. The shield is removed once its pool reaches zero.
    pub fn absorb_with_shield(&mut self, amount: f64) -> bool {
        let Some(idx) = self.effects.iter().position(
            |e| matches!(e, ActiveEffect::Shield { remaining, .. } if *remaining > 0.0),
        ) else {
            return false;
        };
        if let ActiveEffect::Shield { remaining, .. } = &mut self.effects[idx] {
            *remaining -= amount;
            if *remaining <= 0.0 {
                self.effects.remove(idx);
            }
        }
        true
    }

    /// Spend one overcharged shot, removing the effect when the counter hits zero.
    pub fn consume_overcharge(&mut self) -> Option<OverchargeShot> {
        let idx = self.effects.iter().position(
            |e| matches!(e, ActiveEffect::Overcharge { shots_remaining, .. } if *shots_remaining > 0),
        )?;
        let mut spent = None;
        let mut exhausted = false;
        if let ActiveEffect::Overcharge { shots_remaining, damage_multiplier, pierce_count } =
            &mut self.effects[idx]
        {
            *shots_remaining -= 1;
            exhausted = *shots_remaining == 0;
            spent = Some(OverchargeShot {
                damage_multiplier: *damage_multiplier,
                pierce_count: *pierce_count,
            });
        }
        if exhausted {
            self.effects.remove(idx);
        }
        spent
    }

    /// Berserker `(damage_bonus, speed_bonus)` if active.
    pub fn berserker(&self) -> Option<(f64, f64)> {
        match self.get(EffectKind::Berserker) {
            Some(ActiveEffect::Berserker { damage_bonus, speed_bonus, .. }) => {
                Some((*damage_bonus, *speed_bonus))
            }
            _ => None,
        }
    }

    /// Piercing `(pierce_count, damage_reduction)` if active.
    pub fn piercing(&self) -> Option<(u32, f64)> {
        match self.get(EffectKind::Piercing) {
            Some(ActiveEffect::Piercing { pierce_count, damage_reduction, .. }) => {
                Some((*pierce_count, *damage_reduction))
            }
            _ => None,
        }
    }

    /// Mana surge extra projectile count if active.
    pub fn mana_extra_projectiles(&self) -> Option<u32> {
        match self.get(EffectKind::Mana) {
            Some(ActiveEffect::Mana { extra_projectiles, .. }) => Some(*extra_projectiles),
            _ => None,
        }
    }

    /// Vampiric life-steal fraction if active.
    pub fn life_steal(&self) -> Option<f64> {
        match self.get(EffectKind::Vampiric) {
            Some(ActiveEffect::Vampiric { life_steal, .. }) => Some(*life_steal),
            _ => None,
        }
    }

    /// Combined per-tick healing from healing effects.
    pub fn heal_per_tick(&self, tick_rate: f64) -> f64 {
        self.effects
            .iter()
            .map(|e| match e {
                ActiveEffect::Healing { heal_per_second, .. } => heal_per_second / tick_rate,
                _ => 0.0,
            })
            .sum()
    }

    /// Shift every expiry by `offset` ms.
    pub fn rebase(&mut self, offset: Millis) {
        for effect in &mut self.effects {
            if let Some(t) = effect.expires_at_mut() {
                *t += offset;
            }
        }
    }

    /// Iterate active effects in activation order.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.effects.iter()
    }

    /// Number of active effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// No effects active.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
