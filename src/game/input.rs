//! Player Input
//!
//! The only player-controlled inputs are the four movement directions and
//! the upgrade choice made while the session is paused. Shooting and
//! targeting are automatic.

use std::f64::consts::FRAC_1_SQRT_2;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::error::SimError;

// =============================================================================
// MOVEMENT INPUT
// =============================================================================

/// Movement key state sampled for one tick.
///
/// Packed as bit flags so a recorded input stream is one byte per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputFrame {
    /// Direction flags (see the `FLAG_*` constants)
    pub flags: u8,
}

impl InputFrame {
    /// Up (toward y = 0)
    pub const FLAG_UP: u8 = 1 << 0;
    /// Down (toward y = height)
    pub const FLAG_DOWN: u8 = 1 << 1;
    /// Left (toward x = 0)
    pub const FLAG_LEFT: u8 = 1 << 2;
    /// Right (toward x = width)
    pub const FLAG_RIGHT: u8 = 1 << 3;

    /// No keys held.
    pub const IDLE: Self = Self { flags: 0 };

    /// Build from four booleans.
    pub fn new(up: bool, down: bool, left: bool, right: bool) -> Self {
        let mut flags = 0;
        if up {
            flags |= Self::FLAG_UP;
        }
        if down {
            flags |= Self::FLAG_DOWN;
        }
        if left {
            flags |= Self::FLAG_LEFT;
        }
        if right {
            flags |= Self::FLAG_RIGHT;
        }
        Self { flags }
    }

    /// Build from raw flags; unknown bits are dropped.
    pub fn from_flags(flags: u8) -> Self {
        Self { flags: flags & 0x0F }
    }

    /// Check if up is held.
    #[inline]
    pub fn up(&self) -> bool {
        self.flags & Self::FLAG_UP != 0
    }

    /// Check if down is held.
    #[inline]
    pub fn down(&self) -> bool {
        self.flags & Self::FLAG_DOWN != 0
    }

    /// Check if left is held.
    #[inline]
    pub fn left(&self) -> bool {
        self.flags & Self::FLAG_LEFT != 0
    }

    /// Check if right is held.
    #[inline]
    pub fn right(&self) -> bool {
        self.flags & Self::FLAG_RIGHT != 0
    }

    /// Per-tick displacement for a player moving at `speed` px/tick.
    ///
    /// Opposite keys cancel. When both axes are non-zero the result is
    /// scaled by √2/2 so diagonal movement is not faster.
    pub fn displacement(&self, speed: f64) -> Vec2 {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.up() {
            dy -= speed;
        }
        if self.down() {
            dy += speed;
        }
        if self.left() {
            dx -= speed;
        }
        if self.right() {
            dx += speed;
        }

        if dx != 0.0 && dy != 0.0 {
            dx *= FRAC_1_SQRT_2;
            dy *= FRAC_1_SQRT_2;
        }

        Vec2::new(dx, dy)
    }
}

// =============================================================================
// UPGRADE CHOICE
// =============================================================================

/// Which table an upgrade choice refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeCategory {
    /// One of the five stat upgrades
    Stat,
    /// A weapon-specific or general ability
    Ability,
}

impl UpgradeCategory {
    /// Parse the external category key (`"stat"` / `"ability"`).
    pub fn from_key(key: &str) -> Result<Self, SimError> {
        match key {
            "stat" => Ok(Self::Stat),
            "ability" => Ok(Self::Ability),
            other => Err(SimError::InvalidConfig(format!("unknown upgrade category: {other}"))),
        }
    }

    /// External key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Stat => "stat",
            Self::Ability => "ability",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_roundtrip() {
        let input = InputFrame::new(true, false, false, true);
        assert!(input.up());
        assert!(!input.down());
        assert!(!input.left());
        assert!(input.right());
        assert_eq!(InputFrame::from_flags(input.flags), input);
        assert_eq!(InputFrame::from_flags(0xFF).flags, 0x0F);
    }

    #[test]
    fn test_idle_no_movement() {
        assert_eq!(InputFrame::IDLE.displacement(2.2), Vec2::ZERO);
    }

    #[test]
    fn test_axis_movement() {
        let right = InputFrame::new(false, false, false, true);
        assert_eq!(right.displacement(2.2), Vec2::new(2.2, 0.0));

        let up = InputFrame::new(true, false, false, false);
        assert_eq!(up.displacement(2.0), Vec2::new(0.0, -2.0));
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let both = InputFrame::new(true, true, false, false);
        assert_eq!(both.displacement(3.0), Vec2::ZERO);
    }

    #[test]
    fn test_diagonal_normalized() {
        let diag = InputFrame::new(false, true, false, true);
        let d = diag.displacement(2.0);
        assert!((d.length() - 2.0).abs() < 1e-9);
        assert!((d.x - d.y).abs() < 1e-12);
    }

    #[test]
    fn test_upgrade_category_keys() {
        assert_eq!(UpgradeCategory::from_key("stat"), Ok(UpgradeCategory::Stat));
        assert_eq!(UpgradeCategory::from_key("ability"), Ok(UpgradeCategory::Ability));
        assert!(UpgradeCategory::from_key("perk").is_err());
        assert_eq!(UpgradeCategory::Ability.key(), "ability");
    }
}
