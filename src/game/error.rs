//! Boundary Errors
//!
//! Failures reported to callers of the public session API. A call that
//! returns one of these leaves the simulation state untouched.

use thiserror::Error;

/// Errors surfaced at the simulation boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Weapon key is not one of the known weapons.
    #[error("unknown weapon: {0}")]
    UnknownWeapon(String),
    /// Ability key is unknown or belongs to a different weapon.
    #[error("unknown ability '{key}' for weapon {weapon}")]
    UnknownAbility {
        /// Requested ability key
        key: String,
        /// Weapon of the running session
        weapon: String,
    },
    /// Stat key is not one of the five upgradeable stats.
    #[error("unknown stat: {0}")]
    UnknownStat(String),
    /// Upgrade applied while no upgrade menu is open.
    #[error("no upgrade choice is pending")]
    NotPausedForUpgrade,
    /// Upgrade is already at its level cap.
    #[error("{0} is already at max level")]
    UpgradeMaxed(String),
    /// Snapshot was produced by an incompatible format version.
    #[error("snapshot version mismatch: expected {expected}, got {got}")]
    SnapshotVersion {
        /// Version this build understands
        expected: u32,
        /// Version found in the snapshot
        got: u32,
    },
    /// Snapshot bytes or JSON could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    SnapshotCodec(String),
    /// Configuration could not be parsed or is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result alias for boundary operations.
pub type SimResult<T> = Result<T, SimError>;
