//! State Snapshots
//!
//! Versioned export/import of the full session state. Snapshots encode to
//! JSON for inspection or to bincode for compact storage. Timestamps are
//! absolute on the exporting session's clock, so importing shifts them by
//! the time elapsed since export and timed effects resume where they left
//! off.

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::clock::Millis;
use crate::game::error::{SimError, SimResult};
use crate::game::state::SimulationState;

/// Snapshot format version understood by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A serialized session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Format version
    pub version: u32,
    /// Clock reading at export
    pub exported_at: Millis,
    /// Full simulation state, RNG included
    pub state: SimulationState,
}

impl StateSnapshot {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string(self).map_err(|e| SimError::SnapshotCodec(e.to_string()))
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> SimResult<Self> {
        serde_json::from_str(s).map_err(|e| SimError::SnapshotCodec(e.to_string()))
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> SimResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SimError::SnapshotCodec(e.to_string()))
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> SimResult<Self> {
        bincode::deserialize(data).map_err(|e| SimError::SnapshotCodec(e.to_string()))
    }
}

/// Capture `state` as of `now`.
pub fn export_state(state: &SimulationState, now: Millis) -> StateSnapshot {
    info!(
        tick = state.tick,
        hash = %hex::encode(state.compute_hash()),
        "state exported"
    );
    StateSnapshot {
        version: SNAPSHOT_VERSION,
        exported_at: now,
        state: state.clone(),
    }
}

/// Restore a snapshot into a session whose clock reads `now`.
///
/// Every absolute timestamp moves by `now - exported_at`. Pending events
/// are not part of a snapshot; an open upgrade menu is kept.
pub fn import_state(snapshot: StateSnapshot, now: Millis) -> SimResult<SimulationState> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SimError::SnapshotVersion {
            expected: SNAPSHOT_VERSION,
            got: snapshot.version,
        });
    }

    let offset = now - snapshot.exported_at;
    let mut state = snapshot.state;
    state.rebase(offset);
    state.take_events();

    info!(
        tick = state.tick,
        offset,
        hash = %hex::encode(state.compute_hash()),
        "state imported"
    );
    Ok(state)
}

// =============================================================================
// TESTS
// =============================================================================
