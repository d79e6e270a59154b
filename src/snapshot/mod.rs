//! Serializable diagnostic view of a machine.
//!
//! A snapshot names the active state, the history state and every timer
//! slot. It holds no handlers, context or platform handles, so it cannot
//! restore a machine; it is meant for logs, consoles and test assertions.

use crate::core::Event;
use crate::timer::{TimerMode, TimerState};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// State of one timer slot at snapshot time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Index of the slot in the machine's pool
    pub slot: usize,
    pub state: TimerState,
    /// Event delivered on expiry (`NONE` for idle slots)
    pub event: Event,
    pub period_ms: u32,
    pub mode: TimerMode,
}

/// Point-in-time view of a machine, produced by
/// [`Hsm::snapshot`](crate::machine::Hsm::snapshot).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Snapshot format version
    #[serde(default = "current_version")]
    pub version: u32,

    pub name: String,

    /// Name of the active (innermost) state
    pub current: String,

    pub depth: usize,

    /// Name of the state active before the last transition
    pub history: Option<String>,

    /// True if taken from inside an `ENTRY`/`EXIT` handler or hook
    pub transitioning: bool,

    pub timers: Vec<TimerSnapshot>,
}

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

impl MachineSnapshot {
    /// Timers currently armed on the platform.
    pub fn running_timers(&self) -> impl Iterator<Item = &TimerSnapshot> {
        self.timers
            .iter()
            .filter(|timer| timer.state == TimerState::Running)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}
