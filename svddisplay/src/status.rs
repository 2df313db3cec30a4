//! Change detection between successive player snapshots.
//!
//! The tracker keeps the last observed snapshot and reports a
//! [`StatusChange`] whenever volume, source or transport state differ from
//! it. The first observation is compared against the empty baseline
//! (volume 0, no source, unknown state), as if nothing had been seen yet.

use std::time::Duration;

use svdcontrol::{PlaybackState, PlayerSnapshot};
use tracing::info;

/// Difference between two consecutive observations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub previous: PlayerSnapshot,
    pub current: PlayerSnapshot,
}

impl StatusChange {
    pub fn volume_changed(&self) -> bool {
        self.previous.volume != self.current.volume
    }

    pub fn source_changed(&self) -> bool {
        self.previous.source != self.current.source
    }

    pub fn state_changed(&self) -> bool {
        self.previous.transport_state != self.current.transport_state
    }

    /// One info line per field that changed.
    pub fn log(&self) {
        if self.volume_changed() {
            info!(
                "Device volume {} => {}",
                self.previous.volume, self.current.volume
            );
        }
        if self.source_changed() {
            info!(
                "Device source {:?} => {:?}",
                self.previous.source, self.current.source
            );
        }
        if self.state_changed() {
            info!(
                "Device state {:?} => {:?}",
                self.previous.transport_state.as_str(),
                self.current.transport_state.as_str()
            );
        }
    }
}

/// Last observed snapshot.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last: PlayerSnapshot,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> &PlayerSnapshot {
        &self.last
    }

    /// Records `snapshot` and returns the change if anything differs from
    /// the previous observation.
    pub fn observe(&mut self, snapshot: PlayerSnapshot) -> Option<StatusChange> {
        if snapshot == self.last {
            return None;
        }

        let previous = std::mem::replace(&mut self.last, snapshot.clone());
        Some(StatusChange {
            previous,
            current: snapshot,
        })
    }
}

/// Polling interval for a transport state.
pub fn poll_delay(state: &PlaybackState, active: Duration, idle: Duration) -> Duration {
    if state.is_stopped() { idle } else { active }
}
