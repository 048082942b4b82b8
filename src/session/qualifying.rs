//! Best-lap tyre tracking during qualifying

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Remembers the tyre compound of the best qualifying lap.
///
/// The recorded tyre is carried into the race for the starting tyre rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualifyingTracker {
    best_lap_ms: u32,
    tyre: Option<String>,
}

impl QualifyingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_lap_ms(&self) -> u32 {
        self.best_lap_ms
    }

    pub fn tyre(&self) -> Option<&str> {
        self.tyre.as_deref()
    }

    /// Feed the session best lap and the tyre in use.
    ///
    /// Returns the new tyre label when it changed. A best lap of `0` means
    /// no valid lap yet and clears the label.
    pub fn update(&mut self, best_lap_ms: u32, tyre: &str) -> Option<Option<String>> {
        let label = if best_lap_ms == 0 {
            self.best_lap_ms = 0;
            None
        } else if self.best_lap_ms == 0 || best_lap_ms < self.best_lap_ms {
            debug!(best_lap_ms, tyre, "New qualifying best");
            self.best_lap_ms = best_lap_ms;
            Some(tyre.to_string())
        } else {
            return None;
        };

        if label == self.tyre {
            return None;
        }
        self.tyre = label.clone();
        Some(label)
    }
}
