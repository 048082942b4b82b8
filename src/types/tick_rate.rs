//! Tick rate control for the steward loop

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often the steward evaluates telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TickRate {
    /// Evaluate every snapshot the provider produces
    Native,

    /// Evaluate at most this many times per second
    /// If the requested rate exceeds the provider rate, Native is used
    Max(u32),
}

impl Default for TickRate {
    fn default() -> Self {
        TickRate::Max(30)
    }
}

impl TickRate {
    /// Normalize rate against the provider frequency
    pub fn normalize(self, source_hz: f64) -> Self {
        match self {
            TickRate::Native => TickRate::Native,
            TickRate::Max(0) => TickRate::Native,
            TickRate::Max(hz) if hz as f64 >= source_hz => TickRate::Native,
            TickRate::Max(hz) => TickRate::Max(hz),
        }
    }

    /// Minimum spacing between ticks, if pacing is needed
    pub fn tick_interval(self, source_hz: f64) -> Option<Duration> {
        match self.normalize(source_hz) {
            TickRate::Native => None,
            TickRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}
