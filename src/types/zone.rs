//! DRS zone definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a zone: its declaration order in the zone file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub usize);

impl ZoneId {
    pub fn index(self) -> usize {
        self.0
    }

    /// One-based number used in penalty text.
    pub fn number(self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Zone {}", self.number())
    }
}

/// One DRS zone. All positions are normalized spline fractions in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    pub id: ZoneId,
    /// Detection line where the gap to the car ahead is measured
    pub detection: f64,
    /// Activation line where the flap may open
    pub start: f64,
    /// End of the zone
    pub end: f64,
}
