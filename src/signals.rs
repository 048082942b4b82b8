//! Outbound signals for the presentation layer
//!
//! The session machine never draws widgets or plays audio itself. Each tick
//! it returns the [`Signal`]s describing what changed, and whoever owns the
//! UI or the chat connection reacts to them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{Penalty, SessionType};

/// Zone-occupancy indicator shown to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrsIndicator {
    #[default]
    Off,
    /// In a zone, DRS not allowed
    ArmedIllegal,
    /// In a zone, DRS allowed
    ArmedLegal,
}

/// Something the presentation layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    SessionChanged { from: SessionType, to: SessionType },
    DrsIndicator(DrsIndicator),
    PenaltyIssued(Penalty),
    PenaltyServed(Penalty),
    /// Pending Immediate count changed; `detail` is the next penalty to serve
    PenaltyBoard { pending: usize, detail: Option<String> },
    /// Tyre carried forward from qualifying; `None` clears the label
    QualifyingTyre(Option<String>),
    /// Start the DRS cue; the receiver stops it after `duration`
    CueStart { duration: Duration },
    /// Chat message for the server
    Broadcast(String),
    /// Race over; lists penalties converted from Immediate to Deferred
    RaceEnded { unserved: Vec<Penalty> },
}

/// Chat line announcing a penalty.
pub fn penalty_broadcast(app_name: &str, penalty: &Penalty) -> String {
    format!("{}: Penalty, Lap: {} Detail: {}", app_name, penalty.lap, penalty.detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PenaltyReason;

    #[test]
    fn broadcast_line_format() {
        let penalty = Penalty::immediate(4, "Driver", PenaltyReason::IllegalDrs { zone: 2 });
        assert_eq!(
            penalty_broadcast("DRS Steward", &penalty),
            "DRS Steward: Penalty, Lap: 4 Detail: Illegal DRS use, Zone 2"
        );
    }

    #[test]
    fn unserved_penalties_keep_annotation_in_broadcast() {
        let penalty = Penalty::immediate(9, "Driver", PenaltyReason::DrsWithoutDetection).into_unserved();
        let line = penalty_broadcast("Stewards", &penalty);
        assert!(line.starts_with("Stewards: Penalty, Lap: 9 Detail: UNSERVED Illegal DRS use"));
        assert!(line.ends_with("(POST RACE)"));
    }
}
