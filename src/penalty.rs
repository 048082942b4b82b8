//! Penalty ledger and pit-lane serving
//!
//! Immediate penalties queue up FIFO and are discharged one per pit visit.
//! Deferred penalties only accumulate; they become time adjustments after
//! the race. At race end anything still queued is converted to Deferred.
//!
//! ## Pit visits
//!
//! ```text
//! enter pit lane ──► capture fuel (once per visit)
//!       │
//!       ├─ queue non-empty, moving (> 5 km/h) ──► serving
//!       ├─ queue non-empty, stopped            ──► voided
//!       ▼
//! leave pit lane ──► serving && !voided ? pop one penalty
//!                                       : check refuel
//! ```
//!
//! A stop voids the serve rather than completing it. That mirrors the rule
//! set this ledger enforces: the penalty is a drive-through.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::types::{Penalty, PenaltyClass, PenaltyReason};

/// At or below this speed the car counts as stopped in the pit lane.
pub const STOPPED_SPEED_KMH: f32 = 5.0;

/// Pit-lane readings for the monitored car.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitReading {
    pub in_pit_lane: bool,
    pub speed_kmh: f32,
    pub fuel: f32,
}

/// State of the current pit visit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PitVisit {
    /// Fuel on pit entry; `None` outside a visit
    pub pit_fuel: Option<f32>,
    pub serving_penalty: bool,
    pub penalty_voided: bool,
}

/// What a pit exit resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum PitOutcome {
    Served(Penalty),
    IllegalRefuel(Penalty),
}

#[derive(Debug, Clone, Default)]
pub struct PenaltyLedger {
    immediate: VecDeque<Penalty>,
    deferred: Vec<Penalty>,
    pit: PitVisit,
}

impl PenaltyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a penalty in the queue matching its class.
    pub fn issue(&mut self, penalty: Penalty) {
        info!(lap = penalty.lap, driver = %penalty.driver, class = ?penalty.class, "Penalty: {}", penalty.detail);
        match penalty.class {
            PenaltyClass::Immediate => self.immediate.push_back(penalty),
            PenaltyClass::Deferred => self.deferred.push(penalty),
        }
    }

    pub fn immediate(&self) -> impl ExactSizeIterator<Item = &Penalty> {
        self.immediate.iter()
    }

    pub fn deferred(&self) -> &[Penalty] {
        &self.deferred
    }

    /// Number of Immediate penalties waiting to be served.
    pub fn pending(&self) -> usize {
        self.immediate.len()
    }

    /// The penalty the next pit visit would serve.
    pub fn next_to_serve(&self) -> Option<&Penalty> {
        self.immediate.front()
    }

    pub fn pit(&self) -> &PitVisit {
        &self.pit
    }

    /// Drop everything issued so far, for a fresh race start.
    pub fn reset(&mut self) {
        self.immediate.clear();
        self.deferred.clear();
    }

    /// Advance the pit-visit state machine by one tick.
    pub fn update_pit(
        &mut self,
        reading: PitReading,
        refuelling_allowed: bool,
        lap: u32,
        driver: &str,
    ) -> Option<PitOutcome> {
        if reading.in_pit_lane {
            if self.pit.pit_fuel.is_none() {
                debug!(fuel = reading.fuel, "Entered pit lane");
                self.pit.pit_fuel = Some(reading.fuel);
            }
            if !self.immediate.is_empty() && !self.pit.penalty_voided {
                if reading.speed_kmh > STOPPED_SPEED_KMH {
                    self.pit.serving_penalty = true;
                } else {
                    debug!("Stopped in pit lane; penalty serve voided");
                    self.pit.penalty_voided = true;
                }
            }
            return None;
        }

        let outcome = if self.pit.serving_penalty && !self.pit.penalty_voided {
            self.immediate.pop_front().map(|served| {
                info!(lap = served.lap, "Penalty served: {}", served.detail);
                PitOutcome::Served(served)
            })
        } else {
            match self.pit.pit_fuel {
                Some(entry_fuel) if entry_fuel < reading.fuel && !refuelling_allowed => {
                    let penalty = Penalty::deferred(lap, driver, PenaltyReason::IllegalRefuel);
                    self.issue(penalty.clone());
                    Some(PitOutcome::IllegalRefuel(penalty))
                }
                _ => None,
            }
        };

        self.pit = PitVisit::default();
        outcome
    }

    /// Move every unserved Immediate penalty into the Deferred list.
    ///
    /// Returns the converted penalties so they can be reported.
    pub fn close_race(&mut self) -> Vec<Penalty> {
        let converted: Vec<Penalty> = self.immediate.drain(..).map(Penalty::into_unserved).collect();
        for penalty in &converted {
            info!(lap = penalty.lap, "Unserved penalty: {}", penalty.detail);
        }
        self.deferred.extend(converted.iter().cloned());
        converted
    }
}
