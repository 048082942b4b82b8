//! Published rule state of the monitored car

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::race::RaceProgress;
use crate::detection::ZoneOccupancy;
use crate::penalty::{PenaltyLedger, PitVisit};
use crate::signals::DrsIndicator;
use crate::types::SessionType;

/// Flattened view over the machine's components, published once per tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DriverRaceState {
    pub session: SessionType,
    pub start_detected: bool,
    pub start_fuel: f32,
    pub last_fuel: f32,
    /// Fuel on pit entry; `None` when no pit visit is being tracked
    pub pit_fuel: Option<f32>,
    pub race_compounds_used: BTreeSet<String>,
    pub drs_valid: bool,
    pub in_zone: bool,
    pub zone_penalty_awarded: bool,
    pub serving_penalty: bool,
    pub penalty_voided: bool,
    pub race_ended: bool,
    pub finished_flag: bool,
    pub last_drs_level: f32,
    pub indicator: DrsIndicator,
    pub qualifying_tyre: Option<String>,
    pub pending_penalties: usize,
    pub deferred_penalties: usize,
}

impl DriverRaceState {
    pub(super) fn assemble(
        session: SessionType,
        race: &RaceProgress,
        occupancy: &ZoneOccupancy,
        pit: &PitVisit,
        indicator: DrsIndicator,
        qualifying_tyre: Option<&str>,
        ledger: &PenaltyLedger,
    ) -> Self {
        Self {
            session,
            start_detected: race.start_detected,
            start_fuel: race.start_fuel,
            last_fuel: race.last_fuel,
            pit_fuel: pit.pit_fuel,
            race_compounds_used: race.compounds_used.clone(),
            drs_valid: occupancy.drs_valid,
            in_zone: occupancy.in_zone,
            zone_penalty_awarded: occupancy.zone_penalty_awarded,
            serving_penalty: pit.serving_penalty,
            penalty_voided: pit.penalty_voided,
            race_ended: race.race_ended,
            finished_flag: race.finished_flag,
            last_drs_level: occupancy.last_drs_level,
            indicator,
            qualifying_tyre: qualifying_tyre.map(str::to_string),
            pending_penalties: ledger.pending(),
            deferred_penalties: ledger.deferred().len(),
        }
    }
}
