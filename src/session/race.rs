//! Race start, compound usage and race end bookkeeping

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::types::TelemetrySnapshot;

/// The launch window closes this long after the green light.
pub const START_WINDOW_MS: i64 = 5_000;

/// A fuel drop smaller than this (and above zero) means the throttle was applied.
/// Larger drops are still the fuel being set up on the grid.
pub const LAUNCH_FUEL_DROP: f32 = 0.2;

/// What start detection saw on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    Idle,
    /// At or before the green light; fuel baseline recorded
    Gridded,
    /// First throttle application detected
    Launched,
    /// Window expired
    WindowClosed,
}

/// Per-race progress for the monitored car.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RaceProgress {
    pub start_detected: bool,
    /// Still waiting for the first throttle application
    pub launch_pending: bool,
    pub start_fuel: f32,
    pub last_fuel: f32,
    pub compounds_used: BTreeSet<String>,
    pub race_ended: bool,
    pub finished_flag: bool,
}

impl RaceProgress {
    /// Advance start detection.
    ///
    /// On [`StartPhase::Launched`] the compound set already holds only the
    /// current tyre.
    pub fn detect_start(&mut self, snapshot: &TelemetrySnapshot) -> StartPhase {
        if !self.start_detected {
            if snapshot.completed_laps == 0 && snapshot.current_lap_time_ms <= 0 {
                debug!(fuel = snapshot.fuel, "Race start conditions detected");
                self.start_detected = true;
                self.launch_pending = true;
                self.start_fuel = snapshot.fuel;
                self.last_fuel = snapshot.fuel;
                self.race_ended = false;
                self.finished_flag = false;
                return StartPhase::Gridded;
            }
            return StartPhase::Idle;
        }

        if snapshot.current_lap_time_ms > START_WINDOW_MS {
            self.start_detected = false;
            self.launch_pending = false;
            return StartPhase::WindowClosed;
        }

        if !self.launch_pending {
            return StartPhase::Idle;
        }

        self.last_fuel = snapshot.fuel;
        let fuel_delta = self.start_fuel - self.last_fuel;
        if fuel_delta > 0.0 && fuel_delta < LAUNCH_FUEL_DROP {
            info!(tyre = %snapshot.tyre_compound, "Race launch detected");
            self.launch_pending = false;
            self.compounds_used.clear();
            self.record_compound(&snapshot.tyre_compound);
            StartPhase::Launched
        } else {
            self.start_fuel = self.last_fuel;
            StartPhase::Idle
        }
    }

    /// Whether this tick ends the race.
    ///
    /// Timed races report zero total laps and only end on the finished flag.
    pub fn reached_end(&self, snapshot: &TelemetrySnapshot) -> bool {
        let lap_limit =
            snapshot.total_laps > 0 && snapshot.completed_laps == snapshot.total_laps;
        !self.race_ended && (lap_limit || self.finished_flag)
    }

    pub fn record_compound(&mut self, tyre: &str) {
        if !tyre.is_empty() && self.compounds_used.insert(tyre.to_string()) {
            debug!(tyre, used = self.compounds_used.len(), "New compound used");
        }
    }
}
