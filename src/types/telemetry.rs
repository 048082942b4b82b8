//! Per-tick telemetry snapshot handed to the steward

use serde::{Deserialize, Serialize};

use crate::{Result, StewardError};

/// Session kind reported by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionType {
    Practice,
    Qualifying,
    Race,
    Hotlap,
    TimeAttack,
    Drift,
    Drag,
    #[default]
    Unknown,
}

impl SessionType {
    /// Map the simulator's numeric session code onto a session kind.
    ///
    /// Codes follow the Assetto Corsa shared memory layout: `0` practice,
    /// `1` qualifying, `2` race, `3` hotlap, `4` time attack, `5` drift,
    /// `6` drag. Anything else is [`SessionType::Unknown`].
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => SessionType::Practice,
            1 => SessionType::Qualifying,
            2 => SessionType::Race,
            3 => SessionType::Hotlap,
            4 => SessionType::TimeAttack,
            5 => SessionType::Drift,
            6 => SessionType::Drag,
            _ => SessionType::Unknown,
        }
    }
}

/// Position of a single car on the track.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarTelemetry {
    /// Normalized distance around the lap, `0.0` at the start/finish line
    pub spline_position: f64,
}

impl CarTelemetry {
    pub fn at(spline_position: f64) -> Self {
        Self { spline_position }
    }
}

/// Everything the steward reads on one tick.
///
/// Car index `0` in [`cars`](Self::cars) is the monitored car; the scalar
/// fields all describe that car.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySnapshot {
    /// Wall-clock time of the sample, in seconds
    pub timestamp: f64,
    pub session: SessionType,
    pub completed_laps: u32,
    /// Configured race distance in laps (`0` for timed sessions)
    pub total_laps: u32,
    /// Elapsed time in the current lap in milliseconds; `<= 0` before the start
    pub current_lap_time_ms: i64,
    /// Best lap of the session in milliseconds; `0` means no valid lap yet
    pub best_lap_ms: u32,
    pub leaderboard_position: u32,
    pub fuel: f32,
    pub tyre_compound: String,
    /// DRS flap actuation, `0.0` when closed
    pub drs_level: f32,
    pub speed_kmh: f32,
    pub in_pit_lane: bool,
    pub driver_name: String,
    pub cars: Vec<CarTelemetry>,
}

impl TelemetrySnapshot {
    /// The monitored car's track position.
    pub fn monitored(&self) -> Option<&CarTelemetry> {
        self.cars.first()
    }

    /// Lap number shown on penalties (the lap currently being driven).
    pub fn current_lap(&self) -> u32 {
        self.completed_laps.saturating_add(1)
    }

    /// Reject snapshots the detectors cannot reason about.
    pub fn validate(&self) -> Result<()> {
        if !self.timestamp.is_finite() {
            return Err(StewardError::invalid_telemetry("timestamp", "not a finite number"));
        }
        if self.cars.is_empty() {
            return Err(StewardError::telemetry_unavailable("snapshot carries no cars"));
        }
        for (index, car) in self.cars.iter().enumerate() {
            let spline = car.spline_position;
            if !spline.is_finite() || !(0.0..=1.0).contains(&spline) {
                return Err(StewardError::invalid_telemetry(
                    format!("cars[{}].spline_position", index),
                    format!("{} is outside [0, 1]", spline),
                ));
            }
        }
        if !self.fuel.is_finite() {
            return Err(StewardError::invalid_telemetry("fuel", "not a finite number"));
        }
        if !self.drs_level.is_finite() || !self.speed_kmh.is_finite() {
            return Err(StewardError::invalid_telemetry("physics", "non-finite DRS level or speed"));
        }
        Ok(())
    }
}
