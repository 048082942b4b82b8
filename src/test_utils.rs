//! Test utilities for building snapshots and session contexts
//!
//! Shared by the unit tests and the benchmarks so that every scenario starts
//! from the same track: 5000 m long with a single zone whose detection and
//! activation lines sit at half distance and which ends at `0.60`.

#![cfg(any(test, feature = "benchmark"))]

use std::path::PathBuf;

use crate::config::{AppSettings, RuleConfig, SessionContext, TrackInfo, ZoneRegistry};
use crate::types::{CarTelemetry, SessionType, TelemetrySnapshot};

pub const TEST_TRACK_LENGTH_M: f64 = 5000.0;

/// Directory holding recorded sessions and zone files.
pub fn test_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data")
}

/// The reference zone layout.
pub fn single_zone() -> ZoneRegistry {
    ZoneRegistry::from_bounds([(0.50, 0.50, 0.60)]).unwrap_or_else(|_| ZoneRegistry::empty())
}

pub fn test_track() -> TrackInfo {
    TrackInfo { name: "test_track".to_string(), layout: None, length_m: TEST_TRACK_LENGTH_M }
}

/// Session context on the reference track with the given rules.
pub fn context_with(rules: RuleConfig) -> SessionContext {
    SessionContext::new(rules, AppSettings::default(), single_zone(), test_track())
}

/// Builder for [`TelemetrySnapshot`]s.
///
/// Defaults describe a race car mid-way through its first lap of twenty,
/// away from the grid so start detection stays idle.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: TelemetrySnapshot,
}

impl SnapshotBuilder {
    pub fn race() -> Self {
        Self {
            snapshot: TelemetrySnapshot {
                timestamp: 0.0,
                session: SessionType::Race,
                completed_laps: 0,
                total_laps: 20,
                current_lap_time_ms: 30_000,
                best_lap_ms: 0,
                leaderboard_position: 1,
                fuel: 50.0,
                tyre_compound: "M".to_string(),
                drs_level: 0.0,
                speed_kmh: 200.0,
                in_pit_lane: false,
                driver_name: "Test Driver".to_string(),
                cars: vec![CarTelemetry::at(0.0)],
            },
        }
    }

    pub fn session(mut self, session: SessionType) -> Self {
        self.snapshot.session = session;
        self
    }

    pub fn at(mut self, timestamp: f64) -> Self {
        self.snapshot.timestamp = timestamp;
        self
    }

    /// Spline positions; the first entry is the monitored car.
    pub fn cars(mut self, positions: &[f64]) -> Self {
        self.snapshot.cars = positions.iter().copied().map(CarTelemetry::at).collect();
        self
    }

    pub fn laps(mut self, completed: u32) -> Self {
        self.snapshot.completed_laps = completed;
        self
    }

    pub fn total_laps(mut self, total: u32) -> Self {
        self.snapshot.total_laps = total;
        self
    }

    pub fn lap_time(mut self, ms: i64) -> Self {
        self.snapshot.current_lap_time_ms = ms;
        self
    }

    pub fn best_lap(mut self, ms: u32) -> Self {
        self.snapshot.best_lap_ms = ms;
        self
    }

    pub fn position(mut self, position: u32) -> Self {
        self.snapshot.leaderboard_position = position;
        self
    }

    pub fn fuel(mut self, fuel: f32) -> Self {
        self.snapshot.fuel = fuel;
        self
    }

    pub fn tyre(mut self, tyre: &str) -> Self {
        self.snapshot.tyre_compound = tyre.to_string();
        self
    }

    pub fn drs(mut self, level: f32) -> Self {
        self.snapshot.drs_level = level;
        self
    }

    pub fn speed(mut self, kmh: f32) -> Self {
        self.snapshot.speed_kmh = kmh;
        self
    }

    pub fn pit(mut self, in_pit_lane: bool) -> Self {
        self.snapshot.in_pit_lane = in_pit_lane;
        self
    }

    pub fn build(self) -> TelemetrySnapshot {
        self.snapshot
    }
}

/// A lap of evenly spaced samples for `cars` cars, the monitored car leading
/// the field by `spacing` of a lap each.
pub fn lap_of_samples(samples: usize, cars: usize, spacing: f64) -> Vec<TelemetrySnapshot> {
    (0..samples)
        .map(|i| {
            let base = i as f64 / samples as f64;
            let positions: Vec<f64> =
                (0..cars).map(|c| (base - c as f64 * spacing).rem_euclid(1.0)).collect();
            SnapshotBuilder::race().at(i as f64 / 30.0).cars(&positions).laps(2).build()
        })
        .collect()
}
