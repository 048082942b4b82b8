//! Detection-line crossing with lap wraparound and time interpolation
//!
//! Each tick the detector compares every car's spline position with the one
//! it held on the previous tick. A car that passed a zone's detection line
//! in between gets that zone recorded as its last crossed zone, stamped with
//! the interpolated instant it reached the line.
//!
//! Three disjoint cases are tested, chosen by `delta = current - previous`:
//!
//! ```text
//! Normal       delta > -0.8                 previous < detection <= current
//! AfterLine    delta <= -0.8, detection<0.1 line just after start/finish
//! BeforeLine   delta <= -0.8, detection>0.9 line just before start/finish
//! ```
//!
//! Zones are tested in registry order and the first hit wins, so a car
//! produces at most one crossing per tick.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::ZoneRegistry;
use crate::types::{CarTelemetry, ZoneDefinition, ZoneId};

/// A spline delta at or below this is read as a lap wrap.
pub const WRAP_DELTA: f64 = -0.8;
/// Detection lines below this fraction sit just after start/finish.
pub const AFTER_LINE_LIMIT: f64 = 0.1;
/// Detection lines above this fraction sit just before start/finish.
pub const BEFORE_LINE_LIMIT: f64 = 0.9;

/// Which geometry matched a crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossingKind {
    /// Both samples on the same lap
    Normal,
    /// Wrapped past start/finish, line just after it
    AfterLine,
    /// Wrapped past start/finish, line just before it
    BeforeLine,
}

/// A spline position and the time it was sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineSample {
    pub position: f64,
    pub at: f64,
}

/// Test one detection line against a pair of consecutive positions.
pub fn classify(detection: f64, previous: f64, current: f64) -> Option<CrossingKind> {
    let delta = current - previous;
    if delta > WRAP_DELTA {
        (current >= detection && previous < detection).then_some(CrossingKind::Normal)
    } else if detection < AFTER_LINE_LIMIT {
        (current >= detection && previous - 1.0 < detection).then_some(CrossingKind::AfterLine)
    } else if detection > BEFORE_LINE_LIMIT {
        (current + 1.0 >= detection && previous < detection).then_some(CrossingKind::BeforeLine)
    } else {
        None
    }
}

/// First zone, in registry order, whose detection line lies between the samples.
pub fn first_crossing(
    zones: &[ZoneDefinition],
    previous: f64,
    current: f64,
) -> Option<(&ZoneDefinition, CrossingKind)> {
    zones
        .iter()
        .find_map(|zone| classify(zone.detection, previous, current).map(|kind| (zone, kind)))
}

/// Estimate when the car reached the detection line.
///
/// Assumes constant speed between the two samples. When the car covered no
/// distance (or the track length is unknown) there is nothing to interpolate
/// and the crossing is placed at the current sample.
pub fn interpolate_crossing(
    kind: CrossingKind,
    detection: f64,
    track_length: f64,
    previous: SplineSample,
    current: SplineSample,
) -> f64 {
    let elapsed = current.at - previous.at;
    let travelled = match kind {
        CrossingKind::Normal => (current.position - previous.position).abs(),
        CrossingKind::AfterLine | CrossingKind::BeforeLine => {
            current.position + (1.0 - previous.position)
        }
    } * track_length;

    if !(travelled > 0.0) || !elapsed.is_finite() {
        return current.at;
    }
    let seconds_per_meter = elapsed / travelled;

    let estimate = match kind {
        CrossingKind::Normal | CrossingKind::BeforeLine => {
            let to_line = (detection - previous.position).abs() * track_length;
            previous.at + to_line * seconds_per_meter
        }
        CrossingKind::AfterLine => {
            let past_line = (current.position - detection).abs() * track_length;
            current.at - past_line * seconds_per_meter
        }
    };

    if current.at >= previous.at { estimate.clamp(previous.at, current.at) } else { estimate }
}

/// Per-car state retained between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarTick {
    pub spline_position: f64,
    /// Most recently crossed detection line, not zone membership
    pub last_zone_crossed: Option<ZoneId>,
    pub crossing_timestamp: Option<f64>,
}

/// A detection line crossed on this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingEvent {
    pub car: usize,
    pub zone: ZoneId,
    pub kind: CrossingKind,
    pub timestamp: f64,
}

/// Tracks every car's last crossed detection line.
///
/// History depth is one tick: only the previous sample per car is kept.
#[derive(Debug, Clone)]
pub struct CrossingDetector {
    track_length: f64,
    previous: Vec<CarTick>,
    current: Vec<CarTick>,
    last_tick_at: Option<f64>,
}

impl CrossingDetector {
    pub fn new(track_length: f64) -> Self {
        Self { track_length, previous: Vec::new(), current: Vec::new(), last_tick_at: None }
    }

    /// Advance one tick and report the crossings it contained.
    ///
    /// Cars without a previous sample (first tick, or a car that just
    /// joined) are recorded but cannot cross anything yet.
    pub fn update(
        &mut self,
        zones: &ZoneRegistry,
        now: f64,
        cars: &[CarTelemetry],
    ) -> Vec<CrossingEvent> {
        let previous = std::mem::take(&mut self.current);
        let mut current = Vec::with_capacity(cars.len());
        let mut events = Vec::new();

        for (index, car) in cars.iter().enumerate() {
            let mut tick = CarTick { spline_position: car.spline_position, ..Default::default() };

            if let (Some(last), Some(last_at)) = (previous.get(index), self.last_tick_at) {
                tick.last_zone_crossed = last.last_zone_crossed;
                tick.crossing_timestamp = last.crossing_timestamp;

                if let Some((zone, kind)) =
                    first_crossing(zones.as_slice(), last.spline_position, car.spline_position)
                {
                    let timestamp = interpolate_crossing(
                        kind,
                        zone.detection,
                        self.track_length,
                        SplineSample { position: last.spline_position, at: last_at },
                        SplineSample { position: car.spline_position, at: now },
                    );
                    trace!(car = index, zone = zone.id.number(), ?kind, timestamp, "Detection line crossed");

                    tick.last_zone_crossed = Some(zone.id);
                    tick.crossing_timestamp = Some(timestamp);
                    events.push(CrossingEvent { car: index, zone: zone.id, kind, timestamp });
                }
            }

            current.push(tick);
        }

        self.previous = previous;
        self.current = current;
        self.last_tick_at = Some(now);
        events
    }

    /// State of a car after the latest tick.
    pub fn current(&self, car: usize) -> Option<&CarTick> {
        self.current.get(car)
    }

    /// State of a car one tick earlier.
    pub fn previous(&self, car: usize) -> Option<&CarTick> {
        self.previous.get(car)
    }

    pub fn cars(&self) -> &[CarTick] {
        &self.current
    }

    pub fn track_length(&self) -> f64 {
        self.track_length
    }
}
