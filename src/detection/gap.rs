//! DRS legality and zone occupancy for the monitored car
//!
//! Legality is decided once, on the tick the monitored car crosses a
//! detection line: DRS is legal for the zone when the lap is late enough and
//! another car crossed the same line at most `drs_activation_gap` seconds
//! earlier. The verdict then holds until the car leaves the zone.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::crossing::CrossingDetector;
use crate::config::{RuleConfig, ZoneRegistry};
use crate::types::ZoneId;
use crate::{Result, StewardError};

/// Index of the monitored car in every snapshot.
pub const MONITORED_CAR: usize = 0;

/// Zone flags for the monitored car.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneOccupancy {
    pub drs_valid: bool,
    pub in_zone: bool,
    pub zone_penalty_awarded: bool,
    pub last_drs_level: f32,
}

/// What the validator observed on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrsEvent {
    /// Crossed a detection line; `legal` is the verdict for this occupancy
    Armed { zone: ZoneId, legal: bool },
    /// Left the zone
    Exited { zone: ZoneId },
    /// Flap open in a zone where DRS is not allowed
    IllegalUse { zone: ZoneId },
    /// Flap opened outside any zone
    OpenedWithoutDetection,
    /// Passed the activation line with DRS allowed
    ActivationReached { zone: ZoneId },
}

/// Decides DRS legality and tracks zone occupancy.
#[derive(Debug, Clone)]
pub struct GapValidator {
    gap_threshold: f64,
    drs_enabled_lap: u32,
    occupancy: ZoneOccupancy,
}

impl GapValidator {
    pub fn new(rules: &RuleConfig) -> Self {
        Self {
            gap_threshold: rules.drs_activation_gap,
            drs_enabled_lap: rules.drs_enabled_lap,
            occupancy: ZoneOccupancy::default(),
        }
    }

    pub fn occupancy(&self) -> &ZoneOccupancy {
        &self.occupancy
    }

    pub fn enabled(&self) -> bool {
        self.gap_threshold > 0.0
    }

    /// Evaluate the monitored car after the detector has advanced.
    ///
    /// `crossed` is the zone the monitored car crossed on this tick, if any.
    pub fn evaluate(
        &mut self,
        detector: &CrossingDetector,
        zones: &ZoneRegistry,
        crossed: Option<ZoneId>,
        completed_laps: u32,
        drs_level: f32,
    ) -> Result<Vec<DrsEvent>> {
        let mut events = Vec::new();

        if self.enabled() {
            if let Some(zone) = crossed {
                let legal = self.arm(detector, zone, completed_laps);
                events.push(DrsEvent::Armed { zone, legal });
                // A start line at (or just past) the detection line is passed on the arming tick
                let start = zones.get(zone).map(|z| z.start);
                if legal && start.is_some_and(|start| crossed_line(detector, start)) {
                    events.push(DrsEvent::ActivationReached { zone });
                }
            } else if self.occupancy.in_zone {
                self.track_occupancy(detector, zones, drs_level, &mut events)?;
            } else if drs_level > 0.0 && self.occupancy.last_drs_level == 0.0 {
                debug!("DRS opened outside a zone");
                events.push(DrsEvent::OpenedWithoutDetection);
            }
        }

        self.occupancy.last_drs_level = drs_level;
        Ok(events)
    }

    fn arm(&mut self, detector: &CrossingDetector, zone: ZoneId, completed_laps: u32) -> bool {
        self.occupancy.in_zone = true;
        self.occupancy.drs_valid = false;
        self.occupancy.zone_penalty_awarded = false;

        if completed_laps.saturating_add(1) >= self.drs_enabled_lap {
            self.occupancy.drs_valid = self.car_within_gap(detector, zone);
        }

        debug!(zone = zone.number(), legal = self.occupancy.drs_valid, "Detection line crossed");
        self.occupancy.drs_valid
    }

    /// Whether another car crossed the same line no more than the gap earlier.
    fn car_within_gap(&self, detector: &CrossingDetector, zone: ZoneId) -> bool {
        let Some(crossed_at) = detector.current(MONITORED_CAR).and_then(|c| c.crossing_timestamp)
        else {
            return false;
        };

        detector
            .cars()
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != MONITORED_CAR)
            .filter(|(_, car)| car.last_zone_crossed == Some(zone))
            .filter_map(|(index, car)| car.crossing_timestamp.map(|at| (index, crossed_at - at)))
            .find(|(_, gap)| (0.0..=self.gap_threshold).contains(gap))
            .inspect(|(index, gap)| debug!(car = *index, gap = *gap, "Car ahead within DRS gap"))
            .is_some()
    }

    fn track_occupancy(
        &mut self,
        detector: &CrossingDetector,
        zones: &ZoneRegistry,
        drs_level: f32,
        events: &mut Vec<DrsEvent>,
    ) -> Result<()> {
        let Some(zone_id) = detector.current(MONITORED_CAR).and_then(|c| c.last_zone_crossed) else {
            warn!("In a DRS zone without a crossed detection line; clearing occupancy");
            self.clear();
            return Ok(());
        };
        let Some(zone) = zones.get(zone_id) else {
            self.clear();
            return Err(StewardError::ZoneOutOfRange { zone: zone_id.number(), available: zones.len() });
        };

        if drs_level > 0.0 && !self.occupancy.drs_valid && !self.occupancy.zone_penalty_awarded {
            self.occupancy.zone_penalty_awarded = true;
            events.push(DrsEvent::IllegalUse { zone: zone_id });
        }

        let Some(current) = detector.current(MONITORED_CAR).map(|c| c.spline_position) else {
            return Ok(());
        };

        // Fallback for an end line so close to start/finish the boundary test can miss it
        let wrapped_past_end = zone.end > 0.95 && current < 0.1;

        if wrapped_past_end || crossed_line(detector, zone.end) {
            debug!(zone = zone_id.number(), "Left DRS zone");
            self.clear();
            events.push(DrsEvent::Exited { zone: zone_id });
        }

        if self.occupancy.drs_valid && crossed_line(detector, zone.start) {
            events.push(DrsEvent::ActivationReached { zone: zone_id });
        }

        Ok(())
    }

    fn clear(&mut self) {
        self.occupancy.in_zone = false;
        self.occupancy.drs_valid = false;
        self.occupancy.zone_penalty_awarded = false;
    }
}

/// Whether the monitored car passed `line` on the latest tick, without wrap handling.
fn crossed_line(detector: &CrossingDetector, line: f64) -> bool {
    match (detector.previous(MONITORED_CAR), detector.current(MONITORED_CAR)) {
        (Some(previous), Some(current)) => {
            current.spline_position >= line && previous.spline_position < line
        }
        _ => false,
    }
}
