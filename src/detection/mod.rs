//! Per-tick DRS detection.
//!
//! [`CrossingDetector`] turns consecutive spline positions into detection
//! line crossings for every car; [`GapValidator`] reads those crossings to
//! decide whether the monitored car may use DRS in the zone it just entered.

pub mod crossing;
pub mod gap;

pub use crossing::{
    CarTick, CrossingDetector, CrossingEvent, CrossingKind, SplineSample, classify,
    first_crossing, interpolate_crossing,
};
pub use gap::{DrsEvent, GapValidator, MONITORED_CAR, ZoneOccupancy};
