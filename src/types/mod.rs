//! Core types shared by the detectors, the ledger and the session machine.
//!
//! ## Overview
//!
//! - [`TelemetrySnapshot`] is the per-tick input: the monitored car's physics
//!   and graphics readings plus every car's spline position
//! - [`ZoneDefinition`] describes one DRS zone by three spline fractions
//! - [`Penalty`] is a ledger entry, tagged [`PenaltyClass::Immediate`] or
//!   [`PenaltyClass::Deferred`]
//! - [`TickRate`] paces the steward loop against the provider's own rate
//!
//! ## Usage Example
//!
//! ```rust
//! use drs_steward::types::{CarTelemetry, SessionType, TelemetrySnapshot};
//!
//! let snapshot = TelemetrySnapshot {
//!     timestamp: 12.5,
//!     session: SessionType::Race,
//!     completed_laps: 2,
//!     total_laps: 20,
//!     cars: vec![CarTelemetry::at(0.51), CarTelemetry::at(0.49)],
//!     ..Default::default()
//! };
//!
//! assert!(snapshot.validate().is_ok());
//! assert_eq!(snapshot.current_lap(), 3);
//! ```

mod penalty;
mod telemetry;
mod tick_rate;
mod zone;

pub use penalty::{Penalty, PenaltyClass, PenaltyReason};
pub use telemetry::{CarTelemetry, SessionType, TelemetrySnapshot};
pub use tick_rate::TickRate;
pub use zone::{ZoneDefinition, ZoneId};
