//! Rule enforcement for multiplayer racing sessions.
//!
//! DRS Steward watches the telemetry of one car and applies a league's race
//! rules to it in real time: DRS may only be opened in a zone when a car was
//! within the configured gap at the detection line, drive-through penalties
//! are served by passing through the pit lane, and tyre and refuelling rules
//! become post-race time penalties.
//!
//! # Features
//!
//! - **Zone detection**: detection line crossings for every car, with
//!   interpolated crossing times and start/finish wraparound
//! - **Penalty ledger**: queued drive-throughs and post-race penalties
//! - **Session rules**: qualifying tyre, race start, compound count and race end
//! - **Async driver**: Tokio task with signal fan-out and graceful shutdown
//!
//! ## Example (replay)
//!
//! ```rust,no_run
//! use drs_steward::config::{AppSettings, RuleConfig};
//! use drs_steward::{Signal, Steward};
//! use futures::StreamExt;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> drs_steward::Result<()> {
//!     let rules = RuleConfig::load_or_default(Path::new("rules.yaml"));
//!     let settings = AppSettings::load_or_default(Path::new("settings.yaml"));
//!     let connection =
//!         Steward::open_replay("race.yaml", rules, settings, Path::new("content/tracks")).await?;
//!
//!     let mut signals = Box::pin(connection.subscribe());
//!     while let Some(signal) = signals.next().await {
//!         if let Signal::PenaltyIssued(penalty) = signal {
//!             println!("Lap {}: {}", penalty.lap, penalty.detail);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Rule engine
pub mod detection;
pub mod penalty;
pub mod session;
pub mod signals;

// Stream-based steward architecture
pub mod connection;
pub mod cue;
pub mod driver;
pub mod provider;
pub mod providers;

use std::path::{Path, PathBuf};
use tracing::info;

// Core exports
pub use error::*;
pub use types::*;

pub use config::{AppSettings, RuleConfig, SessionContext, TrackInfo, ZoneRegistry};
pub use connection::StewardConnection;
pub use driver::{Driver, StewardCommand};
pub use provider::TelemetryProvider;
pub use providers::{ReplayProvider, SessionRecording};
pub use session::{DriverRaceState, SessionStateMachine};
pub use signals::{DrsIndicator, Signal};

/// Unified entry point for starting a steward.
///
/// # Examples
///
/// ## Any telemetry source
/// ```rust,no_run
/// use drs_steward::{AppSettings, ReplayProvider, RuleConfig, SessionContext, Steward, TrackInfo, ZoneRegistry};
///
/// #[tokio::main]
/// async fn main() -> drs_steward::Result<()> {
///     let zones = ZoneRegistry::from_bounds([(0.50, 0.50, 0.60)])?;
///     let track = TrackInfo { name: "monza".into(), layout: None, length_m: 5793.0 };
///     let context = SessionContext::new(RuleConfig::default(), AppSettings::default(), zones, track)
///         .with_server("League Night");
///     let provider = ReplayProvider::open("race.yaml")?;
///     let connection = Steward::start(context, "af1_2022", provider)?;
///     connection.stopped().await;
///     Ok(())
/// }
/// ```
pub struct Steward;

impl Steward {
    /// Start stewarding `car` with telemetry from `provider`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StewardError::CarNotAllowed`] when the car is not on the
    /// settings allow-list.
    pub fn start<P>(context: SessionContext, car: &str, provider: P) -> Result<StewardConnection>
    where
        P: TelemetryProvider,
    {
        context.ensure_car_allowed(car)?;
        info!(
            car,
            track = %context.track.name,
            zones = context.zones.len(),
            broadcast = context.broadcast_enabled,
            "Starting steward"
        );
        let channels = Driver::spawn(provider, SessionStateMachine::new(context));
        Ok(StewardConnection::new(channels))
    }

    /// Replay a recorded session under the given rules.
    ///
    /// Zones come from the recording's track under `tracks_root`; a missing
    /// zone file leaves DRS unchecked. Broadcasting stays disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The recording cannot be read or parsed
    /// - The recorded car is not on the settings allow-list
    pub async fn open_replay<P: AsRef<Path>>(
        path: P,
        rules: RuleConfig,
        settings: AppSettings,
        tracks_root: &Path,
    ) -> Result<StewardConnection> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let recording = tokio::task::spawn_blocking(move || SessionRecording::load(path))
            .await
            .map_err(|e| StewardError::provider_failed_with_source("recording loader", Box::new(e)))??;

        let zones =
            ZoneRegistry::load(tracks_root, &recording.track.name, recording.track.layout.as_deref());
        let car = recording.car.clone();
        let context = SessionContext::new(rules, settings, zones, recording.track.clone());
        Self::start(context, &car, ReplayProvider::new(recording))
    }
}
