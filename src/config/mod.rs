//! Session configuration: rules, app settings and zones.
//!
//! Rules and settings are YAML documents deserialized with `serde_yaml_ng`.
//! Every field has a default, so a partial file is valid and a missing or
//! broken one degrades to [`RuleConfig::default`] / [`AppSettings::default`]
//! with a warning instead of stopping the steward.
//!
//! ```yaml
//! # rules.yaml
//! min_tyre_compounds: 2
//! start_on_qualifying_tyre: true
//! qualifying_tyre_top_positions: 10
//! refuelling_allowed: false
//! drs_activation_gap: 1.0
//! drs_enabled_lap: 3
//! ```
//!
//! All three pieces are bundled into a [`SessionContext`], built once per
//! track load and handed to the session state machine.

pub mod zones;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::types::TickRate;
use crate::{Result, StewardError};

pub use zones::{ZoneRegistry, zone_file_path};

/// Rule parameters for a session. Immutable once the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Distinct tyre compounds required over the race; `0` disables the rule
    pub min_tyre_compounds: u32,
    /// Cars qualifying inside the cutoff must start on their best-lap tyre
    pub start_on_qualifying_tyre: bool,
    /// Leaderboard cutoff for the starting tyre rule
    pub qualifying_tyre_top_positions: u32,
    pub refuelling_allowed: bool,
    /// Maximum gap in seconds to the car ahead at the detection line;
    /// zero or negative disables DRS checking
    pub drs_activation_gap: f64,
    /// First lap on which DRS may be used
    pub drs_enabled_lap: u32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            min_tyre_compounds: 0,
            start_on_qualifying_tyre: false,
            qualifying_tyre_top_positions: 0,
            refuelling_allowed: true,
            drs_activation_gap: 0.0,
            drs_enabled_lap: 1,
        }
    }
}

impl RuleConfig {
    pub fn drs_checks_enabled(&self) -> bool {
        self.drs_activation_gap > 0.0
    }

    /// Load rules from YAML, substituting defaults on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        load_or_default(path, "rules")
    }
}

/// Audible cue played when DRS becomes available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeepSettings {
    pub enabled: bool,
    pub length_secs: f64,
}

impl Default for BeepSettings {
    fn default() -> Self {
        Self { enabled: true, length_secs: 0.5 }
    }
}

impl BeepSettings {
    /// How long the cue sounds; out-of-range lengths use the default.
    pub fn duration(&self) -> Duration {
        secs_or_default("beep.length_secs", self.length_secs, Self::default().length_secs)
    }
}

/// Application settings outside the race rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Prefix for broadcast chat messages
    pub app_name: String,
    pub beep: BeepSettings,
    /// Cars the steward runs for; empty allows every car
    pub allowed_cars: Vec<String>,
    /// Server name fragments that enable penalty broadcasts
    pub server_names: Vec<String>,
    pub tick_rate_hz: u32,
    /// Delay before the startup rules announcement
    pub announce_delay_secs: f64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: "DRS Steward".to_string(),
            beep: BeepSettings::default(),
            allowed_cars: Vec::new(),
            server_names: Vec::new(),
            tick_rate_hz: 30,
            announce_delay_secs: 10.0,
        }
    }
}

impl AppSettings {
    /// Load settings from YAML, substituting defaults on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        load_or_default(path, "settings")
    }

    pub fn allows_car(&self, car: &str) -> bool {
        self.allowed_cars.is_empty() || self.allowed_cars.iter().any(|c| c == car)
    }

    /// Whether penalties are broadcast on this server.
    pub fn broadcasts_on(&self, server_name: &str) -> bool {
        self.server_names.iter().any(|fragment| !fragment.is_empty() && server_name.contains(fragment.as_str()))
    }

    pub fn tick_rate(&self) -> TickRate {
        TickRate::Max(self.tick_rate_hz)
    }

    /// Delay before the rules announcement; out-of-range delays use the default.
    pub fn announce_delay(&self) -> Duration {
        secs_or_default("announce_delay_secs", self.announce_delay_secs, Self::default().announce_delay_secs)
    }
}

/// Negative and NaN values clamp to zero. Infinite or overflowing ones fall back.
fn secs_or_default(key: &str, secs: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_else(|e| {
        warn!("Setting {} = {} is not a usable duration ({}); using {}s", key, secs, e, fallback);
        Duration::from_secs_f64(fallback)
    })
}

/// Parse a YAML config document.
pub fn parse_yaml<T: DeserializeOwned>(contents: &str) -> Result<T> {
    if contents.trim().is_empty() {
        return Err(StewardError::parse("YAML", "document is empty"));
    }
    Ok(serde_yaml_ng::from_str(contents)?)
}

/// Read and parse a YAML config file, surfacing every failure.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| StewardError::file_error(path.to_path_buf(), e))?;
    parse_yaml(&contents)
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    match read_yaml(path) {
        Ok(value) => {
            info!("Loaded {} from {}", what, path.display());
            value
        }
        Err(e) => {
            warn!("Using default {} ({}): {}", what, path.display(), e);
            T::default()
        }
    }
}

/// Track facts needed by the detectors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackInfo {
    pub name: String,
    pub layout: Option<String>,
    /// Lap length in meters; `0` when the simulator cannot report it
    pub length_m: f64,
}

/// Everything fixed for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub rules: RuleConfig,
    pub settings: AppSettings,
    pub zones: ZoneRegistry,
    pub track: TrackInfo,
    /// Decided once at startup from the server allow-list
    pub broadcast_enabled: bool,
}

impl SessionContext {
    pub fn new(
        rules: RuleConfig,
        settings: AppSettings,
        zones: ZoneRegistry,
        track: TrackInfo,
    ) -> Self {
        Self { rules, settings, zones, track, broadcast_enabled: false }
    }

    /// Enable broadcasts when the server matches the allow-list.
    pub fn with_server(mut self, server_name: &str) -> Self {
        self.broadcast_enabled = self.settings.broadcasts_on(server_name);
        info!(server = server_name, broadcast = self.broadcast_enabled, "Server allow-list checked");
        self
    }

    /// Refuse to run for cars outside the allow-list.
    pub fn ensure_car_allowed(&self, car: &str) -> Result<()> {
        if self.settings.allows_car(car) {
            Ok(())
        } else {
            Err(StewardError::CarNotAllowed { car: car.to_string() })
        }
    }

    /// Rules summary posted once after startup.
    pub fn announcement(&self) -> String {
        format!(
            "{} is running. DRSGap={}; DRSLap={}; Fuel={}",
            self.settings.app_name,
            self.rules.drs_activation_gap,
            self.rules.drs_enabled_lap,
            u8::from(self.rules.refuelling_allowed)
        )
    }
}
