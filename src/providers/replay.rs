//! Replay provider for recorded sessions

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::config::{TrackInfo, read_yaml};
use crate::provider::TelemetryProvider;
use crate::types::TelemetrySnapshot;
use crate::{Result, StewardError};

fn default_tick_rate() -> f64 {
    30.0
}

/// A recorded session: the track plus every sampled snapshot, in order.
///
/// ```yaml
/// track:
///   name: monza
///   length_m: 5793.0
/// car: af1_2022
/// tick_rate: 30.0
/// snapshots:
///   - timestamp: 0.0
///     session: Race
///     cars:
///       - spline_position: 0.49
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecording {
    pub track: TrackInfo,
    /// Model of the monitored car
    #[serde(default)]
    pub car: String,
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    pub snapshots: Vec<TelemetrySnapshot>,
}

impl SessionRecording {
    /// Load a recording from YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let recording: Self = read_yaml(path)?;
        if !(recording.tick_rate.is_finite() && recording.tick_rate > 0.0) {
            return Err(StewardError::configuration(
                format!("recording {}", path.display()),
                format!("tick rate {} must be positive", recording.tick_rate),
            ));
        }
        info!(
            "Loaded recording {}: {} snapshots at {}Hz",
            path.display(),
            recording.snapshots.len(),
            recording.tick_rate
        );
        Ok(recording)
    }
}

/// Replay provider that plays back recorded snapshots
pub struct ReplayProvider {
    snapshots: VecDeque<TelemetrySnapshot>,

    total: usize,

    /// Playback speed multiplier (1.0 = normal, 2.0 = double speed)
    speed: f64,

    /// When false, replays as fast as the consumer reads
    paced: bool,

    /// Created lazily so construction does not need a runtime
    interval: Option<Interval>,

    tick_rate: f64,
}

impl ReplayProvider {
    pub fn new(recording: SessionRecording) -> Self {
        Self::from_snapshots(recording.snapshots, recording.tick_rate)
    }

    /// Replay snapshots held in memory.
    pub fn from_snapshots(snapshots: Vec<TelemetrySnapshot>, tick_rate: f64) -> Self {
        let tick_rate = if tick_rate.is_finite() && tick_rate > 0.0 { tick_rate } else { default_tick_rate() };
        let total = snapshots.len();
        Self { snapshots: snapshots.into(), total, speed: 1.0, paced: true, interval: None, tick_rate }
    }

    /// Open a YAML recording.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        SessionRecording::load(path).map(Self::new)
    }

    /// Set playback speed
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 10.0);
        self.interval = None;
        debug!("Playback speed set to {}x", self.speed);
    }

    /// Disable pacing, for offline adjudication.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Snapshots already handed out
    pub fn position(&self) -> usize {
        self.total - self.snapshots.len()
    }

    /// Get current playback time in seconds
    pub fn current_time(&self) -> f64 {
        self.position() as f64 / self.tick_rate
    }

    /// Get total duration in seconds
    pub fn duration(&self) -> f64 {
        self.total as f64 / self.tick_rate
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / (self.tick_rate * self.speed))
    }
}

#[async_trait::async_trait]
impl TelemetryProvider for ReplayProvider {
    async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
        if self.snapshots.is_empty() {
            debug!("Reached end of replay");
            return Ok(None);
        }

        if self.paced {
            let period = self.frame_interval();
            let pacing = self.interval.get_or_insert_with(|| {
                let mut pacing = interval(period);
                pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
                pacing
            });
            pacing.tick().await;
        }

        let snapshot = self.snapshots.pop_front();
        trace!("Snapshot {}/{}", self.position(), self.total);
        Ok(snapshot)
    }

    fn tick_rate(&self) -> f64 {
        self.tick_rate
    }
}
