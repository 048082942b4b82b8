//! Provider trait for telemetry sources

use crate::Result;
use crate::types::TelemetrySnapshot;

/// Trait for telemetry data sources
///
/// Providers abstract over where snapshots come from (a simulator's shared
/// memory, a recorded session, a test script) and handle their own timing.
#[async_trait::async_trait]
pub trait TelemetryProvider: Send + 'static {
    /// Get the next telemetry snapshot
    ///
    /// Returns:
    /// - `Ok(Some(snapshot))` - New snapshot available
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Error occurred; [`TelemetryUnavailable`] skips one tick
    ///
    /// [`TelemetryUnavailable`]: crate::StewardError::TelemetryUnavailable
    async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>>;

    /// Native sample rate in Hz
    fn tick_rate(&self) -> f64;
}
