//! Handle to a running steward

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::driver::{DriverChannels, StewardCommand};
use crate::session::DriverRaceState;
use crate::signals::Signal;
use crate::{Result, StewardError};

/// Connection to a steward task.
///
/// Dropping the connection stops the steward.
pub struct StewardConnection {
    signals: broadcast::Receiver<Signal>,
    state: watch::Receiver<Arc<DriverRaceState>>,
    commands: mpsc::Sender<StewardCommand>,
    cancel: CancellationToken,
}

impl StewardConnection {
    pub(crate) fn new(channels: DriverChannels) -> Self {
        let DriverChannels { signals, state, commands, cancel } = channels;
        Self { signals, state, commands, cancel }
    }

    /// Subscribe to signals emitted from now on.
    ///
    /// A subscriber that falls more than [`SIGNAL_CAPACITY`] signals behind
    /// skips the oldest ones. The stream ends when the steward stops.
    ///
    /// [`SIGNAL_CAPACITY`]: crate::driver::SIGNAL_CAPACITY
    pub fn subscribe(&self) -> impl Stream<Item = Signal> + 'static {
        BroadcastStream::new(self.signals.resubscribe()).filter_map(|item| async move {
            match item {
                Ok(signal) => Some(signal),
                Err(e) => {
                    warn!("Signal subscriber lagging: {}", e);
                    None
                }
            }
        })
    }

    /// Rule state updates, starting with the current one.
    pub fn state_updates(&self) -> impl Stream<Item = Arc<DriverRaceState>> + 'static {
        WatchStream::new(self.state.clone())
    }

    /// Latest rule state of the monitored car.
    pub fn state(&self) -> Arc<DriverRaceState> {
        self.state.borrow().clone()
    }

    /// Forward a server chat message.
    pub async fn send_chat(&self, sender: impl Into<String>, message: impl Into<String>) -> Result<()> {
        self.send(StewardCommand::Chat { sender: sender.into(), message: message.into() }).await
    }

    /// Mark the race as finished for the monitored car.
    pub async fn race_finished(&self) -> Result<()> {
        self.send(StewardCommand::RaceFinished).await
    }

    /// Whether the steward task has stopped.
    pub fn is_stopped(&self) -> bool {
        self.commands.is_closed()
    }

    /// Wait until the steward stops, returning the final state.
    pub async fn stopped(&self) -> Arc<DriverRaceState> {
        let mut state = self.state.clone();
        while state.changed().await.is_ok() {}
        let last = state.borrow().clone();
        last
    }

    /// Stop the steward.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn send(&self, command: StewardCommand) -> Result<()> {
        self.commands.send(command).await.map_err(|_| StewardError::Stopped)
    }
}

impl Drop for StewardConnection {
    fn drop(&mut self) {
        debug!("Dropping steward connection");
        self.cancel.cancel();
    }
}
