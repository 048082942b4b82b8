//! Driver spawns and manages the steward tick task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::StewardError;
use crate::provider::TelemetryProvider;
use crate::session::{DriverRaceState, SessionStateMachine};
use crate::signals::Signal;

/// Signals buffered per subscriber before the slowest one starts lagging.
pub const SIGNAL_CAPACITY: usize = 256;

const COMMAND_CAPACITY: usize = 32;

const MAX_ERRORS: u32 = 10;

/// Inbound events from outside the telemetry stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StewardCommand {
    /// A chat message seen on the server
    Chat { sender: String, message: String },
    /// The race finished for the monitored car
    RaceFinished,
}

/// Result of spawning driver tasks
pub struct DriverChannels {
    /// Template receiver; resubscribe to get a signal feed
    pub signals: broadcast::Receiver<Signal>,
    /// Latest rule state of the monitored car
    pub state: watch::Receiver<Arc<DriverRaceState>>,
    /// Chat and race-finished events
    pub commands: mpsc::Sender<StewardCommand>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Driver spawns and manages the steward tasks
///
/// The tick task owns the provider and the state machine, so no state is
/// shared across tasks. A second, one-shot task posts the rules announcement
/// when broadcasting is enabled.
pub struct Driver;

impl Driver {
    /// Spawn driver tasks for the given provider
    ///
    /// Must be called from within a Tokio runtime. The provider's
    /// `next_snapshot` future must be cancel safe: it is raced against
    /// inbound commands and cancellation.
    pub fn spawn<P>(provider: P, machine: SessionStateMachine) -> DriverChannels
    where
        P: TelemetryProvider,
    {
        let (signal_tx, signal_rx) = broadcast::channel(SIGNAL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(Arc::new(machine.driver_state()));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let cancel = CancellationToken::new();

        let context = machine.context();
        if context.broadcast_enabled {
            let delay = context.settings.announce_delay();
            tokio::spawn(Self::announce_task(
                context.announcement(),
                delay,
                signal_tx.clone(),
                cancel.clone(),
            ));
        }

        tokio::spawn(Self::tick_task(
            provider,
            machine,
            signal_tx,
            state_tx,
            command_rx,
            cancel.clone(),
        ));

        DriverChannels { signals: signal_rx, state: state_rx, commands: command_tx, cancel }
    }

    /// Tick task - reads snapshots and advances the state machine
    async fn tick_task<P>(
        mut provider: P,
        mut machine: SessionStateMachine,
        signal_tx: broadcast::Sender<Signal>,
        state_tx: watch::Sender<Arc<DriverRaceState>>,
        mut commands: mpsc::Receiver<StewardCommand>,
        cancel: CancellationToken,
    ) where
        P: TelemetryProvider,
    {
        info!("Steward tick task started");
        let min_spacing =
            machine.context().settings.tick_rate().tick_interval(provider.tick_rate());
        let mut last_tick: Option<Instant> = None;
        let mut tick_count = 0u64;
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Steward tick task cancelled");
                    break;
                }
                Some(command) = commands.recv() => {
                    Self::apply_command(&mut machine, command);
                    state_tx.send_replace(Arc::new(machine.driver_state()));
                    continue;
                }
                result = provider.next_snapshot() => result,
            };

            match result {
                Ok(Some(snapshot)) => {
                    error_count = 0;

                    if let (Some(spacing), Some(last)) = (min_spacing, last_tick) {
                        if last.elapsed() < spacing {
                            trace!("Snapshot at {} skipped by tick rate", snapshot.timestamp);
                            continue;
                        }
                    }
                    last_tick = Some(Instant::now());
                    tick_count += 1;

                    match machine.tick(&snapshot) {
                        Ok(signals) => {
                            trace!("Tick {}: {} signals", tick_count, signals.len());
                            for signal in signals {
                                // No subscribers is fine; signals are fire-and-forget
                                let _ = signal_tx.send(signal);
                            }
                            state_tx.send_replace(Arc::new(machine.driver_state()));
                        }
                        Err(StewardError::TelemetryUnavailable { reason }) => {
                            debug!("Tick skipped, telemetry unavailable: {}", reason);
                        }
                        Err(e) => {
                            error!("Tick abandoned: {}", e);
                        }
                    }
                }
                Ok(None) => {
                    info!("Provider stream ended after {} ticks", tick_count);
                    break;
                }
                Err(StewardError::TelemetryUnavailable { reason }) => {
                    debug!("Telemetry unavailable: {}", reason);
                }
                Err(e) => {
                    // Provider error - don't stop on transient failures
                    error_count += 1;
                    error!("Provider error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many provider errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        info!("Steward tick task ended (processed {} ticks)", tick_count);
    }

    fn apply_command(machine: &mut SessionStateMachine, command: StewardCommand) {
        match command {
            StewardCommand::Chat { sender, message } => {
                if machine.on_chat_message(&sender, &message) {
                    debug!("Finished flag set from server chat");
                }
            }
            StewardCommand::RaceFinished => machine.mark_race_finished(),
        }
    }

    /// Announce task - posts the active rules once after a delay
    async fn announce_task(
        announcement: String,
        delay: Duration,
        signal_tx: broadcast::Sender<Signal>,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Announcement cancelled");
            }
            _ = tokio::time::sleep(delay) => {
                info!("{}", announcement);
                if signal_tx.send(Signal::Broadcast(announcement)).is_err() {
                    warn!("No subscribers for the rules announcement");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::config::RuleConfig;
    use crate::test_utils::{SnapshotBuilder, context_with};
    use crate::types::TelemetrySnapshot;
    use std::collections::VecDeque;

    /// Provider replaying scripted results without pacing.
    struct Scripted {
        script: VecDeque<Result<Option<TelemetrySnapshot>>>,
    }

    #[async_trait::async_trait]
    impl TelemetryProvider for Scripted {
        async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn tick_rate(&self) -> f64 {
            30.0
        }
    }

    fn machine() -> SessionStateMachine {
        let mut context = context_with(RuleConfig { drs_activation_gap: 1.0, ..Default::default() });
        context.settings.tick_rate_hz = 0;
        SessionStateMachine::new(context)
    }

    async fn drain(mut state: watch::Receiver<Arc<DriverRaceState>>) -> Arc<DriverRaceState> {
        while state.changed().await.is_ok() {}
        state.borrow().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn errors_do_not_stop_the_loop() {
        let script = VecDeque::from(vec![
            Ok(Some(SnapshotBuilder::race().at(0.0).cars(&[0.10]).build())),
            Err(StewardError::provider_failed("hiccup")),
            Err(StewardError::telemetry_unavailable("not mapped")),
            Ok(Some(SnapshotBuilder::race().at(0.1).cars(&[1.5]).build())),
            Ok(Some(SnapshotBuilder::race().at(0.2).cars(&[0.12]).drs(1.0).build())),
        ]);
        let mut channels = Driver::spawn(Scripted { script }, machine());

        let state = drain(channels.state.clone()).await;
        assert_eq!(state.pending_penalties, 1);

        let mut issued = 0;
        while let Ok(signal) = channels.signals.try_recv() {
            if matches!(signal, Signal::PenaltyIssued(_)) {
                issued += 1;
            }
        }
        assert_eq!(issued, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn too_many_provider_errors_end_the_task() {
        let script = (0..MAX_ERRORS).map(|_| Err(StewardError::provider_failed("gone"))).collect();
        let channels = Driver::spawn(Scripted { script }, machine());
        let state = drain(channels.state.clone()).await;
        assert_eq!(state.pending_penalties, 0);
        assert!(channels.commands.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_task() {
        struct Endless;

        #[async_trait::async_trait]
        impl TelemetryProvider for Endless {
            async fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(Some(SnapshotBuilder::race().build()))
            }

            fn tick_rate(&self) -> f64 {
                1.0
            }
        }

        let channels = Driver::spawn(Endless, machine());
        tokio::time::sleep(Duration::from_secs(3)).await;
        channels.cancel.cancel();
        drain(channels.state.clone()).await;
        assert!(channels.commands.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn announcement_broadcast_after_delay() {
        let mut context = machine().context().clone();
        context.broadcast_enabled = true;
        context.settings.announce_delay_secs = 10.0;

        let mut channels =
            Driver::spawn(Scripted { script: VecDeque::new() }, SessionStateMachine::new(context));

        tokio::time::sleep(Duration::from_secs(11)).await;
        let announcement = channels.signals.recv().await.unwrap();
        assert_eq!(
            announcement,
            Signal::Broadcast("DRS Steward is running. DRSGap=1; DRSLap=1; Fuel=1".into())
        );
    }
}
