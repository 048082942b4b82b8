//! Audible DRS cue scheduling
//!
//! The session machine only emits [`Signal::CueStart`]. Playing and stopping
//! the sound belongs to the presentation side, through a [`CueSink`], with
//! [`CueScheduler`] owning the one-shot stop timer.
//!
//! Starting a cue cancels the stop timer of the previous one. Without that,
//! a cue started shortly after another would be cut off by the earlier timer.

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::signals::Signal;

/// Output device for the cue.
pub trait CueSink: Send + Sync + 'static {
    fn play(&self);
    /// May be called when nothing is playing
    fn stop(&self);
}

/// Starts cues and stops them after their duration.
pub struct CueScheduler<S: CueSink> {
    sink: Arc<S>,
    pending_stop: Option<CancellationToken>,
}

impl<S: CueSink> CueScheduler<S> {
    pub fn new(sink: S) -> Self {
        Self { sink: Arc::new(sink), pending_stop: None }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Play the cue and schedule its stop, replacing any pending stop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, duration: Duration) {
        self.cancel_pending();
        self.sink.play();

        let token = CancellationToken::new();
        let sink = Arc::clone(&self.sink);
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => trace!("Cue stop replaced"),
                _ = tokio::time::sleep(duration) => sink.stop(),
            }
        });
        self.pending_stop = Some(token);
    }

    /// Stop immediately.
    pub fn stop(&mut self) {
        self.cancel_pending();
        self.sink.stop();
    }

    /// React to a steward signal; returns whether it was a cue.
    pub fn handle(&mut self, signal: &Signal) -> bool {
        match signal {
            Signal::CueStart { duration } => {
                self.start(*duration);
                true
            }
            _ => false,
        }
    }

    /// Drive cues from a signal stream until it ends.
    pub async fn run<St>(mut self, signals: St)
    where
        St: Stream<Item = Signal>,
    {
        futures::pin_mut!(signals);
        while let Some(signal) = signals.next().await {
            self.handle(&signal);
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending_stop.take() {
            token.cancel();
        }
    }
}

impl<S: CueSink> Drop for CueScheduler<S> {
    fn drop(&mut self) {
        if let Some(token) = self.pending_stop.take() {
            token.cancel();
            self.sink.stop();
        }
    }
}
