//! Replay a recorded session through the steward and print what it decides.
//!
//! ```text
//! cargo run --example replay -- [recording.yaml] [rules.yaml] [settings.yaml] [tracks_root]
//! ```
//!
//! Defaults replay the bundled single-zone recording on the test track.
//! Set `RUST_LOG=drs_steward=debug` to follow zone and pit transitions.

use anyhow::{Context, Result};
use drs_steward::cue::{CueScheduler, CueSink};
use drs_steward::{AppSettings, RuleConfig, Signal, Steward};
use futures::StreamExt;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Prints the cue instead of playing a sound.
struct ConsoleBeep;

impl CueSink for ConsoleBeep {
    fn play(&self) {
        println!("  *beep*");
    }

    fn stop(&self) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drs_steward=info")),
        )
        .init();

    let test_data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data");
    let mut args = std::env::args().skip(1);
    let recording = args.next().map(PathBuf::from).unwrap_or_else(|| test_data.join("single_zone_race.yaml"));
    let rules_path = args.next().map(PathBuf::from);
    let settings_path = args.next().map(PathBuf::from);
    let tracks_root = args.next().map(PathBuf::from).unwrap_or_else(|| test_data.join("tracks"));

    let rules = match rules_path {
        Some(path) => RuleConfig::load_or_default(&path),
        None => RuleConfig { drs_activation_gap: 1.0, drs_enabled_lap: 1, ..Default::default() },
    };
    let settings = settings_path.map(|path| AppSettings::load_or_default(&path)).unwrap_or_default();

    let connection = Steward::open_replay(&recording, rules, settings, &tracks_root)
        .await
        .with_context(|| format!("replaying {}", recording.display()))?;

    let cues = CueScheduler::new(ConsoleBeep);
    let cue_task = tokio::spawn(cues.run(connection.subscribe()));

    let mut signals = Box::pin(connection.subscribe());
    while let Some(signal) = signals.next().await {
        match signal {
            Signal::PenaltyIssued(penalty) => {
                println!("Lap {:>3}  {:?}  {}", penalty.lap, penalty.class, penalty.detail)
            }
            Signal::PenaltyServed(penalty) => println!("Served: {}", penalty.detail),
            Signal::DrsIndicator(indicator) => println!("  DRS {:?}", indicator),
            Signal::RaceEnded { unserved } => println!("Race over, {} unserved", unserved.len()),
            _ => {}
        }
    }

    let state = connection.state();
    info!(
        pending = state.pending_penalties,
        deferred = state.deferred_penalties,
        "Replay finished"
    );
    cue_task.await.context("cue task")?;
    Ok(())
}
