//! Telemetry providers

pub mod replay;

pub use replay::{ReplayProvider, SessionRecording};
