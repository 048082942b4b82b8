//! Session state machine
//!
//! [`SessionStateMachine`] owns every piece of per-session state and advances
//! it once per telemetry tick. What happens on a tick depends on the session
//! type the simulator reports:
//!
//! - **Qualifying**: the best-lap tyre is recorded for the race start check
//! - **Race**: start detection, compound tracking and race end, then DRS
//!   detection, pit-lane serving and the penalty board, in that order
//! - **Anything else**: nothing advances; the state is paused, not reset
//!
//! Ticks are transactional. [`tick`](SessionStateMachine::tick) works on a
//! copy and only commits it when every step succeeded, so a failed tick
//! leaves the previous state untouched.
//!
//! ```rust
//! use drs_steward::config::{AppSettings, RuleConfig, SessionContext, TrackInfo, ZoneRegistry};
//! use drs_steward::session::SessionStateMachine;
//! use drs_steward::types::{CarTelemetry, SessionType, TelemetrySnapshot};
//!
//! let zones = ZoneRegistry::from_bounds([(0.50, 0.50, 0.60)]).unwrap();
//! let track = TrackInfo { name: "monza".into(), layout: None, length_m: 5000.0 };
//! let context = SessionContext::new(RuleConfig::default(), AppSettings::default(), zones, track);
//!
//! let mut machine = SessionStateMachine::new(context);
//! let snapshot = TelemetrySnapshot {
//!     session: SessionType::Race,
//!     cars: vec![CarTelemetry::at(0.25)],
//!     ..Default::default()
//! };
//! let signals = machine.tick(&snapshot).unwrap();
//! assert!(!signals.is_empty());
//! ```

mod qualifying;
mod race;
mod state;

pub use qualifying::QualifyingTracker;
pub use race::{LAUNCH_FUEL_DROP, RaceProgress, START_WINDOW_MS, StartPhase};
pub use state::DriverRaceState;

use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::config::SessionContext;
use crate::detection::{CrossingDetector, DrsEvent, GapValidator, MONITORED_CAR};
use crate::penalty::{PenaltyLedger, PitOutcome, PitReading};
use crate::signals::{DrsIndicator, Signal, penalty_broadcast};
use crate::types::{Penalty, PenaltyReason, SessionType, TelemetrySnapshot};
use crate::Result;

/// Chat sender whose messages come from the race server itself.
pub const SERVER_SENDER: &str = "SERVER";

/// Server chat text sent to a driver who took the chequered flag.
pub const FINISHED_MESSAGE: &str = "You have finished the race";

/// Rule engine for the monitored car over one session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    context: Arc<SessionContext>,
    session: SessionType,
    qualifying: QualifyingTracker,
    race: RaceProgress,
    detector: CrossingDetector,
    validator: GapValidator,
    ledger: PenaltyLedger,
    indicator: DrsIndicator,
}

impl SessionStateMachine {
    pub fn new(context: SessionContext) -> Self {
        let detector = CrossingDetector::new(context.track.length_m);
        let validator = GapValidator::new(&context.rules);
        Self {
            context: Arc::new(context),
            session: SessionType::Unknown,
            qualifying: QualifyingTracker::new(),
            race: RaceProgress::default(),
            detector,
            validator,
            ledger: PenaltyLedger::new(),
            indicator: DrsIndicator::Off,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn session(&self) -> SessionType {
        self.session
    }

    pub fn ledger(&self) -> &PenaltyLedger {
        &self.ledger
    }

    pub fn qualifying(&self) -> &QualifyingTracker {
        &self.qualifying
    }

    pub fn race(&self) -> &RaceProgress {
        &self.race
    }

    /// Advance one tick and return the signals it produced.
    ///
    /// On error nothing is committed.
    pub fn tick(&mut self, snapshot: &TelemetrySnapshot) -> Result<Vec<Signal>> {
        snapshot.validate()?;

        let mut next = self.clone();
        let signals = next.advance(snapshot)?;
        *self = next;
        Ok(signals)
    }

    /// Flag the race as finished, e.g. when lapped cars take the flag early.
    pub fn mark_race_finished(&mut self) {
        if !self.race.finished_flag {
            info!("Race finished flag set");
        }
        self.race.finished_flag = true;
    }

    /// Inspect a chat message; returns whether it set the finished flag.
    pub fn on_chat_message(&mut self, sender: &str, message: &str) -> bool {
        if sender == SERVER_SENDER && message.contains(FINISHED_MESSAGE) {
            self.mark_race_finished();
            return true;
        }
        false
    }

    /// Snapshot of the monitored car's rule state.
    pub fn driver_state(&self) -> DriverRaceState {
        DriverRaceState::assemble(
            self.session,
            &self.race,
            self.validator.occupancy(),
            self.ledger.pit(),
            self.indicator,
            self.qualifying.tyre(),
            &self.ledger,
        )
    }

    fn advance(&mut self, snapshot: &TelemetrySnapshot) -> Result<Vec<Signal>> {
        let mut signals = Vec::new();
        let board_before = self.penalty_board();

        if snapshot.session != self.session {
            debug!(from = ?self.session, to = ?snapshot.session, "Session changed");
            signals.push(Signal::SessionChanged { from: self.session, to: snapshot.session });
            self.session = snapshot.session;
        }

        match snapshot.session {
            SessionType::Qualifying => self.advance_qualifying(snapshot, &mut signals),
            SessionType::Race => self.advance_race(snapshot, &mut signals)?,
            _ => trace!(session = ?snapshot.session, "No rules for session"),
        }

        let (pending, detail) = self.penalty_board();
        if (pending, detail.as_deref()) != (board_before.0, board_before.1.as_deref()) {
            signals.push(Signal::PenaltyBoard { pending, detail });
        }

        Ok(signals)
    }

    fn advance_qualifying(&mut self, snapshot: &TelemetrySnapshot, signals: &mut Vec<Signal>) {
        if let Some(label) = self.qualifying.update(snapshot.best_lap_ms, &snapshot.tyre_compound) {
            signals.push(Signal::QualifyingTyre(label));
        }
    }

    fn advance_race(&mut self, snapshot: &TelemetrySnapshot, signals: &mut Vec<Signal>) -> Result<()> {
        if self.race.detect_start(snapshot) == StartPhase::Launched {
            self.ledger.reset();
            self.check_starting_tyre(snapshot, signals);
        }

        if self.race.reached_end(snapshot) {
            self.close_race(snapshot, signals);
        } else if !self.race.race_ended {
            self.race.record_compound(&snapshot.tyre_compound);
        }

        let crossed = self
            .detector
            .update(&self.context.zones, snapshot.timestamp, &snapshot.cars)
            .into_iter()
            .find(|event| event.car == MONITORED_CAR)
            .map(|event| event.zone);

        // DRS is no longer policed after the flag, but a pit visit still completes
        if !self.race.race_ended {
            let events = self.validator.evaluate(
                &self.detector,
                &self.context.zones,
                crossed,
                snapshot.completed_laps,
                snapshot.drs_level,
            )?;
            for event in events {
                self.apply_drs_event(event, snapshot, signals);
            }
            self.refresh_indicator(signals);
        }

        let reading = PitReading {
            in_pit_lane: snapshot.in_pit_lane,
            speed_kmh: snapshot.speed_kmh,
            fuel: snapshot.fuel,
        };
        match self.ledger.update_pit(
            reading,
            self.context.rules.refuelling_allowed,
            snapshot.current_lap(),
            &snapshot.driver_name,
        ) {
            Some(PitOutcome::Served(penalty)) => signals.push(Signal::PenaltyServed(penalty)),
            Some(PitOutcome::IllegalRefuel(penalty)) => self.announce(penalty, signals),
            None => {}
        }

        Ok(())
    }

    /// Pending count and the detail of the penalty served next.
    fn penalty_board(&self) -> (usize, Option<String>) {
        (self.ledger.pending(), self.ledger.next_to_serve().map(|p| p.detail.clone()))
    }

    fn check_starting_tyre(&mut self, snapshot: &TelemetrySnapshot, signals: &mut Vec<Signal>) {
        let rules = &self.context.rules;
        if !rules.start_on_qualifying_tyre
            || snapshot.leaderboard_position > rules.qualifying_tyre_top_positions
        {
            return;
        }
        let Some(qualifying_tyre) = self.qualifying.tyre().filter(|t| !t.is_empty()) else {
            return;
        };
        if qualifying_tyre != snapshot.tyre_compound {
            debug!(qualifying_tyre, current = %snapshot.tyre_compound, "Started on wrong tyre");
            self.issue(
                Penalty::deferred(0, &snapshot.driver_name, PenaltyReason::IncorrectStartingTyre),
                signals,
            );
        }
    }

    fn close_race(&mut self, snapshot: &TelemetrySnapshot, signals: &mut Vec<Signal>) {
        info!(laps = snapshot.completed_laps, compounds = self.race.compounds_used.len(), "Race ended");
        self.race.race_ended = true;

        let required = self.context.rules.min_tyre_compounds;
        if required > 0 && (self.race.compounds_used.len() as u32) < required {
            self.issue(
                Penalty::deferred(
                    snapshot.total_laps,
                    &snapshot.driver_name,
                    PenaltyReason::InsufficientCompounds { required },
                ),
                signals,
            );
        }

        let unserved = self.ledger.close_race();
        for penalty in &unserved {
            self.broadcast(penalty, signals);
        }
        signals.push(Signal::RaceEnded { unserved });
    }

    fn apply_drs_event(&mut self, event: DrsEvent, snapshot: &TelemetrySnapshot, signals: &mut Vec<Signal>) {
        let reason = match event {
            DrsEvent::IllegalUse { zone } => PenaltyReason::IllegalDrs { zone: zone.number() },
            DrsEvent::OpenedWithoutDetection => PenaltyReason::DrsWithoutDetection,
            DrsEvent::ActivationReached { zone } => {
                let beep = &self.context.settings.beep;
                if beep.enabled {
                    trace!(zone = zone.number(), "DRS cue");
                    signals.push(Signal::CueStart { duration: beep.duration() });
                }
                return;
            }
            DrsEvent::Armed { .. } | DrsEvent::Exited { .. } => return,
        };
        self.issue(Penalty::immediate(snapshot.current_lap(), &snapshot.driver_name, reason), signals);
    }

    fn refresh_indicator(&mut self, signals: &mut Vec<Signal>) {
        let occupancy = self.validator.occupancy();
        let indicator = match (occupancy.in_zone, occupancy.drs_valid) {
            (false, _) => DrsIndicator::Off,
            (true, false) => DrsIndicator::ArmedIllegal,
            (true, true) => DrsIndicator::ArmedLegal,
        };
        if indicator != self.indicator {
            self.indicator = indicator;
            signals.push(Signal::DrsIndicator(indicator));
        }
    }

    fn issue(&mut self, penalty: Penalty, signals: &mut Vec<Signal>) {
        self.ledger.issue(penalty.clone());
        self.announce(penalty, signals);
    }

    /// Report a penalty the ledger already holds.
    fn announce(&self, penalty: Penalty, signals: &mut Vec<Signal>) {
        self.broadcast(&penalty, signals);
        signals.push(Signal::PenaltyIssued(penalty));
    }

    fn broadcast(&self, penalty: &Penalty, signals: &mut Vec<Signal>) {
        if self.context.broadcast_enabled {
            signals.push(Signal::Broadcast(penalty_broadcast(&self.context.settings.app_name, penalty)));
        }
    }
}
