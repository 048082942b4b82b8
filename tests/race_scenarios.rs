//! End-to-end rule scenarios on a 5 km track with one DRS zone.
//!
//! Every scenario drives a [`SessionStateMachine`] tick by tick, the same way
//! the driver task does, and checks the penalties and signals it produced.

use drs_steward::config::{AppSettings, RuleConfig, SessionContext, TrackInfo, ZoneRegistry};
use drs_steward::session::SessionStateMachine;
use drs_steward::{CarTelemetry, Penalty, PenaltyClass, SessionType, Signal, TelemetrySnapshot};

const TRACK_LENGTH_M: f64 = 5000.0;

fn context(rules: RuleConfig) -> SessionContext {
    let zones = ZoneRegistry::from_bounds([(0.50, 0.50, 0.60)]).unwrap();
    let track = TrackInfo { name: "test_track".into(), layout: None, length_m: TRACK_LENGTH_M };
    SessionContext::new(rules, AppSettings::default(), zones, track)
}

fn drs_rules() -> RuleConfig {
    RuleConfig { drs_activation_gap: 1.0, drs_enabled_lap: 1, ..Default::default() }
}

#[derive(Clone)]
struct Tick {
    at: f64,
    cars: Vec<f64>,
    drs: f32,
    laps: u32,
    total_laps: u32,
    lap_time_ms: i64,
    fuel: f32,
    tyre: &'static str,
    in_pit: bool,
    speed: f32,
}

impl Tick {
    fn at(at: f64, cars: &[f64]) -> Self {
        Self {
            at,
            cars: cars.to_vec(),
            drs: 0.0,
            laps: 2,
            total_laps: 10,
            lap_time_ms: 40_000,
            fuel: 30.0,
            tyre: "M",
            in_pit: false,
            speed: 250.0,
        }
    }

    fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            timestamp: self.at,
            session: SessionType::Race,
            completed_laps: self.laps,
            total_laps: self.total_laps,
            current_lap_time_ms: self.lap_time_ms,
            leaderboard_position: 2,
            fuel: self.fuel,
            tyre_compound: self.tyre.to_string(),
            drs_level: self.drs,
            speed_kmh: self.speed,
            in_pit_lane: self.in_pit,
            driver_name: "Test Driver".into(),
            cars: self.cars.iter().copied().map(CarTelemetry::at).collect(),
            ..Default::default()
        }
    }
}

fn run(machine: &mut SessionStateMachine, ticks: &[Tick]) -> Vec<Signal> {
    ticks.iter().flat_map(|tick| machine.tick(&tick.snapshot()).unwrap()).collect()
}

fn issued(signals: &[Signal]) -> Vec<&Penalty> {
    signals
        .iter()
        .filter_map(|s| match s {
            Signal::PenaltyIssued(p) => Some(p),
            _ => None,
        })
        .collect()
}

/// The monitored car runs 0.44 -> 0.64 in 0.01 steps every 0.1 s, DRS open
/// from 0.53 to 0.57. `other_car_ahead` is in hundredths of a lap.
fn zone_run(other_car_ahead: Option<u32>) -> Vec<Tick> {
    (0..=20u32)
        .map(|i| {
            let hundredths = 44 + i;
            let mut cars = vec![f64::from(hundredths) / 100.0];
            if let Some(ahead) = other_car_ahead {
                cars.push(f64::from(hundredths + ahead) / 100.0);
            }
            let mut tick = Tick::at(f64::from(i) * 0.1, &cars);
            if (53..=57).contains(&hundredths) {
                tick.drs = 1.0;
            }
            tick
        })
        .collect()
}

#[test]
fn lone_car_opening_drs_gets_one_penalty() {
    let mut machine = SessionStateMachine::new(context(drs_rules()));
    let ticks = zone_run(None);

    // Up to and including the detection line crossing
    run(&mut machine, &ticks[..=6]);
    let state = machine.driver_state();
    assert!(state.in_zone);
    assert!(!state.drs_valid);

    let signals = run(&mut machine, &ticks[7..=15]);
    let penalties = issued(&signals);
    assert_eq!(penalties.len(), 1);
    assert_eq!(penalties[0].detail, "Illegal DRS use, Zone 1");
    assert_eq!(penalties[0].class, PenaltyClass::Immediate);
    assert_eq!(penalties[0].lap, 3);

    // Crossing 0.60 leaves the zone
    run(&mut machine, &ticks[16..=16]);
    let state = machine.driver_state();
    assert!(!state.in_zone);
    assert!(!state.zone_penalty_awarded);
    assert_eq!(machine.ledger().pending(), 1);
}

#[test]
fn car_ahead_within_gap_allows_drs() {
    let mut machine = SessionStateMachine::new(context(drs_rules()));

    // 100 m ahead at 500 m/s crosses the detection line 0.2 s earlier
    let signals = run(&mut machine, &zone_run(Some(2)));

    assert!(issued(&signals).is_empty());
    assert!(signals.contains(&Signal::DrsIndicator(drs_steward::DrsIndicator::ArmedLegal)));
    assert_eq!(machine.ledger().pending(), 0);
}

#[test]
fn car_exactly_four_tenths_ahead_allows_drs() {
    let mut machine = SessionStateMachine::new(context(drs_rules()));

    // Other car crosses 0.50 at t = 0.1, the monitored car at t = 0.5
    let ticks = vec![
        Tick::at(0.0, &[0.40, 0.49]),
        Tick::at(0.1, &[0.44, 0.50]),
        Tick::at(0.2, &[0.46, 0.52]),
        Tick::at(0.5, &[0.50, 0.56]),
        Tick { drs: 1.0, ..Tick::at(0.6, &[0.52, 0.58]) },
        Tick { drs: 1.0, ..Tick::at(0.7, &[0.56, 0.62]) },
        Tick::at(0.8, &[0.61, 0.66]),
    ];
    let signals = run(&mut machine, &ticks);

    assert!(issued(&signals).is_empty());
    assert!(!machine.driver_state().in_zone);
}

#[test]
fn car_too_far_ahead_does_not_allow_drs() {
    let mut machine = SessionStateMachine::new(context(drs_rules()));

    // Other car crosses at t = 0.1, the monitored car 1.4 s later
    let ticks = vec![
        Tick::at(0.0, &[0.30, 0.49]),
        Tick::at(0.1, &[0.32, 0.50]),
        Tick::at(1.4, &[0.49, 0.60]),
        Tick::at(1.5, &[0.50, 0.61]),
        Tick { drs: 1.0, ..Tick::at(1.6, &[0.52, 0.63]) },
    ];
    let signals = run(&mut machine, &ticks);
    assert_eq!(issued(&signals).len(), 1);
}

#[test]
fn zero_gap_disables_drs_rules() {
    let mut machine = SessionStateMachine::new(context(RuleConfig::default()));
    let signals = run(&mut machine, &zone_run(None));
    assert!(issued(&signals).is_empty());
}

#[test]
fn drs_before_enabled_lap_is_illegal_even_with_car_ahead() {
    let rules = RuleConfig { drs_enabled_lap: 5, ..drs_rules() };
    let mut machine = SessionStateMachine::new(context(rules));
    let signals = run(&mut machine, &zone_run(Some(2)));
    assert_eq!(issued(&signals).len(), 1);
}

#[test]
fn wrap_across_start_finish_detects_zone_after_the_line() {
    let zones = ZoneRegistry::from_bounds([(0.02, 0.03, 0.15)]).unwrap();
    let mut ctx = context(drs_rules());
    ctx.zones = zones;
    let mut machine = SessionStateMachine::new(ctx);

    run(&mut machine, &[Tick::at(0.0, &[0.98]), Tick { laps: 3, ..Tick::at(0.1, &[0.025]) }]);
    assert!(machine.driver_state().in_zone);
}

#[test]
fn one_drive_through_serves_one_of_three() {
    let mut machine = SessionStateMachine::new(context(drs_rules()));

    // Three openings outside any zone, each on a rising edge
    let mut ticks = Vec::new();
    for i in 0..6 {
        let mut tick = Tick::at(i as f64 * 0.1, &[0.10 + 0.001 * i as f64]);
        tick.drs = if i % 2 == 1 { 1.0 } else { 0.0 };
        ticks.push(tick);
    }
    run(&mut machine, &ticks);
    assert_eq!(machine.ledger().pending(), 3);

    let pit = |at: f64, in_pit: bool| Tick { in_pit, speed: 60.0, ..Tick::at(at, &[0.11]) };
    let signals = run(&mut machine, &[pit(1.0, true), pit(1.1, true), pit(1.2, false)]);

    assert_eq!(machine.ledger().pending(), 2);
    assert_eq!(signals.iter().filter(|s| matches!(s, Signal::PenaltyServed(_))).count(), 1);
}

#[test]
fn race_end_converts_unserved_penalties() {
    let mut machine = SessionStateMachine::new(context(drs_rules()));
    run(&mut machine, &[Tick::at(0.0, &[0.10]), Tick { drs: 1.0, ..Tick::at(0.1, &[0.11]) }]);
    assert_eq!(machine.ledger().pending(), 1);

    let signals = run(&mut machine, &[Tick { laps: 10, ..Tick::at(0.2, &[0.12]) }]);

    assert_eq!(machine.ledger().pending(), 0);
    let deferred = machine.ledger().deferred();
    assert_eq!(deferred.len(), 1);
    assert!(deferred[0].unserved);
    assert_eq!(deferred[0].class, PenaltyClass::Deferred);
    assert_eq!(
        deferred[0].detail,
        "UNSERVED Illegal DRS use, DRS opened without crossing detection line (Start or backToPit) (POST RACE)"
    );
    assert!(signals.iter().any(|s| matches!(s, Signal::RaceEnded { unserved } if unserved.len() == 1)));
}

/// Grid, launch, a few laps on the given tyres, then the flag.
fn race_on(tyres: &[&'static str]) -> Vec<Tick> {
    let mut ticks = vec![
        Tick { laps: 0, lap_time_ms: 0, fuel: 50.0, tyre: tyres[0], ..Tick::at(0.0, &[0.99]) },
        Tick { laps: 0, lap_time_ms: 150, fuel: 49.95, tyre: tyres[0], ..Tick::at(0.2, &[0.995]) },
    ];
    for (lap, tyre) in tyres.iter().enumerate() {
        ticks.push(Tick { laps: lap as u32 + 1, tyre: *tyre, ..Tick::at(10.0 + lap as f64, &[0.2]) });
    }
    ticks.push(Tick { laps: 10, tyre: tyres[tyres.len() - 1], ..Tick::at(100.0, &[0.01]) });
    ticks
}

#[test]
fn single_compound_race_gets_compound_penalty() {
    let rules = RuleConfig { min_tyre_compounds: 2, ..Default::default() };
    let mut machine = SessionStateMachine::new(context(rules));

    let signals = run(&mut machine, &race_on(&["M", "M", "M"]));
    let penalties = issued(&signals);

    assert_eq!(penalties.len(), 1);
    assert_eq!(penalties[0].detail, "Driver did not use 2 compounds. (POST RACE)");
    assert_eq!(penalties[0].lap, 10);
    assert_eq!(penalties[0].class, PenaltyClass::Deferred);
}

#[test]
fn two_compound_race_is_clean() {
    let rules = RuleConfig { min_tyre_compounds: 2, ..Default::default() };
    let mut machine = SessionStateMachine::new(context(rules));

    let signals = run(&mut machine, &race_on(&["M", "H", "H"]));
    assert!(issued(&signals).is_empty());
    assert_eq!(machine.driver_state().race_compounds_used.len(), 2);
}

#[test]
fn refuelling_in_pit_when_disallowed() {
    let rules = RuleConfig { refuelling_allowed: false, ..Default::default() };
    let mut machine = SessionStateMachine::new(context(rules));

    let stop = |at: f64, fuel: f32, in_pit: bool, speed: f32| Tick { fuel, in_pit, speed, ..Tick::at(at, &[0.9]) };
    let signals = run(
        &mut machine,
        &[stop(0.0, 10.0, true, 60.0), stop(1.0, 10.0, true, 0.0), stop(5.0, 40.0, true, 0.0), stop(9.0, 40.0, false, 70.0)],
    );

    let penalties = issued(&signals);
    assert_eq!(penalties.len(), 1);
    assert_eq!(penalties[0].detail, "Driver refuelled (POST RACE)");
    assert_eq!(penalties[0].class, PenaltyClass::Deferred);
}
