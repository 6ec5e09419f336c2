//! Integration tests for `FeedController`.
//!
//! Drives the controller through the same port traits the host uses,
//! with recording mocks standing in for channels, timer and sensor.
//! Timer callbacks run only when a test fires them.

use std::sync::Arc;

use pelletfeed::app::ports::{TimerHandle, WakeTime};
use pelletfeed::error::{ConfigError, Error, PinError, PinKind, TimerError};
use pelletfeed::{
    FeedConfig, FeedController, FeedPhase, FeedPorts, LifecycleEvent, SensorState, TickOutcome,
};

use crate::mock_hw::{Call, CallLog, MockPins, MockTimer, MockWatcher, OffsetClock};

const CLOCK_OFFSET: f64 = 100.0;
const MARGIN: f64 = 0.100;
const LEAD: f64 = 0.010;

fn config() -> FeedConfig {
    FeedConfig::from_json(
        r#"{
            "buffer_time": 3.0,
            "drain_time": 7.0,
            "off_delay_time": 2.0,
            "spool_up_time": 1.5,
            "debounce_time": 0.2,
            "blower_pin": "PB5",
            "pump_pin": "PB6",
            "pellet_sensor_pin": "PC1"
        }"#,
    )
    .unwrap()
}

struct Rig {
    controller: Arc<FeedController>,
    log: CallLog,
    timer: MockTimer,
    watcher: MockWatcher,
}

impl Rig {
    fn new() -> Self {
        let rig = Self::built(config());
        rig.log.clear();
        rig
    }

    /// Keeps the construction calls in the log.
    fn built(config: FeedConfig) -> Self {
        let log = CallLog::default();
        let mut pins = MockPins::new(&log);
        let mut watcher = MockWatcher::default();
        let timer = MockTimer::new(&log);
        let controller = FeedController::new(
            config,
            FeedPorts {
                pins: &mut pins,
                watcher: &mut watcher,
                timer: Box::new(timer.clone()),
                clock: Box::new(OffsetClock(CLOCK_OFFSET)),
            },
        )
        .unwrap();
        Self {
            controller,
            log,
            timer,
            watcher,
        }
    }

    /// Handle of the most recent tick registration.
    fn handle(&self) -> TimerHandle {
        self.log
            .all()
            .iter()
            .rev()
            .find_map(|c| match c {
                Call::Register { handle, .. } => Some(*handle),
                _ => None,
            })
            .unwrap()
    }

    fn assert_consistent(&self) {
        let s = self.controller.status();
        assert_eq!(s.timer_armed, s.feeding, "timer handle must track feeding");
    }
}

/// Where a tick at `event_time` puts its blower command.
fn target(event_time: f64, window: f64) -> f64 {
    event_time + CLOCK_OFFSET + MARGIN + window
}

// ── Construction ──────────────────────────────────────────────

#[test]
fn construction_resolves_pins_then_configures_channels() {
    let rig = Rig::built(config());
    assert_eq!(rig.controller.config().pellet_sensor_pin, "PC1");
    assert_eq!(
        rig.log.all(),
        vec![
            Call::Setup {
                kind: PinKind::ContinuousOutput,
                name: "PB5".into()
            },
            Call::Setup {
                kind: PinKind::BinaryOutput,
                name: "PB6".into()
            },
            Call::Setup {
                kind: PinKind::PresenceSensor,
                name: "PC1".into()
            },
            Call::MaxDuration {
                pin: "PB5".into(),
                secs: 0.0
            },
            Call::CycleTime {
                secs: 0.010,
                hardware_pwm: false
            },
            Call::StartLevel {
                start: 0.0,
                shutdown: 0.0
            },
            Call::StartBit {
                start: false,
                shutdown: false
            },
        ]
    );
    assert!(rig.watcher.subscribed());
    assert_eq!(rig.watcher.pin.as_ref().unwrap().name, "PC1");
    assert_eq!(rig.controller.phase(), FeedPhase::Idle);
    rig.assert_consistent();
}

#[test]
fn negative_buffer_time_fails_before_any_channel_is_armed() {
    let log = CallLog::default();
    let mut pins = MockPins::new(&log);
    let mut watcher = MockWatcher::default();
    let mut cfg = config();
    cfg.buffer_time = -1.0;

    let err = FeedController::new(
        cfg,
        FeedPorts {
            pins: &mut pins,
            watcher: &mut watcher,
            timer: Box::new(MockTimer::new(&log)),
            clock: Box::new(OffsetClock(0.0)),
        },
    )
    .err()
    .unwrap();

    assert_eq!(
        err,
        Error::Config(ConfigError::NotPositive {
            field: "buffer_time",
            value: -1.0
        })
    );
    assert!(log.all().is_empty());
    assert!(!watcher.subscribed());
}

#[test]
fn unknown_pin_fails_before_configuration() {
    let log = CallLog::default();
    let mut pins = MockPins::new(&log);
    pins.missing = Some("PC1".into());
    let mut watcher = MockWatcher::default();

    let err = FeedController::new(
        config(),
        FeedPorts {
            pins: &mut pins,
            watcher: &mut watcher,
            timer: Box::new(MockTimer::new(&log)),
            clock: Box::new(OffsetClock(0.0)),
        },
    )
    .err()
    .unwrap();

    assert_eq!(err, Error::Pin(PinError::Unknown("PC1".into())));
    assert!(
        log.all()
            .iter()
            .all(|c| matches!(c, Call::Setup { .. })),
        "no channel may be configured when a pin is missing"
    );
    assert!(!watcher.subscribed());
}

#[test]
fn failed_subscription_leaves_channels_unconfigured() {
    let log = CallLog::default();
    let mut pins = MockPins::new(&log);
    let mut watcher = MockWatcher {
        refuse: true,
        ..Default::default()
    };

    let err = FeedController::new(
        config(),
        FeedPorts {
            pins: &mut pins,
            watcher: &mut watcher,
            timer: Box::new(MockTimer::new(&log)),
            clock: Box::new(OffsetClock(0.0)),
        },
    )
    .err()
    .unwrap();

    assert_eq!(err, Error::Pin(PinError::Unknown("PC1".into())));
    assert_eq!(log.all().len(), 3);
    assert!(
        log.all()
            .iter()
            .all(|c| matches!(c, Call::Setup { .. })),
        "no channel may be configured when the subscription fails"
    );
}

// ── Start / stop ──────────────────────────────────────────────

#[test]
fn movement_arms_feed_spool_up_early() {
    let rig = Rig::new();
    rig.controller.update_next_movement_time(5.0).unwrap();

    assert_eq!(
        rig.log.all(),
        vec![
            Call::Level {
                time: 3.5,
                level: 1.0
            },
            Call::Bit {
                time: 3.5 + LEAD,
                on: true
            },
            Call::Register {
                handle: TimerHandle(1),
                wake: WakeTime::Now
            },
        ]
    );
    assert_eq!(rig.controller.phase(), FeedPhase::Feeding);
    rig.assert_consistent();
}

#[test]
fn repeated_movement_turns_on_once() {
    let rig = Rig::new();
    for print_time in [5.0, 5.5, 6.0, 6.5, 7.0] {
        rig.controller.update_next_movement_time(print_time).unwrap();
        rig.assert_consistent();
    }
    assert_eq!(rig.log.registrations(), 1);
    assert_eq!(rig.log.writes().len(), 2);
}

#[test]
fn stop_cancels_tick_and_turns_off() {
    let rig = Rig::new();
    rig.controller.start_feeding(10.0).unwrap();
    let h = rig.handle();
    rig.log.clear();

    rig.controller.stop_feeding(12.0);

    assert_eq!(
        rig.log.all(),
        vec![
            Call::Cancel(h),
            Call::Level {
                time: 12.0,
                level: 0.0
            },
            Call::Bit {
                time: 12.0 + LEAD,
                on: false
            },
        ]
    );
    assert!(!rig.timer.is_live(h));
    assert_eq!(rig.controller.phase(), FeedPhase::Idle);
    rig.assert_consistent();
}

#[test]
fn double_stop_and_idle_stop_are_noops() {
    let rig = Rig::new();
    rig.controller.stop_feeding(1.0);
    assert!(rig.log.all().is_empty());

    rig.controller.start_feeding(2.0).unwrap();
    rig.controller.stop_feeding(3.0);
    let after_first = rig.log.all().len();
    rig.controller.stop_feeding(4.0);
    assert_eq!(rig.log.all().len(), after_first);
    rig.assert_consistent();
}

#[test]
fn stop_resets_reading_to_absent() {
    let mut rig = Rig::new();
    rig.controller.start_feeding(0.0).unwrap();
    rig.watcher.edge(1.0, SensorState::Present);
    assert_eq!(rig.controller.status().sensor, SensorState::Present);

    rig.controller.stop_feeding(2.0);
    let s = rig.controller.status();
    assert_eq!(s.sensor, SensorState::Absent);
    assert_eq!(s.accepted_sensor, SensorState::Absent);
}

#[test]
fn refused_registration_rolls_back() {
    let rig = Rig::new();
    rig.timer.refuse();

    let err = rig.controller.start_feeding(2.0).err().unwrap();

    assert_eq!(err, Error::Timer(TimerError::NoFreeSlot));
    assert_eq!(
        rig.log.writes(),
        vec![
            Call::Level {
                time: 2.0,
                level: 1.0
            },
            Call::Bit {
                time: 2.0 + LEAD,
                on: true
            },
            Call::Level {
                time: 2.0,
                level: 0.0
            },
            Call::Bit {
                time: 2.0 + LEAD,
                on: false
            },
        ]
    );
    assert_eq!(rig.controller.phase(), FeedPhase::Idle);
    rig.assert_consistent();
}

#[test]
fn refused_registration_keeps_sensor_reading() {
    let mut rig = Rig::new();
    rig.watcher.edge(1.0, SensorState::Present);
    rig.timer.refuse();

    assert!(rig.controller.start_feeding(2.0).is_err());

    let s = rig.controller.status();
    assert!(!s.feeding);
    assert_eq!(s.sensor, SensorState::Present);
    assert_eq!(s.accepted_sensor, SensorState::Present);
    assert_eq!(s.last_sensor_event_time, Some(1.0));
    rig.assert_consistent();
}

#[test]
fn every_lifecycle_event_stops_the_feed() {
    for event in [
        LifecycleEvent::RestartRequested,
        LifecycleEvent::IdleBegin,
        LifecycleEvent::IdleEnd,
    ] {
        let rig = Rig::new();
        rig.controller.start_feeding(1.0).unwrap();
        let h = rig.handle();

        rig.controller.handle_lifecycle(event, 5.0);

        assert_eq!(rig.controller.phase(), FeedPhase::Idle, "{}", event.name());
        assert_eq!(rig.log.cancels(), vec![h]);
        assert_eq!(
            rig.log.writes().last(),
            Some(&Call::Bit {
                time: 5.0 + LEAD,
                on: false
            })
        );
    }
}

// ── Ticks ─────────────────────────────────────────────────────

#[test]
fn bounced_edge_leaves_accepted_reading_in_charge() {
    let mut rig = Rig::new();
    rig.watcher.edge(0.0, SensorState::Present);
    rig.watcher.edge(0.1, SensorState::Absent);
    rig.controller.start_feeding(0.5).unwrap();
    let h = rig.handle();
    rig.log.clear();

    assert_eq!(rig.timer.fire(h, 1.0), Some(TickOutcome::Reschedule(2.0)));
    assert_eq!(
        rig.log.writes(),
        vec![Call::Level {
            time: target(1.0, 3.0),
            level: 0.5
        }]
    );

    let s = rig.controller.status();
    assert_eq!(s.sensor, SensorState::Absent);
    assert_eq!(s.accepted_sensor, SensorState::Present);
    assert!(s.level_applied);
}

#[test]
fn first_edge_is_always_eligible() {
    let mut rig = Rig::new();
    rig.controller.start_feeding(4.0).unwrap();
    let h = rig.handle();
    rig.timer.fire(h, 4.0);
    rig.log.clear();

    rig.watcher.edge(5.0, SensorState::Absent);
    assert_eq!(rig.controller.status().last_sensor_event_time, Some(5.0));
    assert_eq!(rig.timer.fire(h, 5.5), Some(TickOutcome::Reschedule(6.5)));
    assert_eq!(
        rig.log.writes(),
        vec![Call::Level {
            time: target(5.5, 7.0),
            level: 1.0
        }]
    );
}

#[test]
fn close_edges_trigger_no_extra_recompute() {
    let mut rig = Rig::new();
    rig.controller.start_feeding(0.0).unwrap();
    let h = rig.handle();
    rig.timer.fire(h, 0.0);

    rig.watcher.edge(1.0, SensorState::Present);
    rig.timer.fire(h, 1.5);
    rig.log.clear();

    rig.watcher.edge(1.1, SensorState::Absent);
    rig.watcher.edge(1.2, SensorState::Present);
    rig.timer.fire(h, 2.5);
    rig.timer.fire(h, 3.5);
    assert!(rig.log.writes().is_empty());
}

#[test]
fn applied_level_is_not_reissued() {
    let rig = Rig::new();
    rig.controller.start_feeding(0.0).unwrap();
    let h = rig.handle();
    rig.log.clear();

    for t in [0.0, 1.0, 2.0, 3.0] {
        assert_eq!(rig.timer.fire(h, t), Some(TickOutcome::Reschedule(t + 1.0)));
    }
    assert_eq!(
        rig.log.writes(),
        vec![Call::Level {
            time: target(0.0, 7.0),
            level: 1.0
        }]
    );
}

#[test]
fn in_flight_tick_after_stop_writes_nothing() {
    let rig = Rig::new();
    rig.controller.start_feeding(10.0).unwrap();
    let h = rig.handle();
    // Already dequeued by the dispatcher at 10.4.
    let mut in_flight = rig.timer.take(h).unwrap();

    rig.controller.stop_feeding(10.5);
    assert_eq!(rig.log.cancels(), vec![h]);
    rig.log.clear();

    assert_eq!(in_flight(10.6), TickOutcome::Cancel);
    assert!(rig.log.all().is_empty());
    rig.assert_consistent();
}

#[test]
fn tick_from_earlier_session_is_dropped() {
    let rig = Rig::new();
    rig.controller.start_feeding(1.0).unwrap();
    let old = rig.handle();
    let mut stale = rig.timer.take(old).unwrap();
    rig.controller.stop_feeding(2.0);
    rig.controller.start_feeding(3.0).unwrap();
    let current = rig.handle();
    rig.log.clear();

    assert_eq!(stale(3.5), TickOutcome::Cancel);
    assert!(rig.log.all().is_empty());
    assert_eq!(rig.controller.phase(), FeedPhase::Feeding);
    assert!(rig.timer.is_live(current));
    rig.assert_consistent();
}

#[test]
fn direct_tick_while_idle_cancels() {
    let rig = Rig::new();
    assert_eq!(rig.controller.tick(1.0), TickOutcome::Cancel);
    assert!(rig.log.all().is_empty());
}

#[test]
fn dropped_controller_cancels_its_tick() {
    let rig = Rig::new();
    rig.controller.start_feeding(0.0).unwrap();
    let h = rig.handle();
    let Rig {
        controller, timer, ..
    } = rig;
    drop(controller);

    assert_eq!(timer.fire(h, 1.0), Some(TickOutcome::Cancel));
    assert!(!timer.is_live(h));
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_serialises_to_json() {
    let mut rig = Rig::new();
    rig.controller.start_feeding(0.0).unwrap();
    rig.watcher.edge(0.25, SensorState::Present);

    let s = rig.controller.status();
    assert_eq!(s.phase, FeedPhase::Feeding);
    assert!(s.actuator_on);
    assert_eq!(s.blower_level, 1.0);
    assert_eq!(s.session, 1);

    let json = serde_json::to_string(&s).unwrap();
    assert!(json.contains(r#""phase":"feeding""#), "{json}");
    assert!(json.contains(r#""sensor":"present""#), "{json}");
    assert!(json.contains(r#""last_sensor_event_time":0.25"#), "{json}");
}
