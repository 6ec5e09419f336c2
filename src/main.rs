//! Pellet-feed simulator (host entry point).
//!
//! Wires the feed controller to simulated `embedded-hal` pins and the
//! virtual-time reactor, then plays a scripted print: a movement request,
//! a pellet slug arriving with some sensor chatter, a second slug, and an
//! idle timeout that stops the feed.
//!
//! ```text
//!   SimInputPin ─▶ PolledPresenceSensor ─┐
//!                                        ▼
//!   script ─────────────────────▶ FeedController ─▶ Shared<TimedPwmOutput>     (blower)
//!                                        ▲        ─▶ Shared<TimedDigitalOutput> (pump)
//!   SimReactor (ticks) ──────────────────┘
//! ```
//!
//! Usage: `pelletfeed-sim [config.json]`.  Without an argument the
//! built-in demo config is used.  `RUST_LOG=debug` shows every command.
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{info, warn};

use pelletfeed::adapters::hal_output::{
    Shared, SimOutputPin, SimPwmPin, TimedDigitalOutput, TimedPwmOutput,
};
use pelletfeed::adapters::hal_sensor::{PolledPresenceSensor, SimInputPin};
use pelletfeed::adapters::pins::PinRegistry;
use pelletfeed::adapters::reactor::SimReactor;
use pelletfeed::adapters::time::LinearClock;
use pelletfeed::{FeedConfig, FeedController, FeedPorts, LifecycleEvent};

const DEMO_CONFIG: &str = r#"{
    "buffer_time": 0.5,
    "drain_time": 1.0,
    "off_delay_time": 2.0,
    "spool_up_time": 1.5,
    "debounce_time": 0.2,
    "blower_pin": "PB5",
    "pump_pin": "PB6",
    "pellet_sensor_pin": "PC1"
}"#;

/// Simulation step (seconds).
const STEP: f64 = 0.05;
/// Number of steps to simulate.
const STEPS: u32 = 800;
/// PWM resolution of the simulated blower.
const PWM_MAX_DUTY: u16 = 1000;

/// Scripted host actions, keyed by step index.
enum Action {
    Movement { lead: f64 },
    Lifecycle(LifecycleEvent),
}

const SCRIPT: &[(u32, Action)] = &[
    (20, Action::Movement { lead: 2.0 }),
    (200, Action::Movement { lead: 2.0 }),
    (300, Action::Movement { lead: 2.0 }),
    (600, Action::Lifecycle(LifecycleEvent::IdleBegin)),
];

/// Pellet sensor level over time: a slug from 4 s to 12 s with a brief
/// dropout just after arrival, then a second slug from 20 s to 25 s.
fn pellets_at(t: f64) -> bool {
    let chatter = (4.05..4.15).contains(&t);
    ((4.0..12.0).contains(&t) && !chatter) || (20.0..25.0).contains(&t)
}

fn load_config() -> Result<FeedConfig> {
    let text = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {path}"))?,
        None => {
            info!("No config path given, using the built-in demo config");
            DEMO_CONFIG.to_string()
        }
    };
    FeedConfig::from_json(&text)
        .map_err(pelletfeed::Error::from)
        .context("loading feed config")
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("pelletfeed-sim v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    // ── Board wiring ──────────────────────────────────────────
    let blower_pin = SimPwmPin::new(PWM_MAX_DUTY);
    let pump_pin = SimOutputPin::default();
    let blower = Shared::new(TimedPwmOutput::new(&config.blower_pin, blower_pin.clone()));
    let pump = Shared::new(TimedDigitalOutput::new(&config.pump_pin, pump_pin.clone()));

    let mut pins = PinRegistry::new();
    pins.add_continuous(&config.blower_pin, Box::new(blower.clone()));
    pins.add_binary(&config.pump_pin, Box::new(pump.clone()));
    pins.add_sensor(&config.pellet_sensor_pin);

    let sensor_pin = SimInputPin::default();
    let mut sensor = PolledPresenceSensor::new(&config.pellet_sensor_pin, sensor_pin.clone(), false);
    let reactor = SimReactor::new(0.0);

    let controller = FeedController::new(
        config,
        FeedPorts {
            pins: &mut pins,
            watcher: &mut sensor,
            timer: Box::new(reactor.clone()),
            clock: Box::new(LinearClock::identity()),
        },
    )?;

    let cfg = controller.config();
    info!(
        "Simulating {:.1}s in {:.2}s steps (tick period {:.2}s, low blower {:.0}%)",
        f64::from(STEPS) * STEP,
        STEP,
        cfg.tick_period,
        cfg.blower_low_level * 100.0
    );

    // ── Scripted run ──────────────────────────────────────────
    let mut script = SCRIPT.iter().peekable();
    let mut last_duty = blower_pin.duty();
    let mut last_pump = pump_pin.is_high();

    for step in 0..=STEPS {
        let now = f64::from(step) * STEP;

        while let Some((_, action)) = script.next_if(|(at, _)| *at == step) {
            match action {
                Action::Movement { lead } => controller
                    .update_next_movement_time(now + lead)
                    .context("arming feed")?,
                Action::Lifecycle(event) => controller.handle_lifecycle(*event, now),
            }
        }

        sensor_pin.set(pellets_at(now));
        sensor.poll(now);
        reactor.run_until(now);
        blower.with(|o| o.service(now));
        pump.with(|o| o.service(now));

        let duty = blower_pin.duty();
        let pump_on = pump_pin.is_high();
        if duty != last_duty || pump_on != last_pump {
            info!(
                "t={:6.2}  blower duty {:4}/{}  pump {}",
                now,
                duty,
                PWM_MAX_DUTY,
                if pump_on { "ON" } else { "off" }
            );
            last_duty = duty;
            last_pump = pump_on;
        }
    }

    reactor.close();

    match serde_json::to_string_pretty(&controller.status()) {
        Ok(json) => info!("Final status:\n{json}"),
        Err(e) => warn!("Status serialisation failed: {e}"),
    }
    Ok(())
}
