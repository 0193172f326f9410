//! # Tide Gauge Application Entry Point
//!
//! This binary wires the measurement runtime to a concrete board: rppal GPIO
//! for the ultrasonic sensor in hardware mode, or the built-in simulator for
//! development machines. It installs the stderr logger, loads configuration,
//! and hands control to the library's runtime loop.

// Test modules
#[cfg(test)]
mod tests;

#[cfg(all(target_os = "linux", feature = "hardware"))]
mod gpio_rppal;

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

use tide_gauge_lib::config::GaugeConfig;
use tide_gauge_lib::runtime::{
    run_runtime_iterations, LoopOptions, RuntimeDeps, SystemClock, ThreadSleeper,
};
use tide_gauge_lib::scheduler::CycleScheduler;
use tide_gauge_lib::sim::{ConsoleRadio, SimulatedSensor};

/// Timestamped stderr logger. Field gauges run under systemd, where stderr
/// lands in the journal; nothing fancier is warranted on a Pi-class board.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!(
            "{} [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    log::set_logger(&LOGGER).context("install stderr logger")?;
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    Ok(())
}

#[derive(Debug, Default)]
struct CliArgs {
    simulate: bool,
    verbose: bool,
    config_path: Option<PathBuf>,
    loops: Option<u32>,
}

fn print_usage() {
    eprintln!("Usage: tide-gauge [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --simulate       run against the built-in tide simulator (no hardware)");
    eprintln!("  --loops N        stop after N loop iterations instead of running forever");
    eprintln!("  --config PATH    read configuration from PATH instead of gauge-config.toml");
    eprintln!("  --verbose        log per-cycle measurement details");
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = CliArgs::default();
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--simulate" => args.simulate = true,
            "--verbose" => args.verbose = true,
            "--config" => {
                let value = iter.next().context("--config requires a path")?;
                args.config_path = Some(PathBuf::from(value));
            }
            "--loops" => {
                let value = iter.next().context("--loops requires a count")?;
                args.loops = Some(value.parse().context("--loops expects an integer")?);
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other => {
                print_usage();
                anyhow::bail!("unknown argument: {other}");
            }
        }
    }
    Ok(args)
}

/// Run the loop against real GPIO.
///
/// The LoRaWAN modem driver is deployment-specific and plugs in behind
/// `tide_gauge_lib::radio::LoRaWanDriver`; until a deployment wires one up,
/// uplinks go to the console radio so field bring-up can verify the whole
/// measurement path end to end.
#[cfg(all(target_os = "linux", feature = "hardware"))]
fn run_gauge(
    config: GaugeConfig,
    options: &LoopOptions,
    scheduler: &mut CycleScheduler,
) -> anyhow::Result<()> {
    use crate::gpio_rppal::{MonotonicPulseClock, RppalEchoPin, RppalTriggerPin};
    use tide_gauge_lib::ultrasonic::{Hcsr04PulseReader, UltrasonicRanger};

    log::info!(
        "starting gauge: trigger GPIO {}, echo GPIO {}, interval {} s",
        config.sensor.trigger_pin,
        config.sensor.echo_pin,
        config.schedule.measurement_interval_s
    );

    let trigger = RppalTriggerPin::new(config.sensor.trigger_pin).context("open trigger pin")?;
    let echo = RppalEchoPin::new(config.sensor.echo_pin).context("open echo pin")?;
    let reader = Hcsr04PulseReader::with_timeout(
        trigger,
        echo,
        MonotonicPulseClock::new(),
        config.sensor.echo_timeout_us,
    );

    let mut deps = RuntimeDeps {
        sensor: UltrasonicRanger::new(reader),
        radio: ConsoleRadio::new(),
        clock: SystemClock,
        sleeper: ThreadSleeper,
    };

    let sends = run_runtime_iterations(options, &config.calibration.path, scheduler, &mut deps)
        .context("runtime loop failed")?;
    log::info!("run finished: {sends} uplinks completed");
    Ok(())
}

#[cfg(not(all(target_os = "linux", feature = "hardware")))]
fn run_gauge(
    _config: GaugeConfig,
    _options: &LoopOptions,
    _scheduler: &mut CycleScheduler,
) -> anyhow::Result<()> {
    anyhow::bail!(
        "hardware support is not compiled into this build; \
         rebuild on Linux with --features hardware, or run with --simulate"
    )
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    init_logging(args.verbose)?;

    let config = match &args.config_path {
        Some(path) => GaugeConfig::load_from_path(path),
        None => GaugeConfig::load(),
    };

    // CLI cap wins over the config cap; neither means run until terminated
    let iterations = args
        .loops
        .or(config.schedule.max_loops)
        .unwrap_or(u32::MAX);
    let options = LoopOptions {
        iterations,
        sleep_seconds: config.schedule.sleep_seconds,
        max_send_attempts: config.radio.max_send_attempts,
    };
    let mut scheduler = CycleScheduler::new(config.schedule.measurement_interval_s);

    if args.simulate {
        log::info!("running in simulation mode");
        let mut deps = RuntimeDeps {
            sensor: SimulatedSensor::with_defaults(),
            radio: ConsoleRadio::new(),
            clock: SystemClock,
            sleeper: ThreadSleeper,
        };
        let sends =
            run_runtime_iterations(&options, &config.calibration.path, &mut scheduler, &mut deps)
                .context("runtime loop failed")?;
        log::info!("simulation finished: {sends} uplinks completed");
        return Ok(());
    }

    run_gauge(config, &options, &mut scheduler)
}
