//! # Measurement Runtime
//!
//! The runtime owns the gauge's whole life: wake, check the schedule, run a
//! measurement cycle if one is due, sleep, repeat. Everything it touches
//! arrives through four ports ([`DistanceSensor`], [`Radio`](crate::radio::Radio),
//! [`Clock`], [`Sleep`]), so the loop that runs for months on a mudflat is
//! the same loop the tests drive with fakes in microseconds.
//!
//! ## Measurement Cycle
//!
//! 1. Read a distance from the sensor
//! 2. Convert to a tide height with the stored calibration
//! 3. Encode the 2-byte uplink payload
//! 4. Send, retrying immediate back-to-back up to the attempt cap
//!
//! Retries are deliberately immediate and bounded: LoRaWAN send failures at
//! this layer are usually transient modem conditions, and anything longer
//! lived is better served by waiting for the next scheduled cycle than by
//! holding the processor awake with a backoff timer.
//!
//! ## Fault Isolation
//!
//! A field gauge has no operator. Whatever a cycle does (sensor timeout,
//! missing calibration, a reading the payload cannot carry, a dead radio),
//! the loop logs it and carries on; nothing short of an unreadable
//! calibration file at startup stops the process. An uncalibrated gauge is
//! the expected state between imaging and field calibration, so that branch
//! logs quietly instead of as a fault.
//!
//! The loop sleeps after *every* iteration, fault or not. The sleep is the
//! battery budget; error paths do not get to spin.

use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::calibration::{compute_tide_height_from_config_m, CalibrationConfig, CalibrationError};
use crate::calibration_store::{self, StoreError};
use crate::payload::{encode_tide_height, PayloadError, PAYLOAD_LEN};
use crate::radio::{Radio, RadioSendError};
use crate::scheduler::CycleScheduler;

/// Generic fault from a distance sensor backend.
///
/// Sensor backends keep their own richer error types; by the time a fault
/// crosses this port only the message matters, because the loop's response
/// is always the same: log it and wait for the next cycle.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("sensor fault: {0}")]
pub struct SensorError(pub String);

/// Distance measurement port.
pub trait DistanceSensor {
    /// One water-surface distance in meters, sensor face down.
    fn read_distance_m(&mut self) -> Result<f64, SensorError>;
}

/// Wall-clock seconds for the scheduler.
pub trait Clock {
    fn now_s(&mut self) -> u64;
}

/// Between-iteration sleep.
pub trait Sleep {
    fn sleep_s(&mut self, seconds: u64);
}

/// [`Clock`] backed by the system clock, as seconds since the Unix epoch.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_s(&mut self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// [`Sleep`] backed by `std::thread::sleep`.
#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleep for ThreadSleeper {
    fn sleep_s(&mut self, seconds: u64) {
        thread::sleep(Duration::from_secs(seconds));
    }
}

/// Any failure a single measurement cycle can produce.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Radio(#[from] RadioSendError),
}

/// Loop parameters, fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Iterations to run before returning. The daemon passes `u32::MAX`
    /// for an effectively unbounded run; tests pass small counts.
    pub iterations: u32,
    /// Seconds to sleep after every iteration.
    pub sleep_seconds: u64,
    /// Upper bound on back-to-back send attempts per cycle.
    pub max_send_attempts: u32,
}

/// The four ports the loop runs against.
pub struct RuntimeDeps<S, R, C, Z> {
    pub sensor: S,
    pub radio: R,
    pub clock: C,
    pub sleeper: Z,
}

/// Send one payload with bounded immediate retries.
///
/// Retries only on send failure; a cap of zero is clamped to a single
/// attempt. Earlier firmware revisions read a zero cap as "measure but
/// never transmit"; here a cycle that reaches the radio always gets one
/// try. Returns the last attempt's error when all attempts fail.
pub fn send_with_retry<R>(
    radio: &mut R,
    payload: &[u8],
    max_send_attempts: u32,
) -> Result<(), RadioSendError>
where
    R: Radio,
{
    let attempts = max_send_attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match radio.send(payload) {
            Ok(()) => return Ok(()),
            Err(err) => {
                log::warn!("uplink attempt {attempt} of {attempts} failed: {err}");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| RadioSendError("uplink was never attempted".to_string())))
}

/// Run one full measurement cycle: read, compute, encode, send.
///
/// Returns the payload that went out, mostly for the caller's logging.
pub fn run_measurement_cycle<S, R>(
    sensor: &mut S,
    radio: &mut R,
    calibration: &CalibrationConfig,
    max_send_attempts: u32,
) -> Result<[u8; PAYLOAD_LEN], CycleError>
where
    S: DistanceSensor,
    R: Radio,
{
    let distance_m = sensor.read_distance_m()?;
    let height_m = compute_tide_height_from_config_m(distance_m, calibration)?;
    log::debug!("distance {distance_m:.3} m -> tide height {height_m:.3} m");
    let payload = encode_tide_height(height_m)?;
    send_with_retry(radio, &payload, max_send_attempts)?;
    Ok(payload)
}

/// Drive the measurement loop for a bounded number of iterations.
///
/// Calibration is loaded once here and held for the whole run; a record
/// written by the calibration tool takes effect on the next start. Returns
/// the number of cycles whose payload was actually delivered. The only
/// error path out is a calibration file that exists but cannot be read or
/// parsed, which is an operator problem, not a field condition.
pub fn run_runtime_iterations<S, R, C, Z>(
    options: &LoopOptions,
    calibration_path: &Path,
    scheduler: &mut CycleScheduler,
    deps: &mut RuntimeDeps<S, R, C, Z>,
) -> Result<u32, StoreError>
where
    S: DistanceSensor,
    R: Radio,
    C: Clock,
    Z: Sleep,
{
    let calibration = calibration_store::load_calibration_config(calibration_path)?;
    if !calibration.is_calibrated() {
        log::warn!(
            "gauge is not calibrated; cycles will be skipped until {} is written",
            calibration_path.display()
        );
    }

    let mut sends_completed: u32 = 0;
    for _ in 0..options.iterations {
        let now_s = deps.clock.now_s();
        if scheduler.is_due(now_s) {
            match run_measurement_cycle(
                &mut deps.sensor,
                &mut deps.radio,
                &calibration,
                options.max_send_attempts,
            ) {
                Ok(payload) => {
                    sends_completed += 1;
                    log::info!(
                        "uplinked tide payload 0x{:02X}{:02X}",
                        payload[0],
                        payload[1]
                    );
                }
                Err(CycleError::Calibration(CalibrationError::NotSet)) => {
                    log::info!("skipping cycle: calibration is not set");
                }
                Err(err) => {
                    log::warn!("measurement cycle failed: {err}");
                }
            }
        }
        deps.sleeper.sleep_s(options.sleep_seconds);
    }
    Ok(sends_completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensor(f64);

    impl DistanceSensor for FixedSensor {
        fn read_distance_m(&mut self) -> Result<f64, SensorError> {
            Ok(self.0)
        }
    }

    struct BrokenSensor;

    impl DistanceSensor for BrokenSensor {
        fn read_distance_m(&mut self) -> Result<f64, SensorError> {
            Err(SensorError("echo timeout".to_string()))
        }
    }

    /// Radio that fails the first `failures` sends, then succeeds, counting
    /// every call.
    struct FlakyRadio {
        failures: u32,
        calls: u32,
        delivered: Vec<Vec<u8>>,
    }

    impl FlakyRadio {
        fn new(failures: u32) -> Self {
            FlakyRadio {
                failures,
                calls: 0,
                delivered: Vec::new(),
            }
        }
    }

    impl Radio for FlakyRadio {
        fn send(&mut self, payload: &[u8]) -> Result<(), RadioSendError> {
            self.calls += 1;
            if self.calls <= self.failures {
                Err(RadioSendError("no ack".to_string()))
            } else {
                self.delivered.push(payload.to_vec());
                Ok(())
            }
        }
    }

    #[test]
    fn test_cycle_reads_computes_encodes_and_sends() {
        let mut sensor = FixedSensor(1.4);
        let mut radio = FlakyRadio::new(0);
        let calibration = CalibrationConfig::new(2.5, 0.2);

        let payload = run_measurement_cycle(&mut sensor, &mut radio, &calibration, 3).unwrap();

        assert_eq!(payload, [0x03, 0x84]);
        assert_eq!(radio.calls, 1);
        assert_eq!(radio.delivered, vec![vec![0x03, 0x84]]);
    }

    #[test]
    fn test_cycle_succeeds_after_two_failed_attempts() {
        let mut sensor = FixedSensor(1.4);
        let mut radio = FlakyRadio::new(2);
        let calibration = CalibrationConfig::new(2.5, 0.2);

        run_measurement_cycle(&mut sensor, &mut radio, &calibration, 3).unwrap();

        assert_eq!(radio.calls, 3);
        assert_eq!(radio.delivered.len(), 1);
    }

    #[test]
    fn test_cycle_gives_up_after_attempt_cap() {
        let mut sensor = FixedSensor(1.4);
        let mut radio = FlakyRadio::new(u32::MAX);
        let calibration = CalibrationConfig::new(2.5, 0.2);

        let err = run_measurement_cycle(&mut sensor, &mut radio, &calibration, 3).unwrap_err();

        assert!(matches!(err, CycleError::Radio(_)));
        assert_eq!(radio.calls, 3);
        assert!(radio.delivered.is_empty());
    }

    #[test]
    fn test_sensor_fault_never_reaches_the_radio() {
        let mut radio = FlakyRadio::new(0);
        let calibration = CalibrationConfig::new(2.5, 0.2);

        let err =
            run_measurement_cycle(&mut BrokenSensor, &mut radio, &calibration, 3).unwrap_err();

        assert!(matches!(err, CycleError::Sensor(_)));
        assert_eq!(radio.calls, 0);
    }

    #[test]
    fn test_uncalibrated_cycle_never_reaches_the_radio() {
        let mut sensor = FixedSensor(1.4);
        let mut radio = FlakyRadio::new(0);
        let calibration = CalibrationConfig::default();

        let err = run_measurement_cycle(&mut sensor, &mut radio, &calibration, 3).unwrap_err();

        assert!(matches!(
            err,
            CycleError::Calibration(CalibrationError::NotSet)
        ));
        assert_eq!(radio.calls, 0);
    }

    #[test]
    fn test_out_of_range_height_is_a_payload_fault() {
        // Geometry reference of 100 m puts the height far outside i16 mm
        let mut sensor = FixedSensor(1.4);
        let mut radio = FlakyRadio::new(0);
        let calibration = CalibrationConfig::new(100.0, 0.2);

        let err = run_measurement_cycle(&mut sensor, &mut radio, &calibration, 3).unwrap_err();

        assert!(matches!(err, CycleError::Payload(_)));
        assert_eq!(radio.calls, 0);
    }

    #[test]
    fn test_retry_cap_of_zero_still_attempts_once() {
        let mut radio = FlakyRadio::new(0);
        send_with_retry(&mut radio, &[0x00, 0x01], 0).unwrap();
        assert_eq!(radio.calls, 1);
    }

    #[test]
    fn test_retry_returns_last_error() {
        let mut radio = FlakyRadio::new(u32::MAX);
        let err = send_with_retry(&mut radio, &[0x00, 0x01], 2).unwrap_err();
        assert_eq!(err, RadioSendError("no ack".to_string()));
        assert_eq!(radio.calls, 2);
    }
}
