//! # HC-SR04 Ultrasonic Pulse Driver
//!
//! This module times the echo pulse of an HC-SR04-class ultrasonic ranging
//! sensor and converts the pulse width to a water-surface distance. It talks
//! to the board only through three narrow traits ([`TriggerPin`],
//! [`EchoPin`], [`PulseClock`]), so the timing logic runs identically against
//! real GPIO and against scripted fakes in tests.
//!
//! ## Trigger Sequence
//!
//! The sensor starts a measurement on a 10 µs high pulse on its trigger pin:
//!
//! 1. Drive trigger low and hold 2 µs so the edge is clean
//! 2. Drive trigger high and hold 10 µs
//! 3. Drive trigger low; the sensor emits its 40 kHz burst
//!
//! ## Echo Timing
//!
//! The sensor raises its echo pin for the round-trip flight time of the
//! burst. The driver busy-waits for the rising edge, timestamps it, busy-waits
//! for the falling edge, timestamps that, and reports the difference. The
//! waits are bounded by two *independent* timeout windows (default 30 ms,
//! about 5 m of range): one from the start of the rise wait, one from the
//! echo start. Which window expired is preserved in the error, since a
//! missing rise usually means wiring or power while a missing fall usually
//! means an out-of-range or absorbing target.
//!
//! ## Tick Arithmetic
//!
//! Timestamps come from a free-running microsecond counter that wraps at
//! `u32::MAX` (about 71 minutes). All interval math goes through
//! [`ticks_elapsed_us`], which uses wrapping subtraction so an interval that
//! straddles the wrap point is still correct. Plain subtraction would panic
//! in debug builds and produce garbage in release builds.
//!
//! ## Hardware Notes
//!
//! The HC-SR04 echo output is 5 V; Pi GPIO inputs are 3.3 V. Deployments use
//! a level shifter or divider on the echo line.

use thiserror::Error;

use crate::runtime::{DistanceSensor, SensorError};

/// Speed of sound used for distance conversion, in meters per second.
///
/// 343 m/s is dry air at 20 °C. Over water the true value drifts with air
/// temperature by about 0.6 m/s per °C; at tide-gauge ranges that error is
/// millimeters and is absorbed into the site calibration.
pub const SPEED_OF_SOUND_M_PER_S: f64 = 343.0;

/// Default bound on each echo wait, in microseconds.
///
/// 30 ms of round-trip flight is just over 5 m of range, past the useful
/// span of the sensor, so a longer wait only burns battery.
pub const DEFAULT_ECHO_TIMEOUT_US: u32 = 30_000;

/// Low hold before the trigger pulse, microseconds
const TRIGGER_SETTLE_US: u32 = 2;
/// High hold of the trigger pulse, microseconds
const TRIGGER_HOLD_US: u32 = 10;

/// Errors from pulse timing and distance conversion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UltrasonicError {
    /// Echo never rose within the timeout window (wiring, power, or a dead
    /// sensor).
    #[error("timed out after {0} us waiting for echo to start")]
    EchoStartTimeout(u32),

    /// Echo rose but never fell within the timeout window (target out of
    /// range or absorbing the burst).
    #[error("timed out after {0} us waiting for echo to end")]
    EchoEndTimeout(u32),

    /// A negative pulse duration was offered for conversion.
    #[error("echo duration must be non-negative, got {0} us")]
    NegativeDuration(i64),

    /// The board-level pin driver reported a fault.
    #[error("gpio fault: {0}")]
    Gpio(String),
}

/// Output pin driving the sensor's trigger line.
pub trait TriggerPin {
    fn set_high(&mut self) -> Result<(), UltrasonicError>;
    fn set_low(&mut self) -> Result<(), UltrasonicError>;
}

/// Input pin reading the sensor's echo line.
pub trait EchoPin {
    fn is_high(&mut self) -> Result<bool, UltrasonicError>;
}

/// Microsecond time source for pulse timing.
pub trait PulseClock {
    /// Current value of a free-running microsecond counter. Wraps at
    /// `u32::MAX`; compare values only through [`ticks_elapsed_us`].
    fn ticks_us(&mut self) -> u32;

    /// Block for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);
}

/// Microseconds elapsed from `start_us` to `now_us` on a wrapping counter.
///
/// Correct for any interval shorter than a full counter wrap (~71 minutes),
/// including intervals that cross the wrap point.
pub fn ticks_elapsed_us(start_us: u32, now_us: u32) -> u32 {
    now_us.wrapping_sub(start_us)
}

/// Pulse-timing driver for an HC-SR04-class sensor.
pub struct Hcsr04PulseReader<T, E, C> {
    trigger: T,
    echo: E,
    clock: C,
    echo_timeout_us: u32,
}

impl<T, E, C> Hcsr04PulseReader<T, E, C>
where
    T: TriggerPin,
    E: EchoPin,
    C: PulseClock,
{
    /// Create a driver with the default 30 ms echo timeout.
    pub fn new(trigger: T, echo: E, clock: C) -> Self {
        Self::with_timeout(trigger, echo, clock, DEFAULT_ECHO_TIMEOUT_US)
    }

    /// Create a driver with an explicit echo timeout in microseconds.
    pub fn with_timeout(trigger: T, echo: E, clock: C, echo_timeout_us: u32) -> Self {
        Hcsr04PulseReader {
            trigger,
            echo,
            clock,
            echo_timeout_us,
        }
    }

    /// Fire one measurement and return the echo pulse width in microseconds.
    pub fn read_echo_duration_us(&mut self) -> Result<u32, UltrasonicError> {
        self.send_trigger_pulse()?;

        // Wait for the echo to rise; window starts at the wait, not the
        // trigger, so trigger-side pin latency never eats into it.
        let wait_start_us = self.clock.ticks_us();
        while !self.echo.is_high()? {
            let waited_us = ticks_elapsed_us(wait_start_us, self.clock.ticks_us());
            if waited_us > self.echo_timeout_us {
                return Err(UltrasonicError::EchoStartTimeout(self.echo_timeout_us));
            }
        }

        // The rise timestamp doubles as the fall wait's own window start.
        let pulse_start_us = self.clock.ticks_us();
        while self.echo.is_high()? {
            let waited_us = ticks_elapsed_us(pulse_start_us, self.clock.ticks_us());
            if waited_us > self.echo_timeout_us {
                return Err(UltrasonicError::EchoEndTimeout(self.echo_timeout_us));
            }
        }
        let pulse_end_us = self.clock.ticks_us();

        Ok(ticks_elapsed_us(pulse_start_us, pulse_end_us))
    }

    fn send_trigger_pulse(&mut self) -> Result<(), UltrasonicError> {
        self.trigger.set_low()?;
        self.clock.delay_us(TRIGGER_SETTLE_US);
        self.trigger.set_high()?;
        self.clock.delay_us(TRIGGER_HOLD_US);
        self.trigger.set_low()?;
        Ok(())
    }
}

/// Convert an echo pulse width to a one-way distance in meters.
///
/// Takes `i64` rather than `u32` so durations sourced from vendor pulse
/// helpers, which signal timeouts with negative sentinels, are rejected
/// here instead of converting to a bogus distance.
pub fn echo_duration_us_to_distance_m(duration_us: i64) -> Result<f64, UltrasonicError> {
    if duration_us < 0 {
        return Err(UltrasonicError::NegativeDuration(duration_us));
    }
    // Round trip at the speed of sound; halve for the one-way distance.
    Ok(duration_us as f64 / 1_000_000.0 * SPEED_OF_SOUND_M_PER_S / 2.0)
}

impl From<UltrasonicError> for SensorError {
    fn from(err: UltrasonicError) -> Self {
        SensorError(err.to_string())
    }
}

/// Adapts the pulse driver to the runtime's [`DistanceSensor`] port.
pub struct UltrasonicRanger<T, E, C> {
    reader: Hcsr04PulseReader<T, E, C>,
}

impl<T, E, C> UltrasonicRanger<T, E, C>
where
    T: TriggerPin,
    E: EchoPin,
    C: PulseClock,
{
    pub fn new(reader: Hcsr04PulseReader<T, E, C>) -> Self {
        UltrasonicRanger { reader }
    }
}

impl<T, E, C> DistanceSensor for UltrasonicRanger<T, E, C>
where
    T: TriggerPin,
    E: EchoPin,
    C: PulseClock,
{
    fn read_distance_m(&mut self) -> Result<f64, SensorError> {
        let duration_us = self.reader.read_echo_duration_us()?;
        Ok(echo_duration_us_to_distance_m(i64::from(duration_us))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records trigger levels as they are written.
    struct FakeTriggerPin {
        writes: Vec<bool>,
    }

    impl FakeTriggerPin {
        fn new() -> Self {
            FakeTriggerPin { writes: Vec::new() }
        }
    }

    impl TriggerPin for FakeTriggerPin {
        fn set_high(&mut self) -> Result<(), UltrasonicError> {
            self.writes.push(true);
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), UltrasonicError> {
            self.writes.push(false);
            Ok(())
        }
    }

    /// Replays a scripted level sequence, repeating the final level forever.
    struct FakeEchoPin {
        levels: Vec<bool>,
        reads: usize,
    }

    impl FakeEchoPin {
        fn new(levels: &[bool]) -> Self {
            FakeEchoPin {
                levels: levels.to_vec(),
                reads: 0,
            }
        }
    }

    impl EchoPin for FakeEchoPin {
        fn is_high(&mut self) -> Result<bool, UltrasonicError> {
            let level = self
                .levels
                .get(self.reads)
                .or_else(|| self.levels.last())
                .copied()
                .unwrap_or(false);
            self.reads += 1;
            Ok(level)
        }
    }

    /// Deterministic clock: every `ticks_us` read advances time by a fixed
    /// step, and delays advance it by the requested amount.
    struct FakeClock {
        now_us: u32,
        tick_step_us: u32,
        delays_us: Vec<u32>,
    }

    impl FakeClock {
        fn new(tick_step_us: u32) -> Self {
            FakeClock {
                now_us: 0,
                tick_step_us,
                delays_us: Vec::new(),
            }
        }

        fn starting_at(now_us: u32, tick_step_us: u32) -> Self {
            FakeClock {
                now_us,
                tick_step_us,
                delays_us: Vec::new(),
            }
        }
    }

    impl PulseClock for FakeClock {
        fn ticks_us(&mut self) -> u32 {
            self.now_us = self.now_us.wrapping_add(self.tick_step_us);
            self.now_us
        }

        fn delay_us(&mut self, us: u32) {
            self.delays_us.push(us);
            self.now_us = self.now_us.wrapping_add(us);
        }
    }

    #[test]
    fn test_elapsed_simple() {
        assert_eq!(ticks_elapsed_us(100, 400), 300);
        assert_eq!(ticks_elapsed_us(0, 0), 0);
    }

    #[test]
    fn test_elapsed_across_counter_wrap() {
        assert_eq!(ticks_elapsed_us(u32::MAX - 10, 20), 31);
        assert_eq!(ticks_elapsed_us(u32::MAX, 0), 1);
    }

    #[test]
    fn test_pulse_width_measured_between_edges() {
        // Echo: two reads low, three reads high, then low. With a 100 us
        // tick step the rise and fall timestamps land 300 us apart.
        let echo = FakeEchoPin::new(&[false, false, true, true, true, false]);
        let mut reader =
            Hcsr04PulseReader::new(FakeTriggerPin::new(), echo, FakeClock::new(100));

        let duration_us = reader.read_echo_duration_us().unwrap();
        assert_eq!(duration_us, 300);
    }

    #[test]
    fn test_trigger_sequence_levels_and_delays() {
        let echo = FakeEchoPin::new(&[false, true, true, false]);
        let mut reader =
            Hcsr04PulseReader::new(FakeTriggerPin::new(), echo, FakeClock::new(100));

        reader.read_echo_duration_us().unwrap();

        assert_eq!(reader.trigger.writes, vec![false, true, false]);
        assert_eq!(reader.clock.delays_us, vec![2, 10]);
    }

    #[test]
    fn test_echo_start_timeout() {
        // Echo stays low; with a 200 us step the second check exceeds the
        // 300 us window.
        let echo = FakeEchoPin::new(&[false]);
        let mut reader = Hcsr04PulseReader::with_timeout(
            FakeTriggerPin::new(),
            echo,
            FakeClock::new(200),
            300,
        );

        let err = reader.read_echo_duration_us().unwrap_err();
        assert_eq!(err, UltrasonicError::EchoStartTimeout(300));
    }

    #[test]
    fn test_echo_end_timeout() {
        // Echo rises immediately and never falls.
        let echo = FakeEchoPin::new(&[true]);
        let mut reader = Hcsr04PulseReader::with_timeout(
            FakeTriggerPin::new(),
            echo,
            FakeClock::new(200),
            300,
        );

        let err = reader.read_echo_duration_us().unwrap_err();
        assert_eq!(err, UltrasonicError::EchoEndTimeout(300));
    }

    #[test]
    fn test_timeout_window_survives_counter_wrap() {
        // Start the counter just below the wrap point; the echo wait spans
        // it without a false timeout.
        let echo = FakeEchoPin::new(&[false, false, true, true, false]);
        let mut reader = Hcsr04PulseReader::new(
            FakeTriggerPin::new(),
            echo,
            FakeClock::starting_at(u32::MAX - 150, 100),
        );

        let duration_us = reader.read_echo_duration_us().unwrap();
        assert_eq!(duration_us, 200);
    }

    #[test]
    fn test_gpio_fault_propagates() {
        struct BrokenTrigger;

        impl TriggerPin for BrokenTrigger {
            fn set_high(&mut self) -> Result<(), UltrasonicError> {
                Err(UltrasonicError::Gpio("trigger line stuck".to_string()))
            }

            fn set_low(&mut self) -> Result<(), UltrasonicError> {
                Err(UltrasonicError::Gpio("trigger line stuck".to_string()))
            }
        }

        let echo = FakeEchoPin::new(&[false]);
        let mut reader = Hcsr04PulseReader::new(BrokenTrigger, echo, FakeClock::new(100));

        let err = reader.read_echo_duration_us().unwrap_err();
        assert!(matches!(err, UltrasonicError::Gpio(_)));
    }

    #[test]
    fn test_duration_to_distance() {
        // 5831 us of round trip is one meter each way at 343 m/s
        let distance_m = echo_duration_us_to_distance_m(5831).unwrap();
        assert!((distance_m - 1.0).abs() < 1e-3);

        let distance_m = echo_duration_us_to_distance_m(2000).unwrap();
        assert!((distance_m - 0.343).abs() < 1e-9);

        assert_eq!(echo_duration_us_to_distance_m(0).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = echo_duration_us_to_distance_m(-2).unwrap_err();
        assert_eq!(err, UltrasonicError::NegativeDuration(-2));
    }

    #[test]
    fn test_ranger_reports_distance_through_sensor_port() {
        // 100 us tick step gives a 300 us pulse: 0.05145 m of range.
        let echo = FakeEchoPin::new(&[false, false, true, true, true, false]);
        let reader = Hcsr04PulseReader::new(FakeTriggerPin::new(), echo, FakeClock::new(100));
        let mut ranger = UltrasonicRanger::new(reader);

        let distance_m = ranger.read_distance_m().unwrap();
        assert!((distance_m - 0.051_45).abs() < 1e-9);
    }

    #[test]
    fn test_ranger_maps_timeout_to_sensor_fault() {
        let echo = FakeEchoPin::new(&[false]);
        let reader = Hcsr04PulseReader::with_timeout(
            FakeTriggerPin::new(),
            echo,
            FakeClock::new(200),
            300,
        );
        let mut ranger = UltrasonicRanger::new(reader);

        let err = ranger.read_distance_m().unwrap_err();
        assert!(err.to_string().contains("echo"));
    }
}
