//! rppal-backed GPIO adapters for the ultrasonic driver.
//!
//! Compiled only on Linux with the `hardware` feature; everything else in
//! the crate runs against fakes or the simulator. Pin numbers are BCM GPIO
//! numbers, the same numbering rppal and the Pi pinout diagrams use.

use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, OutputPin};

use tide_gauge_lib::ultrasonic::{EchoPin, PulseClock, TriggerPin, UltrasonicError};

fn gpio_err(err: rppal::gpio::Error) -> UltrasonicError {
    UltrasonicError::Gpio(err.to_string())
}

/// Output pin on the sensor's trigger line.
pub struct RppalTriggerPin {
    pin: OutputPin,
}

impl RppalTriggerPin {
    /// Claim a BCM pin as the trigger output, starting low.
    pub fn new(bcm_pin: u8) -> Result<Self, UltrasonicError> {
        let pin = Gpio::new()
            .map_err(gpio_err)?
            .get(bcm_pin)
            .map_err(gpio_err)?
            .into_output_low();
        Ok(RppalTriggerPin { pin })
    }
}

impl TriggerPin for RppalTriggerPin {
    fn set_high(&mut self) -> Result<(), UltrasonicError> {
        self.pin.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), UltrasonicError> {
        self.pin.set_low();
        Ok(())
    }
}

/// Input pin on the sensor's echo line.
pub struct RppalEchoPin {
    pin: InputPin,
}

impl RppalEchoPin {
    pub fn new(bcm_pin: u8) -> Result<Self, UltrasonicError> {
        let pin = Gpio::new()
            .map_err(gpio_err)?
            .get(bcm_pin)
            .map_err(gpio_err)?
            .into_input();
        Ok(RppalEchoPin { pin })
    }
}

impl EchoPin for RppalEchoPin {
    fn is_high(&mut self) -> Result<bool, UltrasonicError> {
        Ok(self.pin.is_high())
    }
}

/// Microsecond tick source built on the monotonic clock.
pub struct MonotonicPulseClock {
    origin: Instant,
}

impl MonotonicPulseClock {
    pub fn new() -> Self {
        MonotonicPulseClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicPulseClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseClock for MonotonicPulseClock {
    fn ticks_us(&mut self) -> u32 {
        // Truncating the microsecond count to u32 yields exactly the
        // wrapping counter the driver's elapsed arithmetic expects.
        self.origin.elapsed().as_micros() as u32
    }

    fn delay_us(&mut self, us: u32) {
        // thread::sleep cannot hold microsecond deadlines on a non-RT
        // kernel; the trigger holds are short enough to spin through.
        let start = Instant::now();
        let wait = Duration::from_micros(u64::from(us));
        while start.elapsed() < wait {
            std::hint::spin_loop();
        }
    }
}
