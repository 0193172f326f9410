//! # Bench Simulation
//!
//! Hardware-free stand-ins for the sensor and radio ports so the full
//! runtime loop can run on a development machine: same scheduler, same
//! calibration math, same payload bytes, no GPIO and no modem.
//!
//! The simulated water level follows a single semidiurnal constituent, a
//! sine at the lunar M2 period of 12.42 hours. That is crude as tide
//! prediction goes (no solar constituent, no spring-neap envelope, no
//! asymmetry) but it exercises everything the firmware cares about: the
//! distance shrinks as the water rises, crosses the datum in both
//! directions, and repeats on a realistic timescale.

use crate::radio::{Radio, RadioSendError};
use crate::runtime::{DistanceSensor, SensorError};

/// Lunar M2 constituent period in seconds (12.42 hours).
const M2_PERIOD_S: f64 = 44_712.0;

/// Default sensor-face-to-mean-water distance, meters.
const DEFAULT_MEAN_DISTANCE_M: f64 = 2.0;

/// Default M2 amplitude, meters (Portland, ME harmonics, 4.51 ft).
const DEFAULT_AMPLITUDE_M: f64 = 1.37;

/// Distance sensor that synthesizes a semidiurnal tide.
///
/// Each reading advances an internal clock by a fixed step, so simulated
/// time moves at measurement speed rather than wall speed; a bench run
/// sweeps a full tide cycle in seconds.
pub struct SimulatedSensor {
    mean_distance_m: f64,
    amplitude_m: f64,
    step_s: f64,
    t_s: f64,
}

impl SimulatedSensor {
    pub fn new(mean_distance_m: f64, amplitude_m: f64, step_s: f64) -> Self {
        SimulatedSensor {
            mean_distance_m,
            amplitude_m,
            step_s,
            t_s: 0.0,
        }
    }

    /// Portland-flavored defaults: 2 m mounting height above mean water,
    /// 1.37 m amplitude, one simulated minute per reading.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MEAN_DISTANCE_M, DEFAULT_AMPLITUDE_M, 60.0)
    }
}

impl DistanceSensor for SimulatedSensor {
    fn read_distance_m(&mut self) -> Result<f64, SensorError> {
        let phase = std::f64::consts::TAU * self.t_s / M2_PERIOD_S;
        self.t_s += self.step_s;
        // Rising water shortens the distance the sensor sees
        Ok(self.mean_distance_m - self.amplitude_m * phase.sin())
    }
}

/// Radio that prints uplinks instead of transmitting them. Never fails.
#[derive(Debug, Default)]
pub struct ConsoleRadio {
    frames_sent: u32,
}

impl ConsoleRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }
}

impl Radio for ConsoleRadio {
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioSendError> {
        self.frames_sent += 1;
        let hex: String = payload.iter().map(|b| format!("{b:02X}")).collect();
        log::info!("console uplink #{}: 0x{hex}", self.frames_sent);
        Ok(())
    }
}
