//! # Tide Gauge Core Library
//!
//! This library implements the firmware logic of a battery-powered tide
//! gauge for Raspberry-Pi-class boards: measure the distance to the water
//! with an ultrasonic sensor, convert it to a tide height against a surveyed
//! datum, and uplink the height as a 2-byte LoRaWAN payload.
//!
//! ## Architecture
//!
//! Everything hardware- or environment-shaped sits behind a narrow trait:
//! [`runtime::DistanceSensor`], [`radio::Radio`], [`runtime::Clock`],
//! [`runtime::Sleep`], and the pin/clock traits of [`ultrasonic`]. The
//! runtime loop is written purely against those ports, which is what lets
//! the same loop run for months on a mudflat, in seconds under test, and
//! on a laptop via [`sim`].
//!
//! ```text
//! scheduler -> sensor -> calibration -> payload -> radio (with retry)
//!     ^                                                     |
//!     +--------------------- sleep <-----------------------+
//! ```
//!
//! ## Design Constraints
//!
//! - **Battery first**: one measurement cycle per interval, an explicit
//!   sleep every loop iteration, bounded busy-waits in the pulse driver,
//!   and immediate (not backoff) send retries so the radio window stays
//!   short.
//! - **No operator**: any cycle failure is logged and survived; only an
//!   unreadable calibration file at startup stops the process.
//! - **Tiny uplinks**: exactly two bytes per report, signed millimeters,
//!   big-endian ([`payload`]).
//!
//! ## Core Modules
//!
//! - [`ultrasonic`]: HC-SR04 pulse timing and distance conversion
//! - [`calibration`] / [`calibration_store`]: height math and its persisted
//!   site constants
//! - [`payload`]: the 2-byte wire codec
//! - [`scheduler`] / [`runtime`]: cadence and the fault-isolating loop
//! - [`radio`] / [`sim`]: uplink contract, lazy-join adapter, bench fakes

// Module declarations
pub mod calibration;
pub mod calibration_store;
pub mod config;
pub mod payload;
pub mod radio;
pub mod runtime;
pub mod scheduler;
pub mod sim;
pub mod ultrasonic;

pub use calibration::CalibrationConfig;
