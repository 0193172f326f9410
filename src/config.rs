//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! gauge-config.toml file. It provides a centralized way to configure GPIO
//! pin assignments, the measurement cadence, radio retry behavior, and the
//! calibration file location.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration loaded from gauge-config.toml
#[derive(Debug, Deserialize, Serialize)]
pub struct GaugeConfig {
    /// Ultrasonic sensor wiring and timing
    pub sensor: SensorConfig,
    /// Measurement loop cadence
    pub schedule: ScheduleConfig,
    /// Radio retry behavior
    pub radio: RadioConfig,
    /// Calibration file location
    pub calibration: CalibrationStoreConfig,
}

/// Ultrasonic sensor configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct SensorConfig {
    /// BCM pin number driving the HC-SR04 trigger line
    pub trigger_pin: u8,
    /// BCM pin number reading the (level-shifted) echo line
    pub echo_pin: u8,
    /// Echo wait timeout in microseconds; 30000 covers the sensor's range
    pub echo_timeout_us: u32,
}

/// Measurement loop configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Seconds between measurement cycles
    pub measurement_interval_s: u64,
    /// Seconds the loop sleeps after every iteration
    pub sleep_seconds: u64,
    /// Iteration cap; omit to run until terminated
    pub max_loops: Option<u32>,
}

/// Radio configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct RadioConfig {
    /// Back-to-back send attempts before a cycle gives up
    pub max_send_attempts: u32,
}

/// Calibration file configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct CalibrationStoreConfig {
    /// Path of the persisted calibration record
    pub path: PathBuf,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        GaugeConfig {
            sensor: SensorConfig {
                trigger_pin: 6,
                echo_pin: 7,
                echo_timeout_us: 30_000,
            },
            schedule: ScheduleConfig {
                measurement_interval_s: 60,
                sleep_seconds: 1,
                max_loops: None, // Run until terminated
            },
            radio: RadioConfig {
                max_send_attempts: 3,
            },
            calibration: CalibrationStoreConfig {
                path: PathBuf::from("calibration.json"),
            },
        }
    }
}

impl GaugeConfig {
    /// Load configuration from gauge-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path("gauge-config.toml")
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<GaugeConfig>(&contents) {
                Ok(config) => {
                    log::info!(
                        "loaded configuration: {} s interval, trigger/echo pins {}/{}",
                        config.schedule.measurement_interval_s,
                        config.sensor.trigger_pin,
                        config.sensor.echo_pin
                    );
                    config
                }
                Err(e) => {
                    log::warn!("invalid config file format: {e}");
                    log::warn!("using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Save current configuration to gauge-config.toml
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        fs::write("gauge-config.toml", contents)?;
        log::info!("configuration saved to gauge-config.toml");
        Ok(())
    }
}
