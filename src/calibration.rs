//! # Calibration and Tide Height Computation
//!
//! A deployed gauge measures the distance from the sensor face down to the
//! water surface. Turning that distance into a tide height needs two site
//! constants established during installation:
//!
//! - **Geometry reference**: vertical distance from the sensor face to the
//!   site's fixed reference plane (e.g. the top of a mounting structure),
//!   in meters.
//! - **Datum offset**: vertical distance from that reference plane to the
//!   tidal datum heights are reported against, in meters.
//!
//! The height formula is then:
//!
//! ```text
//! tide_height = geometry_reference - measured_distance - datum_offset
//! ```
//!
//! Both constants live in [`CalibrationConfig`]. The record is all-or-nothing:
//! a gauge with either constant missing is uncalibrated and must not report
//! heights, so the config-checked entry point refuses to compute before it
//! even looks at the reading.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from tide height and datum offset computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The calibration record is incomplete; the gauge cannot report heights.
    #[error("calibration is not set")]
    NotSet,

    /// A distance reading below zero is physically impossible for a
    /// downward-looking ranging sensor and is rejected, never clamped.
    #[error("measured distance must be non-negative, got {0}")]
    NegativeDistance(f64),
}

/// Site calibration constants, persisted between runs.
///
/// Either field may be absent (freshly deployed gauge, or a record written
/// by an older tool that only knew one constant). Computation requires both.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Sensor face to reference plane, meters
    pub geometry_reference_m: Option<f64>,
    /// Reference plane to tidal datum, meters
    pub datum_offset_m: Option<f64>,
}

impl CalibrationConfig {
    /// Create a complete calibration record.
    pub fn new(geometry_reference_m: f64, datum_offset_m: f64) -> Self {
        CalibrationConfig {
            geometry_reference_m: Some(geometry_reference_m),
            datum_offset_m: Some(datum_offset_m),
        }
    }

    /// True only when both constants are present.
    pub fn is_calibrated(&self) -> bool {
        self.geometry_reference_m.is_some() && self.datum_offset_m.is_some()
    }
}

/// Compute a tide height from an explicit geometry reference and datum offset.
///
/// Rejects negative distance readings; a valid result may itself be negative
/// (water below the datum).
///
/// # Example
/// ```
/// use tide_gauge_lib::calibration::compute_tide_height_m;
///
/// let height = compute_tide_height_m(2.5, 1.4, 0.2).unwrap();
/// assert!((height - 0.9).abs() < 1e-9);
/// ```
pub fn compute_tide_height_m(
    geometry_reference_m: f64,
    measured_distance_m: f64,
    datum_offset_m: f64,
) -> Result<f64, CalibrationError> {
    if measured_distance_m < 0.0 {
        return Err(CalibrationError::NegativeDistance(measured_distance_m));
    }
    Ok(geometry_reference_m - measured_distance_m - datum_offset_m)
}

/// Compute a tide height using a stored calibration record.
///
/// Calibration completeness is checked before the reading is validated, so
/// an uncalibrated gauge always reports [`CalibrationError::NotSet`] even
/// for nonsensical readings.
pub fn compute_tide_height_from_config_m(
    measured_distance_m: f64,
    config: &CalibrationConfig,
) -> Result<f64, CalibrationError> {
    match (config.geometry_reference_m, config.datum_offset_m) {
        (Some(geometry_reference_m), Some(datum_offset_m)) => {
            compute_tide_height_m(geometry_reference_m, measured_distance_m, datum_offset_m)
        }
        _ => Err(CalibrationError::NotSet),
    }
}

/// Derive the datum offset during field calibration.
///
/// With the sensor installed and the geometry reference surveyed, take one
/// distance reading while the true tide height is known (e.g. from a staff
/// gauge or a nearby reference station). The datum offset is whatever makes
/// the height formula reproduce that known height:
///
/// ```text
/// datum_offset = geometry_reference - measured_distance - known_tide_height
/// ```
pub fn compute_datum_offset_m(
    geometry_reference_m: f64,
    measured_distance_m: f64,
    known_tide_height_m: f64,
) -> Result<f64, CalibrationError> {
    if measured_distance_m < 0.0 {
        return Err(CalibrationError::NegativeDistance(measured_distance_m));
    }
    Ok(geometry_reference_m - measured_distance_m - known_tide_height_m)
}
