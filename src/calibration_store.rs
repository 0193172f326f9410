//! # Calibration Persistence
//!
//! The calibration record lives in a small JSON file on the gauge's SD card
//! so it survives reboots and firmware updates:
//!
//! ```json
//! { "geometry_reference_m": 2.5, "datum_offset_m": 0.2 }
//! ```
//!
//! Either key may be `null` or absent. A missing file is the normal state of
//! a freshly imaged gauge and loads as an uncalibrated record rather than an
//! error; a file that exists but does not parse is corruption and is
//! reported, not papered over.
//!
//! Saving writes a sibling temp file and renames it over the target. On the
//! POSIX filesystems the gauge runs on, the rename is atomic, so a reader
//! (or a power cut mid-save) sees the previous complete record or the new
//! one, never a torn write.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::calibration::{self, CalibrationConfig, CalibrationError};

/// Errors from loading, saving, or updating the calibration file.
#[derive(Error, Debug)]
pub enum StoreError {
    /// File could not be read or written (permissions, disk, SD card).
    #[error("calibration IO: {0}")]
    Io(#[from] io::Error),

    /// File exists but is not a valid calibration record.
    #[error("invalid calibration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The values offered for an update are not usable.
    #[error(transparent)]
    Invalid(#[from] CalibrationError),
}

/// Load the calibration record at `path`.
///
/// A missing file yields an uncalibrated record; the runtime treats that as
/// "measure but do not report" rather than a fault.
pub fn load_calibration_config<P: AsRef<Path>>(path: P) -> Result<CalibrationConfig, StoreError> {
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(CalibrationConfig::default()),
        Err(err) => Err(StoreError::Io(err)),
    }
}

/// Persist a calibration record to `path`, atomically replacing any
/// previous record.
pub fn save_calibration_config<P: AsRef<Path>>(
    path: P,
    config: &CalibrationConfig,
) -> Result<(), StoreError> {
    let path = path.as_ref();
    let contents = serde_json::to_string_pretty(config)?;
    let tmp_path = tmp_sibling(path);
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Derive the datum offset from a reading taken at a known tide height and
/// persist the resulting record. Returns what was written.
///
/// The inputs are validated before anything touches the filesystem, so a
/// bad reading never clobbers an existing good record.
pub fn update_calibration_from_reference<P: AsRef<Path>>(
    path: P,
    geometry_reference_m: f64,
    measured_distance_m: f64,
    known_tide_height_m: f64,
) -> Result<CalibrationConfig, StoreError> {
    let datum_offset_m = calibration::compute_datum_offset_m(
        geometry_reference_m,
        measured_distance_m,
        known_tide_height_m,
    )?;
    let config = CalibrationConfig::new(geometry_reference_m, datum_offset_m);
    save_calibration_config(path, &config)?;
    Ok(config)
}

// Temp file next to the target so the rename never crosses a filesystem.
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("calibration.json"));
    name.push(".tmp");
    path.with_file_name(name)
}
