//! # Uplink Payload Codec
//!
//! Tide heights go over the air as exactly two bytes so that an uplink fits
//! the smallest LoRaWAN payload budgets at every data rate.
//!
//! ## Wire Format
//!
//! - Signed 16-bit integer, big-endian (network byte order)
//! - Unit: millimeters relative to the tidal datum
//! - Range: -32768 mm to +32767 mm (about ±32.7 m, far beyond any tide)
//!
//! Encoding rounds the height to the nearest millimeter with ties away from
//! zero (`f64::round`), then range-checks before the integer cast. A height
//! outside the representable range is an error, never a clamp; the one value
//! this costs is +32767.5 mm, which rounds out of range instead of saturating.
//! Non-finite heights fail the same range check.
//!
//! The decoder exists for interoperability tooling and tests on the receive
//! side; the gauge itself only encodes.

use thiserror::Error;

/// Exact uplink payload size in bytes.
pub const PAYLOAD_LEN: usize = 2;

/// Errors from encoding or decoding the 2-byte tide payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// Height rounds to a millimeter count outside the signed 16-bit range.
    #[error("tide height {0} m is outside the encodable range")]
    OutOfRange(f64),

    /// Payload is not exactly [`PAYLOAD_LEN`] bytes.
    #[error("payload must be exactly 2 bytes, got {0}")]
    Length(usize),
}

/// Encode a tide height in meters as 2 big-endian signed-millimeter bytes.
///
/// # Example
/// ```
/// use tide_gauge_lib::payload::encode_tide_height;
///
/// assert_eq!(encode_tide_height(0.9).unwrap(), [0x03, 0x84]);
/// assert_eq!(encode_tide_height(-0.6).unwrap(), [0xFD, 0xA8]);
/// ```
pub fn encode_tide_height(height_m: f64) -> Result<[u8; PAYLOAD_LEN], PayloadError> {
    let millimeters = (height_m * 1000.0).round();
    if !(f64::from(i16::MIN)..=f64::from(i16::MAX)).contains(&millimeters) {
        return Err(PayloadError::OutOfRange(height_m));
    }
    Ok((millimeters as i16).to_be_bytes())
}

/// Decode a 2-byte payload back to a tide height in meters.
pub fn decode_tide_height(payload: &[u8]) -> Result<f64, PayloadError> {
    let bytes: [u8; PAYLOAD_LEN] = payload
        .try_into()
        .map_err(|_| PayloadError::Length(payload.len()))?;
    Ok(f64::from(i16::from_be_bytes(bytes)) / 1000.0)
}
