//! # Radio Uplink Contract
//!
//! The runtime only knows how to hand 2 bytes to something that either
//! delivers them or reports a send failure; everything vendor-specific sits
//! behind the [`Radio`] trait. Concrete LoRaWAN modules differ in how they
//! surface failure (exceptions, status booleans, return codes), so the
//! [`LoRaWanDriver`] boundary trait absorbs that variance and
//! [`LoRaWanClient`] normalizes it to the one error kind the retry loop
//! understands.
//!
//! Joining the network is handled lazily: the client joins at most once per
//! process, right before the first uplink, and a failed join is simply
//! retried on the next send attempt. Keeping the join out of startup means
//! a gauge that boots without coverage still measures on schedule and
//! starts uplinking as soon as the network appears.

use thiserror::Error;

/// The single failure kind the retry loop reacts to.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("radio send failed: {0}")]
pub struct RadioSendError(pub String);

/// Uplink port used by the runtime loop.
pub trait Radio {
    /// Deliver one payload, or report why it could not be delivered.
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioSendError>;
}

/// Boundary trait for vendor LoRaWAN modules.
///
/// `send` follows the common vendor convention of a status boolean on top
/// of hard faults: `Ok(false)` means the module ran the transmit path but
/// did not get the frame out (no coverage, duty-cycle lockout).
pub trait LoRaWanDriver {
    fn join(&mut self) -> Result<(), RadioSendError>;
    fn send(&mut self, payload: &[u8]) -> Result<bool, RadioSendError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum JoinState {
    NotJoined,
    Joined,
}

/// Lazy-joining adapter from a [`LoRaWanDriver`] to the [`Radio`] port.
pub struct LoRaWanClient<D> {
    driver: D,
    join_state: JoinState,
}

impl<D> LoRaWanClient<D>
where
    D: LoRaWanDriver,
{
    pub fn new(driver: D) -> Self {
        LoRaWanClient {
            driver,
            join_state: JoinState::NotJoined,
        }
    }

    /// True once a join has succeeded in this process.
    pub fn is_joined(&self) -> bool {
        self.join_state == JoinState::Joined
    }

    fn ensure_joined(&mut self) -> Result<(), RadioSendError> {
        if self.join_state == JoinState::Joined {
            return Ok(());
        }
        // The flag flips only on success, so a failed join is retried on
        // the next send.
        self.driver.join()?;
        self.join_state = JoinState::Joined;
        log::info!("joined LoRaWAN network");
        Ok(())
    }
}

impl<D> Radio for LoRaWanClient<D>
where
    D: LoRaWanDriver,
{
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioSendError> {
        self.ensure_joined()?;
        if self.driver.send(payload)? {
            Ok(())
        } else {
            Err(RadioSendError("driver reported send failure".to_string()))
        }
    }
}
