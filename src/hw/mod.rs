//! Hardware capability trait for an nRF24-class transceiver.
//!
//! The [`Transceiver`] trait is the only way the link manager touches the
//! radio. A driver for real hardware implements it on top of its SPI and
//! GPIO access; [`mock::MockTransceiver`] implements it in memory so the
//! controller, receive loop and command handling can be exercised without a
//! radio attached.
//!
//! Methods are individual register-level steps. Sequencing them (which
//! order, which mode the chip must be in) is the job of
//! [`crate::runtime::controller::ModeController`].

pub mod mock;

use async_trait::async_trait;

use crate::{
    config::{Address, ConfigError},
    types::{CrcMode, DataRate, PipeId, PowerLevel, TransceiverMode},
};

/// Failure talking to the transceiver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// The chip did not acknowledge power-up.
    #[error("radio hardware is not responding")]
    NotResponding,
    /// A hardware call overran its deadline.
    #[error("radio hardware call timed out")]
    Timeout,
    /// The link is not connected, so the hardware was not touched.
    #[error("radio is not initialized")]
    NotInitialized,
    /// The mode state machine forbids this step.
    #[error("invalid mode transition {from} -> {to}")]
    InvalidTransition {
        /// Mode before the attempted step.
        from: TransceiverMode,
        /// Mode the step would have entered.
        to: TransceiverMode,
    },
    /// The record was rejected before any register was written.
    #[error("invalid radio config: {0}")]
    InvalidConfig(#[from] ConfigError),
    /// Driver-specific failure.
    #[error("radio device error: {0}")]
    Device(String),
}

/// Convenience alias for hardware results.
pub type HwResult<T> = Result<T, HardwareError>;

/// One packet pulled from the receive FIFO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    /// Reading pipe the packet arrived on.
    pub pipe: PipeId,
    /// Payload bytes, already cut to the dynamic payload length.
    pub payload: Vec<u8>,
}

impl RawPacket {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True for a zero-length payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Register-level operations of a half-duplex packet radio.
#[async_trait]
pub trait Transceiver: Send {
    /// Power the chip up. [`HardwareError::NotResponding`] when it does not answer.
    async fn power_up(&mut self) -> HwResult<()>;

    /// Power the chip down.
    async fn power_down(&mut self) -> HwResult<()>;

    /// Set the power amplifier level.
    async fn set_power_level(&mut self, level: PowerLevel) -> HwResult<()>;

    /// Set the air data rate.
    async fn set_data_rate(&mut self, rate: DataRate) -> HwResult<()>;

    /// Tune to `channel` (0..=125).
    async fn set_channel(&mut self, channel: u8) -> HwResult<()>;

    /// Set CRC length.
    async fn set_crc_mode(&mut self, mode: CrcMode) -> HwResult<()>;

    /// Set auto-retransmit delay (250µs units) and count.
    async fn set_retries(&mut self, delay: u8, count: u8) -> HwResult<()>;

    /// Enable or disable dynamic payload lengths.
    async fn set_dynamic_payloads(&mut self, enabled: bool) -> HwResult<()>;

    /// Enable or disable auto-acknowledgement on all pipes.
    async fn set_auto_ack(&mut self, enabled: bool) -> HwResult<()>;

    /// Enable or disable payloads carried in acknowledgements.
    async fn set_ack_payloads(&mut self, enabled: bool) -> HwResult<()>;

    /// Set the transmit address.
    async fn open_writing_pipe(&mut self, address: &Address) -> HwResult<()>;

    /// Set the receive address of `pipe` (0..=5).
    async fn open_reading_pipe(&mut self, pipe: PipeId, address: &Address) -> HwResult<()>;

    /// Enter receive mode.
    async fn start_listening(&mut self) -> HwResult<()>;

    /// Leave receive mode.
    async fn stop_listening(&mut self) -> HwResult<()>;

    /// Transmit one payload. `Ok(false)` means no acknowledgement after all retries.
    async fn write(&mut self, payload: &[u8]) -> HwResult<bool>;

    /// Pipe of the next queued packet, if any.
    async fn available(&mut self) -> HwResult<Option<PipeId>>;

    /// Pop the next queued packet, cut to its dynamic payload length.
    async fn read(&mut self) -> HwResult<Vec<u8>>;
}
