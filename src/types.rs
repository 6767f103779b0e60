//! Shared primitive IDs and radio-related enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonic message log sequence number.
pub type EntrySeq = u64;
/// Reading pipe number (0..=5).
pub type PipeId = u8;

/// Width in bytes of every pipe address.
pub const ADDRESS_WIDTH: usize = 5;
/// Number of reading pipes the transceiver can listen on at once.
pub const READING_PIPES: usize = 6;
/// Largest payload the transceiver puts on the air.
pub const MAX_PAYLOAD_WIDTH: usize = 32;
/// Highest tunable RF channel.
pub const MAX_CHANNEL: u8 = 125;
/// Highest auto-retransmit delay, in 250µs units.
pub const MAX_RETRY_DELAY: u8 = 15;
/// Highest auto-retransmit count.
pub const MAX_RETRY_COUNT: u8 = 15;

/// Power amplifier level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerLevel {
    /// -18 dBm.
    Min,
    /// -12 dBm.
    Low,
    /// -6 dBm.
    High,
    /// 0 dBm.
    Max,
}

/// Air data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataRate {
    /// 250 kbps.
    Kbps250,
    /// 1 Mbps.
    Mbps1,
    /// 2 Mbps.
    Mbps2,
}

/// Packet CRC length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CrcMode {
    /// No CRC.
    Disabled,
    /// 8-bit CRC.
    Crc8,
    /// 16-bit CRC.
    #[default]
    Crc16,
}

/// Operating mode of the transceiver.
///
/// Listening and Writing are mutually exclusive. Standby sits between them
/// whenever the controller must touch configuration registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransceiverMode {
    /// Handle created, power-up not attempted yet.
    Uninitialized,
    /// Powered, neither receiving nor transmitting.
    Standby,
    /// Receiver enabled on the reading pipes.
    Listening,
    /// Transmitter enabled on the writing pipe.
    Writing,
    /// Power-up failed or the link was shut down. Terminal.
    Disconnected,
}

impl TransceiverMode {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: TransceiverMode) -> bool {
        use TransceiverMode::*;
        matches!(
            (self, next),
            (Uninitialized, Standby)
                | (Uninitialized, Disconnected)
                | (Standby, Listening)
                | (Standby, Writing)
                | (Standby, Disconnected)
                | (Listening, Standby)
                | (Listening, Writing)
                | (Writing, Listening)
                | (Writing, Standby)
        )
    }
}

impl fmt::Display for TransceiverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Standby => "standby",
            Self::Listening => "listening",
            Self::Writing => "writing",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Process-wide link status shown by front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    /// Hardware initialization has not finished.
    Initializing,
    /// Hardware is up and the receive loop is running.
    Connected,
    /// Hardware is unavailable.
    Disconnected {
        /// Human-readable cause.
        reason: String,
    },
}

impl LinkStatus {
    /// True only for [`LinkStatus::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Who produced a message log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Outbound payload.
    Sent,
    /// Inbound payload.
    Received,
    /// Link-manager notice.
    System,
}

/// Result recorded with a message log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Operation completed.
    Success,
    /// Operation failed.
    Failed,
    /// Inbound bytes were not valid text.
    CorruptPayload,
    /// Inbound command was not acted on.
    Ignored,
}

/// Result of a single transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SendOutcome {
    /// The write was acknowledged.
    Success,
    /// The write was not acknowledged or could not be issued.
    Failed,
}

impl From<SendOutcome> for Outcome {
    fn from(value: SendOutcome) -> Self {
        match value {
            SendOutcome::Success => Self::Success,
            SendOutcome::Failed => Self::Failed,
        }
    }
}
