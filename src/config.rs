//! Radio configuration record, pipe addresses, and runtime settings.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::types::{
    ADDRESS_WIDTH, CrcMode, DataRate, MAX_CHANNEL, MAX_PAYLOAD_WIDTH, MAX_RETRY_COUNT,
    MAX_RETRY_DELAY, PowerLevel, READING_PIPES,
};

/// Channel the radio tunes to when no configuration has been saved.
pub const DEFAULT_CHANNEL: u8 = 76;
/// Default auto-retransmit delay, in 250µs units.
pub const DEFAULT_RETRY_DELAY: u8 = 5;
/// Default auto-retransmit count.
pub const DEFAULT_RETRY_COUNT: u8 = 15;
/// Default writing pipe name.
pub const DEFAULT_WRITING_ADDRESS: &str = "2Node";
/// Default reading pipe names, slot 0 first.
pub const DEFAULT_READING_ADDRESSES: [&str; READING_PIPES] =
    ["1Node", "2Node", "3Node", "4Node", "5Node", "6Node"];

/// A field of [`RadioConfig`] outside its hardware range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Channel above [`MAX_CHANNEL`].
    #[error("channel {0} out of range 0..=125")]
    ChannelOutOfRange(u8),
    /// Retry delay above [`MAX_RETRY_DELAY`].
    #[error("retry delay {0} out of range 0..=15")]
    RetryDelayOutOfRange(u8),
    /// Retry count above [`MAX_RETRY_COUNT`].
    #[error("retry count {0} out of range 0..=15")]
    RetryCountOutOfRange(u8),
}

/// Fixed-width pipe address.
///
/// Serialized as a string when the bytes are printable ASCII followed only
/// by NUL padding, otherwise as a byte array.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AddressRepr", into = "AddressRepr")]
pub struct Address([u8; ADDRESS_WIDTH]);

impl Address {
    /// Wraps raw address bytes.
    pub const fn new(bytes: [u8; ADDRESS_WIDTH]) -> Self {
        Self(bytes)
    }

    /// Builds an address from a textual pipe name, NUL-padding or truncating
    /// to [`ADDRESS_WIDTH`].
    pub fn from_name(name: &str) -> Self {
        let mut bytes = [0u8; ADDRESS_WIDTH];
        let src = name.as_bytes();
        let n = src.len().min(ADDRESS_WIDTH);
        bytes[..n].copy_from_slice(&src[..n]);
        Self(bytes)
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_WIDTH] {
        &self.0
    }

    fn unpadded(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |i| i + 1);
        &self.0[..end]
    }

    fn as_name(&self) -> Option<&str> {
        let bytes = self.unpadded();
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            std::str::from_utf8(bytes).ok()
        } else {
            None
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_name() {
            Some(name) => write!(f, "Address({name:?})"),
            None => write!(f, "Address({:02x?})", self.0),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Name(String),
    Bytes(Vec<u8>),
}

impl From<Address> for AddressRepr {
    fn from(value: Address) -> Self {
        match value.as_name() {
            Some(name) => Self::Name(name.to_string()),
            None => Self::Bytes(value.0.to_vec()),
        }
    }
}

impl TryFrom<AddressRepr> for Address {
    type Error = String;

    fn try_from(value: AddressRepr) -> Result<Self, Self::Error> {
        match value {
            AddressRepr::Name(name) => Ok(Self::from_name(&name)),
            AddressRepr::Bytes(bytes) => {
                let arr: [u8; ADDRESS_WIDTH] = bytes.as_slice().try_into().map_err(|_| {
                    format!("address must be {ADDRESS_WIDTH} bytes, got {}", bytes.len())
                })?;
                Ok(Self(arr))
            }
        }
    }
}

/// Complete transceiver configuration. Always read and applied as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Power amplifier level.
    pub power_level: PowerLevel,
    /// Air data rate.
    pub data_rate: DataRate,
    /// CRC length.
    #[serde(default)]
    pub crc_mode: CrcMode,
    /// RF channel, 0..=125.
    pub channel: u8,
    /// Auto-retransmit delay in 250µs units, 0..=15.
    pub retry_delay: u8,
    /// Auto-retransmit count, 0..=15.
    pub retry_count: u8,
    /// Variable-length packets.
    pub dynamic_payloads: bool,
    /// Hardware auto-acknowledgement.
    pub auto_ack: bool,
    /// Payloads attached to acknowledgements.
    #[serde(default = "default_true")]
    pub ack_payloads: bool,
    /// Address written to.
    pub writing_address: Address,
    /// Addresses listened on, pipe 0 first.
    pub reading_addresses: [Address; READING_PIPES],
    /// Whether inbound `/` commands are interpreted.
    pub remote_control: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            power_level: PowerLevel::Low,
            data_rate: DataRate::Mbps1,
            crc_mode: CrcMode::Crc16,
            channel: DEFAULT_CHANNEL,
            retry_delay: DEFAULT_RETRY_DELAY,
            retry_count: DEFAULT_RETRY_COUNT,
            dynamic_payloads: true,
            auto_ack: true,
            ack_payloads: true,
            writing_address: Address::from_name(DEFAULT_WRITING_ADDRESS),
            reading_addresses: DEFAULT_READING_ADDRESSES.map(Address::from_name),
            remote_control: false,
        }
    }
}

impl RadioConfig {
    /// Checks every ranged field against the hardware limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel > MAX_CHANNEL {
            return Err(ConfigError::ChannelOutOfRange(self.channel));
        }
        if self.retry_delay > MAX_RETRY_DELAY {
            return Err(ConfigError::RetryDelayOutOfRange(self.retry_delay));
        }
        if self.retry_count > MAX_RETRY_COUNT {
            return Err(ConfigError::RetryCountOutOfRange(self.retry_count));
        }
        Ok(())
    }

    /// Copy of this record with only the channel replaced.
    pub fn with_channel(&self, channel: u8) -> Self {
        Self {
            channel,
            ..self.clone()
        }
    }
}

/// Runtime settings of the link manager itself (not persisted).
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Receive loop cadence.
    pub poll_interval: Duration,
    /// Deadline for every individual hardware call.
    pub hardware_timeout: Duration,
    /// Outbound payloads are truncated to this many bytes.
    pub max_payload: usize,
    /// Message log entries kept before the oldest is dropped.
    pub log_capacity: usize,
    /// Capacity of the [`crate::runtime::events::LinkEvent`] broadcast channel.
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            hardware_timeout: Duration::from_secs(1),
            max_payload: MAX_PAYLOAD_WIDTH,
            log_capacity: 500,
            event_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_nul_padded() {
        assert_eq!(Address::from_name("ab").as_bytes(), b"ab\0\0\0");
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(Address::from_name("1NodeXYZ").as_bytes(), b"1Node");
    }

    #[test]
    fn default_record_is_valid() {
        let cfg = RadioConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.channel, 76);
        assert_eq!(cfg.writing_address, Address::from_name("2Node"));
        assert_eq!(cfg.reading_addresses[5], Address::from_name("6Node"));
        assert!(!cfg.remote_control);
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut cfg = RadioConfig::default();
        cfg.channel = 126;
        assert_eq!(cfg.validate(), Err(ConfigError::ChannelOutOfRange(126)));

        let mut cfg = RadioConfig::default();
        cfg.retry_delay = 16;
        assert_eq!(cfg.validate(), Err(ConfigError::RetryDelayOutOfRange(16)));

        let mut cfg = RadioConfig::default();
        cfg.retry_count = 200;
        assert_eq!(cfg.validate(), Err(ConfigError::RetryCountOutOfRange(200)));
    }

    #[test]
    fn printable_addresses_serialize_as_names() {
        let json = serde_json::to_string(&Address::from_name("2Node")).expect("ser");
        assert_eq!(json, "\"2Node\"");

        let raw = Address::new([0xE7, 0xE7, 0x00, 0xE7, 0xE7]);
        let json = serde_json::to_string(&raw).expect("ser");
        assert_eq!(json, "[231,231,0,231,231]");
        let back: Address = serde_json::from_str(&json).expect("de");
        assert_eq!(back, raw);
    }

    #[test]
    fn byte_addresses_must_be_full_width() {
        let err = serde_json::from_str::<Address>("[1,2,3]");
        assert!(err.is_err());
    }
}
