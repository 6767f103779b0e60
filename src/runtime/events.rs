//! Runtime event stream payloads.

use crate::{config::RadioConfig, core::log::MessageEntry, types::LinkStatus};

/// Events broadcast by the link manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// An entry was appended to the message log.
    Logged(MessageEntry),
    /// The link status changed.
    StatusChanged(LinkStatus),
    /// A new radio configuration is live on the hardware.
    ConfigApplied(Box<RadioConfig>),
}
