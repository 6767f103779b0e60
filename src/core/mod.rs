//! In-memory building blocks with no hardware or runtime dependency.

/// Payload decoding and truncation.
pub mod codec;
/// Remote-control command parsing.
pub mod command;
/// Bounded message log.
pub mod log;
