//! Link manager for an nRF24-class half-duplex packet radio.
//!
//! A single [`runtime::controller::ModeController`] owns the transceiver and
//! serializes every hardware call. [`runtime::handle::LinkHandle`] sits on
//! top: it polls for packets, answers remote commands, sends text and keeps a
//! bounded message log. The radio configuration is stored as one JSON record.
//!
//! # Examples
//!
//! Parsing a remote command:
//! ```
//! use rflink::core::command::RemoteCommand;
//!
//! assert_eq!(RemoteCommand::parse("/c 40"), Some(RemoteCommand::SetChannel(40)));
//! assert_eq!(RemoteCommand::parse("/c 126"), None);
//! ```
//!
//! Running a link against the in-memory transceiver:
//! ```
//! use std::sync::Arc;
//!
//! use rflink::{
//!     config::LinkConfig,
//!     hw::mock::MockTransceiver,
//!     persist::json::JsonFileStore,
//!     runtime::handle::spawn_link,
//!     types::{LinkStatus, SendOutcome},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let dir = tempfile::tempdir().expect("tempdir");
//! let store = Arc::new(JsonFileStore::new(dir.path().join("radio.json")));
//! let (radio, mock) = MockTransceiver::new();
//!
//! let link = spawn_link(Box::new(radio), store, LinkConfig::default()).await;
//! assert_eq!(link.status(), LinkStatus::Connected);
//!
//! assert_eq!(link.send("hello").await, SendOutcome::Success);
//! assert_eq!(mock.tx_history(), vec![b"hello".to_vec()]);
//! link.shutdown().await.expect("shutdown");
//! # }
//! ```
#![warn(missing_docs)]

/// Radio and link configuration records.
pub mod config;
/// Codec, command parser and message log.
pub mod core;
/// Transceiver capability trait and in-memory implementation.
pub mod hw;
/// Configuration persistence.
pub mod persist;
/// Hardware arbitration, receive loop and public handle.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;
