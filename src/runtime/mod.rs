//! Link runtime: hardware arbitration, receive loop and public handle.

/// Mode state machine and exclusive hardware access.
pub mod controller;
/// Event stream types emitted by the runtime.
pub mod events;
/// Handle, send path, receive loop and command dispatch.
pub mod handle;
