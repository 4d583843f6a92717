//! Simulator wire protocol
//!
//! Length-prefixed msgpack maps exchanged over TCP. Every request names
//! its `type` and carries an `_id` that the reply echoes. See [`messages`]
//! for the request catalogue and [`codec`] for framing.

pub mod codec;
pub mod messages;

pub use messages::{Request, VehicleInfo};

/// Protocol version announced in the `Hello` handshake.
pub const PROTOCOL_VERSION: &str = "v1.21";
