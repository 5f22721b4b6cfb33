//! Adapter side of the Debug Adapter Protocol.
//!
//! This crate holds the message types exchanged with a debugging client,
//! Content-Length framing, and the async reader/writer pair that moves
//! framed messages over the adapter's stdin/stdout.

pub mod error;
pub mod protocol;
pub mod transport;

// Re-export key types for convenience.
pub use error::DapError;
pub use protocol::*;
pub use transport::{write_loop, DapSender, Incoming, MessageReader};
