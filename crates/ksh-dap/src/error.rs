//! DAP error types.

use thiserror::Error;

/// Errors from the client-facing protocol layer.
#[derive(Debug, Error)]
pub enum DapError {
    /// I/O failure on the client channel.
    #[error("client channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level framing error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The client sent a message that is not valid DAP.
    #[error("client sent invalid message: {0}")]
    InvalidMessage(String),

    /// A request carried arguments that do not match its command.
    #[error("invalid arguments for '{command}': {message}")]
    InvalidArguments {
        /// The command whose arguments failed to parse.
        command: String,
        /// The deserialization error.
        message: String,
    },

    /// The outbound channel to the client has been closed.
    #[error("client channel closed")]
    ChannelClosed,
}
