use ksh_config::ConfigError;
use ksh_dap::DapError;
use thiserror::Error;

use crate::validate::ValidationError;

/// Errors raised while serving a request against the debugger.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A helper process could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the debugger failed.
    #[error("debugger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session is shutting down; no more output will arrive.
    #[error("debug session is closing")]
    SessionClosed,

    /// A request that needs the debugger arrived before `launch`.
    #[error("no program has been launched")]
    NotLaunched,

    /// `launch` was sent twice.
    #[error("a program has already been launched in this session")]
    AlreadyLaunched,

    /// The launch configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The host environment cannot run the debugger.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The client channel failed.
    #[error(transparent)]
    Dap(#[from] DapError),
}
