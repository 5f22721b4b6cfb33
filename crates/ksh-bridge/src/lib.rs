//! Drives a `kshdb` REPL on behalf of a DAP client.
//!
//! Requests are serialized onto the debugger's single command channel,
//! replies are delimited with a sentinel line the debugger prints itself,
//! and the unstructured text in between is parsed back into DAP types.

pub mod command;
pub mod error;
pub mod events;
pub mod line_log;
pub mod parse;
pub mod registry;
pub mod session;
pub mod signal;
pub mod spawn;
pub mod validate;

pub use error::BridgeError;
pub use session::DebugSession;
pub use validate::ValidationError;

/// The only thread the adapter reports.
pub const THREAD_ID: i64 = 42;
