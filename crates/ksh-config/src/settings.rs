use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::launch::TerminalKind;

/// Log verbosity level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug messages.
    Debug,
    /// Informational messages (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing-subscriber`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Adapter log settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Minimum level written to the log file.
    #[serde(default)]
    pub level: LogLevel,
    /// Log file location; the platform default when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Tool locations used when a launch request leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefaults {
    /// Shell that runs kshdb and helper scripts.
    #[serde(default = "default_ksh")]
    pub path_ksh: String,
    /// kshdb entry script; the bundled copy when unset.
    #[serde(default)]
    pub path_kshdb: Option<PathBuf>,
    /// kshdb library directory; the bundled copy when unset.
    #[serde(default)]
    pub path_kshdb_lib: Option<PathBuf>,
    #[serde(default = "default_cat")]
    pub path_cat: String,
    #[serde(default = "default_mkfifo")]
    pub path_mkfifo: String,
    /// Resolved per platform when unset.
    #[serde(default)]
    pub path_pkill: Option<String>,
    /// Where the debuggee runs.
    #[serde(default)]
    pub terminal_kind: TerminalKind,
}

fn default_ksh() -> String {
    "ksh".to_string()
}

fn default_cat() -> String {
    "cat".to_string()
}

fn default_mkfifo() -> String {
    "mkfifo".to_string()
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            path_ksh: default_ksh(),
            path_kshdb: None,
            path_kshdb_lib: None,
            path_cat: default_cat(),
            path_mkfifo: default_mkfifo(),
            path_pkill: None,
            terminal_kind: TerminalKind::default(),
        }
    }
}

/// Top-level adapter settings, read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub defaults: ToolDefaults,
}
