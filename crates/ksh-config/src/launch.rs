//! Resolution of `launch` request arguments into a [`LaunchConfig`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::paths;
use crate::settings::ToolDefaults;

/// Keys that were renamed, with the key that replaced them.
const DEPRECATED_KEYS: &[(&str, &str)] = &[
    ("kshDbPath", "pathKshdb"),
    ("kshPath", "pathKsh"),
    ("commandLineArguments", "args"),
    ("scriptPath", "program"),
];

/// Where the debugged program's terminal lives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminalKind {
    /// The client's integrated terminal, via `runInTerminal`.
    Integrated,
    /// An external terminal window, via `runInTerminal`.
    External,
    /// A background shell whose output becomes `output` events.
    #[default]
    DebugConsole,
}

impl TerminalKind {
    /// Value of the `kind` argument of a `runInTerminal` request, if this
    /// kind goes through the client at all.
    pub fn run_in_terminal_kind(self) -> Option<&'static str> {
        match self {
            TerminalKind::Integrated => Some("integrated"),
            TerminalKind::External => Some("external"),
            TerminalKind::DebugConsole => None,
        }
    }
}

/// Host facts used to fill in launch attributes the client left out.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Install root of the adapter; the bundled kshdb lives in
    /// `<adapter_dir>/kshdb_dir`.
    pub adapter_dir: PathBuf,
    /// Default working directory of the debuggee.
    pub workspace_dir: PathBuf,
    /// Tool defaults from the settings file.
    pub defaults: ToolDefaults,
}

impl ResolveContext {
    /// Build a context from the running executable and process directory.
    pub fn from_environment(defaults: ToolDefaults) -> Result<Self, ConfigError> {
        let exe = std::env::current_exe()?;
        let adapter_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let workspace_dir = std::env::current_dir()?;
        Ok(Self {
            adapter_dir,
            workspace_dir,
            defaults,
        })
    }
}

/// Attributes of a `launch` request as the client sent them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawLaunch {
    program: Option<String>,
    args: Option<Vec<String>>,
    env: Option<BTreeMap<String, String>>,
    cwd: Option<String>,
    path_ksh: Option<String>,
    path_kshdb: Option<String>,
    path_kshdb_lib: Option<String>,
    path_cat: Option<String>,
    path_mkfifo: Option<String>,
    path_pkill: Option<String>,
    terminal_kind: Option<TerminalKind>,
    show_debug_output: Option<bool>,
    trace: Option<bool>,
}

/// A fully resolved launch configuration. Every tool path is filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: String,
    pub path_ksh: String,
    pub path_kshdb: String,
    pub path_kshdb_lib: String,
    pub path_cat: String,
    pub path_mkfifo: String,
    pub path_pkill: String,
    pub terminal_kind: TerminalKind,
    /// Forward raw debugger output to the client.
    pub show_debug_output: bool,
    /// Log every command and line of the session.
    pub trace: bool,
}

impl LaunchConfig {
    /// Resolve raw `launch` arguments.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Deprecated`] when a retired key is present,
    /// [`ConfigError::MissingField`] when `program` is absent and
    /// [`ConfigError::Parse`] when an attribute has the wrong type.
    pub fn resolve(arguments: Value, ctx: &ResolveContext) -> Result<Self, ConfigError> {
        if let Some(object) = arguments.as_object() {
            for &(old, new) in DEPRECATED_KEYS {
                if object.get(old).is_some_and(is_set) {
                    return Err(ConfigError::Deprecated { old, new });
                }
            }
        }

        let raw: RawLaunch = if arguments.is_null() {
            RawLaunch::default()
        } else {
            serde_json::from_value(arguments).map_err(|e| ConfigError::Parse(e.to_string()))?
        };

        let program = raw
            .program
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingField("program"))?;

        let defaults = &ctx.defaults;
        let bundled_dir = ctx.adapter_dir.join("kshdb_dir");
        let path_kshdb = non_empty(raw.path_kshdb).unwrap_or_else(|| {
            let bundled = defaults
                .path_kshdb
                .clone()
                .unwrap_or_else(|| paths::absolutize(&bundled_dir.join("kshdb"), &ctx.adapter_dir));
            paths::to_debugger_path(&bundled.to_string_lossy())
        });
        let path_kshdb_lib = non_empty(raw.path_kshdb_lib).unwrap_or_else(|| {
            let bundled = defaults
                .path_kshdb_lib
                .clone()
                .unwrap_or_else(|| paths::absolutize(&bundled_dir, &ctx.adapter_dir));
            paths::to_debugger_path(&bundled.to_string_lossy())
        });
        let path_pkill = non_empty(raw.path_pkill)
            .or_else(|| defaults.path_pkill.clone())
            .unwrap_or_else(default_pkill);

        Ok(Self {
            program,
            args: raw.args.unwrap_or_default(),
            env: raw.env.unwrap_or_default(),
            cwd: non_empty(raw.cwd)
                .unwrap_or_else(|| ctx.workspace_dir.to_string_lossy().into_owned()),
            path_ksh: non_empty(raw.path_ksh).unwrap_or_else(|| defaults.path_ksh.clone()),
            path_kshdb,
            path_kshdb_lib,
            path_cat: non_empty(raw.path_cat).unwrap_or_else(|| defaults.path_cat.clone()),
            path_mkfifo: non_empty(raw.path_mkfifo)
                .unwrap_or_else(|| defaults.path_mkfifo.clone()),
            path_pkill,
            terminal_kind: raw.terminal_kind.unwrap_or(defaults.terminal_kind),
            show_debug_output: raw.show_debug_output.unwrap_or(false),
            trace: raw.trace.unwrap_or(false),
        })
    }

    /// Working directory as seen by the debugger.
    pub fn cwd_effective(&self) -> String {
        paths::to_debugger_path(&self.cwd)
    }

    /// Program path as seen by the debugger.
    pub fn program_effective(&self) -> String {
        paths::to_debugger_path(&self.program)
    }
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// `pkill` for this platform. Homebrew's pkill on macOS lacks the flags
/// the adapter relies on, so the system copy is preferred there.
fn default_pkill() -> String {
    if cfg!(target_os = "macos") {
        if let Ok(found) = which::which("pkill") {
            if found == Path::new("/usr/local/bin/pkill") {
                tracing::info!("using /usr/bin/pkill instead of /usr/local/bin/pkill");
                return "/usr/bin/pkill".to_string();
            }
        }
    }
    "pkill".to_string()
}
