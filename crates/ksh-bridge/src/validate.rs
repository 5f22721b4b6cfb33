//! Pre-launch check that the debugger can run on this host.
//!
//! A probe script is run through the configured shell; its exit status
//! names the first missing piece.

use std::process::Stdio;
use std::time::Duration;

use ksh_config::LaunchConfig;
use thiserror::Error;

use crate::spawn;

/// How long the probe may run.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const REPORT_REQUEST: &str =
    "If it is reproducible, please report it to https://github.com/rogalmic/vscode-ksh-debug/issues.";

/// Why the environment cannot run the debugger. Each message ends with
/// whatever the probe wrote to stderr.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Error: cwd ({cwd}) does not exist.{}", trailer(.stderr))]
    CwdNotFound { cwd: String, stderr: String },

    #[error("Error: ksh not found. (pathKsh: {path}){}", trailer(.stderr))]
    KshNotFound { path: String, stderr: String },

    #[error("Error: kshdb not found. (pathKshdb: {path}){}", trailer(.stderr))]
    KshdbNotFound { path: String, stderr: String },

    #[error("Error: cat not found. (pathCat: {path}){}", trailer(.stderr))]
    CatNotFound { path: String, stderr: String },

    #[error("Error: mkfifo not found. (pathMkfifo: {path}){}", trailer(.stderr))]
    MkfifoNotFound { path: String, stderr: String },

    #[error("Error: pkill not found. (pathPkill: {path}){}", trailer(.stderr))]
    PkillNotFound { path: String, stderr: String },

    #[error("Error: BUG: timeout while validating environment. {}{}", REPORT_REQUEST, trailer(.stderr))]
    Timeout { stderr: String },

    #[error("Error: Cannot chmod +x internal kshdb copy.{}", trailer(.stderr))]
    CannotChmod { stderr: String },

    #[error("Error: Only ksh versions 4.* are supported.{}", trailer(.stderr))]
    UnsupportedKshVersion { stderr: String },

    #[error(
        "Error: BUG: unknown error ocurred while validating environment. {}{}",
        REPORT_REQUEST,
        trailer(.stderr)
    )]
    Unknown { stderr: String },

    #[error(
        "Error: BUG: reached to unreachable code while validating environment (code {}). {}{}",
        display_code(.code),
        REPORT_REQUEST,
        trailer(.stderr)
    )]
    UnrecognizedStatus { code: Option<i32>, stderr: String },
}

fn trailer(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!("\n\n{stderr}")
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Exit statuses the probe script uses.
mod status {
    pub const SUCCESS: i32 = 0;
    pub const CWD: i32 = 1;
    pub const KSH: i32 = 2;
    pub const KSHDB: i32 = 3;
    pub const CAT: i32 = 4;
    pub const MKFIFO: i32 = 5;
    pub const PKILL: i32 = 6;
    pub const TIMEOUT: i32 = 7;
    pub const CHMOD: i32 = 8;
    pub const VERSION: i32 = 9;
    pub const UNKNOWN: i32 = 10;
}

/// Shell text that exits with the status of the first failing check.
pub fn probe_script(config: &LaunchConfig) -> String {
    let mut script = String::new();
    if config.path_kshdb.find("kshdb_dir").is_some_and(|i| i > 0) {
        script.push_str(&format!(
            "chmod +x \"{}\" || exit {};",
            config.path_kshdb,
            status::CHMOD
        ));
    }
    for (path, code) in [
        (&config.path_kshdb, status::KSHDB),
        (&config.path_cat, status::CAT),
        (&config.path_mkfifo, status::MKFIFO),
        (&config.path_pkill, status::PKILL),
    ] {
        script.push_str(&format!("type \"{path}\" || exit {code};"));
    }
    script.push_str(&format!(
        "test -d \"{}\" || exit {};",
        config.cwd_effective(),
        status::CWD
    ));
    script
}

/// Map a probe exit status to its error.
pub fn interpret(
    config: &LaunchConfig,
    code: Option<i32>,
    stderr: String,
) -> Result<(), ValidationError> {
    let err = match code {
        Some(status::SUCCESS) => return Ok(()),
        Some(status::CWD) => ValidationError::CwdNotFound {
            cwd: config.cwd_effective(),
            stderr,
        },
        Some(status::KSH) => ValidationError::KshNotFound {
            path: config.path_ksh.clone(),
            stderr,
        },
        Some(status::KSHDB) => ValidationError::KshdbNotFound {
            path: config.path_kshdb.clone(),
            stderr,
        },
        Some(status::CAT) => ValidationError::CatNotFound {
            path: config.path_cat.clone(),
            stderr,
        },
        Some(status::MKFIFO) => ValidationError::MkfifoNotFound {
            path: config.path_mkfifo.clone(),
            stderr,
        },
        Some(status::PKILL) => ValidationError::PkillNotFound {
            path: config.path_pkill.clone(),
            stderr,
        },
        Some(status::TIMEOUT) => ValidationError::Timeout { stderr },
        Some(status::CHMOD) => ValidationError::CannotChmod { stderr },
        Some(status::VERSION) => ValidationError::UnsupportedKshVersion { stderr },
        Some(status::UNKNOWN) => ValidationError::Unknown { stderr },
        other => ValidationError::UnrecognizedStatus {
            code: other,
            stderr,
        },
    };
    Err(err)
}

/// Run the probe with the default timeout.
pub async fn validate_environment(config: &LaunchConfig) -> Result<(), ValidationError> {
    validate_with_timeout(config, PROBE_TIMEOUT).await
}

pub async fn validate_with_timeout(
    config: &LaunchConfig,
    limit: Duration,
) -> Result<(), ValidationError> {
    let mut command = spawn::script_command(&config.path_ksh, &probe_script(config));
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(limit, command.output()).await {
        Err(_) => {
            return Err(ValidationError::Timeout {
                stderr: String::new(),
            })
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ValidationError::KshNotFound {
                path: config.path_ksh.clone(),
                stderr: String::new(),
            })
        }
        Ok(Err(e)) => {
            tracing::warn!("environment probe failed to start: {e}");
            return Err(ValidationError::Unknown {
                stderr: String::new(),
            });
        }
        Ok(Ok(output)) => output,
    };

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    tracing::debug!(status = ?output.status, "environment probe finished");
    interpret(config, output.status.code(), stderr)
}
