//! Log file location, rotation and level selection.
//!
//! The subscriber itself is installed by the adapter binary; stdout carries
//! the protocol stream, so all logging goes to a file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::settings::LogSettings;

/// Rotate once the log grows past this many bytes.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated files kept beside the active one.
pub const MAX_LOG_FILES: u32 = 5;

/// Environment variable that overrides the configured level.
pub const LOG_ENV: &str = "KSH_DEBUG_LOG";

/// Platform default log file.
///
/// * macOS: `$HOME/Library/Logs/ksh-debug/ksh-debug.log`
/// * Windows: `%APPDATA%\ksh-debug\logs\ksh-debug.log`
/// * elsewhere: `$HOME/.local/share/ksh-debug/ksh-debug.log`
pub fn default_log_file_path() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            return home.join("Library/Logs/ksh-debug/ksh-debug.log");
        }
    }
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("ksh-debug\\logs\\ksh-debug.log");
        }
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".local/share/ksh-debug/ksh-debug.log");
    }
    std::env::temp_dir().join("ksh-debug").join("ksh-debug.log")
}

/// The configured log file, or the platform default.
pub fn log_file_path(settings: &LogSettings) -> PathBuf {
    settings.file.clone().unwrap_or_else(default_log_file_path)
}

pub fn ensure_log_dir(log_path: &Path) -> io::Result<()> {
    match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Shift `ksh-debug.log` to `.1`, `.1` to `.2` and so on once the active
/// file reaches `max_size`. The file at index `max_files` is dropped.
pub fn rotate_log_files(log_path: &Path, max_size: u64, max_files: u32) -> io::Result<()> {
    let len = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if len < max_size {
        return Ok(());
    }

    let oldest = rotated_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..max_files).rev() {
        let from = rotated_path(log_path, index);
        if from.exists() {
            fs::rename(&from, rotated_path(log_path, index + 1))?;
        }
    }
    fs::rename(log_path, rotated_path(log_path, 1))
}

/// Filter directive for the subscriber.
///
/// A non-empty `env_value` (from [`LOG_ENV`]) wins over the settings file.
/// Unknown names fall back to `info`.
pub fn effective_filter(env_value: Option<&str>, settings: &LogSettings) -> &'static str {
    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(level) => level_to_filter(level),
        None => settings.level.as_filter(),
    }
}

fn level_to_filter(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let name = base.file_name().unwrap_or_default().to_string_lossy();
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{name}.{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LogLevel;

    #[test]
    fn default_path_is_a_ksh_debug_log() {
        let path = default_log_file_path();
        assert!(path.to_string_lossy().contains("ksh-debug"));
        assert!(path.extension().is_some_and(|e| e == "log"));
    }

    #[test]
    fn configured_file_overrides_default() {
        let settings = LogSettings {
            level: LogLevel::Info,
            file: Some(PathBuf::from("/var/tmp/adapter.log")),
        };
        assert_eq!(log_file_path(&settings), PathBuf::from("/var/tmp/adapter.log"));
    }

    #[test]
    fn rotate_ignores_missing_and_small_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("ksh-debug.log");
        rotate_log_files(&log, MAX_LOG_SIZE, MAX_LOG_FILES).unwrap();

        fs::write(&log, "short").unwrap();
        rotate_log_files(&log, MAX_LOG_SIZE, MAX_LOG_FILES).unwrap();
        assert!(log.exists());
    }

    #[test]
    fn rotate_cascades_and_drops_oldest() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("ksh-debug.log");
        fs::write(dir.path().join("ksh-debug.log.1"), "old1").unwrap();
        fs::write(dir.path().join("ksh-debug.log.2"), "old2").unwrap();
        fs::write(&log, "x".repeat(64)).unwrap();

        rotate_log_files(&log, 32, 2).unwrap();

        assert!(!log.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("ksh-debug.log.1")).unwrap(),
            "x".repeat(64)
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("ksh-debug.log.2")).unwrap(),
            "old1"
        );
        assert!(!dir.path().join("ksh-debug.log.3").exists());
    }

    #[test]
    fn ensure_log_dir_creates_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("a").join("b").join("ksh-debug.log");
        ensure_log_dir(&log).unwrap();
        ensure_log_dir(&log).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn env_level_wins_over_settings() {
        let settings = LogSettings {
            level: LogLevel::Warn,
            file: None,
        };
        assert_eq!(effective_filter(Some("DEBUG"), &settings), "debug");
        assert_eq!(effective_filter(Some("  "), &settings), "warn");
        assert_eq!(effective_filter(None, &settings), "warn");
        assert_eq!(effective_filter(Some("verbose"), &settings), "info");
    }
}
