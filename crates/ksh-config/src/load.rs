use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::settings::Settings;
use crate::validate::validate;

/// Written into a newly created settings file.
const DEFAULT_SETTINGS_CONTENT: &str = r#"# ksh-debug adapter settings
# Uncomment and edit to override the built-in defaults.
# Values given in launch.json take precedence over [defaults].

# [log]
# level = "info"
# file = "/tmp/ksh-debug.log"

# [defaults]
# path_ksh = "ksh"
# path_cat = "cat"
# path_mkfifo = "mkfifo"
# path_pkill = "pkill"
# terminal_kind = "debugConsole"
"#;

/// `~/.config/ksh-debug`, if a home directory can be found.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("ksh-debug"))
}

/// Load `config_dir/config.toml`, creating a commented template when it is
/// missing, and validate the result.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O, parse or validation failure.
pub fn load_settings(config_dir: &Path) -> Result<Settings, ConfigError> {
    let path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)?;
    }
    if !path.exists() {
        std::fs::write(&path, DEFAULT_SETTINGS_CONTENT)
            .map_err(|e| ConfigError::CreateDefault(e.to_string()))?;
        tracing::info!("Created default settings at {}", path.display());
    }

    let content = std::fs::read_to_string(&path)?;
    if !has_non_comment_content(&content) {
        return Ok(Settings::default());
    }
    load_from_str(&content)
}

/// Parse and validate settings from a TOML string.
///
/// # Errors
///
/// Returns the first parse or validation error.
pub fn load_from_str(toml_str: &str) -> Result<Settings, ConfigError> {
    let settings: Settings =
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate(&settings).map_err(|errors| {
        errors
            .into_iter()
            .next()
            .unwrap_or_else(|| ConfigError::Validation {
                field: "unknown".to_string(),
                message: "validation failed".to_string(),
            })
    })?;

    Ok(settings)
}

fn has_non_comment_content(content: &str) -> bool {
    content.lines().any(|l| {
        let trimmed = l.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::TerminalKind;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_and_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("ksh-debug");

        let settings = load_settings(&dir).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(dir.join("config.toml").exists());
    }

    #[test]
    fn existing_file_is_read() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[defaults]\npath_ksh = \"/bin/ksh93\"\nterminal_kind = \"external\"\n",
        )
        .unwrap();

        let settings = load_settings(tmp.path()).unwrap();
        assert_eq!(settings.defaults.path_ksh, "/bin/ksh93");
        assert_eq!(settings.defaults.terminal_kind, TerminalKind::External);
        assert_eq!(settings.defaults.path_cat, "cat");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        assert!(matches!(load_from_str("{{bad"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = load_from_str("[defaults]\npath_ksh = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn template_is_comment_only() {
        assert!(!has_non_comment_content(DEFAULT_SETTINGS_CONTENT));
        assert!(has_non_comment_content("# x\n[log]\n"));
    }
}
