use crate::error::ConfigError;
use crate::settings::Settings;

/// Check a [`Settings`] value, collecting every violation.
pub fn validate(settings: &Settings) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let defaults = &settings.defaults;

    for (field, value) in [
        ("defaults.path_ksh", defaults.path_ksh.as_str()),
        ("defaults.path_cat", defaults.path_cat.as_str()),
        ("defaults.path_mkfifo", defaults.path_mkfifo.as_str()),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                field: field.to_string(),
                message: "must not be empty".to_string(),
            });
        }
    }

    if defaults.path_pkill.as_deref().is_some_and(|p| p.trim().is_empty()) {
        errors.push(ConfigError::Validation {
            field: "defaults.path_pkill".to_string(),
            message: "must not be empty when set".to_string(),
        });
    }

    if let Some(file) = &settings.log.file {
        if file.file_name().is_none() {
            errors.push(ConfigError::Validation {
                field: "log.file".to_string(),
                message: format!("`{}` does not name a file", file.display()),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_settings_pass() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn empty_tool_path_rejected() {
        let mut settings = Settings::default();
        settings.defaults.path_ksh = String::new();
        let errs = validate(&settings).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].to_string().contains("defaults.path_ksh"));
    }

    #[test]
    fn blank_pkill_rejected_but_unset_allowed() {
        let mut settings = Settings::default();
        settings.defaults.path_pkill = Some(" ".into());
        assert!(validate(&settings).is_err());

        settings.defaults.path_pkill = None;
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn log_file_must_name_a_file() {
        let mut settings = Settings::default();
        settings.log.file = Some(PathBuf::from("/"));
        let errs = validate(&settings).unwrap_err();
        assert!(errs[0].to_string().contains("log.file"));
    }

    #[test]
    fn all_errors_reported() {
        let mut settings = Settings::default();
        settings.defaults.path_cat = String::new();
        settings.defaults.path_mkfifo = String::new();
        settings.log.file = Some(PathBuf::from("/"));
        assert_eq!(validate(&settings).unwrap_err().len(), 3);
    }
}
