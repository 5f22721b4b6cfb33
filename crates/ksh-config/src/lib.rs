//! Launch configuration, adapter settings and logging helpers.

pub mod error;
pub mod launch;
pub mod load;
pub mod logging;
pub mod paths;
pub mod settings;
pub mod validate;

pub use error::ConfigError;
pub use launch::{LaunchConfig, ResolveContext, TerminalKind};
pub use load::{default_config_dir, load_from_str, load_settings};
pub use settings::{LogSettings, Settings, ToolDefaults};
