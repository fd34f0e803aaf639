//! The `mkv-subset.toml` settings file.
//!
//! One TOML table per [`ConfigSection`]. [`ConfigManager`] validates on load,
//! fills in missing keys, and rewrites single sections without touching the
//! rest of the file.
//!
//! ```no_run
//! use mkvsub_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new("mkv-subset.toml");
//! config.load_or_create()?;
//!
//! config.settings_mut().subset.strict_font_match = true;
//! config.update_section(ConfigSection::Subset)?;
//! # Ok::<(), mkvsub_core::config::ConfigError>(())
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, LoggingSettings, MuxSettings, PathSettings, Settings, SubsetSettings,
    ToolSettings,
};
