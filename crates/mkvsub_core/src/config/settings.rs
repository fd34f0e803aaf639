//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use super::manager::{ConfigError, ConfigResult};
use crate::logging::LogLevel;

/// Upper bound for `logging.error_tail`.
const MAX_ERROR_TAIL: u32 = 1000;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool executables.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Font subset behaviour.
    #[serde(default)]
    pub subset: SubsetSettings,

    /// Remux defaults.
    #[serde(default)]
    pub mux: MuxSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Reject values no run could work with.
    pub fn validate(&self) -> ConfigResult<()> {
        let tools = [
            ("mkvmerge", &self.tools.mkvmerge),
            ("mkvextract", &self.tools.mkvextract),
            ("pyftsubset", &self.tools.pyftsubset),
            ("ttx", &self.tools.ttx),
        ];
        for (name, value) in tools {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("tools.{}", name),
                    "executable must not be empty",
                ));
            }
        }

        if self.paths.logs_folder.trim().is_empty() {
            return Err(ConfigError::invalid(
                "paths.logs_folder",
                "must not be empty",
            ));
        }

        // Passed to mkvmerge as `--language 0:<lang>`
        let language = &self.mux.default_language;
        if !language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::invalid(
                "mux.default_language",
                format!("'{}' is not a language code", language),
            ));
        }

        if self.logging.error_tail > MAX_ERROR_TAIL {
            return Err(ConfigError::invalid(
                "logging.error_tail",
                format!("at most {} lines", MAX_ERROR_TAIL),
            ));
        }
        Ok(())
    }
}

/// Path configuration for temp and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for batch workspaces. Empty means the system temp dir.
    #[serde(default)]
    pub temp_root: String,

    /// Folder for batch log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            temp_root: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// External tool executables (names resolved through PATH, or full paths).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_mkvmerge")]
    pub mkvmerge: String,

    #[serde(default = "default_mkvextract")]
    pub mkvextract: String,

    #[serde(default = "default_pyftsubset")]
    pub pyftsubset: String,

    #[serde(default = "default_ttx")]
    pub ttx: String,
}

fn default_mkvmerge() -> String {
    "mkvmerge".to_string()
}

fn default_mkvextract() -> String {
    "mkvextract".to_string()
}

fn default_pyftsubset() -> String {
    "pyftsubset".to_string()
}

fn default_ttx() -> String {
    "ttx".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            mkvmerge: default_mkvmerge(),
            mkvextract: default_mkvextract(),
            pyftsubset: default_pyftsubset(),
            ttx: default_ttx(),
        }
    }
}

/// Font subset configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsetSettings {
    /// Fail the pipeline when any referenced font family has no match.
    #[serde(default)]
    pub strict_font_match: bool,

    /// Keep the `.txt` glyph lists and `.ttx` dumps next to the output.
    #[serde(default)]
    pub keep_intermediates: bool,
}

/// Defaults applied when remuxing. Empty values leave the option unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuxSettings {
    /// Language for tracks whose file name does not encode one.
    #[serde(default)]
    pub default_language: String,

    /// Title for tracks whose file name does not encode one.
    #[serde(default)]
    pub default_title: String,

    /// Drop the source's subtitle tracks and attachments in Create.
    #[serde(default)]
    pub clean_source_tracks: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for console output (overridden by RUST_LOG).
    #[serde(default)]
    pub level: LogLevel,

    /// Keep per-file tool output out of the batch log unless a file fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of recent lines to show when a file fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Also write the tracing output to a file in the logs folder.
    #[serde(default)]
    pub file_log: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            file_log: false,
        }
    }
}

/// Config sections for atomic updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tools,
    Subset,
    Mux,
    Logging,
}

impl ConfigSection {
    /// All sections in file order.
    pub fn all() -> &'static [ConfigSection] {
        &[
            Self::Paths,
            Self::Tools,
            Self::Subset,
            Self::Mux,
            Self::Logging,
        ]
    }

    /// Section stored under `name`, if any.
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.table_name() == name)
    }

    /// TOML table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Subset => "subset",
            ConfigSection::Mux => "mux",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the table.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Working and log directories",
            ConfigSection::Tools => "# External tool executables",
            ConfigSection::Subset => "# Font subsetting",
            ConfigSection::Mux => "# Remux defaults",
            ConfigSection::Logging => "# Logging configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serialize() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[tools]"));
        assert!(toml_str.contains("mkvmerge = \"mkvmerge\""));
        assert!(toml_str.contains("[subset]"));
        assert!(toml_str.contains("[mux]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml_str = r#"
[tools]
mkvmerge = "/opt/mkvtoolnix/mkvmerge"

[mux]
default_title = "Subsetted"
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.tools.mkvmerge, "/opt/mkvtoolnix/mkvmerge");
        assert_eq!(settings.tools.mkvextract, "mkvextract");
        assert_eq!(settings.mux.default_title, "Subsetted");
        assert!(settings.mux.default_language.is_empty());
        assert!(!settings.subset.strict_font_match);
        assert!(settings.logging.compact);
    }

    #[test]
    fn table_names_round_trip() {
        for section in ConfigSection::all() {
            assert_eq!(
                ConfigSection::from_table_name(section.table_name()),
                Some(*section)
            );
        }
        assert_eq!(ConfigSection::from_table_name("analysis"), None);
    }

    #[test]
    fn validation() {
        assert!(Settings::default().validate().is_ok());

        let mut settings = Settings::default();
        settings.mux.default_language = "zh-Hans".to_string();
        assert!(settings.validate().is_ok());

        settings.mux.default_language = "0:eng".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { ref key, .. }) if key == "mux.default_language"
        ));

        let mut settings = Settings::default();
        settings.tools.ttx = "  ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.error_tail = MAX_ERROR_TAIL + 1;
        assert!(settings.validate().is_err());
    }
}
