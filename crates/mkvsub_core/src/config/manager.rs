//! Loading and saving the settings file.
//!
//! Writes go to a sibling temp file that is renamed over the target. Loading
//! and section updates edit the document in place through `toml_edit`, so
//! comments and key order added by hand survive.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table};

use super::settings::{ConfigSection, Settings};

const FILE_HEADER: &str = "# mkv-subset settings\n\
# Unknown sections and keys are dropped when the file is loaded.\n";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to edit config document: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings file and the settings loaded from it.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Nothing is read until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create).
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until [`save`](Self::save) or
    /// [`update_section`](Self::update_section).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Read and validate an existing file. The file is left untouched.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Read the file, or write one with defaults when there is none.
    ///
    /// An existing file is normalized: unknown sections and keys go, missing
    /// ones are added with their defaults. It is only rewritten when that
    /// changed something.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            self.settings = Settings::default();
            return self.save();
        }

        let content = fs::read_to_string(&self.config_path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        self.settings = settings;

        let mut doc: DocumentMut = content.parse()?;
        if self.normalize(&mut doc)? {
            tracing::debug!("Normalized config {}", self.config_path.display());
            self.atomic_write(&doc.to_string())?;
        }
        Ok(())
    }

    /// Write every section, replacing the file.
    pub fn save(&self) -> ConfigResult<()> {
        let mut doc = DocumentMut::new();
        for section in ConfigSection::all() {
            doc.insert(
                section.table_name(),
                Item::Table(self.commented_table(*section)?),
            );
        }
        self.atomic_write(&format!("{}{}", FILE_HEADER, doc))?;
        Ok(())
    }

    /// Write one section's values into the file on disk.
    ///
    /// The rest of the file is re-read and kept as it is, including edits
    /// made since this manager loaded it.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc: DocumentMut = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?.parse()?
        } else {
            DocumentMut::new()
        };

        let fresh = self.section_table(section)?;
        match doc
            .get_mut(section.table_name())
            .and_then(Item::as_table_mut)
        {
            Some(existing) => {
                for (key, value) in fresh.iter() {
                    existing[key] = value.clone();
                }
            }
            None => {
                doc.insert(
                    section.table_name(),
                    Item::Table(self.commented_table(section)?),
                );
            }
        }

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    /// Current values of one section as a standalone table.
    fn section_table(&self, section: ConfigSection) -> ConfigResult<Table> {
        let text = match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Tools => toml::to_string_pretty(&self.settings.tools)?,
            ConfigSection::Subset => toml::to_string_pretty(&self.settings.subset)?,
            ConfigSection::Mux => toml::to_string_pretty(&self.settings.mux)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
        };
        let parsed: DocumentMut = text.parse()?;

        let mut table = Table::new();
        for (key, value) in parsed.as_table().iter() {
            table.insert(key, value.clone());
        }
        Ok(table)
    }

    fn commented_table(&self, section: ConfigSection) -> ConfigResult<Table> {
        let mut table = self.section_table(section)?;
        table
            .decor_mut()
            .set_prefix(format!("\n{}\n", section.comment()));
        Ok(table)
    }

    /// Drop unknown tables and keys, add missing ones. Returns whether the
    /// document changed.
    fn normalize(&self, doc: &mut DocumentMut) -> ConfigResult<bool> {
        let mut changed = false;

        let unknown: Vec<String> = doc
            .iter()
            .map(|(key, _)| key.to_string())
            .filter(|key| ConfigSection::from_table_name(key).is_none())
            .collect();
        for key in unknown {
            tracing::warn!("Dropping unknown config section [{}]", key);
            doc.remove(&key);
            changed = true;
        }

        for section in ConfigSection::all() {
            let fresh = self.section_table(*section)?;
            let Some(existing) = doc
                .get_mut(section.table_name())
                .and_then(Item::as_table_mut)
            else {
                doc.insert(
                    section.table_name(),
                    Item::Table(self.commented_table(*section)?),
                );
                changed = true;
                continue;
            };

            let stray: Vec<String> = existing
                .iter()
                .map(|(key, _)| key.to_string())
                .filter(|key| !fresh.contains_key(key))
                .collect();
            for key in stray {
                tracing::warn!(
                    "Dropping unknown config key {}.{}",
                    section.table_name(),
                    key
                );
                existing.remove(&key);
                changed = true;
            }

            for (key, value) in fresh.iter() {
                if !existing.contains_key(key) {
                    existing.insert(key, value.clone());
                    changed = true;
                }
            }
        }

        Ok(changed)
    }

    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Same directory so the rename stays on one filesystem
        let temp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_default_file_that_loads_back() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("mkv-subset.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.starts_with("# mkv-subset settings"));
        assert!(content.contains("# External tool executables\n[tools]"));
        assert!(content.contains("[logging]"));

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings(), &Settings::default());
    }

    #[test]
    fn existing_values_and_comments_survive_normalizing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mkv-subset.toml");
        fs::write(
            &config_path,
            "# my tools\n[tools]\nmkvmerge = \"/opt/bin/mkvmerge\" # pinned\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();
        assert_eq!(manager.settings().tools.mkvmerge, "/opt/bin/mkvmerge");

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("# my tools"));
        assert!(content.contains("# pinned"));
        assert!(content.contains("[subset]"));
        assert!(content.contains("mkvextract = \"mkvextract\""));
    }

    #[test]
    fn unknown_sections_and_keys_are_dropped() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mkv-subset.toml");
        fs::write(
            &config_path,
            "[analysis]\nchunk_count = 10\n\n[subset]\nfont_cache = true\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("[analysis]"));
        assert!(!content.contains("font_cache"));
        assert!(content.contains("strict_font_match = false"));
    }

    #[test]
    fn complete_file_is_not_rewritten() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mkv-subset.toml");
        ConfigManager::new(&config_path).save().unwrap();
        let mut text = fs::read_to_string(&config_path).unwrap();
        text.push_str("# trailing note\n");
        fs::write(&config_path, &text).unwrap();

        ConfigManager::new(&config_path).load_or_create().unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), text);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mkv-subset.toml");
        fs::write(&config_path, "[tools]\nmkvextract = \"\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        let err = manager.load_or_create().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "tools.mkvextract"));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mkv-subset.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        manager.settings_mut().subset.strict_font_match = true;
        manager.settings_mut().mux.default_title = "not saved".to_string();
        manager.update_section(ConfigSection::Subset).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("strict_font_match = true"));
        assert!(!content.contains("not saved"));
        assert!(content.contains("# Font subsetting\n[subset]"));
        assert!(!config_path.with_extension("toml.tmp").exists());
    }
}
