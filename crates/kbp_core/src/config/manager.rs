//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Unknown sections are dropped on load
//! - Preserves comments and formatting with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a manager for `config_path`. Call `load()` or
    /// `load_or_create()` afterwards.
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

    /// Changes stay in memory until `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file. Fails if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if missing.
    ///
    /// A file with unknown sections or missing keys is rewritten.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = parse_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!("Normalizing config file {}", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
            tracing::info!("Created default config {}", self.config_path.display());
        }
        Ok(())
    }

    /// Create the logs folder and, when set, the output folder.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        let dirs = [paths.logs_folder.trim(), paths.output_folder.trim()];

        for dir in dirs.into_iter().filter(|d| !d.is_empty()) {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Rewrite one section on disk, leaving the rest of the file as it is.
    ///
    /// The file is re-read first so edits made to other sections since
    /// loading are kept.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_doc: DocumentMut = self.section_toml(section)?.parse()?;
        doc[section.table_name()] = Item::Table(section_doc.as_table().clone());

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    /// Serialize one section's keys.
    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let toml = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Subtitle => toml::to_string_pretty(&s.subtitle)?,
            ConfigSection::Video => toml::to_string_pretty(&s.video)?,
            ConfigSection::Audio => toml::to_string_pretty(&s.audio)?,
            ConfigSection::Lyrics => toml::to_string_pretty(&s.lyrics)?,
            ConfigSection::Tools => toml::to_string_pretty(&s.tools)?,
            ConfigSection::Batch => toml::to_string_pretty(&s.batch)?,
            ConfigSection::Intro => toml::to_string_pretty(&s.intro)?,
            ConfigSection::Outro => toml::to_string_pretty(&s.outro)?,
        };
        Ok(toml)
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();
        output.push_str("# kbp2video configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n",
        );

        for section in ConfigSection::all() {
            output.push_str(&format!(
                "\n# {}\n[{}]\n",
                section.description(),
                section.table_name()
            ));
            for line in self.section_toml(*section)?.lines() {
                output.push_str(line);
                output.push('\n');
            }
        }
        Ok(output)
    }

    /// Write to a temp file in the same folder, then rename over the config.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}

/// Parse settings and report whether the file needs rewriting.
fn parse_and_clean(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;
    let settings: Settings = toml::from_str(content)?;

    let known: Vec<&str> = ConfigSection::all().iter().map(|s| s.table_name()).collect();
    let has_unknown = doc.iter().any(|(key, _)| !known.contains(&key));
    if has_unknown {
        tracing::warn!("Dropping unknown config sections");
    }

    // Defaults were filled in if the round trip differs
    let reserialized: DocumentMut = toml::to_string_pretty(&settings)?.parse()?;
    let missing_keys = ConfigSection::all().iter().any(|section| {
        let name = section.table_name();
        let (Some(written), Some(expected)) = (
            doc.get(name).and_then(Item::as_table),
            reserialized.get(name).and_then(Item::as_table),
        ) else {
            return true;
        };
        expected.iter().any(|(key, _)| !written.contains_key(key))
    });

    Ok((settings, has_unknown || missing_keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("kbp2video.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        for section in ConfigSection::all() {
            assert!(content.contains(&format!("[{}]", section.table_name())));
        }
        assert!(content.contains("# Subtitle conversion"));

        // The generated file loads without changes
        let (_, modified) = parse_and_clean(&content).unwrap();
        assert!(!modified);
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("kbp2video.toml");
        fs::write(
            &config_path,
            "[video]\nbackground_color = \"#102030\"\n\n[mystery]\nx = 1\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(
            manager.settings().video.background_color,
            crate::models::Color::rgb(0x10, 0x20, 0x30)
        );
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("[mystery]"));
        assert!(content.contains("[tools]"));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("nope.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("kbp2video.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        // Hand edit to another section survives
        let edited = fs::read_to_string(&config_path)
            .unwrap()
            .replace("frame_rate = 60", "frame_rate = 30");
        fs::write(&config_path, edited).unwrap();

        manager.settings_mut().logging.compact = false;
        manager.update_section(ConfigSection::Logging).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("compact = false"));
        assert!(content.contains("frame_rate = 30"));
        assert!(content.contains("# Background and video encoding"));
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("kbp2video.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(!config_path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn ensure_dirs_creates_logs_folder() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("kbp2video.toml"));
        manager.settings_mut().paths.logs_folder =
            dir.path().join("logs").to_string_lossy().into_owned();
        manager.ensure_dirs_exist().unwrap();
        assert!(manager.logs_folder().is_dir());
    }
}
