use crate::{
    CONFIG_DIRECTORY, DATABASE_FILE, SETTINGS_FILE, STORAGE_DIRECTORY, expand_tilde,
};
use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

pub const DEFAULT_VOLUME: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub volume: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            volume: DEFAULT_VOLUME,
            library_path: None,
            storage_dir: None,
            log_level: String::from("warn"),
        }
    }
}

impl Settings {
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    pub fn library_file(&self) -> Result<PathBuf> {
        match &self.library_path {
            Some(p) => expand_tilde(p),
            None => dirs::data_dir()
                .map(|d| d.join(CONFIG_DIRECTORY).join(DATABASE_FILE))
                .ok_or_else(|| anyhow!("Could not determine data directory!")),
        }
    }

    pub fn storage_root(&self) -> Result<PathBuf> {
        match &self.storage_dir {
            Some(p) => expand_tilde(p),
            None => dirs::audio_dir()
                .or_else(dirs::home_dir)
                .map(|d| d.join(STORAGE_DIRECTORY))
                .ok_or_else(|| anyhow!("Could not determine a download directory!")),
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }
}

pub fn clamp_volume(volume: f32) -> f32 {
    match volume.is_nan() {
        true => DEFAULT_VOLUME,
        false => volume.clamp(0.0, 1.0),
    }
}

/// Persisted preferences.
pub trait SettingsStore: Send {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings kept as TOML on disk. A missing file reads as the defaults.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        FileSettings { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory!"))?;
        Ok(Self::at(dir.join(CONFIG_DIRECTORY).join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettings {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let file_str = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut settings = toml::from_str::<Settings>(&file_str)
            .with_context(|| format!("invalid settings in {}", self.path.display()))?;
        settings.volume = clamp_volume(settings.volume);

        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file_str = toml::to_string_pretty(settings)?;
        std::fs::write(&self.path, file_str)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// Settings that live only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings(Arc<Mutex<Settings>>);

impl SettingsStore for MemorySettings {
    fn load(&self) -> Result<Settings> {
        self.0
            .lock()
            .map(|s| s.clone())
            .map_err(|_| anyhow!("settings lock was poisoned"))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let mut stored = self.0.lock().map_err(|_| anyhow!("settings lock was poisoned"))?;
        *stored = settings.clone();
        Ok(())
    }
}
