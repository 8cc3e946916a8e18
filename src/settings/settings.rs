// Settings management and persistence
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Fade-in settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeSettings {
    pub steps: u32,   // number of volume increments
    pub tick_ms: u64, // delay between increments
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            steps: 50,
            tick_ms: 30,
        }
    }
}

impl FadeSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn total(&self) -> Duration {
        self.tick() * self.steps
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub filter: String, // tracing EnvFilter directive, RUST_LOG overrides it
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Main player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub version: i32, // Settings schema version for future migrations
    pub volume: f32,  // initial store volume, 0.0-1.0
    pub fade: FadeSettings,
    pub logging: LoggingSettings,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            version: 1,
            volume: 1.0,
            fade: FadeSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl PlayerSettings {
    /// Get the settings file path
    pub fn settings_path(dir: &Path) -> PathBuf {
        dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::settings_path(dir);

        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;

        let settings: PlayerSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {:?}", path))?;
        settings.validate()?;

        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create settings directory {:?}", dir))?;

        let path = Self::settings_path(dir);
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings file {:?}", path))?;

        info!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fade.steps == 0 {
            bail!("fade.steps must be at least 1");
        }
        if self.fade.tick_ms == 0 {
            bail!("fade.tick_ms must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.volume) {
            bail!("volume must be between 0.0 and 1.0, got {}", self.volume);
        }
        Ok(())
    }
}
