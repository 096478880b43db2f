use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use crate::core::Coordinate;
use crate::playback::PlaybackConfig;
use crate::playback::synth::DEFAULT_STEPS;

/// Persistent settings for the replay binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub route_path: PathBuf,
    pub tick_interval_ms: u64,
    pub resume_delay_ms: u64,
    pub target_clear_delay_ms: u64,
    pub synth_steps: usize,
    pub fallback_latitude: f64,
    pub fallback_longitude: f64,
}

impl Default for Settings {
    fn default() -> Self {
        let playback = PlaybackConfig::default();
        Self {
            route_path: PathBuf::from("data/dummy-route.json"),
            tick_interval_ms: playback.tick_interval.as_millis() as u64,
            resume_delay_ms: playback.resume_delay.as_millis() as u64,
            target_clear_delay_ms: playback.target_clear_delay.as_millis() as u64,
            synth_steps: DEFAULT_STEPS,
            fallback_latitude: playback.fallback_position.latitude,
            fallback_longitude: playback.fallback_position.longitude,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vehicle-replay").join("settings.json"))
    }

    /// Load from the user config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Write these settings to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn save_if_missing(&self, path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        self.save_to(path)?;
        Ok(true)
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            resume_delay: Duration::from_millis(self.resume_delay_ms),
            target_clear_delay: Duration::from_millis(self.target_clear_delay_ms),
            synth_steps: self.synth_steps,
            fallback_position: Coordinate::new(self.fallback_latitude, self.fallback_longitude),
        }
    }
}
