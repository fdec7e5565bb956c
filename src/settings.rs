//! Game tuning
//!
//! Every section is `#[serde(default)]`, so a JSON file only needs the values
//! it wants to override.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioSettings;
use crate::sim::enemy::EnemySettings;
use crate::sim::gesture::{GestureSettings, MIN_WINDOW_MS};
use crate::sim::level::{LevelConfig, MIN_LEVEL_SECS, default_levels};
use crate::sim::projectile::ProjectileSettings;
use crate::sim::wind::WindSettings;

/// Errors from loading a settings file
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Screen flow options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Route through the pre-game gate after the menu
    pub gate_enabled: bool,
    /// Levels that show the tutorial overlay on first visit
    pub tutorial_levels: Vec<usize>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            gate_enabled: true,
            tutorial_levels: vec![0],
        }
    }
}

/// All tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub gesture: GestureSettings,
    pub wind: WindSettings,
    pub projectile: ProjectileSettings,
    pub enemy: EnemySettings,
    pub flow: FlowSettings,
    pub levels: Vec<LevelConfig>,
    /// Seed for gust timing and the noise permutation
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            gesture: GestureSettings::default(),
            wind: WindSettings::default(),
            projectile: ProjectileSettings::default(),
            enemy: EnemySettings::default(),
            flow: FlowSettings::default(),
            levels: default_levels(),
            seed: 0xB111_BA11,
        }
    }
}

impl Settings {
    /// Parse, validate and sanitize settings from JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings.sanitized())
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Reject settings that cannot be repaired
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.levels.is_empty() {
            return Err(SettingsError::Invalid("no levels configured".into()));
        }
        Ok(())
    }

    /// Clamp and floor out-of-range values, warning about each repair
    pub fn sanitized(mut self) -> Self {
        for (i, level) in self.levels.iter_mut().enumerate() {
            if level.required_hits == 0 {
                log::warn!("Level {i}: required_hits 0, using 1");
                level.required_hits = 1;
            }
            if !(level.duration_sec >= MIN_LEVEL_SECS) {
                log::warn!(
                    "Level {i}: duration {}s below minimum, using {MIN_LEVEL_SECS}s",
                    level.duration_sec
                );
                level.duration_sec = MIN_LEVEL_SECS;
            }
            if !(level.enemy_drop >= 0.0) {
                log::warn!("Level {i}: negative enemy drop, using 0");
                level.enemy_drop = 0.0;
            }
        }

        let g = &mut self.gesture;
        if !(g.window_ms >= MIN_WINDOW_MS) {
            log::warn!("Gesture window {}ms below minimum", g.window_ms);
            g.window_ms = MIN_WINDOW_MS;
        }
        if g.throw_min > g.throw_max {
            log::warn!("Throw range inverted, swapping");
            std::mem::swap(&mut g.throw_min, &mut g.throw_max);
        }
        if g.speed_min > g.speed_max {
            log::warn!("Gesture speed range inverted, swapping");
            std::mem::swap(&mut g.speed_min, &mut g.speed_max);
        }

        for range in [&mut self.wind.gust_on_ms, &mut self.wind.gust_off_ms] {
            if range[0] > range[1] {
                log::warn!("Gust range {:?} inverted, swapping", range);
                range.swap(0, 1);
            }
            range[0] = range[0].max(0.0);
            range[1] = range[1].max(range[0]);
        }

        let a = &mut self.audio;
        for (name, v) in [
            ("master", &mut a.master),
            ("music", &mut a.music),
            ("sfx", &mut a.sfx),
        ] {
            if !(0.0..=1.0).contains(&*v) {
                log::warn!("Audio {name} volume {v} out of range, clamping");
                *v = if v.is_nan() { 1.0 } else { v.clamp(0.0, 1.0) };
            }
        }

        self
    }
}
