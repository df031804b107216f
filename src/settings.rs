//! Engine settings
//!
//! Physics constants, arena bounds, loop timing and the demo scene, persisted
//! as JSON. Every section has defaults, so a file only needs the values it
//! changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform::{LoopConfig, LoopError};
use crate::sim::body::check_bounds_fit;
use crate::sim::{BodyError, Bounds, PhysicsConfig, RigidBody2D, ScatterSpec};

/// Demo scene description
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Balls to drop into the arena
    pub scatter: ScatterSpec,
    /// Wall-clock run time in seconds
    pub duration_secs: f32,
    /// Log a progress line every this many frames (0 = never)
    pub report_every_frames: u32,
}

impl SceneSettings {
    /// Run time as a `Duration`
    pub fn duration(&self) -> Result<Duration, SettingsError> {
        Duration::try_from_secs_f32(self.duration_secs).map_err(|_| {
            SettingsError::Scene("duration_secs must be a non-negative, representable time")
        })
    }
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            scatter: ScatterSpec::default(),
            duration_secs: 5.0,
            report_every_frames: 60,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub physics: PhysicsConfig,
    pub bounds: Bounds,
    pub timing: LoopConfig,
    pub scene: SceneSettings,
}

/// Ways that loading settings can fail
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid physics settings: {0}")]
    Physics(#[from] BodyError),
    #[error("invalid timing settings: {0}")]
    Timing(#[from] LoopError),
    #[error("invalid scene settings: {0}")]
    Scene(&'static str),
}

impl Settings {
    /// Parse and validate settings from JSON text
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Check every section, including that the scene's ball fits the arena
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.physics.validate()?;
        check_bounds_fit(&self.bounds, 0.0)?;
        self.timing.validate()?;

        // Building one template ball validates radius, mass and the fit
        RigidBody2D::new(self.scene.scatter.template, self.physics, self.bounds)?;

        let scatter = &self.scene.scatter;
        for value in [
            scatter.min_height,
            scatter.max_height,
            scatter.half_width,
            scatter.max_speed,
        ] {
            if !value.is_finite() {
                return Err(SettingsError::Scene("scatter ranges must be finite"));
            }
        }
        self.scene.duration()?;
        Ok(())
    }
}
