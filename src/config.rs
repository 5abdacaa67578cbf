use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, EngineError, EngineResult};

pub const DEFAULT_THRESHOLD: f64 = 0.8;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
pub const DEFAULT_BORDER_WIDTH: i32 = 4;

const APP_DIR_NAME: &str = "OverlayWatch";
const CONFIG_FILE_NAME: &str = "config.json";

/// Values the match loop reads once per tick.
///
/// The engine keeps the current value behind a lock and clones a snapshot at
/// the start of every tick, so an update never lands halfway through one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Minimum correlation score (inclusive) that counts as a match
    pub threshold_confidence: f64,
    /// Target spacing between tick starts
    pub poll_interval_ms: u64,
    /// Margin added around the match rectangle, in logical pixels
    pub border_width: i32,
    /// Capture pixels per logical pixel
    pub scale_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold_confidence: DEFAULT_THRESHOLD,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            border_width: DEFAULT_BORDER_WIDTH,
            scale_factor: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "scale factor must be > 0, got {}",
                self.scale_factor
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::invalid_config("poll interval must be > 0 ms"));
        }
        if !self.threshold_confidence.is_finite() {
            return Err(EngineError::invalid_config(format!(
                "threshold must be a finite number, got {}",
                self.threshold_confidence
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub width: i32,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            width: DEFAULT_BORDER_WIDTH,
        }
    }
}

/// Alert tone played when a match is acquired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoundKind {
    None,
    Beep,
    #[default]
    Success,
    Error,
    Mario,
    Custom,
}

/// An unrecognised sound kind falls back to the default tone instead of
/// discarding every other setting in the file.
fn lenient_sound_kind<'de, D>(deserializer: D) -> Result<SoundKind, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match serde_json::from_value(value.clone()) {
        Ok(kind) => Ok(kind),
        Err(_) => {
            tracing::warn!("Unknown sound_type {value}, using {:?}", SoundKind::default());
            Ok(SoundKind::default())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomSound {
    /// Local audio file
    pub path: Option<PathBuf>,
    /// Offset into the file, in seconds
    pub start: f32,
    /// Seconds to play
    pub duration: f32,
}

impl Default for CustomSound {
    fn default() -> Self {
        Self {
            path: None,
            start: 0.0,
            duration: 3.0,
        }
    }
}

/// Persisted application settings.
///
/// Unknown or missing fields fall back to their defaults so older files keep
/// loading after new settings are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub threshold_confidence: f64,
    pub poll_interval_ms: u64,
    pub border: Border,

    /// Overlay border colour, `#RRGGBB`
    pub color: String,
    pub opacity: f32,

    /// Target image used in the previous session
    pub last_image: Option<PathBuf>,

    #[serde(deserialize_with = "lenient_sound_kind")]
    pub sound_type: SoundKind,
    pub enable_notification: bool,
    pub enable_sound: bool,
    pub custom_sound: CustomSound,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threshold_confidence: DEFAULT_THRESHOLD,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            border: Border::default(),
            color: "#FF0000".to_string(),
            opacity: 1.0,
            last_image: None,
            sound_type: SoundKind::default(),
            enable_notification: true,
            enable_sound: true,
            custom_sound: CustomSound::default(),
        }
    }
}

impl AppConfig {
    /// Load from the platform config directory, falling back to defaults when
    /// the file is missing or unreadable.
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!("{err}, using default configuration");
                return Self::default();
            }
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{err}: {}, using default configuration", error_chain(&err));
                Self::default()
            }
        }
    }

    /// Load from an explicit path. A missing file yields the defaults; a
    /// corrupt one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|err| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(err),
        })?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(|err| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(err),
            })?;

        tracing::info!("✓ Loaded config from: {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: err,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|err| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(err),
        })?;
        fs::write(path, json).map_err(|err| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(err),
        })?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::app_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn logs_dir() -> Result<PathBuf, ConfigError> {
        Ok(Self::app_dir()?.join("logs"))
    }

    fn app_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Derive the engine settings for a display with the given scale factor.
    pub fn engine_config(&self, scale_factor: f64) -> EngineResult<EngineConfig> {
        let config = EngineConfig {
            threshold_confidence: self.threshold_confidence,
            poll_interval_ms: self.poll_interval_ms,
            border_width: self.border.width,
            scale_factor,
        };
        config.validate()?;
        Ok(config)
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
