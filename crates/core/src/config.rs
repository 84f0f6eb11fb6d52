use std::fs;
use std::path::{Path, PathBuf};

use aural_catalog::IntervalCatalog;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Settings;

/// Configuration manager for trainer settings
/// Keeps the schema (available options and their limits) separate from the
/// persisted values. Settings live in ~/.aural/config.json by default
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub playback: PlaybackConfigSchema,
    pub quiz: QuizConfigSchema,
    pub backend: BackendConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfigSchema {
    pub inter_note_delay_ms: ConfigOption<u64>,
    pub stop_fade_ms: ConfigOption<u64>,
    pub note_duration_ms: ConfigOption<u64>,
    pub volume: ConfigOption<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfigSchema {
    pub intervals: ConfigOption<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfigSchema {
    pub prepare_latency_ms: ConfigOption<u64>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to ~/.aural/config.json
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(Self::default_path);

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aural")
            .join("config.json")
    }

    /// Load settings from the configuration file
    /// Writes a default file first if none exists
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings).map_err(ConfigError::ValidationError)?;

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to the configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let created_at = self.existing_created_at().unwrap_or_else(|| now.clone());

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at,
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    fn existing_created_at(&self) -> Option<String> {
        let content = fs::read_to_string(&self.config_path).ok()?;
        let config_file: ConfigFile = serde_json::from_str(&content).ok()?;
        Some(config_file.created_at)
    }

    /// Validate, update and save settings
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        let defaults = Settings::default();

        ConfigSchema {
            playback: PlaybackConfigSchema {
                inter_note_delay_ms: ConfigOption {
                    default: defaults.inter_note_delay_ms,
                    valid_range: Some((100, 5000)),
                    valid_choices: None,
                    description: "Pause between the first and second note in milliseconds"
                        .to_string(),
                },
                stop_fade_ms: ConfigOption {
                    default: defaults.stop_fade_ms,
                    valid_range: Some((0, 2000)),
                    valid_choices: None,
                    description: "Fade-out applied when a sounding note is stopped".to_string(),
                },
                note_duration_ms: ConfigOption {
                    default: defaults.note_duration_ms,
                    valid_range: Some((250, 10000)),
                    valid_choices: None,
                    description: "How long a synthesized note rings".to_string(),
                },
                volume: ConfigOption {
                    default: defaults.volume,
                    valid_range: Some((0.0, 1.0)),
                    valid_choices: None,
                    description: "Playback volume".to_string(),
                },
            },
            quiz: QuizConfigSchema {
                intervals: ConfigOption {
                    default: String::new(),
                    valid_range: None,
                    valid_choices: Some(
                        IntervalCatalog::new()
                            .codes()
                            .into_iter()
                            .map(String::from)
                            .collect(),
                    ),
                    description: "Interval codes the quiz may ask about".to_string(),
                },
            },
            backend: BackendConfigSchema {
                prepare_latency_ms: ConfigOption {
                    default: defaults.prepare_latency_ms,
                    valid_range: Some((0, 5000)),
                    valid_choices: None,
                    description: "Simulated load time of the headless backend".to_string(),
                },
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        check_range(
            &mut errors,
            "inter_note_delay_ms",
            settings.inter_note_delay_ms,
            &schema.playback.inter_note_delay_ms,
        );
        check_range(
            &mut errors,
            "stop_fade_ms",
            settings.stop_fade_ms,
            &schema.playback.stop_fade_ms,
        );
        check_range(
            &mut errors,
            "note_duration_ms",
            settings.note_duration_ms,
            &schema.playback.note_duration_ms,
        );
        check_range(&mut errors, "volume", settings.volume, &schema.playback.volume);
        check_range(
            &mut errors,
            "prepare_latency_ms",
            settings.prepare_latency_ms,
            &schema.backend.prepare_latency_ms,
        );

        // Validate quiz settings
        if settings.intervals.is_empty() {
            errors.push("intervals must name at least one interval".to_string());
        }
        if let Some(choices) = &schema.quiz.intervals.valid_choices {
            for code in &settings.intervals {
                if !choices.contains(code) {
                    errors.push(format!("unknown interval code {}, expected one of: {:?}", code, choices));
                }
            }
        }
        if settings.arpeggiations.is_empty() {
            errors.push("arpeggiations must contain up, down or both".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset settings to defaults
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(
    errors: &mut Vec<String>,
    name: &str,
    value: T,
    option: &ConfigOption<T>,
) {
    if let Some((min, max)) = &option.valid_range {
        if value < *min || value > *max {
            errors.push(format!("{} must be between {} and {}", name, min, max));
        }
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Config validation errors: {}", .0.join(", "))]
    ValidationError(Vec<String>),
}
