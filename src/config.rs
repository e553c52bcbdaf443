//! Bridge configuration.
//!
//! Every field has a default, so a host can pass a partial JSON object (a
//! Tauri plugin config block or a settings file) and override only what it
//! needs.

use crate::constants::{
    DEFAULT_FALLBACK_ANSWER, DEFAULT_PARTIAL_RESULTS, DEFAULT_SPEECH_PITCH, DEFAULT_SPEECH_RATE,
    HARD_TIMEOUT_MS, SILENCE_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Errors raised while loading or validating configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file: {0}")]
    Io(String),
    /// Config JSON is malformed
    #[error("Invalid config JSON: {0}")]
    Parse(String),
    /// A value is out of range
    #[error("Invalid config value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Settings for the transcription session controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranscriptionConfig {
    /// Silence timeout after the latest non-empty partial (default: 1500)
    pub silence_timeout_ms: u64,
    /// Hard deadline from engine start (default: 15000)
    pub hard_timeout_ms: u64,
    /// BCP 47 locale for the recogniser; None uses the host default
    pub locale: Option<String>,
    /// Ask the engine for partial hypotheses (default: true)
    pub partial_results: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            silence_timeout_ms: SILENCE_TIMEOUT_MS,
            hard_timeout_ms: HARD_TIMEOUT_MS,
            locale: None,
            partial_results: DEFAULT_PARTIAL_RESULTS,
        }
    }
}

impl TranscriptionConfig {
    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }

    pub fn hard_timeout(&self) -> Duration {
        Duration::from_millis(self.hard_timeout_ms)
    }

    /// Check timing values
    ///
    /// # Errors
    /// - zero timeouts
    /// - silence timeout not shorter than the hard timeout
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.silence_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "silenceTimeoutMs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.hard_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hardTimeoutMs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.silence_timeout_ms >= self.hard_timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "silenceTimeoutMs",
                reason: format!(
                    "must be shorter than hardTimeoutMs ({} >= {})",
                    self.silence_timeout_ms, self.hard_timeout_ms
                ),
            });
        }
        Ok(())
    }
}

/// Voice settings for speech synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthesisConfig {
    /// Speech rate multiplier (default: 1.1)
    pub speech_rate: f32,
    /// Pitch multiplier (default: 1.2)
    pub pitch: f32,
    /// Voice locale; None uses the host default
    pub locale: Option<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            speech_rate: DEFAULT_SPEECH_RATE,
            pitch: DEFAULT_SPEECH_PITCH,
            locale: None,
        }
    }
}

/// Settings for text answering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnswerConfig {
    /// Reply returned when no model backend is configured
    pub fallback_answer: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
        }
    }
}

/// Top-level configuration for the bridge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    pub transcription: TranscriptionConfig,
    pub synthesis: SynthesisConfig,
    pub answer: AnswerConfig,
}

impl BridgeConfig {
    /// Parse and validate a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config already decoded as a JSON value (e.g. a Tauri plugin block)
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config = Self::from_json_str(&contents)?;
        crate::debug!("Loaded bridge config from {:?}", path);
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transcription.validate()?;
        if !(self.synthesis.speech_rate > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "speechRate",
                reason: "must be positive".to_string(),
            });
        }
        if !(self.synthesis.pitch > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "pitch",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
