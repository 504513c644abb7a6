use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MediqError, Result};

/// Top-level configuration for the Mediq assistant.
///
/// Loaded from `mediq.toml` by default. Each section corresponds to one
/// engine or cross-cutting concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediqConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

impl Default for MediqConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            session: SessionConfig::default(),
            context: ContextConfig::default(),
            classifier: ClassifierConfig::default(),
            retrieval: RetrievalConfig::default(),
            booking: BookingConfig::default(),
        }
    }
}

impl MediqConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MediqConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| MediqError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Session memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum messages retained per session (oldest evicted first).
    pub max_messages: usize,
    /// Maximum intent/entity history entries retained per session.
    pub max_history: usize,
    /// Idle minutes after which a session is swept.
    pub timeout_minutes: i64,
    /// Maximum accepted utterance length in characters.
    pub max_message_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            max_history: 5,
            timeout_minutes: 30,
            max_message_length: 2000,
        }
    }
}

/// Context carry-over settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Words whose presence suppresses department back-fill from a prior
    /// turn. Tunable per deployment.
    pub backfill_suppress_words: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            backfill_suppress_words: vec![
                "book".to_string(),
                "appointment".to_string(),
                "schedule".to_string(),
                "reserve".to_string(),
            ],
        }
    }
}

/// Intent classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Weight of the boolean keyword match in the hybrid score.
    pub pattern_weight: f32,
    /// Weight of the exemplar cosine similarity in the hybrid score.
    pub similarity_weight: f32,
    /// Minimum hybrid score to accept the scored intent.
    pub confidence_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pattern_weight: 0.7,
            similarity_weight: 0.3,
            confidence_threshold: 0.3,
        }
    }
}

/// Retrieval engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages returned per query.
    pub top_k: usize,
    /// Minimum similarity a passage must reach to be surfaced.
    pub min_relevance: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            min_relevance: 0.3,
        }
    }
}

/// Appointment slot grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// First bookable hour of the day (24-hour).
    pub open_hour: u32,
    /// First hour past the bookable range (24-hour, exclusive).
    pub close_hour: u32,
    /// Slot granularity in minutes.
    pub slot_minutes: u32,
    /// Number of alternative slots suggested on conflict.
    pub max_alternatives: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 18,
            slot_minutes: 30,
            max_alternatives: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MediqConfig::default();
        assert_eq!(config.session.max_messages, 10);
        assert_eq!(config.session.max_history, 5);
        assert_eq!(config.session.timeout_minutes, 30);
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(config.booking.open_hour, 9);
        assert_eq!(config.booking.close_hour, 18);
    }

    #[test]
    fn test_classifier_defaults_sum_to_one() {
        let config = ClassifierConfig::default();
        assert!((config.pattern_weight + config.similarity_weight - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.confidence_threshold, 0.3);
    }

    #[test]
    fn test_backfill_suppress_words_default() {
        let config = ContextConfig::default();
        assert!(config.backfill_suppress_words.contains(&"book".to_string()));
        assert!(config
            .backfill_suppress_words
            .contains(&"reserve".to_string()));
        assert_eq!(config.backfill_suppress_words.len(), 4);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediq.toml");

        let mut config = MediqConfig::default();
        config.session.timeout_minutes = 45;
        config.retrieval.min_relevance = 0.5;
        config.save(&path).unwrap();

        let loaded = MediqConfig::load(&path).unwrap();
        assert_eq!(loaded.session.timeout_minutes, 45);
        assert_eq!(loaded.retrieval.min_relevance, 0.5);
        assert_eq!(loaded.session.max_messages, 10);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = MediqConfig::load(Path::new("/nonexistent/mediq.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = MediqConfig::load_or_default(Path::new("/nonexistent/mediq.toml"));
        assert_eq!(config.session.max_messages, 10);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[session]\ntimeout_minutes = 5\n").unwrap();

        let config = MediqConfig::load(&path).unwrap();
        assert_eq!(config.session.timeout_minutes, 5);
        assert_eq!(config.session.max_messages, 10);
        assert_eq!(config.booking.slot_minutes, 30);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "session = [[[").unwrap();

        let result = MediqConfig::load(&path);
        assert!(matches!(result, Err(MediqError::Config(_))));
    }
}
