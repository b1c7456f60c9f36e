//! Editor configuration, loadable from JSON or TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::schema::DEFAULT_CODE_LANGUAGE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period after the last code surface change before it is committed.
    pub debounce_ms: u64,
    /// Language new code blocks start with.
    pub default_code_language: String,
    pub suggestion: SuggestionConfig,
    pub classifier: ClassifierConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            default_code_language: DEFAULT_CODE_LANGUAGE.to_owned(),
            suggestion: SuggestionConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn from_json_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` or `.toml` file, picked by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&src),
            Some("toml") => Self::from_toml_str(&src),
            _ => Err(ConfigError::Invalid(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid("debounce_ms must be positive".into()));
        }
        if self.default_code_language.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_code_language must not be empty".into(),
            ));
        }
        if self.suggestion.trigger.is_whitespace() {
            return Err(ConfigError::Invalid(
                "suggestion trigger must not be whitespace".into(),
            ));
        }
        if self.suggestion.max_items == Some(0) {
            return Err(ConfigError::Invalid("suggestion.max_items must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.classifier.threshold) {
            return Err(ConfigError::Invalid(
                "classifier.threshold must be within 0..=1".into(),
            ));
        }
        if self.classifier.strong_weight <= 0.0 {
            return Err(ConfigError::Invalid(
                "classifier.strong_weight must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Trigger-suggestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub trigger: char,
    /// Whether the query may contain spaces (`/heading 2`).
    pub allow_spaces: bool,
    /// Cap on listed items. `None` lists every match.
    pub max_items: Option<usize>,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            trigger: '/',
            allow_spaces: true,
            max_items: None,
        }
    }
}

/// Language classifier tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// A language wins once its normalized score exceeds this.
    pub threshold: f64,
    /// Weight of keywords ending in a space.
    pub strong_weight: f64,
    /// Answer when no rule applies.
    pub default_language: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            strong_weight: 3.0,
            default_language: "javascript".to_owned(),
        }
    }
}
