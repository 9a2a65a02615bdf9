//! Configuration
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. A TOML file: the explicit path if one is given (it must exist),
//!    otherwise `scl.toml` in the working directory when present
//! 3. Environment variables prefixed `SCL_`, with `__` between sections,
//!    e.g. `SCL_FORMATTING__INDENT_WIDTH=2`
//!
//! A `.env` file is loaded into the environment first.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::editor::{FormattingOptions, LineEnding};

pub const DEFAULT_CONFIG_FILE: &str = "scl.toml";
pub const ENV_PREFIX: &str = "SCL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to write configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration settings: {0}")]
    Settings(#[from] serde_json::Error),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingConfig {
    /// Spaces per indentation level
    pub indent_width: usize,
    pub line_ending: LineEnding,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            line_ending: LineEnding::Auto,
        }
    }
}

impl From<&FormattingConfig> for FormattingOptions {
    fn from(config: &FormattingConfig) -> Self {
        FormattingOptions {
            indent_width: config.indent_width,
            line_ending: config.line_ending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Shown by editors as the origin of each diagnostic
    pub source: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            source: "scl".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Upper bound on the items returned for one request
    pub max_items: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self { max_items: 200 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SclConfig {
    pub formatting: FormattingConfig,
    pub diagnostics: DiagnosticsConfig,
    pub completion: CompletionConfig,
}

impl SclConfig {
    pub fn builder() -> SclConfigBuilder {
        SclConfigBuilder::default()
    }

    /// Load from the default file, `.env` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn formatting_options(&self) -> FormattingOptions {
        FormattingOptions::from(&self.formatting)
    }

    /// Settings sent by an editor, e.g. LSP initialization options. Missing
    /// fields keep their defaults.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: SclConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=16).contains(&self.formatting.indent_width) {
            return Err(ConfigError::Invalid(format!(
                "formatting.indent_width must be between 1 and 16, got {}",
                self.formatting.indent_width
            )));
        }
        if self.completion.max_items == 0 {
            return Err(ConfigError::Invalid(
                "completion.max_items must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone)]
pub struct SclConfigBuilder {
    config_path: Option<PathBuf>,
    read_environment: bool,
}

impl Default for SclConfigBuilder {
    fn default() -> Self {
        Self {
            config_path: None,
            read_environment: true,
        }
    }
}

impl SclConfigBuilder {
    /// Explicit config file; `None` falls back to `scl.toml` if present
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Whether `.env` and `SCL_*` variables are read
    pub fn read_environment(mut self, read: bool) -> Self {
        self.read_environment = read;
        self
    }

    pub fn build(self) -> Result<SclConfig, ConfigError> {
        if self.read_environment {
            if let Ok(path) = dotenvy::dotenv() {
                debug!(path = %path.display(), "loaded .env file");
            }
        }

        let defaults = SclConfig::default();
        let mut builder = config::Config::builder()
            .set_default("formatting.indent_width", defaults.formatting.indent_width as i64)?
            .set_default("formatting.line_ending", "auto")?
            .set_default("diagnostics.source", defaults.diagnostics.source.clone())?
            .set_default("completion.max_items", defaults.completion.max_items as i64)?;

        match &self.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.clone()));
                }
                debug!(path = %path.display(), "reading config file");
                builder = builder.add_source(
                    config::File::from(path.clone())
                        .format(config::FileFormat::Toml)
                        .required(true),
                );
            }
            None => {
                builder = builder.add_source(
                    config::File::from(Path::new(DEFAULT_CONFIG_FILE))
                        .format(config::FileFormat::Toml)
                        .required(false),
                );
            }
        }

        if self.read_environment {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: SclConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
