//! reqgraph Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with defaults that match the reference extraction behaviour.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Extraction engine settings
    pub extraction: ExtractionConfig,

    /// External punctuation restorer
    pub punctuation: PunctuationConfig,

    /// Graph loading settings
    pub graph: GraphConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(profile) = std::env::var("REQGRAPH_PROFILE") {
            config.extraction.profile = profile.parse()?;
        }
        if let Ok(value) = std::env::var("REQGRAPH_RESTORE_PUNCT") {
            config.extraction.always_restore_punct = parse_bool("REQGRAPH_RESTORE_PUNCT", &value)?;
        }

        // Whitespace-separated argv, e.g. "python3 -m punct_restore"
        if let Ok(command) = std::env::var("PUNCTUATION_COMMAND") {
            let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            config.punctuation.command = if argv.is_empty() { None } else { Some(argv) };
        }
        if let Ok(value) = std::env::var("PUNCTUATION_TIMEOUT_SECS") {
            config.punctuation.timeout_secs =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "PUNCTUATION_TIMEOUT_SECS".to_string(),
                    value: value.clone(),
                })?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(value) = std::env::var("LOG_JSON") {
            config.logging.json_format = parse_bool("LOG_JSON", &value)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.extraction.profile != defaults.extraction.profile {
            self.extraction.profile = env_config.extraction.profile;
        }
        if env_config.extraction.always_restore_punct != defaults.extraction.always_restore_punct {
            self.extraction.always_restore_punct = env_config.extraction.always_restore_punct;
        }
        if env_config.punctuation.command.is_some() {
            self.punctuation.command = env_config.punctuation.command;
        }
        if env_config.punctuation.timeout_secs != defaults.punctuation.timeout_secs {
            self.punctuation.timeout_secs = env_config.punctuation.timeout_secs;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format != defaults.logging.json_format {
            self.logging.json_format = env_config.logging.json_format;
        }

        Ok(self)
    }

    /// Reject values the extractor cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.max_name_words == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extraction.max_name_words".to_string(),
                value: "0".to_string(),
            });
        }
        if matches!(&self.punctuation.command, Some(argv) if argv.is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "punctuation.command".to_string(),
                value: "[]".to_string(),
            });
        }
        if self.graph.scope_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired("graph.scope_key".to_string()));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Which pattern catalogue the extractor runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionProfile {
    /// Feature, Team, Requirement, Constraint, TestCase
    #[default]
    Basic,
    /// Basic plus Stakeholder and Design nodes and code-style ids
    Extended,
}

impl std::str::FromStr for ExtractionProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "extended" => Ok(Self::Extended),
            _ => Err(ConfigError::InvalidValue {
                key: "REQGRAPH_PROFILE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ExtractionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// Extraction engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Pattern catalogue to use
    pub profile: ExtractionProfile,

    /// Restore punctuation even when the text already looks punctuated
    pub always_restore_punct: bool,

    /// Word count above which sparse punctuation triggers restoration
    pub restore_min_words: usize,

    /// Restoration triggers below this many sentence-ending marks
    pub restore_max_marks: usize,

    /// Longest run of name words kept in front of a suffix word
    pub max_name_words: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            profile: ExtractionProfile::Basic,
            always_restore_punct: false,
            restore_min_words: 30,
            restore_max_marks: 3,
            max_name_words: 6,
        }
    }
}

/// External punctuation restorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PunctuationConfig {
    /// Program and arguments; reads text on stdin, writes restored text to stdout
    pub command: Option<Vec<String>>,

    /// Kill the restorer after this many seconds (0 waits forever)
    pub timeout_secs: u64,
}

impl PunctuationConfig {
    /// Restorer time limit, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for PunctuationConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_secs: 30,
        }
    }
}

/// Graph loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Also write OWNS / SUPPORTS / SATISFIED_BY for their forward edges
    pub materialize_inverse: bool,

    /// Property name used to tag nodes and edges with the recording id
    pub scope_key: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            materialize_inverse: false,
            scope_key: "recording_id".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl From<ConfigError> for crate::ReqGraphError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
