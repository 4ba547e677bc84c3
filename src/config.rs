//! Configuration file handling for pipeplot.
//!
//! Loads configuration from `<config_dir>/pipeplot/config.toml` or a custom
//! path. Every value is optional; command-line flags override the file and
//! the file overrides built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub synth: SynthConfig,
}

/// Warm-up collection.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CollectConfig {
    pub sample_size: Option<usize>,
    pub learn_timeout: Option<f64>,
    pub frame_stream: Option<bool>,
}

/// Plot window and redraw.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    pub window: Option<usize>,
    pub height: Option<usize>,
    pub refresh: Option<f64>,
}

/// Rule synthesis.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SynthConfig {
    pub model: Option<String>,
    pub prompt: Option<String>,
}

/// Template written by `pipeplot config init`.
pub const DEFAULT_CONFIG: &str = r#"# pipeplot configuration

[collect]
# Samples gathered before synthesizing extraction rules
sample_size = 5
# Seconds to wait for those samples
learn_timeout = 10.0
# Split input on screen-clear sequences instead of newlines
frame_stream = false

[view]
# Entries plotted at once
window = 200
# Plot height in terminal rows
height = 30
# Minimum seconds between redraws while live
refresh = 0.5

[synth]
# Model used to synthesize extraction rules
model = "gpt-5"
# Extra instruction appended to the synthesis prompt
# prompt = "plot resident memory only"
"#;

impl Config {
    /// Load configuration.
    ///
    /// With `path = None` the default location is used and a missing file
    /// yields the default config. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound { path });
            }
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Write [`DEFAULT_CONFIG`] to `path`, creating parent directories.
    /// Refuses to overwrite an existing file.
    pub fn init(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, DEFAULT_CONFIG).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    NotFound {
        path: PathBuf,
    },
    AlreadyExists {
        path: PathBuf,
    },
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::NotFound { path } => {
                write!(f, "Config file not found: {}", path.display())
            }
            ConfigError::AlreadyExists { path } => {
                write!(f, "Config file already exists: {}", path.display())
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("pipeplot").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/pipeplot/config.toml")
        })
}
