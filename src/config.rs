//! Session configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via FSML_CONFIG or --config)
//! 3. Environment variables

use fsml_core::{EntryActions, InterpreterOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpretation session settings.
    pub session: SessionConfig,
    /// Code generation settings.
    pub generator: GeneratorConfig,
}

impl Config {
    /// Loads configuration from `path` (or FSML_CONFIG when `path` is
    /// `None`), then applies environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var("FSML_CONFIG") {
                Ok(path) => Self::from_file(&path)?,
                Err(_) => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        self.session.apply_overrides(&var);
        self.generator.apply_overrides(&var);
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Interpretation session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// When state entry actions run.
    pub entry_actions: EntryActions,
    /// Whether timeout actions actually pause.
    pub honor_delays: bool,
    /// Refuse to start when validation reports errors.
    pub strict: bool,
    /// Treat validation warnings as errors.
    pub warnings_as_errors: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            entry_actions: EntryActions::InitialOnly,
            honor_delays: true,
            strict: true,
            warnings_as_errors: false,
        }
    }
}

impl SessionConfig {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(policy) = var("FSML_ENTRY_ACTIONS") {
            match policy.to_lowercase().as_str() {
                "initial_only" | "initialonly" => self.entry_actions = EntryActions::InitialOnly,
                "every_entry" | "everyentry" => self.entry_actions = EntryActions::EveryEntry,
                other => tracing::warn!("ignoring FSML_ENTRY_ACTIONS={}", other),
            }
        }

        if let Some(honor) = var("FSML_HONOR_DELAYS") {
            self.honor_delays = parse_flag(&honor);
        }

        if let Some(strict) = var("FSML_STRICT") {
            self.strict = parse_flag(&strict);
        }

        if let Some(werror) = var("FSML_WARNINGS_AS_ERRORS") {
            self.warnings_as_errors = parse_flag(&werror);
        }
    }

    /// Interpreter options for this session.
    pub fn interpreter_options(&self) -> InterpreterOptions {
        InterpreterOptions {
            entry_actions: self.entry_actions,
            honor_delays: self.honor_delays,
        }
    }
}

/// Code generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Directory generated sources are written to.
    pub out_dir: PathBuf,
    /// File extension of generated sources.
    pub extension: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("./generated"),
            extension: "cpp".to_string(),
        }
    }
}

impl GeneratorConfig {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("FSML_OUT_DIR") {
            self.out_dir = PathBuf::from(dir);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.to_lowercase() == "true"
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
