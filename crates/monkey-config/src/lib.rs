//! Monkey Configuration System
//!
//! Provides runtime and REPL settings for Monkey tools:
//! - VM limits (value stack, call depth, global slots)
//! - REPL preferences (prompt, history)
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config (~/.monkey/config.toml)
//! 3. Project config (nearest monkey.toml)
//! 4. Environment variables (MONKEY_*)
//! 5. CLI flags (handled by the caller)
//!
//! # Example
//!
//! ```no_run
//! use monkey_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let loaded = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("max frames: {}", loaded.config.vm.max_frames);
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default value stack capacity, in slots
pub const DEFAULT_STACK_SIZE: usize = 2048;
/// Default maximum call depth, root frame included
pub const DEFAULT_MAX_FRAMES: usize = 1024;
/// Default number of global slots; also the most a 16-bit operand can address
pub const DEFAULT_GLOBALS_SIZE: usize = 65536;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete settings for Monkey tools
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MonkeyConfig {
    pub vm: VmConfig,
    pub repl: ReplConfig,
}

/// Virtual machine limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct VmConfig {
    /// Value stack capacity
    pub stack_size: usize,
    /// Maximum call depth, counting the top-level frame
    pub max_frames: usize,
    /// Number of global slots
    pub globals_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            max_frames: DEFAULT_MAX_FRAMES,
            globals_size: DEFAULT_GLOBALS_SIZE,
        }
    }
}

impl VmConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("vm.stack_size", self.stack_size),
            ("vm.max_frames", self.max_frames),
            ("vm.globals_size", self.globals_size),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.globals_size > DEFAULT_GLOBALS_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "vm.globals_size".to_string(),
                reason: format!("must be at most {}", DEFAULT_GLOBALS_SIZE),
            });
        }

        Ok(())
    }
}

/// Interactive shell preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReplConfig {
    pub prompt: String,
    /// Persist input history between sessions
    pub history: bool,
    /// History location; defaults to ~/.monkey/history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: ">> ".to_string(),
            history: true,
            history_file: None,
        }
    }
}

impl ReplConfig {
    /// Where history should be read from and written to, if anywhere
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.history {
            return None;
        }
        match &self.history_file {
            Some(path) => Some(path.clone()),
            None => loader::ConfigLoader::global_config_dir()
                .ok()
                .map(|dir| dir.join("history")),
        }
    }

    /// Resolve the history file and create the directory it lives in
    ///
    /// The default location goes through the global config directory, which
    /// is created on first use.
    pub fn prepare_history_file(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.history {
            return Ok(None);
        }
        match &self.history_file {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(Some(path.clone()))
            }
            None => {
                let dir = loader::ConfigLoader::ensure_global_config_dir()?;
                Ok(Some(dir.join("history")))
            }
        }
    }
}

impl MonkeyConfig {
    /// Load a single configuration file, without merging
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = read_config_file(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.vm.validate()
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

pub(crate) fn read_config_file(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::IoError(e)
        }
    })
}

// Re-export main types
pub use loader::{ConfigLoader, LoadedConfig};
