//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::{read_config_file, ConfigError, ConfigResult, MonkeyConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "monkey.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.monkey/config.toml) - lowest priority
/// 2. Project config (nearest monkey.toml) - overrides global
/// 3. Environment variables (MONKEY_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
///
/// Files are merged key by key, so a project file that only sets
/// `vm.max_frames` keeps every other global setting.
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: MonkeyConfig,

    /// Directory holding the monkey.toml that was used, if any
    pub project_root: Option<PathBuf>,

    /// Files that contributed, lowest priority first
    pub sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use `path` instead of ~/.monkey/config.toml
    pub fn with_global_config(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find monkey.toml, layers it over the
    /// global config and applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<LoadedConfig> {
        let project = find_project_config(start_dir);
        self.load_layers(project)
    }

    /// Load configuration using a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<LoadedConfig> {
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path.to_path_buf()));
        }
        self.load_layers(Some(config_path.to_path_buf()))
    }

    fn load_layers(&mut self, project: Option<PathBuf>) -> ConfigResult<LoadedConfig> {
        let mut merged = toml::Table::new();
        let mut sources = Vec::new();

        if let Some(global) = self.global_config_file() {
            merge_tables(&mut merged, read_table(&global)?);
            sources.push(global);
        }

        let project_root = match project {
            Some(path) => {
                merge_tables(&mut merged, read_table(&path)?);
                let root = path.parent().map(Path::to_path_buf);
                sources.push(path);
                root
            }
            None => None,
        };

        let file = sources.last().cloned().unwrap_or_default();
        let mut config: MonkeyConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|error| ConfigError::TomlParseError { file, error })?;

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(LoadedConfig {
            config,
            project_root,
            sources,
        })
    }

    /// The global config file, when one exists
    fn global_config_file(&mut self) -> Option<PathBuf> {
        if self.global_config_path.is_none() {
            self.global_config_path = Self::global_config_dir()
                .ok()
                .map(|dir| dir.join("config.toml"));
        }

        self.global_config_path
            .as_ref()
            .filter(|path| path.exists())
            .cloned()
    }

    /// Get the global configuration directory (~/.monkey)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".monkey"))
    }

    /// Ensure global configuration directory exists
    pub fn ensure_global_config_dir() -> ConfigResult<PathBuf> {
        let dir = Self::global_config_dir()?;
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadedConfig {
    /// Check if a monkey.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

/// Walk up from `start_dir` to the nearest monkey.toml
fn find_project_config(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|path| path.is_file())
}

/// Parse one file, checking it against the schema on its own so errors name the file
fn read_table(path: &Path) -> ConfigResult<toml::Table> {
    let content = read_config_file(path)?;
    let parse_error = |error| ConfigError::TomlParseError {
        file: path.to_path_buf(),
        error,
    };

    toml::from_str::<MonkeyConfig>(&content).map_err(parse_error)?;
    toml::from_str::<toml::Table>(&content).map_err(parse_error)
}

/// Overlay `overlay` onto `base`, recursing into nested tables
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides
///
/// Recognized variables: MONKEY_STACK_SIZE, MONKEY_MAX_FRAMES,
/// MONKEY_GLOBALS_SIZE, MONKEY_HISTORY_FILE and MONKEY_NO_HISTORY.
fn apply_env_overrides(config: &mut MonkeyConfig) -> ConfigResult<()> {
    if let Some(n) = env_usize("MONKEY_STACK_SIZE")? {
        config.vm.stack_size = n;
    }
    if let Some(n) = env_usize("MONKEY_MAX_FRAMES")? {
        config.vm.max_frames = n;
    }
    if let Some(n) = env_usize("MONKEY_GLOBALS_SIZE")? {
        config.vm.globals_size = n;
    }

    if let Ok(path) = env::var("MONKEY_HISTORY_FILE") {
        config.repl.history_file = Some(PathBuf::from(path));
    }
    if let Ok(flag) = env::var("MONKEY_NO_HISTORY") {
        if matches!(flag.to_lowercase().as_str(), "true" | "1" | "yes") {
            config.repl.history = false;
        }
    }

    Ok(())
}

fn env_usize(name: &str) -> ConfigResult<Option<usize>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                reason: format!("expected a non-negative integer, got '{}'", raw),
            }),
        Err(_) => Ok(None),
    }
}
