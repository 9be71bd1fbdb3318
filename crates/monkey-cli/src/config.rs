//! CLI settings
//!
//! Layers command-line flags over the merged `monkey-config` configuration
//! and reads the few environment variables that only the CLI cares about.

use crate::LimitArgs;
use anyhow::{Context, Result};
use monkey_config::{ConfigLoader, MonkeyConfig};
use std::env;

/// Everything a subcommand needs to know about its environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub monkey: MonkeyConfig,
    /// Default to JSON diagnostic output (MONKEY_DIAGNOSTICS=json)
    pub default_json: bool,
}

impl Settings {
    pub fn load(limits: &LimitArgs) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        let loaded = match &limits.config {
            Some(path) => loader
                .load_from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => {
                let cwd = env::current_dir().context("Failed to read the working directory")?;
                loader
                    .load_from_directory(&cwd)
                    .context("Failed to load configuration")?
            }
        };

        let mut monkey = loaded.config;
        apply_limits(&mut monkey, limits);
        monkey.validate().context("Invalid command-line limits")?;

        Ok(Self {
            monkey,
            default_json: json_from_env(),
        })
    }
}

fn apply_limits(config: &mut MonkeyConfig, limits: &LimitArgs) {
    if let Some(stack_size) = limits.stack_size {
        config.vm.stack_size = stack_size;
    }
    if let Some(max_frames) = limits.max_frames {
        config.vm.max_frames = max_frames;
    }
}

fn json_from_env() -> bool {
    env::var("MONKEY_DIAGNOSTICS")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false)
}
