//! Configuration file parsing for trycatch.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,

    /// Demo runner settings
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive added on top of `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

/// Demo runner configuration.
#[derive(Debug, Default, Deserialize)]
pub struct DemoConfig {
    /// Scenarios to run when none are given on the command line (empty = all)
    #[serde(default)]
    pub scenarios: Vec<String>,
}

fn default_filter() -> String {
    "info".to_string()
}

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map(PathBuf::from).or_else(find_config_file);

    match config_path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            Ok(config)
        }
        Some(path) => Err(anyhow::anyhow!("Config file not found: {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Search for configuration file in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;

    const CONFIG_NAMES: &[&str] = &["trycatch.toml", ".trycatchrc.toml"];

    let mut dir = Some(cwd.as_path());
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }
    None
}
