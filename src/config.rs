//! Configuration loading.
//!
//! Configuration sources (highest priority first):
//! 1. Explicit path (`--config`)
//! 2. Environment variable (PARLEY_CONFIG)
//! 3. Config file (.parley/config.yaml in the current directory or a parent)
//! 4. Home config file (~/.parley/config.yaml)
//! 5. Defaults
//!
//! The event log path can be overridden by PARLEY_LOG. A relative `log_file`
//! in a config file is resolved against the directory containing `.parley/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::ResponderConfig;

const CONFIG_DIR: &str = ".parley";
const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_LOG_FILE: &str = "events.log";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Event log location
    #[serde(default)]
    pub log_file: Option<String>,

    /// Responses, keywords, and pacing
    #[serde(flatten)]
    pub responder: ResponderConfig,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Path the event log is appended to
    pub log_file: PathBuf,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,

    /// Validated responder settings
    pub responder: ResponderConfig,
}

/// Find config file by searching the current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE);
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn parse_config(content: &str) -> Result<ConfigFile> {
    // An empty file is a valid "all defaults" config
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Directory relative paths in a config file are resolved against: the
/// parent of `.parley/`, or the file's own directory otherwise.
fn config_base_dir(config_path: &Path) -> PathBuf {
    let dir = config_path.parent().unwrap_or(Path::new("."));
    if dir.file_name().map(|n| n == CONFIG_DIR).unwrap_or(false) {
        dir.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

/// Load configuration from all sources
pub fn load_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let config_file = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::var_os("PARLEY_CONFIG")
            .map(PathBuf::from)
            .or_else(find_config_file),
    };

    let (file, base_dir) = match config_file {
        Some(ref path) => (load_config_file(path)?, config_base_dir(path)),
        None => (ConfigFile::default(), std::env::current_dir().context("Failed to determine current directory")?),
    };

    let log_file = if let Ok(env_log) = std::env::var("PARLEY_LOG") {
        PathBuf::from(env_log)
    } else if let Some(ref log_path) = file.log_file {
        resolve_path(&base_dir, log_path)
    } else {
        base_dir.join(DEFAULT_LOG_FILE)
    };

    file.responder.validate().context("Invalid responder configuration")?;

    Ok(ResolvedConfig {
        log_file,
        config_file,
        responder: file.responder,
    })
}
