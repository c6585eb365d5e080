//! Configuration discovery and resolution

use super::types::{Config, EnvRule};
use crate::home::global_config_path;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Repo-local config file name
pub const REPO_CONFIG_FILE: &str = ".jolt-marker.toml";

/// Overrides the marker file name
pub const ENV_MARKER_FILE: &str = "JOLT_MARKER_FILE";

/// Overrides the heartbeat period in milliseconds
pub const ENV_HEARTBEAT_MS: &str = "JOLT_MARKER_HEARTBEAT_MS";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a config file
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parsing error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Programmatic overrides supplied by the host
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Override marker file name
    pub marker_file: Option<String>,
    /// Override heartbeat period
    pub heartbeat_ms: Option<u64>,
    /// Explicit config file; replaces repo-local discovery and must parse
    pub config_path: Option<PathBuf>,
}

/// On-disk layer: every field optional so a file only overrides what it names
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    marker: Option<FileMarkerConfig>,
    #[serde(default)]
    classifier: Option<FileClassifierConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileMarkerConfig {
    file: Option<String>,
    heartbeat_ms: Option<u64>,
    stale_tolerance_ms: Option<u64>,
}

/// Classifier lists replace per list; lists a file leaves out keep the lower layer's
#[derive(Debug, Default, Deserialize)]
struct FileClassifierConfig {
    ping: Option<Vec<EnvRule>>,
    test_runner: Option<Vec<EnvRule>>,
    editor: Option<Vec<EnvRule>>,
    tooling_processes: Option<Vec<String>>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. `overrides`
/// 2. Environment variables (`JOLT_MARKER_FILE`, `JOLT_MARKER_HEARTBEAT_MS`)
/// 3. Repo-local `.jolt-marker.toml` (project root up to the git root), or
///    `overrides.config_path` when given
/// 4. Global `~/.config/jolt/marker.toml`
/// 5. Defaults
///
/// Discovered files that fail to parse are skipped with a warning.
///
/// # Errors
///
/// Returns an error only when `overrides.config_path` is set and that file
/// cannot be read or parsed.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    project_root: &Path,
    home_dir: Option<&Path>,
) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    // 4. Global config
    if let Some(home) = home_dir {
        let global_path = global_config_path(home);
        if global_path.exists() {
            match load_config_file(&global_path) {
                Ok(file_config) => merge_config(&mut config, file_config, &global_path),
                Err(e) => warn!("Skipping global marker config: {e}"),
            }
        }
    }

    // 3. Explicit or repo-local config
    if let Some(path) = &overrides.config_path {
        merge_config(&mut config, load_config_file(path)?, path);
    } else if let Some(repo_config) = find_repo_local_config(project_root) {
        match load_config_file(&repo_config) {
            Ok(file_config) => merge_config(&mut config, file_config, &repo_config),
            Err(e) => warn!("Skipping repo marker config: {e}"),
        }
    }

    // 2. Environment variables
    apply_env_overrides(&mut config);

    // 1. Programmatic overrides
    apply_overrides(&mut config, overrides);

    Ok(config)
}

/// Find repo-local config file
///
/// Searches the project root and its parents, stopping at the git root.
fn find_repo_local_config(project_root: &Path) -> Option<PathBuf> {
    let mut dir = project_root;

    loop {
        let config_path = dir.join(REPO_CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if dir.join(".git").exists() {
            break;
        }

        dir = dir.parent()?;
    }

    None
}

fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&contents).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn merge_config(base: &mut Config, file: FileConfig, source: &Path) {
    if let Some(marker) = file.marker {
        if let Some(name) = marker.file {
            base.marker.file = name;
        }
        if let Some(ms) = marker.heartbeat_ms {
            set_heartbeat_ms(base, ms, &source.display().to_string());
        }
        if let Some(ms) = marker.stale_tolerance_ms {
            base.marker.stale_tolerance_ms = ms;
        }
    }

    if let Some(classifier) = file.classifier {
        if let Some(rules) = classifier.ping {
            base.classifier.ping = rules;
        }
        if let Some(rules) = classifier.test_runner {
            base.classifier.test_runner = rules;
        }
        if let Some(rules) = classifier.editor {
            base.classifier.editor = rules;
        }
        if let Some(patterns) = classifier.tooling_processes {
            base.classifier.tooling_processes = patterns;
        }
    }
}

/// A zero period would rewrite the marker continuously; keep the lower layer's value.
fn set_heartbeat_ms(config: &mut Config, ms: u64, source: &str) {
    if ms == 0 {
        warn!(
            "Ignoring heartbeat_ms = 0 from {source}; keeping {} ms",
            config.marker.heartbeat_ms
        );
        return;
    }
    config.marker.heartbeat_ms = ms;
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(name) = std::env::var(ENV_MARKER_FILE) {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            config.marker.file = trimmed.to_string();
        }
    }

    if let Ok(raw) = std::env::var(ENV_HEARTBEAT_MS) {
        match raw.trim().parse::<u64>() {
            Ok(ms) => set_heartbeat_ms(config, ms, ENV_HEARTBEAT_MS),
            Err(_) => warn!("Ignoring {ENV_HEARTBEAT_MS}={raw:?}: not a number of milliseconds"),
        }
    }
}

fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(ref name) = overrides.marker_file {
        config.marker.file = name.clone();
    }

    if let Some(ms) = overrides.heartbeat_ms {
        set_heartbeat_ms(config, ms, "host overrides");
    }
}
