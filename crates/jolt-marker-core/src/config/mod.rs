//! Configuration resolution
//!
//! Resolves configuration from multiple sources with priority:
//! 1. Programmatic overrides (passed by the host)
//! 2. Environment variables
//! 3. Repo-local config (`.jolt-marker.toml`)
//! 4. Global config (`~/.config/jolt/marker.toml`)
//! 5. Defaults

mod discovery;
mod types;

pub use discovery::{
    ConfigError, ConfigOverrides, ENV_HEARTBEAT_MS, ENV_MARKER_FILE, REPO_CONFIG_FILE,
    resolve_config,
};
pub use types::{
    ClassifierConfig, Config, DEFAULT_HEARTBEAT_MS, DEFAULT_MARKER_FILE,
    DEFAULT_STALE_TOLERANCE_MS, EnvRule, MarkerConfig,
};
