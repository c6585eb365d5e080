//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default marker file name, relative to the project root
pub const DEFAULT_MARKER_FILE: &str = ".jolt-marker.tmp";

/// Default heartbeat period (one minute)
pub const DEFAULT_HEARTBEAT_MS: u64 = 60_000;

/// Default slack readers add on top of the heartbeat period
pub const DEFAULT_STALE_TOLERANCE_MS: u64 = 10_000;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Marker file configuration
    #[serde(default)]
    pub marker: MarkerConfig,
    /// Session classification rules
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Marker file configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Marker file name, relative to the project root
    #[serde(default = "default_marker_file")]
    pub file: String,
    /// Milliseconds between heartbeat refreshes
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
    /// Extra milliseconds past the heartbeat period before a marker counts as stale
    #[serde(default = "default_stale_tolerance_ms")]
    pub stale_tolerance_ms: u64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            file: default_marker_file(),
            heartbeat_ms: default_heartbeat_ms(),
            stale_tolerance_ms: default_stale_tolerance_ms(),
        }
    }
}

impl MarkerConfig {
    /// Heartbeat period. A `0` set directly on the struct means the default.
    pub fn heartbeat_period(&self) -> Duration {
        match self.heartbeat_ms {
            0 => Duration::from_millis(DEFAULT_HEARTBEAT_MS),
            ms => Duration::from_millis(ms),
        }
    }

    /// Age past which a reader should treat the marker as possibly dead.
    pub fn stale_after(&self) -> Duration {
        self.heartbeat_period() + Duration::from_millis(self.stale_tolerance_ms)
    }
}

fn default_marker_file() -> String {
    DEFAULT_MARKER_FILE.to_string()
}

fn default_heartbeat_ms() -> u64 {
    DEFAULT_HEARTBEAT_MS
}

fn default_stale_tolerance_ms() -> u64 {
    DEFAULT_STALE_TOLERANCE_MS
}

/// One environment-variable check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "lowercase")]
pub enum EnvRule {
    /// Variable is set to a non-empty value
    Present { var: String },
    /// Variable equals `value` (ASCII case-insensitive)
    Equals { var: String, value: String },
    /// Variable is `1`, `true`, `yes` or `on`
    Affirmative { var: String },
}

impl EnvRule {
    pub fn present(var: &str) -> Self {
        EnvRule::Present {
            var: var.to_string(),
        }
    }

    pub fn equals(var: &str, value: &str) -> Self {
        EnvRule::Equals {
            var: var.to_string(),
            value: value.to_string(),
        }
    }

    pub fn affirmative(var: &str) -> Self {
        EnvRule::Affirmative {
            var: var.to_string(),
        }
    }

    /// Name of the variable this rule inspects
    pub fn var(&self) -> &str {
        match self {
            EnvRule::Present { var }
            | EnvRule::Equals { var, .. }
            | EnvRule::Affirmative { var } => var,
        }
    }

    /// Evaluate the rule against a variable's value (`None` when unset)
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value.map(str::trim) else {
            return false;
        };
        match self {
            EnvRule::Present { .. } => !value.is_empty(),
            EnvRule::Equals { value: expected, .. } => value.eq_ignore_ascii_case(expected),
            EnvRule::Affirmative { .. } => matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
        }
    }
}

/// Session classification rules, evaluated in field order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Explicit "this is only a tooling ping" overrides
    #[serde(default = "default_ping")]
    pub ping: Vec<EnvRule>,
    /// Test runner markers
    #[serde(default = "default_test_runner")]
    pub test_runner: Vec<EnvRule>,
    /// Editor / IDE host markers
    #[serde(default = "default_editor")]
    pub editor: Vec<EnvRule>,
    /// Substrings of the parent command line that identify tooling processes
    #[serde(default = "default_tooling_processes")]
    pub tooling_processes: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ping: default_ping(),
            test_runner: default_test_runner(),
            editor: default_editor(),
            tooling_processes: default_tooling_processes(),
        }
    }
}

fn default_ping() -> Vec<EnvRule> {
    vec![EnvRule::affirmative("JOLT_TOOLING_PING")]
}

fn default_test_runner() -> Vec<EnvRule> {
    vec![
        EnvRule::present("VITEST"),
        EnvRule::equals("NODE_ENV", "test"),
        EnvRule::present("VITEST_WORKER_ID"),
        EnvRule::present("JEST_WORKER_ID"),
    ]
}

fn default_editor() -> Vec<EnvRule> {
    vec![
        EnvRule::present("VSCODE_PID"),
        EnvRule::present("VSCODE_AMD_ENTRYPOINT"),
        EnvRule::present("VSCODE_ESM_ENTRYPOINT"),
    ]
}

fn default_tooling_processes() -> Vec<String> {
    ["vitest", "jest", "vite-node", "tsserver"]
        .into_iter()
        .map(String::from)
        .collect()
}
