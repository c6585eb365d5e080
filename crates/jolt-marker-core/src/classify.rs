//! Dev-session classification
//!
//! Build-tool hooks fire for far more than interactive dev servers: test
//! runners boot the pipeline, editors probe the config, CI runs one-shot
//! builds. Writing a marker for those tells external tools that a dev server
//! is up when none is. [`classify`] looks for the known false-positive
//! sources, in priority order, and returns the first one it finds:
//!
//! 1. explicit tooling-ping override
//! 2. test runner markers
//! 3. editor / IDE host markers
//! 4. parent command line containing a known tooling process name
//!
//! The rule lists come from [`ClassifierConfig`] and are expected to grow.
//! A miss means a marker gets written when it should not have been; it
//! never fails the host.

use crate::config::{ClassifierConfig, EnvRule};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Failure while inspecting the parent process. Never surfaced past
/// [`classify`].
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The parent pid is unknown on this platform
    #[error("parent process id unavailable")]
    NoParent,

    /// The parent process could not be found in the process table
    #[error("parent process {pid} not found")]
    ParentNotFound { pid: u32 },

    /// Any other inspection failure
    #[error("process inspection failed: {message}")]
    Inspect { message: String },
}

/// Read-only view of the process environment.
pub trait EnvSource {
    /// Value of an environment variable, `None` if unset or not unicode
    fn var(&self, name: &str) -> Option<String>;

    /// This process's id
    fn process_id(&self) -> u32;

    /// Parent process id, if the platform exposes it
    fn parent_process_id(&self) -> Option<u32>;

    /// Raw command line of the parent process, arguments joined by spaces
    fn parent_command(&self) -> Result<Option<String>, ClassifyError>;
}

/// Why an invocation was classified as a tooling probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReason {
    /// An explicit tooling-ping override was set
    Ping { var: String },
    /// A test runner marker was present
    TestRunner { var: String },
    /// An editor / IDE host marker was present
    Editor { var: String },
    /// The parent command line mentioned a tooling process
    ParentProcess { pattern: String },
}

impl fmt::Display for ProbeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeReason::Ping { var } => write!(f, "tooling ping override {var}"),
            ProbeReason::TestRunner { var } => write!(f, "test runner marker {var}"),
            ProbeReason::Editor { var } => write!(f, "editor host marker {var}"),
            ProbeReason::ParentProcess { pattern } => {
                write!(f, "parent process matches {pattern:?}")
            }
        }
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// An interactive dev session; the marker should be written
    RealSession,
    /// A tooling invocation; no marker
    Probe(ProbeReason),
}

impl Verdict {
    pub fn is_real_session(&self) -> bool {
        matches!(self, Verdict::RealSession)
    }
}

/// Classify the current invocation. Pure apart from reading `env`.
pub fn classify(config: &ClassifierConfig, env: &dyn EnvSource) -> Verdict {
    if let Some(var) = first_match(&config.ping, env) {
        return Verdict::Probe(ProbeReason::Ping { var });
    }
    if let Some(var) = first_match(&config.test_runner, env) {
        return Verdict::Probe(ProbeReason::TestRunner { var });
    }
    if let Some(var) = first_match(&config.editor, env) {
        return Verdict::Probe(ProbeReason::Editor { var });
    }
    if let Some(pattern) = parent_match(&config.tooling_processes, env) {
        return Verdict::Probe(ProbeReason::ParentProcess { pattern });
    }
    Verdict::RealSession
}

/// Shorthand for `classify(..).is_real_session()`.
pub fn is_real_session(config: &ClassifierConfig, env: &dyn EnvSource) -> bool {
    classify(config, env).is_real_session()
}

fn first_match(rules: &[EnvRule], env: &dyn EnvSource) -> Option<String> {
    rules
        .iter()
        .find(|rule| rule.matches(env.var(rule.var()).as_deref()))
        .map(|rule| rule.var().to_string())
}

fn parent_match(patterns: &[String], env: &dyn EnvSource) -> Option<String> {
    if patterns.is_empty() {
        return None;
    }

    let command = match env.parent_command() {
        Ok(Some(cmd)) => cmd.to_lowercase(),
        Ok(None) => return None,
        Err(e) => {
            debug!(error = %e, "parent process inspection failed; ignoring");
            return None;
        }
    };

    patterns
        .iter()
        .find(|p| !p.is_empty() && command.contains(&p.to_lowercase()))
        .cloned()
}

/// [`EnvSource`] backed by the real process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn process_id(&self) -> u32 {
        std::process::id()
    }

    fn parent_process_id(&self) -> Option<u32> {
        #[cfg(unix)]
        {
            Some(std::os::unix::process::parent_id())
        }

        #[cfg(not(unix))]
        {
            use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
            let mut sys = System::new();
            let me = Pid::from_u32(std::process::id());
            sys.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[me]),
                ProcessRefreshKind::new(),
            );
            sys.process(me)
                .and_then(|p| p.parent())
                .map(|pid| pid.as_u32())
        }
    }

    fn parent_command(&self) -> Result<Option<String>, ClassifyError> {
        use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

        let ppid = self.parent_process_id().ok_or(ClassifyError::NoParent)?;

        // Refresh only the parent; scanning the whole table is needless here
        let mut sys = System::new();
        let pid = Pid::from_u32(ppid);
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
        );

        let process = sys
            .process(pid)
            .ok_or(ClassifyError::ParentNotFound { pid: ppid })?;

        let cmd = process.cmd();
        if cmd.is_empty() {
            let name = process.name().to_string_lossy().into_owned();
            return Ok((!name.is_empty()).then_some(name));
        }
        let args: Vec<_> = cmd.iter().map(|a| a.to_string_lossy()).collect();
        Ok(Some(args.join(" ")))
    }
}

/// [`EnvSource`] with fixed contents, for tests and for hosts that capture the
/// environment up front.
#[derive(Debug, Clone)]
pub struct FixedEnv {
    vars: HashMap<String, String>,
    process_id: u32,
    parent_process_id: Option<u32>,
    parent_command: Result<Option<String>, String>,
}

impl Default for FixedEnv {
    fn default() -> Self {
        Self {
            vars: HashMap::new(),
            process_id: std::process::id(),
            parent_process_id: None,
            parent_command: Ok(None),
        }
    }
}

impl FixedEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_process_id(mut self, pid: u32) -> Self {
        self.process_id = pid;
        self
    }

    pub fn with_parent(mut self, ppid: u32, command: &str) -> Self {
        self.parent_process_id = Some(ppid);
        self.parent_command = Ok(Some(command.to_string()));
        self
    }

    /// Make parent inspection fail with `message`
    pub fn with_parent_error(mut self, message: &str) -> Self {
        self.parent_command = Err(message.to_string());
        self
    }
}

impl EnvSource for FixedEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn process_id(&self) -> u32 {
        self.process_id
    }

    fn parent_process_id(&self) -> Option<u32> {
        self.parent_process_id
    }

    fn parent_command(&self) -> Result<Option<String>, ClassifyError> {
        self.parent_command
            .clone()
            .map_err(|message| ClassifyError::Inspect { message })
    }
}
