use std::path::PathBuf;

/// Hook identity as reported to the host
#[derive(Debug, Clone)]
pub struct HookMetadata {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

/// Which command the host build tool resolved its configuration for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Interactive dev server
    Serve,
    /// One-shot production build
    Build,
    /// Anything else (preview, optimize, ...)
    Other,
}

impl HostCommand {
    pub fn is_serve(self) -> bool {
        matches!(self, HostCommand::Serve)
    }
}

/// What the host knows when a session starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    /// Project root; the marker is written here
    pub root: PathBuf,
    /// Port the dev server bound to, if it is known yet
    pub server_port: Option<u16>,
}

impl HostContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            server_port: None,
        }
    }

    pub fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = Some(port);
        self
    }
}

/// Hook errors with structured variants
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("marker config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("marker cleanup failed: {message}")]
    Cleanup {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}
