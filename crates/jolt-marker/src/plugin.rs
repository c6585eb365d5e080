//! Dev-server marker hook for the host build tool

use crate::host::{HookError, HookMetadata, HostCommand, HostContext, HostHooks};
use crate::manager::{LifecycleManager, StartOutcome};
use jolt_marker_core::config::{Config, ConfigOverrides, resolve_config};
use jolt_marker_core::home::get_home_dir;
use std::path::Path;
use tracing::{debug, warn};

/// Hook name reported to the host
pub const HOOK_NAME: &str = "jolt-dev-server-marker";

/// Writes the liveness marker while the host's dev server runs.
pub struct DevServerMarkerPlugin {
    manager: LifecycleManager,
}

impl DevServerMarkerPlugin {
    pub fn new(config: Config) -> Self {
        Self::with_manager(LifecycleManager::new(config))
    }

    /// Resolve configuration for `root` (global, repo-local, env, overrides).
    pub fn from_project(root: &Path, overrides: &ConfigOverrides) -> Result<Self, HookError> {
        let home = get_home_dir();
        let config =
            resolve_config(overrides, root, home.as_deref()).map_err(|e| HookError::Config {
                message: format!("failed to resolve marker config for {}", root.display()),
                source: Some(Box::new(e)),
            })?;
        Ok(Self::new(config))
    }

    /// Inject a prepared manager (custom environment or termination guard)
    pub fn with_manager(manager: LifecycleManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &LifecycleManager {
        &self.manager
    }
}

impl HostHooks for DevServerMarkerPlugin {
    fn metadata(&self) -> HookMetadata {
        HookMetadata {
            name: HOOK_NAME,
            version: env!("CARGO_PKG_VERSION"),
            description: "Advertises a running dev server through a marker file in the project root",
        }
    }

    fn config_resolved(&mut self, command: HostCommand) {
        debug!("Host resolved config for {:?}", command);
        self.manager.set_command(command);
    }

    async fn session_start(&mut self, ctx: &HostContext) -> Result<(), HookError> {
        match self.manager.start_session(ctx) {
            StartOutcome::Started { .. } | StartOutcome::NotServe | StartOutcome::Probe(_) => {}
            StartOutcome::AlreadyActive | StartOutcome::AlreadyTerminated => {
                debug!("session_start ignored; session already {:?}", self.manager.state());
            }
        }
        Ok(())
    }

    async fn session_end(&mut self) -> Result<(), HookError> {
        self.manager.end_session().map_err(|e| {
            warn!("Failed to remove dev-server marker: {}", e);
            HookError::Cleanup {
                message: "failed to remove dev-server marker".to_string(),
                source: Some(Box::new(e)),
            }
        })
    }
}
