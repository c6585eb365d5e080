use super::{HookError, HookMetadata, HostCommand, HostContext};
use std::future::Future;

/// Lifecycle callbacks a host build tool drives.
///
/// Lifecycle: config_resolved() → session_start() → session_end()
///
/// Uses RPITIT (Return Position Impl Trait in Traits) with explicit Send bounds.
pub trait HostHooks: Send {
    /// Return hook identity.
    fn metadata(&self) -> HookMetadata;

    /// The host resolved its configuration for `command`. Called before
    /// `session_start`.
    fn config_resolved(&mut self, command: HostCommand);

    /// The build pipeline started. Fires for every invocation, not just dev
    /// servers; implementations decide whether it is a real session.
    fn session_start(
        &mut self,
        ctx: &HostContext,
    ) -> impl Future<Output = Result<(), HookError>> + Send;

    /// The build pipeline ended (clean shutdown from the host).
    fn session_end(&mut self) -> impl Future<Output = Result<(), HookError>> + Send;
}
