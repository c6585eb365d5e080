//! Boundary to the host build tool's hook framework

pub mod traits;
pub mod types;

pub use traits::HostHooks;
pub use types::{HookError, HookMetadata, HostCommand, HostContext};
