//! Core types for the jolt dev-server liveness marker
//!
//! A running dev server advertises itself to editors and other tooling through
//! a single marker file in the project root (`.jolt-marker.tmp` by default).
//! This crate owns everything about that file that does not need an async
//! runtime:
//!
//! - [`schema::MarkerRecord`]: the persisted record
//! - [`io::MarkerStore`]: atomic write and idempotent delete
//! - [`classify`]: deciding whether an invocation is a real dev session
//! - [`config`]: layered configuration resolution
//! - [`inspect`]: the consumer-side "is it still alive?" check
//!
//! The lifecycle (heartbeat, signal handling, host hooks) lives in the
//! `jolt-marker` crate.

pub mod classify;
pub mod config;
pub mod home;
pub mod inspect;
pub mod io;
pub mod logging;
pub mod schema;

pub use classify::{EnvSource, ProbeReason, ProcessEnv, Verdict};
pub use io::{MarkerError, MarkerStore};
pub use schema::MarkerRecord;
