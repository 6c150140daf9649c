//! Core library for the application catalog
//!
//! This crate defines the catalog description types, the shared error type,
//! id helpers and the remote command execution utilities used by the
//! database and server crates.

pub mod catalog;
pub mod cluster;
pub mod error;
pub mod ids;
pub mod remote;
pub mod types;

// Re-exports
pub use catalog::*;
pub use cluster::{Cluster, JobDescriptor, JobStatus, PbsCluster};
pub use error::{Error, Result};
pub use ids::{ensure_id, generate_id, is_unset_id, now_millis, DEFAULT_ID};
pub use remote::{CommandExecutor, CommandRunner, RemoteSession};
pub use types::{AuthenticationInfo, CommandOutput, ServerInfo};
