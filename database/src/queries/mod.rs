//! Catalog query modules, one per entity family
//!
//! Every function takes the pool and returns catalog types from
//! `appcatalog-core`. Multi-row writes run in a single transaction and
//! updates replace child collections wholesale.

use anyhow::Context;
use appcatalog_core::{Error, Result};
use tracing::error;

pub mod application_deployments;
pub mod application_interfaces;
pub mod compute_resources;
pub mod gateway_profiles;
pub mod group_profiles;
pub mod parsers;
pub mod resource_job_managers;
pub mod storage_resources;
pub mod submissions;
pub mod user_profiles;

// Re-export commonly used functions for convenience
pub use application_deployments::*;
pub use application_interfaces::*;
pub use compute_resources::*;
pub use gateway_profiles::*;
pub use group_profiles::*;
pub use parsers::*;
pub use resource_job_managers::*;
pub use storage_resources::*;
pub use submissions::*;
pub use user_profiles::*;

/// Attach context to a sqlx failure, log it and turn it into the crate error
pub(crate) trait DbResultExt<T> {
    fn db_context(self, context: &'static str) -> Result<T>;
}

impl<T> DbResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn db_context(self, context: &'static str) -> Result<T> {
        self.context(context).map_err(|e| {
            let message = format!("{:#}", e);
            error!(error = %message, "Database operation failed");
            Error::DatabaseError(message)
        })
    }
}

/// Reject input that fails a `validate()` check
pub(crate) fn validation(result: std::result::Result<(), String>) -> Result<()> {
    result.map_err(|e| {
        error!(error = %e, "Rejected invalid catalog input");
        Error::ValidationError(e)
    })
}
