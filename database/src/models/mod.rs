//! Database row models
//!
//! Each row type mirrors one table. Conversions into the catalog types fill
//! scalar fields only; the query layer attaches child collections.

pub mod application;
pub mod compute;
pub mod group;
pub mod parser;
pub mod profile;
pub mod storage;

pub use application::*;
pub use compute::*;
pub use group::*;
pub use parser::*;
pub use profile::*;
pub use storage::*;
