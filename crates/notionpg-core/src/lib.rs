//! Import engine for mirroring a Notion database into a PostgreSQL table.
//!
//! The pipeline is: fetch every page of the database (paginated, throttled,
//! retried), normalize each property value into a canonical in-memory shape,
//! infer one PostgreSQL column type per property from the values observed
//! across all pages, and bulk-load the result into a freshly created table.
//! Each run is a full refresh; there is no incremental sync.

pub mod assemble;
pub mod context;
pub mod error;
pub mod ident;
pub mod infer;
pub mod notion;
pub mod pg;
pub mod sanitize;
pub mod value;

pub use assemble::{assemble, Column, Table};
pub use context::RunContext;
pub use error::{ImportError, Result};
