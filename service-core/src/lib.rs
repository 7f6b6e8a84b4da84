//! service-core: Shared infrastructure for the field settlement workspace.
pub mod config;
pub mod error;
pub mod observability;

pub use tracing;
