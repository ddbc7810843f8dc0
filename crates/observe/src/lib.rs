//! Logging and metrics plumbing shared by the binaries of this workspace.
//! Components only emit `tracing` events and register metric storages; the
//! binaries decide how those get formatted and where they end up.
pub mod config;
pub mod metrics;
pub mod tracing;

pub use config::Config;
