//! Logging setup shared by every consumer of the allocation engine.
pub mod config;
pub mod tracing;

pub use config::Config;
