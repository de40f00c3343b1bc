//! CLI command implementations.

pub mod config;
pub mod process;

// Re-export submodules for convenience
pub use config::ConfigArgs;
pub use process::ProcessArgs;
