//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod rate_limiter;
pub mod retry;
pub mod stats;

// Re-exports for convenience
pub use error::{RelayError, RelayResult};
pub use logging::init_logger;
