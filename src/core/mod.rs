/*!
 * Core Module
 * Fundamental scheduler types, limits, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod types;
pub mod wait;

// Re-export for convenience
pub use config::RuntimeConfig;
pub use errors::*;
pub use types::*;
pub use wait::sleep_uninterruptible;
