//! Application-level configuration.
//!
//! - [`ReviewConfig`]: the explicit per-run configuration (PR, token, bounds)
//! - [`SessionParams`]: handshake and call timeouts

pub mod review_config;
pub mod session_params;

pub use review_config::{ConfigError, ReviewConfig};
pub use session_params::SessionParams;
