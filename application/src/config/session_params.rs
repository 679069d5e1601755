//! Session parameters - handshake and call bounds.
//!
//! [`SessionParams`] groups the static limits applied by the client session.
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds applied to a tool session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Maximum time to wait for the provider's handshake response.
    pub handshake_timeout: Duration,
    /// Maximum time to wait for any single call's response.
    pub call_timeout: Duration,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl SessionParams {
    // ==================== Builder Methods ====================

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = SessionParams::default();
        assert_eq!(params.handshake_timeout, Duration::from_secs(10));
        assert_eq!(params.call_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_builder() {
        let params = SessionParams::default()
            .with_handshake_timeout(Duration::from_millis(50))
            .with_call_timeout(Duration::from_millis(200));
        assert_eq!(params.handshake_timeout, Duration::from_millis(50));
        assert_eq!(params.call_timeout, Duration::from_millis(200));
    }
}
