//! Per-chain connectivity status.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Connectivity of one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// Connected and serving requests
    Connected,
    /// Connection lost
    Disconnected,
    /// Connection attempt in flight
    Connecting,
    /// Automatic recovery gave up; needs a manual reconnect
    Unstable,
}

impl ConnectionStatus {
    /// True when the chain needs a user-triggered reconnect
    pub fn needs_manual_recovery(&self) -> bool {
        matches!(self, Self::Unstable)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Unstable => write!(f, "unstable"),
        }
    }
}

/// `chain slug -> status`
pub type ConnectionStatusMap = BTreeMap<String, ConnectionStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionStatus::Unstable.to_string(), "unstable");
    }

    #[test]
    fn test_unstable_is_distinguishable() {
        assert!(ConnectionStatus::Unstable.needs_manual_recovery());
        assert!(!ConnectionStatus::Connecting.needs_manual_recovery());
        assert!(!ConnectionStatus::Disconnected.needs_manual_recovery());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&ConnectionStatus::Unstable).unwrap();
        assert_eq!(json, "\"UNSTABLE\"");
    }
}
