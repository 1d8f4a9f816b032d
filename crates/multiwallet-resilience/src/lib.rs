//! # Multiwallet Resilience
//!
//! Keeps track of which chains are reachable and brings the broken ones back.
//!
//! - **Health tracking**: [`ConnectionHealthTracker`] publishes a status per
//!   chain and schedules automatic reconnects
//! - **Retry policy**: [`ReconnectPolicy`] holds the attempt budget and the two
//!   delay tiers
//! - **Timeouts**: [`with_connect_timeout`] bounds a single connect
//! - **Connection service**: [`ConnectionService`] drives adapters through
//!   connect, manual reconnect and sleep/wake-up
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use multiwallet_resilience::{ConnectionConfig, ConnectionService, ReconnectPolicy};
//! use multiwallet_types::{ChainActivity, ChainApi};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(api: Arc<dyn ChainApi>) -> multiwallet_error::Result<()> {
//! let activity: Arc<dyn ChainActivity> = Arc::new(|_: &str| true);
//! let service = ConnectionService::new(
//!     ConnectionConfig::new()
//!         .with_connect_timeout(Duration::from_secs(10))
//!         .with_reconnect(ReconnectPolicy::new().with_max_retry(4)),
//!     activity,
//! );
//!
//! service.register(api);
//! service.connect("polkadot").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry schedule
//!
//! ```rust
//! use multiwallet_resilience::ReconnectPolicy;
//! use std::time::Duration;
//!
//! let policy = ReconnectPolicy::default();
//! assert_eq!(policy.delay_for(0), Duration::from_secs(3));
//! assert_eq!(policy.delay_for(1), Duration::from_secs(20));
//! assert!(policy.is_exhausted(6));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod health;
pub mod retry_policy;
pub mod timeout;

pub use connection::{ConnectionConfig, ConnectionService};
pub use health::ConnectionHealthTracker;
pub use retry_policy::{ReconnectPolicy, FIRST_RECONNECT_DELAY, MAX_RETRY, SHORT_RETRY_DELAY};
pub use timeout::{with_connect_timeout, with_timeout, TimeoutError, DEFAULT_CONNECT_TIMEOUT};

#[cfg(test)]
mod tests {
    use super::*;
    use multiwallet_testing::StaticActivity;
    use multiwallet_types::ConnectionStatus;
    use std::sync::Arc;

    #[test]
    fn test_reexports() {
        assert_eq!(MAX_RETRY, 6);
        assert_eq!(FIRST_RECONNECT_DELAY.as_millis(), 3_000);
        assert_eq!(SHORT_RETRY_DELAY.as_millis(), 20_000);
        assert_eq!(DEFAULT_CONNECT_TIMEOUT.as_millis(), 30_000);
    }

    #[test]
    fn test_tracker_inside_runtime() {
        let tracker = ConnectionHealthTracker::with_activity(Arc::new(StaticActivity::new(["astar"])));
        tokio_test::block_on(async {
            tracker.report("astar", ConnectionStatus::Connected, false);
        });
        assert_eq!(tracker.status("astar"), Some(ConnectionStatus::Connected));
        assert!(tracker.statuses().contains_key("astar"));
    }
}
