//! Per-chain connection health tracking
//!
//! [`ConnectionHealthTracker`] publishes one [`ConnectionStatus`] per chain
//! and drives automatic reconnects with bounded, two-tier retries. Once the
//! attempt budget is spent the chain is marked `UNSTABLE` and left alone
//! until something outside calls `report(.., force_recover = true)`.
//!
//! At most one retry timer exists per chain. Timers are tokio tasks; each
//! carries a sequence number so a timer that was replaced or cancelled while
//! already waking up does nothing.

use crate::retry_policy::ReconnectPolicy;
use dashmap::DashMap;
use multiwallet_types::{ChainActivity, ChainApi, ConnectionStatus, ConnectionStatusMap, Subject, Subscription};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct RetryRecord {
    retry_times: u32,
    timer: Option<(u64, JoinHandle<()>)>,
}

impl RetryRecord {
    fn clear_timer(&mut self) {
        if let Some((_, handle)) = self.timer.take() {
            handle.abort();
        }
    }
}

struct TrackerInner {
    policy: ReconnectPolicy,
    activity: Arc<dyn ChainActivity>,
    adapters: DashMap<String, Arc<dyn ChainApi>>,
    statuses: Mutex<ConnectionStatusMap>,
    subject: Subject<ConnectionStatusMap>,
    retries: Mutex<HashMap<String, RetryRecord>>,
    sleeping: AtomicBool,
    next_timer: AtomicU64,
}

/// Connection status map plus the reconnect loop driving it.
///
/// Cloning is cheap and every clone shares state. Timers run on the ambient
/// tokio runtime, so `report` and `recover` must be called from within one.
#[derive(Clone)]
pub struct ConnectionHealthTracker {
    inner: Arc<TrackerInner>,
}

impl std::fmt::Debug for ConnectionHealthTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHealthTracker")
            .field("policy", &self.inner.policy)
            .field("statuses", &*self.inner.statuses.lock())
            .field("retrying", &self.inner.retries.lock().len())
            .field("sleeping", &self.inner.sleeping.load(Ordering::SeqCst))
            .finish()
    }
}

impl ConnectionHealthTracker {
    /// Create a tracker consulting `activity` before every retry
    pub fn new(policy: ReconnectPolicy, activity: Arc<dyn ChainActivity>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                policy,
                activity,
                adapters: DashMap::new(),
                statuses: Mutex::new(ConnectionStatusMap::new()),
                subject: Subject::new(ConnectionStatusMap::new()),
                retries: Mutex::new(HashMap::new()),
                sleeping: AtomicBool::new(false),
                next_timer: AtomicU64::new(0),
            }),
        }
    }

    /// Create with the default policy
    pub fn with_activity(activity: Arc<dyn ChainActivity>) -> Self {
        Self::new(ReconnectPolicy::default(), activity)
    }

    /// Active policy
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.inner.policy
    }

    /// Register the adapter serving `api.chain()`, replacing any previous one
    pub fn register(&self, api: Arc<dyn ChainApi>) {
        let chain = api.chain().to_string();
        tracing::debug!(chain = %chain, "Registered chain adapter");
        self.inner.adapters.insert(chain, api);
    }

    /// Forget a chain's adapter and stop retrying it
    pub fn unregister(&self, chain: &str) -> Option<Arc<dyn ChainApi>> {
        self.cancel(chain);
        self.inner.adapters.remove(chain).map(|(_, api)| api)
    }

    /// Adapter for `chain`
    pub fn adapter(&self, chain: &str) -> Option<Arc<dyn ChainApi>> {
        self.inner.adapters.get(chain).map(|entry| Arc::clone(entry.value()))
    }

    /// Slugs of every registered chain, sorted
    pub fn chains(&self) -> Vec<String> {
        let mut chains: Vec<String> = self.inner.adapters.iter().map(|e| e.key().clone()).collect();
        chains.sort();
        chains
    }

    /// Current status of `chain`; `None` until its first report
    pub fn status(&self, chain: &str) -> Option<ConnectionStatus> {
        self.inner.statuses.lock().get(chain).copied()
    }

    /// Copy of the whole status map
    pub fn statuses(&self) -> ConnectionStatusMap {
        self.inner.statuses.lock().clone()
    }

    /// Listen to the status map, starting with its current value
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectionStatusMap) + Send + Sync + 'static,
    {
        self.inner.subject.subscribe(listener)
    }

    /// Retries scheduled so far for `chain`; `None` when no retry is in flight
    pub fn retry_times(&self, chain: &str) -> Option<u32> {
        self.inner.retries.lock().get(chain).map(|r| r.retry_times)
    }

    /// True while a retry timer is pending for `chain`
    pub fn has_pending_retry(&self, chain: &str) -> bool {
        self.inner
            .retries
            .lock()
            .get(chain)
            .map(|r| r.timer.is_some())
            .unwrap_or(false)
    }

    /// Feed a status observed by the chain's adapter.
    ///
    /// Publishes on change, clears retries on `CONNECTED` and starts recovery
    /// on `DISCONNECTED` unless a retry loop is already running for the chain
    /// (`force_recover` overrides that).
    pub fn report(&self, chain: &str, status: ConnectionStatus, force_recover: bool) {
        TrackerInner::report(&self.inner, chain, status, force_recover);
    }

    /// Run one step of the recovery procedure for `chain`
    pub fn recover(&self, chain: &str) {
        TrackerInner::recover(&self.inner, chain);
    }

    /// Drop the retry record of `chain`. No-op when there is none.
    pub fn cancel(&self, chain: &str) {
        self.inner.cancel(chain);
    }

    /// Cancel retries for every tracked chain
    pub fn cancel_all(&self) {
        let records: Vec<(String, RetryRecord)> = self.inner.retries.lock().drain().collect();
        for (chain, mut record) in records {
            record.clear_timer();
            tracing::debug!(chain = %chain, "Retry cancelled");
        }
    }

    /// Suspend automatic reconnects; pending retries are cancelled
    pub fn sleep(&self) {
        self.inner.sleeping.store(true, Ordering::SeqCst);
        self.cancel_all();
        tracing::info!("Connection tracker sleeping");
    }

    /// Leave suspended mode
    pub fn wake_up(&self) {
        self.inner.sleeping.store(false, Ordering::SeqCst);
        tracing::info!("Connection tracker awake");
    }

    /// True while suspended
    pub fn is_sleeping(&self) -> bool {
        self.inner.sleeping.load(Ordering::SeqCst)
    }
}

impl TrackerInner {
    fn report(this: &Arc<Self>, chain: &str, status: ConnectionStatus, force_recover: bool) {
        this.set_status(chain, status);

        match status {
            ConnectionStatus::Connected => this.cancel(chain),
            ConnectionStatus::Disconnected => {
                let retrying = this.retries.lock().contains_key(chain);
                if !retrying || force_recover {
                    Self::recover(this, chain);
                }
            }
            ConnectionStatus::Connecting | ConnectionStatus::Unstable => {}
        }
    }

    fn recover(this: &Arc<Self>, chain: &str) {
        Self::schedule(this, chain, false);
    }

    /// One recovery step. With `resume` set, the step only continues an
    /// existing retry record: a record cleared since the timer fired means
    /// the chain connected or the tracker went to sleep in between.
    fn schedule(this: &Arc<Self>, chain: &str, resume: bool) {
        if !this.activity.is_chain_active(chain) {
            tracing::debug!(chain = %chain, "Chain inactive, not reconnecting");
            this.cancel(chain);
            return;
        }

        let mut retries = this.retries.lock();
        if resume && !retries.contains_key(chain) {
            tracing::debug!(chain = %chain, "Retry record cleared while reconnecting");
            return;
        }
        let record = retries.entry(chain.to_string()).or_default();
        record.clear_timer();

        if this.policy.is_exhausted(record.retry_times) {
            let attempts = record.retry_times;
            retries.remove(chain);
            drop(retries);

            this.set_status(chain, ConnectionStatus::Unstable);
            tracing::warn!(chain = %chain, attempts, "Reconnect attempts exhausted, chain unstable");
            return;
        }

        let delay = this.policy.delay_for(record.retry_times);
        let deadline = tokio::time::Instant::now() + delay;
        let timer_id = this.next_timer.fetch_add(1, Ordering::SeqCst);
        let weak: Weak<Self> = Arc::downgrade(this);
        let timer_chain = chain.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                Self::on_timer(&inner, &timer_chain, timer_id);
            }
        });

        record.timer = Some((timer_id, handle));
        record.retry_times += 1;

        tracing::debug!(
            chain = %chain,
            retry_times = record.retry_times,
            delay_ms = delay.as_millis() as u64,
            "Reconnect scheduled"
        );
    }

    fn on_timer(this: &Arc<Self>, chain: &str, timer_id: u64) {
        {
            let mut retries = this.retries.lock();
            let Some(record) = retries.get_mut(chain) else {
                return;
            };
            match &record.timer {
                Some((id, _)) if *id == timer_id => {
                    // Detach rather than abort: this task is the one running
                    record.timer = None;
                }
                _ => return,
            }
        }

        let adapter = this.adapters.get(chain).map(|entry| Arc::clone(entry.value()));
        let connected = adapter.as_ref().map(|api| api.is_connected()).unwrap_or(false);

        if connected || this.sleeping.load(Ordering::SeqCst) {
            this.cancel(chain);
            return;
        }

        match adapter {
            Some(api) => {
                tracing::info!(chain = %chain, "Reconnecting");
                api.reconnect();
            }
            None => tracing::warn!(chain = %chain, "No adapter registered, counting attempt"),
        }

        Self::schedule(this, chain, true);
    }

    fn cancel(&self, chain: &str) {
        let removed = self.retries.lock().remove(chain);
        if let Some(mut record) = removed {
            record.clear_timer();
            tracing::debug!(chain = %chain, retry_times = record.retry_times, "Retry cancelled");
        }
    }

    fn set_status(&self, chain: &str, status: ConnectionStatus) {
        let (stamp, snapshot) = {
            let mut statuses = self.statuses.lock();
            if statuses.get(chain) == Some(&status) {
                return;
            }
            statuses.insert(chain.to_string(), status);
            (self.subject.stamp(), statuses.clone())
        };

        tracing::info!(chain = %chain, status = %status, "Connection status changed");
        self.subject.next_stamped(stamp, snapshot);
    }
}
