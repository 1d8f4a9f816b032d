//! Replay-one publish/subscribe.
//!
//! A [`Subject`] caches the last published value. New subscribers receive it
//! immediately, and [`Subject::value`] lets late readers pull it without
//! subscribing. Publishing happens synchronously on the caller's task.
//!
//! Only a listener's own reentrant guard is held while it runs, so a listener
//! may publish again or subscribe/unsubscribe from inside its callback.

use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Listener plus the generation it last received. The guard is reentrant so a
/// listener that publishes again is handed the nested value on the same
/// thread, while deliveries from other threads wait their turn.
struct Slot<T> {
    id: u64,
    callback: Box<dyn Fn(&T) + Send + Sync>,
    seen: ReentrantMutex<Cell<Option<u64>>>,
}

impl<T> Slot<T> {
    fn deliver(&self, generation: u64, value: &T) {
        let seen = self.seen.lock();
        if seen.get().is_some_and(|last| last >= generation) {
            return;
        }
        seen.set(Some(generation));
        (self.callback)(value);
    }
}

struct Inner<T> {
    current: Mutex<(u64, T)>,
    listeners: Mutex<Vec<Arc<Slot<T>>>>,
    next_id: AtomicU64,
    generation: AtomicU64,
}

/// Observable value with replay-one semantics.
///
/// Every published value carries a generation. A value older than the one
/// already stored is dropped, and no listener is handed a value older than
/// one it has already seen, so concurrent or nested publishers always settle
/// on the newest value.
pub struct Subject<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Creates a subject holding `initial`
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: Mutex::new((0, initial)),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Last published value
    pub fn value(&self) -> T {
        self.inner.current.lock().1.clone()
    }

    /// Reserves the next generation.
    ///
    /// Owners that build the published value under their own lock take the
    /// stamp under that same lock and pass it to [`next_stamped`](Self::next_stamped)
    /// after releasing it.
    pub fn stamp(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Stores `value` and delivers it to every listener
    pub fn next(&self, value: T) {
        let generation = self.stamp();
        self.next_stamped(generation, value);
    }

    /// Publishes `value` as `generation`. Ignored when a newer generation
    /// has already been stored.
    pub fn next_stamped(&self, generation: u64, value: T) {
        {
            let mut current = self.inner.current.lock();
            if current.0 >= generation {
                return;
            }
            *current = (generation, value.clone());
        }

        let listeners: Vec<Arc<Slot<T>>> = self.inner.listeners.lock().clone();
        for slot in listeners {
            slot.deliver(generation, &value);
        }
    }

    /// Registers `listener` and immediately hands it the current value.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot {
            id,
            callback: Box::new(listener),
            seen: ReentrantMutex::new(Cell::new(None)),
        });
        self.inner.listeners.lock().push(Arc::clone(&slot));

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let subscription = Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.listeners.lock().retain(|s| s.id != id);
                }
            })),
        };

        let (generation, current) = self.inner.current.lock().clone();
        slot.deliver(generation, &current);

        subscription
    }

    /// Number of registered listeners
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl<T: Clone + Send + Default + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("value", &self.inner.current.lock().1)
            .field("subscribers", &self.inner.listeners.lock().len())
            .finish()
    }
}

/// Unsubscribe handle returned by [`Subject::subscribe`]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Removes the listener
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
