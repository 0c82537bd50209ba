//! Live view of a BaaS collection.
//!
//! A [`CollectionFeed`] polls a table on an interval and hands the full
//! snapshot to every subscriber whenever it differs from the previous one.
//! The first successful fetch always notifies.

use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::baas::{BaasClient, BaasError};

/// Callback receiving the latest snapshot.
pub type Handler<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// Something that can produce the current contents of a collection.
pub trait CollectionSource<T>: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<T>, BaasError>> + Send;
}

/// A BaaS table read with a fixed PostgREST query.
pub struct BaasCollection<T> {
    baas: BaasClient,
    table: String,
    query: String,
    _rows: PhantomData<fn() -> T>,
}

impl<T> BaasCollection<T> {
    pub fn new(baas: BaasClient, table: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            baas,
            table: table.into(),
            query: query.into(),
            _rows: PhantomData,
        }
    }
}

impl<T> CollectionSource<T> for BaasCollection<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self) -> Result<Vec<T>, BaasError> {
        self.baas.select(&self.table, &self.query).await
    }
}

struct Subscribers<T> {
    next_id: u64,
    handlers: BTreeMap<u64, Handler<T>>,
}

struct FeedInner<T> {
    subscribers: Mutex<Subscribers<T>>,
    latest: Mutex<Option<Arc<Vec<T>>>>,
}

/// Subscriber registry plus the last snapshot seen.
pub struct CollectionFeed<T> {
    inner: Arc<FeedInner<T>>,
}

impl<T> Clone for CollectionFeed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for CollectionFeed<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                subscribers: Mutex::new(Subscribers {
                    next_id: 0,
                    handlers: BTreeMap::new(),
                }),
                latest: Mutex::new(None),
            }),
        }
    }
}

impl<T> CollectionFeed<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for future snapshots.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe(&self, callback: Handler<T>) -> Subscription {
        let id = match self.inner.subscribers.lock() {
            Ok(mut subscribers) => {
                let id = subscribers.next_id;
                subscribers.next_id += 1;
                subscribers.handlers.insert(id, callback);
                id
            }
            Err(_) => {
                warn!("Feed subscriber registry poisoned");
                u64::MAX
            }
        };

        let weak: Weak<FeedInner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade()
                    && let Ok(mut subscribers) = inner.subscribers.lock()
                {
                    subscribers.handlers.remove(&id);
                }
            })),
        }
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .map_or(0, |subscribers| subscribers.handlers.len())
    }

    /// The most recent snapshot, if any fetch has succeeded.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<Vec<T>>> {
        self.inner.latest.lock().ok().and_then(|latest| latest.clone())
    }

    /// Start polling `source` every `interval`.
    ///
    /// Must be called inside a Tokio runtime. Polling stops when the
    /// returned handle is cancelled or dropped.
    pub fn start<S>(&self, source: S, interval: Duration) -> FeedHandle
    where
        S: CollectionSource<T>,
    {
        let feed = self.clone();
        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "Collection feed started");
            loop {
                timer.tick().await;
                match source.fetch().await {
                    Ok(rows) => feed.publish(rows),
                    Err(e) => warn!(error = %e, "Collection feed poll failed"),
                }
            }
        });
        FeedHandle { task: Some(task) }
    }

    /// Store `rows` and notify subscribers if they changed.
    pub fn publish(&self, rows: Vec<T>) {
        let snapshot = {
            let Ok(mut latest) = self.inner.latest.lock() else {
                warn!("Feed snapshot lock poisoned");
                return;
            };
            if latest.as_deref() == Some(&rows) {
                return;
            }
            let snapshot = Arc::new(rows);
            *latest = Some(Arc::clone(&snapshot));
            snapshot
        };

        // Callbacks run outside the lock so they may unsubscribe.
        let handlers: Vec<Handler<T>> = match self.inner.subscribers.lock() {
            Ok(subscribers) => subscribers.handlers.values().cloned().collect(),
            Err(_) => return,
        };
        debug!(
            rows = snapshot.len(),
            subscribers = handlers.len(),
            "Collection changed"
        );
        for handler in handlers {
            handler(snapshot.as_slice());
        }
    }
}

/// Keeps a callback attached to a [`CollectionFeed`].
#[must_use = "dropping a Subscription detaches the callback"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// Owns the polling task of a running feed.
#[derive(Debug)]
#[must_use = "dropping a FeedHandle stops the feed"]
pub struct FeedHandle {
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    pub fn cancel(mut self) {
        self.stop();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Collection feed stopped");
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
