//! Live subscriptions.
//!
//! A [`WatchRegistry`] fans store mutations out to every watcher whose
//! target they touch. Each watcher owns an unbounded channel, so a store
//! never blocks on a slow consumer and per-watcher order is the order in
//! which the store called [`WatchRegistry::notify`].
//!
//! Consumers hold a [`Subscription`], which is a `futures::Stream`, plus any
//! number of [`CancelHandle`] clones.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use docbase_types::{Constraint, Document, DocumentPath};

use crate::error::{StoreError, StoreResult};

/// What a subscription is bound to.
#[derive(Clone, Debug, PartialEq)]
pub enum WatchTarget {
    /// A single document.
    Document(DocumentPath),
    /// The result set of a collection query.
    Query {
        collection: String,
        constraints: Vec<Constraint>,
    },
}

impl WatchTarget {
    pub fn collection(&self) -> &str {
        match self {
            Self::Document(path) => path.collection(),
            Self::Query { collection, .. } => collection,
        }
    }

    /// Returns `true` if a mutation at `path` may change this target's state.
    pub fn is_affected_by(&self, path: &DocumentPath) -> bool {
        match self {
            Self::Document(watched) => watched == path,
            Self::Query { collection, .. } => collection == path.collection(),
        }
    }
}

/// State of a watch target at one point in time.
#[derive(Clone, Debug, PartialEq)]
pub enum Snapshot {
    /// `None` when the watched document does not exist.
    Document(Option<Document>),
    Query(Vec<Document>),
}

type Feed = mpsc::UnboundedSender<StoreResult<Snapshot>>;

struct Watcher {
    target: WatchTarget,
    feed: Feed,
    last: Snapshot,
}

/// Fan-out of store changes to live watchers.
pub struct WatchRegistry {
    watchers: RwLock<BTreeMap<u64, Watcher>>,
    next_id: AtomicU64,
}

impl WatchRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            watchers: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a watcher whose current state is `initial`.
    ///
    /// The initial state is queued before this returns. An `Err` initial
    /// state yields a subscription that delivers that error and ends.
    pub fn register(
        self: &Arc<Self>,
        target: WatchTarget,
        initial: StoreResult<Snapshot>,
    ) -> Subscription<Snapshot> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = CancelHandle {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
            registry: Arc::downgrade(self),
        };

        match initial {
            Ok(snapshot) => {
                // Receiver is alive, so this cannot fail.
                let _ = tx.send(Ok(snapshot.clone()));
                self.watchers
                    .write()
                    .expect("watch registry lock poisoned")
                    .insert(
                        id,
                        Watcher {
                            target,
                            feed: tx,
                            last: snapshot,
                        },
                    );
                debug!(watch_id = id, "watch registered");
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }

        Subscription::new(rx, handle)
    }

    /// Deliver fresh state to every watcher affected by a mutation at `path`.
    ///
    /// `snapshot_of` computes a target's current state; it is called while
    /// the caller still holds its own data lock. Watchers whose state did not
    /// change are skipped. Watchers whose receiver is gone are pruned.
    pub fn notify<F>(&self, path: &DocumentPath, snapshot_of: F)
    where
        F: Fn(&WatchTarget) -> Snapshot,
    {
        let mut watchers = self.watchers.write().expect("watch registry lock poisoned");
        watchers.retain(|id, watcher| {
            if !watcher.target.is_affected_by(path) {
                return !watcher.feed.is_closed();
            }
            let next = snapshot_of(&watcher.target);
            if next == watcher.last {
                return !watcher.feed.is_closed();
            }
            watcher.last = next.clone();
            let alive = watcher.feed.send(Ok(next)).is_ok();
            if !alive {
                debug!(watch_id = id, "pruned closed watcher");
            }
            alive
        });
    }

    /// Terminate every watcher with `error`.
    pub fn fail_all(&self, error: &StoreError) {
        let drained = std::mem::take(
            &mut *self.watchers.write().expect("watch registry lock poisoned"),
        );
        for (_, watcher) in drained {
            let _ = watcher.feed.send(Err(error.clone()));
        }
    }

    /// Drop a watcher. Unknown ids are ignored.
    pub fn remove(&self, id: u64) {
        self.watchers
            .write()
            .expect("watch registry lock poisoned")
            .remove(&id);
    }

    /// Number of registered watchers.
    pub fn len(&self) -> usize {
        self.watchers.read().expect("watch registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("watchers", &self.len())
            .finish()
    }
}

/// Idempotent cancellation of one subscription.
///
/// Cheap to clone and safe to call from inside the subscription's own
/// callbacks. Once `cancel` has returned the stream yields nothing more.
/// For [`Subscription::spawn_callbacks`] the same holds when `cancel` runs
/// inside a callback or on the task that will next poll; a `cancel` from
/// another thread can overlap at most one delivery already handed to
/// `on_change`.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
    registry: Weak<WatchRegistry>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.detach();
        debug!(watch_id = self.id, "watch cancelled");
    }

    /// Unregister without marking the subscription cancelled.
    fn detach(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A live, cancelable feed of change notifications.
///
/// Yields `Ok(state)` once for the state at establishment and once per
/// subsequent change, then at most one `Err`, after which it ends. After
/// [`Subscription::cancel`] it yields `None`.
pub struct Subscription<T> {
    feed: mpsc::UnboundedReceiver<StoreResult<Snapshot>>,
    handle: CancelHandle,
    decode: fn(Snapshot) -> StoreResult<T>,
    finished: bool,
}

fn passthrough(snapshot: Snapshot) -> StoreResult<Snapshot> {
    Ok(snapshot)
}

impl Subscription<Snapshot> {
    fn new(feed: mpsc::UnboundedReceiver<StoreResult<Snapshot>>, handle: CancelHandle) -> Self {
        Self {
            feed,
            handle,
            decode: passthrough,
            finished: false,
        }
    }

    /// A subscription that delivers `error` and ends, for targets that
    /// could not be established at all.
    pub fn failed(error: StoreError) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Err(error));
        let handle = CancelHandle {
            id: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
            registry: Weak::new(),
        };
        Self::new(rx, handle)
    }

    /// Re-type the subscription. A decode failure ends it with that error.
    pub fn map_snapshots<U>(self, decode: fn(Snapshot) -> StoreResult<U>) -> Subscription<U> {
        Subscription {
            feed: self.feed,
            handle: self.handle,
            decode,
            finished: self.finished,
        }
    }
}

impl<T> Subscription<T> {
    /// A handle that cancels this subscription.
    pub fn handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Wait for the next notification.
    pub async fn next_change(&mut self) -> Option<StoreResult<T>> {
        futures::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Drive the subscription on a tokio task, calling `on_change` for each
    /// state and `on_error` at most once.
    ///
    /// Must be called from within a tokio runtime. The returned handle (or a
    /// clone captured by the callbacks) unsubscribes. The cancel flag is
    /// checked before every callback, so a cross-thread cancel races with
    /// at most the one delivery in flight.
    pub fn spawn_callbacks<F, E>(mut self, mut on_change: F, on_error: E) -> CancelHandle
    where
        T: Send + 'static,
        F: FnMut(T) + Send + 'static,
        E: FnOnce(StoreError) + Send + 'static,
    {
        let handle = self.handle();
        tokio::spawn(async move {
            let mut on_error = Some(on_error);
            while let Some(item) = self.next().await {
                if self.is_cancelled() {
                    break;
                }
                match item {
                    Ok(state) => on_change(state),
                    Err(e) => {
                        if let Some(cb) = on_error.take() {
                            cb(e);
                        }
                    }
                }
            }
        });
        handle
    }
}

impl<T> Stream for Subscription<T> {
    type Item = StoreResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished || this.handle.is_cancelled() {
            return Poll::Ready(None);
        }
        match this.feed.poll_recv(cx) {
            Poll::Ready(Some(Ok(snapshot))) => match (this.decode)(snapshot) {
                Ok(state) => Poll::Ready(Some(Ok(state))),
                Err(e) => {
                    this.finished = true;
                    this.handle.detach();
                    Poll::Ready(Some(Err(e)))
                }
            },
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                this.handle.detach();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.handle.id)
            .field("cancelled", &self.handle.is_cancelled())
            .field("finished", &self.finished)
            .finish()
    }
}
