//! Predicate-filtered publish/subscribe.
//!
//! Subscribers live in a registry keyed by monotonically increasing ids.
//! [`EventBus::notify`] snapshots the ids up front and looks each one up again
//! just before calling it, so handlers may subscribe or unsubscribe (including
//! themselves) while a dispatch is running:
//! - entries removed mid-dispatch are not invoked afterwards,
//! - entries added mid-dispatch wait for the next `notify`,
//! - every other entry is invoked exactly once.
//!
//! No lock is held while a predicate or handler runs.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{error, trace};

/// Error a handler may return. Reported, never propagated to other handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of every handler.
pub type HandlerResult = std::result::Result<(), HandlerError>;

type HandlerFn<E> = dyn Fn(&E) -> HandlerResult + Send + Sync;
type PredicateFn<E> = dyn Fn(&E) -> bool + Send + Sync;

/// Stable identifier of one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscriber<E: ?Sized> {
    handler: Arc<HandlerFn<E>>,
    predicate: Arc<PredicateFn<E>>,
}

struct Registry<E: ?Sized> {
    subscribers: BTreeMap<SubscriptionId, Arc<Subscriber<E>>>,
    next_id: u64,
}

impl<E: ?Sized> Registry<E> {
    fn insert(&mut self, subscriber: Subscriber<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, Arc::new(subscriber));
        id
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Handlers never run under the lock, so poisoning cannot leave the
    // registry half-updated.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publish/subscribe registry.
///
/// Cloning yields another handle to the same registry.
pub struct EventBus<E: ?Sized> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: ?Sized> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E: ?Sized + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized + 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                subscribers: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Register a handler that receives every event.
    ///
    /// Starts a new lineage; see [`Subscription`].
    pub fn subscribe<H>(&self, handler: H) -> Subscription<E>
    where
        H: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_filtered(handler, |_: &E| true)
    }

    /// Register a handler that receives events accepted by `predicate`.
    pub fn subscribe_filtered<H, P>(&self, handler: H, predicate: P) -> Subscription<E>
    where
        H: Fn(&E) -> HandlerResult + Send + Sync + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let subscription = Subscription {
            registry: Arc::downgrade(&self.registry),
            ids: Arc::new(Mutex::new(Vec::new())),
        };
        subscription.add(Arc::new(handler), Arc::new(predicate));
        subscription
    }

    /// Invoke every handler whose predicate accepts `event`.
    ///
    /// A handler that returns an error or panics is logged and recorded in
    /// the report; the remaining handlers still run.
    pub fn notify(&self, event: &E) -> DispatchReport {
        let snapshot: Vec<SubscriptionId> =
            lock(&self.registry).subscribers.keys().copied().collect();
        let mut report = DispatchReport::default();

        for id in snapshot {
            let Some(subscriber) = lock(&self.registry).subscribers.get(&id).cloned() else {
                trace!(%id, "skipping subscriber removed during dispatch");
                continue;
            };

            let matched = match catch_unwind(AssertUnwindSafe(|| (subscriber.predicate)(event))) {
                Ok(matched) => matched,
                Err(panic) => {
                    report.record_failure(id, panic_message(panic.as_ref()), true);
                    continue;
                }
            };
            if !matched {
                continue;
            }

            report.delivered += 1;
            match catch_unwind(AssertUnwindSafe(|| (subscriber.handler)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => report.record_failure(id, err.to_string(), false),
                Err(panic) => report.record_failure(id, panic_message(panic.as_ref()), true),
            }
        }

        report
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every handler.
    pub fn clear(&self) {
        lock(&self.registry).subscribers.clear();
    }
}

impl<E: ?Sized> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &lock(&self.registry).subscribers.len())
            .finish()
    }
}

/// Cancellation capability for one lineage of handlers.
///
/// Every handler added through a handle (or any clone of it) joins the same
/// lineage, and [`unsubscribe`](Self::unsubscribe) removes all of them.
/// Each top-level [`EventBus::subscribe`] starts a fresh lineage.
/// Dropping the handle does not unsubscribe.
pub struct Subscription<E: ?Sized> {
    registry: Weak<Mutex<Registry<E>>>,
    ids: Arc<Mutex<Vec<SubscriptionId>>>,
}

impl<E: ?Sized> Clone for Subscription<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Weak::clone(&self.registry),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<E: ?Sized + 'static> Subscription<E> {
    /// Add a handler for every event to this lineage.
    pub fn subscribe<H>(&self, handler: H) -> &Self
    where
        H: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_filtered(handler, |_: &E| true)
    }

    /// Add a filtered handler to this lineage.
    pub fn subscribe_filtered<H, P>(&self, handler: H, predicate: P) -> &Self
    where
        H: Fn(&E) -> HandlerResult + Send + Sync + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.add(Arc::new(handler), Arc::new(predicate));
        self
    }

    pub(crate) fn add(&self, handler: Arc<HandlerFn<E>>, predicate: Arc<PredicateFn<E>>) {
        let Some(registry) = self.registry.upgrade() else {
            trace!("event bus dropped; ignoring subscribe");
            return;
        };
        let id = lock(&registry).insert(Subscriber { handler, predicate });
        lock(&self.ids).push(id);
        trace!(%id, "subscribed");
    }

    /// Remove every handler in this lineage. Idempotent.
    pub fn unsubscribe(&self) {
        let ids: Vec<SubscriptionId> = lock(&self.ids).drain(..).collect();
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = lock(&registry);
        for id in ids {
            if registry.subscribers.remove(&id).is_some() {
                trace!(%id, "unsubscribed");
            }
        }
    }

    /// Ids currently owned by this lineage.
    pub fn ids(&self) -> Vec<SubscriptionId> {
        lock(&self.ids).clone()
    }

    /// True while at least one handler of this lineage is registered.
    pub fn is_active(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let registry = lock(&registry);
        lock(&self.ids)
            .iter()
            .any(|id| registry.subscribers.contains_key(id))
    }
}

impl<E: ?Sized> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("ids", &*lock(&self.ids))
            .finish()
    }
}

/// A handler that failed during one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub id: SubscriptionId,
    pub message: String,
    pub panicked: bool,
}

/// Outcome of one [`EventBus::notify`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers whose predicate accepted the event.
    pub delivered: usize,
    /// Handlers (or predicates) that returned an error or panicked.
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, id: SubscriptionId, message: String, panicked: bool) {
        error!(%id, panicked, error = %message, "subscriber failed");
        self.failures.push(HandlerFailure {
            id,
            message,
            panicked,
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "handler panicked".to_string()
    }
}
