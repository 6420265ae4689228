//! Notification fan-out
//!
//! Broadcasts each unsolicited status delta to every registered
//! consumer. The delta is first merged into the shared [`StateStore`],
//! then consumers run in registration order, all while the render lock
//! is held — the same lock the rendering thread takes, so consumers may
//! mutate their visual state directly from the dispatch.
//!
//! Registration hands back a [`ConsumerHandle`]; dropping the handle
//! deregisters. The registry holds its own short-lived lock, separate
//! from the render lock, so a consumer may register others or drop its
//! own handle from inside `consume` without deadlocking. Dispatch
//! iterates a snapshot: a consumer that unregisters itself mid-dispatch
//! still receives the current delta, and one registered mid-dispatch
//! only sees later ones.

use moonview_core::StateStore;
use parking_lot::Mutex;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// The render lock: one mutex over the state store, shared between the
/// I/O side and the rendering thread.
pub type SharedState = Arc<Mutex<StateStore>>;

/// A registered consumer behind its own lock
type SharedConsumer = Arc<Mutex<dyn NotifyConsumer>>;

/// Identifies one consumer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(Uuid);

impl ConsumerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Consumer({})", &self.0.to_string()[..8])
    }
}

/// A display/control unit reacting to state deltas.
///
/// `consume` runs with the render lock held. It must not block, must
/// treat `delta` as read-only, and reads printer state through the
/// `store` argument rather than taking any lock of its own.
pub trait NotifyConsumer: Send {
    /// Handle one status delta
    fn consume(&mut self, delta: &Value, store: &StateStore);
}

/// Registration capability token.
///
/// Dropping the handle removes the consumer from the registry, so a
/// panel that owns its handle can never leave a dangling registration
/// behind.
#[must_use = "dropping the handle unregisters the consumer"]
pub struct ConsumerHandle {
    id: ConsumerId,
    fanout: Weak<Fanout>,
}

impl ConsumerHandle {
    /// The registration id (diagnostics)
    pub fn id(&self) -> ConsumerId {
        self.id
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        if let Some(fanout) = self.fanout.upgrade() {
            fanout.unregister(self.id);
        }
    }
}

/// Ordered consumer registry
#[derive(Default)]
struct Registry {
    entries: Vec<(ConsumerId, SharedConsumer)>,
}

/// Fans status notifications out to registered consumers.
pub struct Fanout {
    /// The render lock and the store it guards.
    state: SharedState,
    /// Registration-ordered registry; its lock is internal and never
    /// held while a consumer runs.
    registry: Mutex<Registry>,
}

impl Fanout {
    /// Create a fan-out over the given shared store
    pub fn new(state: SharedState) -> Arc<Self> {
        Arc::new(Self {
            state,
            registry: Mutex::new(Registry::default()),
        })
    }

    /// Register a consumer; delivery follows registration order.
    ///
    /// The registry keeps a reference to the consumer only as long as
    /// the returned handle lives.
    pub fn register(self: &Arc<Self>, consumer: SharedConsumer) -> ConsumerHandle {
        let id = ConsumerId::new();
        self.registry.lock().entries.push((id, consumer));
        tracing::debug!(%id, "Consumer registered");
        ConsumerHandle {
            id,
            fanout: Arc::downgrade(self),
        }
    }

    /// Remove a registration; a no-op if it is already gone
    fn unregister(&self, id: ConsumerId) {
        let mut registry = self.registry.lock();
        let before = registry.entries.len();
        registry.entries.retain(|(entry_id, _)| *entry_id != id);
        if registry.entries.len() != before {
            tracing::debug!(%id, "Consumer unregistered");
        }
    }

    /// Apply a status delta to the store, then deliver it to every
    /// consumer registered at this moment, in registration order.
    ///
    /// A panicking consumer is logged and skipped; the rest still run.
    pub fn on_notification(&self, delta: &Value) {
        let snapshot: Vec<(ConsumerId, SharedConsumer)> =
            self.registry.lock().entries.clone();

        // Everything below runs under the render lock: the merge and
        // every consumer see one coherent tree per notification.
        let mut store = self.state.lock();
        store.apply_status(delta);

        for (id, consumer) in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                consumer.lock().consume(delta, &store);
            }));
            if outcome.is_err() {
                tracing::error!(%id, "Consumer panicked during dispatch; continuing");
            }
        }
    }

    /// Run `f` with the store under the render lock.
    ///
    /// Copy values out; never hold a reference past the closure. Do not
    /// call from inside `consume` — the lock is already held there.
    pub fn with_store<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        f(&self.state.lock())
    }

    /// The shared render lock, for the rendering thread
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Number of live registrations
    pub fn consumer_count(&self) -> usize {
        self.registry.lock().entries.len()
    }
}
