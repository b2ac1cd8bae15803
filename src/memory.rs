//! In-memory raw store and schema service.
//!
//! Thread-safe reference implementations of [`RawDataBroker`] and
//! [`SchemaService`]. They are intended for embedded usage and tests: the
//! data broker does not diff trees itself, callers publish ready-made
//! [`RawChangeEvent`]s for an anchor path.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::{SchemaContext, SchemaContextListener, SchemaService};
use crate::error::StoreError;
use crate::event::RawChangeEvent;
use crate::path::RawPath;
use crate::store::{DataChangeScope, DataStoreType, RawDataBroker, RawDataChangeListener, Registration};

fn lock_err(context: &'static str) -> StoreError {
    StoreError::Backend(format!("poisoned lock: {context}"))
}

/// Unique identifier for a raw subscription.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscription {
    store: DataStoreType,
    path: RawPath,
    scope: DataChangeScope,
    listener: Arc<dyn RawDataChangeListener>,
}

type SubscriptionTable = RwLock<HashMap<SubscriptionId, Subscription>>;

/// In-memory [`RawDataBroker`].
///
/// Events are delivered synchronously on the publishing thread, in publish
/// order, to every subscription registered at exactly the published
/// `(store, path)`. The triggering scope is recorded but not interpreted.
#[derive(Default)]
pub struct InMemoryDataBroker {
    subscriptions: Arc<SubscriptionTable>,
    closed: AtomicBool,
}

impl InMemoryDataBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every subscription at `(store, path)`.
    ///
    /// Listener failures are logged and isolated from other subscribers.
    /// Returns the number of listeners that handled the event successfully.
    ///
    /// # Errors
    /// [`StoreError::Closed`] after [`shutdown`](Self::shutdown).
    pub fn publish(&self, store: DataStoreType, path: &RawPath, event: RawChangeEvent) -> Result<usize, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        // Snapshot targets so listeners may (un)register from their callback.
        let targets: Vec<(SubscriptionId, Arc<dyn RawDataChangeListener>)> = self
            .subscriptions
            .read()
            .map_err(|_| lock_err("subscriptions"))?
            .iter()
            .filter(|(_, sub)| sub.store == store && sub.path == *path)
            .map(|(id, sub)| (*id, Arc::clone(&sub.listener)))
            .collect();

        let event = Arc::new(event);
        let mut delivered = 0;
        for (id, listener) in targets {
            match listener.on_data_changed(Arc::clone(&event)) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(subscription = ?id, %path, %err, "Listener failed to handle change event");
                }
            }
        }

        Ok(delivered)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Scope a subscription was registered with.
    #[must_use]
    pub fn subscription_scope(&self, store: DataStoreType, path: &RawPath) -> Option<DataChangeScope> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|sub| sub.store == store && sub.path == *path)
            .map(|sub| sub.scope)
    }

    /// Refuse new subscriptions and publications and drop existing ones.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for InMemoryDataBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDataBroker")
            .field("subscriptions", &self.subscription_count())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl RawDataBroker for InMemoryDataBroker {
    fn register_data_change_listener(
        &self,
        store: DataStoreType,
        path: &RawPath,
        listener: Arc<dyn RawDataChangeListener>,
        triggering_scope: DataChangeScope,
    ) -> Result<Box<dyn Registration>, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        let id = SubscriptionId::new();
        self.subscriptions
            .write()
            .map_err(|_| lock_err("subscriptions"))?
            .insert(
                id,
                Subscription {
                    store,
                    path: path.clone(),
                    scope: triggering_scope,
                    listener,
                },
            );

        debug!(subscription = ?id, ?store, %path, "Raw subscription registered");
        Ok(Box::new(MemorySubscription {
            id,
            subscriptions: Arc::downgrade(&self.subscriptions),
        }))
    }
}

struct MemorySubscription {
    id: SubscriptionId,
    subscriptions: Weak<SubscriptionTable>,
}

impl Registration for MemorySubscription {
    fn close(&self) {
        let Some(subscriptions) = self.subscriptions.upgrade() else {
            return;
        };
        let removed = subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        if removed.is_some() {
            debug!(subscription = ?self.id, "Raw subscription closed");
        }
    }
}

#[derive(Default)]
struct SchemaState {
    context: Option<Arc<SchemaContext>>,
    listeners: HashMap<u64, Arc<dyn SchemaContextListener>>,
    next_id: u64,
}

/// In-memory [`SchemaService`] holding the global schema context.
#[derive(Default)]
pub struct InMemorySchemaService {
    state: Arc<RwLock<SchemaState>>,
}

impl InMemorySchemaService {
    /// Create a service with no global context yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global context and notify every listener.
    pub fn set_global_context(&self, context: SchemaContext) {
        let context = Arc::new(context);
        let listeners: Vec<Arc<dyn SchemaContextListener>> = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.context = Some(Arc::clone(&context));
            state.listeners.values().cloned().collect()
        };

        debug!(revision = context.revision(), listeners = listeners.len(), "Global schema context updated");
        for listener in listeners {
            listener.on_global_context_updated(&context);
        }
    }

    /// The current global context, if one was set.
    #[must_use]
    pub fn global_context(&self) -> Option<Arc<SchemaContext>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .context
            .clone()
    }

    /// Number of registered schema listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}

impl fmt::Debug for InMemorySchemaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySchemaService")
            .field("revision", &self.global_context().map(|c| c.revision()))
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl SchemaService for InMemorySchemaService {
    fn register_schema_context_listener(&self, listener: Arc<dyn SchemaContextListener>) -> Box<dyn Registration> {
        let (id, current) = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.insert(id, Arc::clone(&listener));
            (id, state.context.clone())
        };

        if let Some(context) = current {
            listener.on_global_context_updated(&context);
        }

        Box::new(SchemaListenerRegistration {
            id,
            state: Arc::downgrade(&self.state),
        })
    }
}

struct SchemaListenerRegistration {
    id: u64,
    state: Weak<RwLock<SchemaState>>,
}

impl Registration for SchemaListenerRegistration {
    fn close(&self) {
        if let Some(state) = self.state.upgrade() {
            state
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .remove(&self.id);
        }
    }
}
