//! Per-registration forwarding from raw to typed listeners.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::binding::TypedId;
use crate::error::ListenerResult;
use crate::event::{RawChangeEvent, TranslatedDataChangeEvent};
use crate::store::{DataChangeScope, DataStoreType, RawDataChangeListener, Registration};
use crate::translate::ChangeSetTranslator;

/// Receives typed change events.
///
/// Called on whatever thread the raw store delivers on. A returned error is
/// handed back to the store unchanged.
pub trait DataChangeListener: Send + Sync {
    /// Handle one translated change event.
    ///
    /// # Errors
    /// Any failure the listener wants the store to see.
    fn on_data_changed(&self, event: TranslatedDataChangeEvent) -> ListenerResult;
}

impl<F> DataChangeListener for F
where
    F: Fn(TranslatedDataChangeEvent) -> ListenerResult + Send + Sync,
{
    fn on_data_changed(&self, event: TranslatedDataChangeEvent) -> ListenerResult {
        self(event)
    }
}

/// Unique identifier for a listener registration.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    /// Create a new random registration id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Raw listener that wraps every raw event for one typed listener.
///
/// Events arriving after the owning registration closed are ignored.
pub(crate) struct TranslatingListener {
    id: RegistrationId,
    store: DataStoreType,
    path: TypedId,
    triggering_scope: DataChangeScope,
    translator: ChangeSetTranslator,
    listener: Arc<dyn DataChangeListener>,
    closed: Arc<AtomicBool>,
}

impl TranslatingListener {
    pub(crate) fn new(
        id: RegistrationId,
        store: DataStoreType,
        path: TypedId,
        triggering_scope: DataChangeScope,
        translator: ChangeSetTranslator,
        listener: Arc<dyn DataChangeListener>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            store,
            path,
            triggering_scope,
            translator,
            listener,
            closed,
        }
    }
}

impl RawDataChangeListener for TranslatingListener {
    fn on_data_changed(&self, event: Arc<RawChangeEvent>) -> ListenerResult {
        if self.closed.load(Ordering::Acquire) {
            trace!(registration = %self.id, "Dropping change event for closed registration");
            return Ok(());
        }

        trace!(
            registration = %self.id,
            store = ?self.store,
            scope = ?self.triggering_scope,
            path = %self.path,
            "Forwarding change event"
        );
        self.listener.on_data_changed(TranslatedDataChangeEvent::new(
            self.translator.clone(),
            self.path.clone(),
            event,
        ))
    }
}

/// Handle for a typed listener registration.
///
/// Closing is idempotent and releases the raw subscription exactly once.
/// Dropping the handle closes it.
pub struct ListenerRegistration {
    id: RegistrationId,
    path: TypedId,
    listener: Arc<dyn DataChangeListener>,
    registration: Box<dyn Registration>,
    closed: Arc<AtomicBool>,
}

impl ListenerRegistration {
    pub(crate) fn new(
        id: RegistrationId,
        path: TypedId,
        listener: Arc<dyn DataChangeListener>,
        registration: Box<dyn Registration>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            path,
            listener,
            registration,
            closed,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn id(&self) -> RegistrationId {
        self.id
    }

    /// The typed identifier the listener was registered at.
    #[must_use]
    pub const fn path(&self) -> &TypedId {
        &self.path
    }

    /// The registered listener.
    #[must_use]
    pub fn listener(&self) -> &Arc<dyn DataChangeListener> {
        &self.listener
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop deliveries and release the raw subscription.
    ///
    /// Deliveries already in progress may still complete.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.registration.close();
        debug!(registration = %self.id, path = %self.path, "Listener registration closed");
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.close();
    }
}
