//! Contract of the raw tree store beneath the broker.
//!
//! The store decides what changed and when; the broker only consumes its
//! subscription primitive. Implementations must be safe to call from any
//! thread.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ListenerResult, StoreError};
use crate::event::RawChangeEvent;
use crate::path::RawPath;

/// Logical data store a subscription targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStoreType {
    /// Intended configuration.
    Configuration,
    /// Observed runtime state.
    Operational,
}

/// Which changes under the anchor path trigger a notification.
///
/// Interpreted by the store; the broker passes it through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChangeScope {
    /// Only the anchor node itself.
    Base,
    /// The anchor node and its direct children.
    One,
    /// The anchor node and everything beneath it.
    Subtree,
}

/// A live registration that can be released.
///
/// `close` must be safe to call from any thread. Callers in this crate
/// guarantee they call it at most once per registration.
pub trait Registration: Send + Sync {
    /// Release the registration.
    fn close(&self);
}

/// Callback invoked by the store once per commit touching a subscription.
pub trait RawDataChangeListener: Send + Sync {
    /// Handle one raw change event.
    ///
    /// # Errors
    /// Whatever the listener reports; the store decides how to handle it.
    fn on_data_changed(&self, event: Arc<RawChangeEvent>) -> ListenerResult;
}

/// Subscription surface of the raw tree store.
pub trait RawDataBroker: Send + Sync {
    /// Subscribe `listener` to changes at `path` in `store`.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if the store cannot accept the subscription.
    fn register_data_change_listener(
        &self,
        store: DataStoreType,
        path: &RawPath,
        listener: Arc<dyn RawDataChangeListener>,
        triggering_scope: DataChangeScope,
    ) -> Result<Box<dyn Registration>, StoreError>;
}
