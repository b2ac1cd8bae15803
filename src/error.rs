//! Error types for the binding broker.
//!
//! All errors are strongly typed using thiserror. Translation failures are
//! usually recovered from locally (an entry is dropped, a snapshot becomes
//! absent); only registration setup surfaces them to the caller.

use thiserror::Error;

use crate::binding::TypedId;
use crate::path::{QName, RawPath};

/// Failures reported by a [`NodeCodec`](crate::codec::NodeCodec).
#[derive(Debug, Error)]
pub enum TranslationError {
    /// A path step names a node the schema does not know.
    #[error("Unknown schema node '{name}' in {path}")]
    UnknownNode {
        /// The unknown node.
        name: QName,
        /// Path being translated.
        path: RawPath,
    },

    /// The path is structurally invalid for the schema.
    #[error("Failed to deserialize {path}: {reason}")]
    Deserialization {
        /// Path being translated.
        path: RawPath,
        /// What was wrong with it.
        reason: String,
    },

    /// A typed step names a binding class with no schema node.
    #[error("No binding class named '{type_name}' in {id}")]
    UnmappedBinding {
        /// The unmapped binding class.
        type_name: String,
        /// Identifier being translated.
        id: TypedId,
    },

    /// No schema context has been published yet.
    #[error("No schema context is available")]
    SchemaUnavailable,
}

/// Failures reported by the raw tree store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was shut down.
    #[error("Data store is closed")]
    Closed,

    /// Any other backend failure.
    #[error("Data store backend error: {0}")]
    Backend(String),
}

/// Top-level error type for broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The typed registration path has no raw counterpart.
    #[error("Cannot register listener at {path}: {source}")]
    Registration {
        /// The typed path passed to registration.
        path: TypedId,
        /// Why it could not be translated.
        #[source]
        source: TranslationError,
    },

    /// The raw store refused the operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The change stream was closed and drained.
    #[error("Change stream disconnected")]
    Disconnected,

    /// No event arrived within the timeout.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        duration_ms: u64,
    },
}

impl BrokerError {
    /// Returns true if the registration path could not be translated.
    #[must_use]
    pub const fn is_registration(&self) -> bool {
        matches!(self, Self::Registration { .. })
    }

    /// Returns true if the raw store rejected the operation.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this error is retryable.
    ///
    /// A missing schema context may appear later; everything else is final.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Registration { source, .. } => matches!(source, TranslationError::SchemaUnavailable),
            Self::Store(e) => matches!(e, StoreError::Backend(_)),
            Self::Timeout { .. } => true,
            Self::Disconnected => false,
        }
    }
}

/// Error returned by a listener callback; handed back to the raw store.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for listener callbacks.
pub type ListenerResult = Result<(), ListenerError>;

/// Result type alias for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;
