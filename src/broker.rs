//! Typed facade over a raw data broker.
//!
//! [`ForwardedDataBroker`] turns a typed listener registration into a raw
//! subscription whose events are translated on demand, and keeps its codec
//! in step with the global schema context for as long as it is open.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::TypedId;
use crate::codec::{NodeCodec, SchemaContext, SchemaContextListener, SchemaService};
use crate::error::{BrokerError, BrokerResult};
use crate::forward::{DataChangeListener, ListenerRegistration, RegistrationId, TranslatingListener};
use crate::store::{DataChangeScope, DataStoreType, RawDataBroker, Registration};
use crate::stream::{ChangeStream, ChannelListener};
use crate::translate::ChangeSetTranslator;

/// Broker tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Per-stream buffer capacity for [`ForwardedDataBroker::register_stream`].
    pub stream_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { stream_capacity: 1024 }
    }
}

/// Forwards schema updates to the codec.
struct CodecSchemaListener {
    codec: Arc<dyn NodeCodec>,
}

impl SchemaContextListener for CodecSchemaListener {
    fn on_global_context_updated(&self, context: &Arc<SchemaContext>) {
        self.codec.on_schema_updated(context);
    }
}

/// Typed data broker forwarding to a raw one.
pub struct ForwardedDataBroker {
    cfg: BrokerConfig,
    delegate: Arc<dyn RawDataBroker>,
    translator: ChangeSetTranslator,
    schema_registration: Mutex<Option<Box<dyn Registration>>>,
}

impl ForwardedDataBroker {
    /// Create a broker with the default configuration.
    ///
    /// Registers with `schema_service` immediately; the registration is held
    /// until [`close`](Self::close).
    pub fn new(
        delegate: Arc<dyn RawDataBroker>,
        codec: Arc<dyn NodeCodec>,
        schema_service: &dyn SchemaService,
    ) -> Self {
        Self::with_config(BrokerConfig::default(), delegate, codec, schema_service)
    }

    /// Create a broker with an explicit configuration.
    pub fn with_config(
        cfg: BrokerConfig,
        delegate: Arc<dyn RawDataBroker>,
        codec: Arc<dyn NodeCodec>,
        schema_service: &dyn SchemaService,
    ) -> Self {
        let schema_listener = Arc::new(CodecSchemaListener {
            codec: Arc::clone(&codec),
        });
        let schema_registration = schema_service.register_schema_context_listener(schema_listener);

        Self {
            cfg,
            delegate,
            translator: ChangeSetTranslator::new(codec),
            schema_registration: Mutex::new(Some(schema_registration)),
        }
    }

    /// The raw broker all subscriptions are forwarded to.
    #[must_use]
    pub fn delegate(&self) -> &Arc<dyn RawDataBroker> {
        &self.delegate
    }

    /// The codec shared by every registration of this broker.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn NodeCodec> {
        self.translator.codec()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn config(&self) -> &BrokerConfig {
        &self.cfg
    }

    /// Register `listener` for changes at `path`.
    ///
    /// Every raw event delivered for the subscription reaches the listener
    /// exactly once, as a lazily translated event anchored at `path`.
    ///
    /// # Errors
    /// - [`BrokerError::Registration`] if `path` has no raw counterpart; no
    ///   subscription is created.
    /// - [`BrokerError::Store`] if the raw broker refuses the subscription.
    pub fn register_data_change_listener(
        &self,
        store: DataStoreType,
        path: &TypedId,
        listener: Arc<dyn DataChangeListener>,
        triggering_scope: DataChangeScope,
    ) -> BrokerResult<ListenerRegistration> {
        let raw_path = self
            .translator
            .codec()
            .to_normalized(path)
            .map_err(|source| BrokerError::Registration {
                path: path.clone(),
                source,
            })?;

        let id = RegistrationId::new();
        let closed = Arc::new(AtomicBool::new(false));
        let forwarder = Arc::new(TranslatingListener::new(
            id,
            store,
            path.clone(),
            triggering_scope,
            self.translator.clone(),
            Arc::clone(&listener),
            Arc::clone(&closed),
        ));

        let registration =
            self.delegate
                .register_data_change_listener(store, &raw_path, forwarder, triggering_scope)?;

        debug!(
            registration = %id,
            ?store,
            path = %path,
            raw_path = %raw_path,
            scope = ?triggering_scope,
            "Listener registered"
        );
        Ok(ListenerRegistration::new(id, path.clone(), listener, registration, closed))
    }

    /// Register a buffered stream for changes at `path`.
    ///
    /// # Errors
    /// Same as [`register_data_change_listener`](Self::register_data_change_listener).
    pub fn register_stream(
        &self,
        store: DataStoreType,
        path: &TypedId,
        triggering_scope: DataChangeScope,
    ) -> BrokerResult<ChangeStream> {
        let (listener, rx) = ChannelListener::bounded(self.cfg.stream_capacity);
        let listener = Arc::new(listener);
        let registration =
            self.register_data_change_listener(store, path, Arc::clone(&listener) as Arc<dyn DataChangeListener>, triggering_scope)?;
        Ok(ChangeStream::new(registration, listener, rx))
    }

    /// Release the schema listener registration.
    ///
    /// Idempotent. Existing listener registrations stay active; the codec
    /// simply stops receiving schema updates.
    pub fn close(&self) {
        let registration = self
            .schema_registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(registration) = registration {
            registration.close();
            debug!("Broker closed, schema listener released");
        }
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.schema_registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for ForwardedDataBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardedDataBroker")
            .field("cfg", &self.cfg)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for ForwardedDataBroker {
    fn drop(&mut self) {
        self.close();
    }
}
