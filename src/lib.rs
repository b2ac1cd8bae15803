//! # binding-broker - Typed change events over an untyped tree store
//!
//! A raw tree store addresses nodes by structural paths and knows nothing
//! about types. This crate sits on top of it: a consumer registers a typed
//! listener at a typed identifier, and every commit the store reports for
//! that subtree arrives as a typed event listing what was created, updated
//! and removed, plus the before/after state of the subtree.
//!
//! ## Core Concepts
//!
//! - **RawPath / RawNode**: the store's untyped addressing and content
//! - **TypedId / TypedValue**: the binding model listeners work with
//! - **NodeCodec**: maps one raw path or node to its typed counterpart
//! - **TranslatedDataChangeEvent**: typed view of one raw event, translated
//!   lazily and cached per collection
//! - **ForwardedDataBroker**: ties typed listeners to raw subscriptions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use binding_broker::*;
//!
//! let store = Arc::new(InMemoryDataBroker::new());
//! let schema = InMemorySchemaService::new();
//! schema.set_global_context(context);
//!
//! let broker = ForwardedDataBroker::new(store.clone(), Arc::new(SchemaCodec::new()), &schema);
//! let stream = broker.register_stream(
//!     DataStoreType::Operational,
//!     &TypedId::root().child("Cars"),
//!     DataChangeScope::Subtree,
//! )?;
//!
//! let event = stream.recv()?;
//! for (id, car) in event.created_data() {
//!     println!("{id} -> {}", car.content);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod binding;
pub mod error;
pub mod event;
pub mod node;
pub mod path;

// Translation
pub mod codec;
pub mod translate;

// Forwarding and registration
pub mod broker;
pub mod forward;
pub mod memory;
pub mod store;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types at crate root for convenience
pub use binding::{TypedId, TypedStep, TypedValue};
pub use broker::{BrokerConfig, ForwardedDataBroker};
pub use codec::{NodeCodec, SchemaCodec, SchemaContext, SchemaContextListener, SchemaService};
pub use error::{BrokerError, BrokerResult, ListenerError, ListenerResult, StoreError, TranslationError};
pub use event::{RawChangeEvent, RawChangeEventBuilder, TranslatedDataChangeEvent};
pub use forward::{DataChangeListener, ListenerRegistration, RegistrationId};
pub use memory::{InMemoryDataBroker, InMemorySchemaService};
pub use node::RawNode;
pub use path::{PathArgument, QName, RawPath};
pub use store::{DataChangeScope, DataStoreType, RawDataBroker, RawDataChangeListener, Registration};
pub use stream::ChangeStream;
pub use translate::{ChangeSetTranslator, TypedDataMap, TypedPathSet};
