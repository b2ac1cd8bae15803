//! Raw ⇄ typed translation.
//!
//! The broker never interprets paths or nodes itself; every mapping goes
//! through a [`NodeCodec`]. [`SchemaCodec`] is the in-crate implementation
//! driven by a [`SchemaContext`].

/// Reference codec over a schema context.
pub mod schema_codec;
/// Schema context and the service distributing it.
pub mod schema;

use std::sync::Arc;

use crate::binding::{TypedId, TypedValue};
use crate::error::TranslationError;
use crate::node::RawNode;
use crate::path::RawPath;

pub use schema::{SchemaContext, SchemaContextBuilder, SchemaContextListener, SchemaNode, SchemaNodeKind, SchemaService};
pub use schema_codec::SchemaCodec;

/// Maps single raw paths and nodes to their typed counterparts and back.
///
/// `Ok(None)` means "no typed counterpart" and is not a failure; an `Err`
/// means the input could not be interpreted at all.
pub trait NodeCodec: Send + Sync {
    /// Typed identifier of a raw path.
    ///
    /// # Errors
    /// Returns a [`TranslationError`] for malformed or unknown paths.
    fn to_binding_id(&self, path: &RawPath) -> Result<Option<TypedId>, TranslationError>;

    /// Typed value of `node` interpreted as the object at `id`.
    ///
    /// # Errors
    /// Returns a [`TranslationError`] if `id` names no known binding type.
    fn to_binding_value(&self, id: &TypedId, node: &RawNode) -> Result<Option<TypedValue>, TranslationError>;

    /// Raw path of a typed identifier.
    ///
    /// # Errors
    /// Returns a [`TranslationError`] if any step names no known binding type.
    fn to_normalized(&self, id: &TypedId) -> Result<RawPath, TranslationError>;

    /// Joint translation of one raw entry.
    ///
    /// # Errors
    /// Propagates failures from either half of the translation.
    fn to_binding_entry(
        &self,
        path: &RawPath,
        node: &RawNode,
    ) -> Result<Option<(TypedId, TypedValue)>, TranslationError> {
        let Some(id) = self.to_binding_id(path)? else {
            return Ok(None);
        };
        Ok(self.to_binding_value(&id, node)?.map(|value| (id, value)))
    }

    /// Hook invoked whenever the global schema context changes.
    fn on_schema_updated(&self, _context: &Arc<SchemaContext>) {}
}
