//! Raw change events and their lazily translated typed view.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::binding::{TypedId, TypedValue};
use crate::node::RawNode;
use crate::path::RawPath;
use crate::translate::{ChangeSetTranslator, TypedDataMap, TypedPathSet};

/// One commit's worth of changes under a subscription anchor, as emitted by
/// the raw store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChangeEvent {
    created: BTreeMap<RawPath, RawNode>,
    updated: BTreeMap<RawPath, RawNode>,
    original: BTreeMap<RawPath, RawNode>,
    removed: BTreeSet<RawPath>,
    original_subtree: Option<RawNode>,
    updated_subtree: Option<RawNode>,
}

impl RawChangeEvent {
    #[allow(missing_docs)]
    #[must_use]
    pub fn builder() -> RawChangeEventBuilder {
        RawChangeEventBuilder::default()
    }

    /// Nodes that did not exist before the commit.
    #[must_use]
    pub const fn created_data(&self) -> &BTreeMap<RawPath, RawNode> {
        &self.created
    }

    /// New state of nodes that existed before and after the commit.
    #[must_use]
    pub const fn updated_data(&self) -> &BTreeMap<RawPath, RawNode> {
        &self.updated
    }

    /// Pre-commit state of every updated or removed node.
    #[must_use]
    pub const fn original_data(&self) -> &BTreeMap<RawPath, RawNode> {
        &self.original
    }

    /// Nodes deleted by the commit.
    #[must_use]
    pub const fn removed_paths(&self) -> &BTreeSet<RawPath> {
        &self.removed
    }

    /// The whole subtree at the anchor before the commit.
    #[must_use]
    pub const fn original_subtree(&self) -> Option<&RawNode> {
        self.original_subtree.as_ref()
    }

    /// The whole subtree at the anchor after the commit.
    #[must_use]
    pub const fn updated_subtree(&self) -> Option<&RawNode> {
        self.updated_subtree.as_ref()
    }

    /// True when the event carries no entries and no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.original.is_empty()
            && self.removed.is_empty()
            && self.original_subtree.is_none()
            && self.updated_subtree.is_none()
    }
}

/// Builder for [`RawChangeEvent`].
#[derive(Debug, Default)]
pub struct RawChangeEventBuilder {
    event: RawChangeEvent,
}

#[allow(missing_docs)]
impl RawChangeEventBuilder {
    #[must_use]
    pub fn created(mut self, path: RawPath, node: RawNode) -> Self {
        self.event.created.insert(path, node);
        self
    }

    #[must_use]
    pub fn updated(mut self, path: RawPath, node: RawNode) -> Self {
        self.event.updated.insert(path, node);
        self
    }

    #[must_use]
    pub fn original(mut self, path: RawPath, node: RawNode) -> Self {
        self.event.original.insert(path, node);
        self
    }

    #[must_use]
    pub fn removed(mut self, path: RawPath) -> Self {
        self.event.removed.insert(path);
        self
    }

    #[must_use]
    pub fn original_subtree(mut self, node: RawNode) -> Self {
        self.event.original_subtree = Some(node);
        self
    }

    #[must_use]
    pub fn updated_subtree(mut self, node: RawNode) -> Self {
        self.event.updated_subtree = Some(node);
        self
    }

    #[must_use]
    pub fn build(self) -> RawChangeEvent {
        self.event
    }
}

/// Typed view over a [`RawChangeEvent`].
///
/// Nothing is translated up front. Each accessor translates its collection
/// on first call and caches it; every field has its own once-cell, so
/// concurrent readers of different fields never wait on each other and a
/// field is computed exactly once.
pub struct TranslatedDataChangeEvent {
    translator: ChangeSetTranslator,
    path: TypedId,
    raw: Arc<RawChangeEvent>,
    created: OnceLock<TypedDataMap>,
    updated: OnceLock<TypedDataMap>,
    original: OnceLock<TypedDataMap>,
    removed: OnceLock<TypedPathSet>,
    original_subtree: OnceLock<Option<TypedValue>>,
    updated_subtree: OnceLock<Option<TypedValue>>,
}

impl TranslatedDataChangeEvent {
    /// Wrap `raw` for a listener registered at `path`.
    #[must_use]
    pub fn new(translator: ChangeSetTranslator, path: TypedId, raw: Arc<RawChangeEvent>) -> Self {
        Self {
            translator,
            path,
            raw,
            created: OnceLock::new(),
            updated: OnceLock::new(),
            original: OnceLock::new(),
            removed: OnceLock::new(),
            original_subtree: OnceLock::new(),
            updated_subtree: OnceLock::new(),
        }
    }

    /// The identifier the listener was registered at.
    #[must_use]
    pub const fn path(&self) -> &TypedId {
        &self.path
    }

    /// The untranslated event.
    #[must_use]
    pub fn raw_event(&self) -> &RawChangeEvent {
        &self.raw
    }

    /// Typed nodes created by the commit.
    pub fn created_data(&self) -> &TypedDataMap {
        self.created
            .get_or_init(|| self.translator.translate_map(&self.path, self.raw.created_data()))
    }

    /// Typed new state of updated nodes.
    pub fn updated_data(&self) -> &TypedDataMap {
        self.updated
            .get_or_init(|| self.translator.translate_map(&self.path, self.raw.updated_data()))
    }

    /// Typed pre-commit state of updated or removed nodes.
    pub fn original_data(&self) -> &TypedDataMap {
        self.original
            .get_or_init(|| self.translator.translate_map(&self.path, self.raw.original_data()))
    }

    /// Typed identifiers of removed nodes.
    pub fn removed_paths(&self) -> &TypedPathSet {
        self.removed
            .get_or_init(|| self.translator.translate_set(&self.path, self.raw.removed_paths()))
    }

    /// Typed state of the anchor before the commit.
    pub fn original_subtree(&self) -> Option<&TypedValue> {
        self.original_subtree
            .get_or_init(|| self.translator.translate_subtree(&self.path, self.raw.original_subtree()))
            .as_ref()
    }

    /// Typed state of the anchor after the commit.
    pub fn updated_subtree(&self) -> Option<&TypedValue> {
        self.updated_subtree
            .get_or_init(|| self.translator.translate_subtree(&self.path, self.raw.updated_subtree()))
            .as_ref()
    }
}

impl fmt::Debug for TranslatedDataChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatedDataChangeEvent")
            .field("path", &self.path)
            .field("created", self.created_data())
            .field("updated", self.updated_data())
            .field("removed", self.removed_paths())
            .field("raw", &self.raw)
            .finish()
    }
}
