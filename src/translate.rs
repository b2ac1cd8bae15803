//! Translation of raw change sets into typed ones.
//!
//! Every collection is translated entry by entry. A failing entry is logged
//! and dropped; the collection as a whole always translates.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::binding::{TypedId, TypedValue};
use crate::codec::NodeCodec;
use crate::node::RawNode;
use crate::path::{PathArgument, RawPath};

/// Typed view of a created/updated/original collection.
pub type TypedDataMap = HashMap<TypedId, TypedValue>;

/// Typed view of a removed-paths collection.
pub type TypedPathSet = HashSet<TypedId>;

/// Translates raw change collections relative to an anchor identifier.
#[derive(Clone)]
pub struct ChangeSetTranslator {
    codec: Arc<dyn NodeCodec>,
}

impl fmt::Debug for ChangeSetTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSetTranslator").finish_non_exhaustive()
    }
}

fn ends_in_augmentation(path: &RawPath) -> bool {
    path.last_argument().is_some_and(PathArgument::is_augmentation)
}

/// Paths ordered ancestors-first: by step count, ties kept in input order.
fn sorted_by_depth<'a, I, T>(entries: I) -> Vec<(&'a RawPath, T)>
where
    I: IntoIterator<Item = (&'a RawPath, T)>,
{
    let mut sorted: Vec<_> = entries.into_iter().collect();
    sorted.sort_by_key(|(path, _)| path.depth());
    sorted
}

impl ChangeSetTranslator {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(codec: Arc<dyn NodeCodec>) -> Self {
        Self { codec }
    }

    /// The codec used for every entry.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn NodeCodec> {
        &self.codec
    }

    /// Translate a path → node collection.
    ///
    /// Entries are visited ancestors-first, so when two raw paths land on
    /// the same identifier the deeper one wins. An entry ending in an
    /// augmentation step is attributed to `anchor`.
    #[must_use]
    pub fn translate_map(&self, anchor: &TypedId, raw: &BTreeMap<RawPath, RawNode>) -> TypedDataMap {
        let mut translated = TypedDataMap::with_capacity(raw.len());

        for (path, node) in sorted_by_depth(raw) {
            match self.codec.to_binding_entry(path, node) {
                Ok(Some((id, value))) => {
                    translated.insert(id, value);
                }
                Ok(None) if ends_in_augmentation(path) => match self.codec.to_binding_value(anchor, node) {
                    Ok(Some(value)) => {
                        translated.insert(anchor.clone(), value);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(%path, %anchor, %err, "Failed to translate augmentation, omitting it");
                    }
                },
                Ok(None) => {
                    debug!(%path, "Change entry has no binding counterpart");
                }
                Err(err) => {
                    warn!(%path, %err, "Failed to translate change entry, omitting it");
                }
            }
        }

        translated
    }

    /// Translate a removed-paths collection.
    #[must_use]
    pub fn translate_set(&self, anchor: &TypedId, raw: &BTreeSet<RawPath>) -> TypedPathSet {
        let mut translated = TypedPathSet::with_capacity(raw.len());

        for (path, ()) in sorted_by_depth(raw.iter().map(|p| (p, ()))) {
            match self.codec.to_binding_id(path) {
                Ok(Some(id)) => {
                    translated.insert(id);
                }
                Ok(None) if ends_in_augmentation(path) => {
                    translated.insert(anchor.clone());
                }
                Ok(None) => {
                    debug!(%path, "Removed path has no binding counterpart");
                }
                Err(err) => {
                    warn!(%path, %err, "Failed to translate removed path, omitting it");
                }
            }
        }

        translated
    }

    /// Translate a full-subtree snapshot taken at `anchor`.
    ///
    /// Absent input, a wildcarded anchor and codec failures all yield `None`;
    /// the codec is not consulted in the first two cases.
    #[must_use]
    pub fn translate_subtree(&self, anchor: &TypedId, node: Option<&RawNode>) -> Option<TypedValue> {
        let node = node?;
        if anchor.is_wildcarded() {
            return None;
        }

        match self.codec.to_binding_value(anchor, node) {
            Ok(value) => value,
            Err(err) => {
                debug!(%anchor, %err, "Subtree snapshot is untranslatable, treating it as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{q, StubCodec};

    fn cars() -> RawPath {
        RawPath::root().node(q("cars"))
    }

    fn car(id: &str) -> RawPath {
        cars().keyed(q("car"), [(q("id"), id)])
    }

    fn typed_cars() -> TypedId {
        TypedId::root().child("Cars")
    }

    fn typed_car(id: &str) -> TypedId {
        typed_cars().keyed_child("Car", [("id", id)])
    }

    fn leaf(value: &str) -> RawNode {
        RawNode::container(q("car"), vec![RawNode::leaf(q("color"), value)])
    }

    #[test]
    fn translates_every_mapped_entry() {
        let codec = StubCodec::new()
            .map(car("1"), typed_car("1"))
            .map(car("2"), typed_car("2"))
            .shared();
        let translator = ChangeSetTranslator::new(codec);

        let raw = BTreeMap::from([(car("1"), leaf("red")), (car("2"), leaf("blue"))]);
        let out = translator.translate_map(&typed_cars(), &raw);

        assert_eq!(out.len(), 2);
        assert_eq!(out[&typed_car("1")].content, json!({ "color": "red" }));
        assert_eq!(out[&typed_car("2")].content, json!({ "color": "blue" }));
    }

    #[test]
    fn visits_ancestors_before_descendants() {
        let deep = car("1").node(q("engine"));
        let codec = StubCodec::new()
            .map(cars(), typed_cars())
            .map(car("1"), typed_car("1"))
            .map(deep.clone(), typed_car("1").child("Engine"))
            .shared();
        let translator = ChangeSetTranslator::new(codec.clone());
        let trucks = RawPath::root().node(q("trucks"));

        let raw = BTreeMap::from([
            (deep.clone(), leaf("x")),
            (car("1"), leaf("y")),
            (cars(), leaf("z")),
            (trucks.clone(), leaf("w")),
        ]);
        let _ = translator.translate_map(&typed_cars(), &raw);

        let calls = codec.id_calls();
        let position = |p: &RawPath| calls.iter().position(|c| c == p).unwrap();
        assert!(position(&cars()) < position(&car("1")));
        assert!(position(&car("1")) < position(&deep));
        assert!(position(&trucks) < position(&car("1")));
    }

    #[test]
    fn deeper_entry_wins_on_identifier_collision() {
        let aug = car("1").augmentation([q("color")]);
        let codec = StubCodec::new()
            .map(car("1"), typed_car("1"))
            .map(aug.clone(), typed_car("1"))
            .shared();
        let translator = ChangeSetTranslator::new(codec);

        let raw = BTreeMap::from([(aug, leaf("deep")), (car("1"), leaf("shallow"))]);
        let out = translator.translate_map(&typed_cars(), &raw);

        assert_eq!(out.len(), 1);
        assert_eq!(out[&typed_car("1")].content, json!({ "color": "deep" }));
    }

    #[test]
    fn failing_entry_is_dropped() {
        let codec = StubCodec::new()
            .map(car("1"), typed_car("1"))
            .map(car("3"), typed_car("3"))
            .fail_path(car("2"))
            .shared();
        let translator = ChangeSetTranslator::new(codec);

        let raw = BTreeMap::from([
            (car("1"), leaf("a")),
            (car("2"), leaf("b")),
            (car("3"), leaf("c")),
        ]);
        let out = translator.translate_map(&typed_cars(), &raw);

        assert_eq!(out.len(), 2);
        assert!(out.contains_key(&typed_car("1")));
        assert!(out.contains_key(&typed_car("3")));
    }

    #[test]
    fn augmentation_is_attributed_to_anchor() {
        let aug = car("1").augmentation([q("color")]);
        let codec = StubCodec::new().shared();
        let translator = ChangeSetTranslator::new(codec);
        let anchor = typed_car("1");

        let node = RawNode::augmentation(vec![RawNode::leaf(q("color"), "green")]);
        let out = translator.translate_map(&anchor, &BTreeMap::from([(aug, node)]));

        assert_eq!(out.len(), 1);
        assert_eq!(out[&anchor].content, json!({ "color": "green" }));
    }

    #[test]
    fn failing_augmentation_fallback_is_dropped() {
        let aug = car("1").augmentation([q("color")]);
        let anchor = typed_car("1");
        let codec = StubCodec::new().fail_value(anchor.clone()).shared();
        let translator = ChangeSetTranslator::new(codec);

        let out = translator.translate_map(&anchor, &BTreeMap::from([(aug, leaf("x"))]));
        assert!(out.is_empty());
    }

    #[test]
    fn untranslatable_plain_entry_is_skipped() {
        let codec = StubCodec::new().shared();
        let translator = ChangeSetTranslator::new(codec.clone());

        let out = translator.translate_map(&typed_cars(), &BTreeMap::from([(car("9"), leaf("x"))]));
        assert!(out.is_empty());
        assert_eq!(codec.value_calls(), 0);
    }

    #[test]
    fn removed_set_follows_same_policy() {
        let aug = car("1").augmentation([q("color")]);
        let codec = StubCodec::new()
            .map(car("1"), typed_car("1"))
            .fail_path(car("2"))
            .shared();
        let translator = ChangeSetTranslator::new(codec);
        let anchor = typed_cars();

        let raw = BTreeSet::from([car("1"), car("2"), car("3"), aug]);
        let out = translator.translate_set(&anchor, &raw);

        assert_eq!(out, TypedPathSet::from([typed_car("1"), anchor]));
    }

    #[test]
    fn subtree_absent_or_wildcarded_skips_codec() {
        let codec = StubCodec::new().shared();
        let translator = ChangeSetTranslator::new(codec.clone());

        assert_eq!(translator.translate_subtree(&typed_cars(), None), None);
        let wildcard = typed_cars().wildcard_child("Car");
        assert_eq!(translator.translate_subtree(&wildcard, Some(&leaf("x"))), None);
        assert_eq!(codec.total_calls(), 0);

        let value = translator.translate_subtree(&typed_cars(), Some(&leaf("x")));
        assert_eq!(value.map(|v| v.type_name), Some("Cars".to_string()));
    }

    #[test]
    fn subtree_failure_degrades_to_absent() {
        let codec = StubCodec::new().fail_value(typed_cars()).shared();
        let translator = ChangeSetTranslator::new(codec.clone());

        assert_eq!(translator.translate_subtree(&typed_cars(), Some(&leaf("x"))), None);
        assert_eq!(codec.value_calls(), 1);
    }
}
