//! Reference codec driven by the schema context.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::binding::{TypedId, TypedStep, TypedValue};
use crate::error::TranslationError;
use crate::node::RawNode;
use crate::path::{PathArgument, QName, RawPath};

use super::schema::{SchemaContext, SchemaNodeKind};
use super::NodeCodec;

/// [`NodeCodec`] driven by the current global [`SchemaContext`].
///
/// List entries appear in raw paths as a single keyed step; a keyed step
/// with no predicates (or a non-final plain list step) is a wildcard.
/// Augmentation steps are transparent inside a path and untranslatable at
/// its end.
#[derive(Debug, Default)]
pub struct SchemaCodec {
    context: RwLock<Option<Arc<SchemaContext>>>,
}

impl SchemaCodec {
    /// Codec with no schema yet; every call fails until a context arrives.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec bound to `context` until the next schema update.
    #[must_use]
    pub fn with_context(context: Arc<SchemaContext>) -> Self {
        Self {
            context: RwLock::new(Some(context)),
        }
    }

    /// The context translations currently run against.
    ///
    /// # Errors
    /// [`TranslationError::SchemaUnavailable`] before the first update.
    pub fn current(&self) -> Result<Arc<SchemaContext>, TranslationError> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TranslationError::SchemaUnavailable)
    }
}

fn malformed(path: &RawPath, reason: impl Into<String>) -> TranslationError {
    TranslationError::Deserialization {
        path: path.clone(),
        reason: reason.into(),
    }
}

impl NodeCodec for SchemaCodec {
    fn to_binding_id(&self, path: &RawPath) -> Result<Option<TypedId>, TranslationError> {
        let ctx = self.current()?;
        let arguments = path.arguments();
        let mut steps = Vec::with_capacity(arguments.len());

        for (index, argument) in arguments.iter().enumerate() {
            let last = index + 1 == arguments.len();
            let (name, keys) = match argument {
                PathArgument::Augmentation { .. } if last => return Ok(None),
                PathArgument::Augmentation { .. } => continue,
                PathArgument::LeafSetEntry { .. } if last => return Ok(None),
                PathArgument::LeafSetEntry { .. } => {
                    return Err(malformed(path, "leaf-list entry cannot have children"));
                }
                PathArgument::Node { name } => (name, None),
                PathArgument::Keyed { name, keys } => (name, Some(keys)),
            };

            let node = ctx.node(name).ok_or_else(|| TranslationError::UnknownNode {
                name: name.clone(),
                path: path.clone(),
            })?;

            if node.kind.is_terminal() {
                if last {
                    return Ok(None);
                }
                return Err(malformed(path, format!("terminal node {name} cannot have children")));
            }

            let Some(type_name) = node.binding_type.clone() else {
                return Err(malformed(path, format!("{name} has no binding type")));
            };

            match (node.kind, keys) {
                (SchemaNodeKind::List, None) if last => return Ok(None),
                (SchemaNodeKind::List, None) => steps.push(TypedStep::Keyed { type_name, key: None }),
                (SchemaNodeKind::List, Some(keys)) => {
                    let key = (!keys.is_empty())
                        .then(|| keys.iter().map(|(k, v)| (k.name.clone(), v.clone())).collect());
                    steps.push(TypedStep::Keyed { type_name, key });
                }
                (_, Some(_)) => return Err(malformed(path, format!("{name} is not a list"))),
                (_, None) => steps.push(TypedStep::Item { type_name }),
            }
        }

        if steps.is_empty() {
            return Ok(None);
        }
        Ok(Some(TypedId::from_steps(steps)))
    }

    fn to_binding_value(&self, id: &TypedId, node: &RawNode) -> Result<Option<TypedValue>, TranslationError> {
        let Some(type_name) = id.target_type() else {
            return Ok(None);
        };
        let ctx = self.current()?;
        if ctx.qname_for_binding(type_name).is_none() {
            return Err(TranslationError::UnmappedBinding {
                type_name: type_name.to_string(),
                id: id.clone(),
            });
        }

        // A bare leaf is a field, never a binding object.
        if matches!(node, RawNode::Leaf { .. }) {
            return Ok(None);
        }
        Ok(Some(TypedValue::new(type_name, node.to_json())))
    }

    fn to_normalized(&self, id: &TypedId) -> Result<RawPath, TranslationError> {
        let ctx = self.current()?;
        let mut path = RawPath::root();

        for step in id.steps() {
            let name = ctx
                .qname_for_binding(step.type_name())
                .cloned()
                .ok_or_else(|| TranslationError::UnmappedBinding {
                    type_name: step.type_name().to_string(),
                    id: id.clone(),
                })?;

            path = match step {
                TypedStep::Item { .. } => path.node(name),
                TypedStep::Keyed { key, .. } => {
                    let keys: Vec<(QName, String)> = key
                        .iter()
                        .flatten()
                        .map(|(k, v)| (QName::new(name.module.clone(), k.clone()), v.clone()))
                        .collect();
                    path.keyed(name, keys)
                }
            };
        }

        Ok(path)
    }

    fn on_schema_updated(&self, context: &Arc<SchemaContext>) {
        let mut guard = self.context.write().unwrap_or_else(PoisonError::into_inner);
        debug!(
            revision = context.revision(),
            previous = guard.as_ref().map(|c| c.revision()),
            "Schema context updated"
        );
        *guard = Some(Arc::clone(context));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn q(name: &str) -> QName {
        QName::new("test", name)
    }

    fn context() -> Arc<SchemaContext> {
        Arc::new(
            SchemaContext::builder(1)
                .container(q("cars"), "Cars")
                .list(q("car"), "Car")
                .container(q("engine"), "Engine")
                .leaf(q("id"))
                .leaf(q("color"))
                .leaf_list(q("tags"))
                .build(),
        )
    }

    fn car_path(id: &str) -> RawPath {
        RawPath::root().node(q("cars")).keyed(q("car"), [(q("id"), id)])
    }

    #[test]
    fn fails_without_schema() {
        let codec = SchemaCodec::new();
        let err = codec.to_binding_id(&RawPath::root().node(q("cars"))).unwrap_err();
        assert!(matches!(err, TranslationError::SchemaUnavailable));
    }

    #[test]
    fn translates_keyed_path() {
        let codec = SchemaCodec::with_context(context());
        let id = codec.to_binding_id(&car_path("7")).unwrap().unwrap();
        assert_eq!(id, TypedId::root().child("Cars").keyed_child("Car", [("id", "7")]));
    }

    #[test]
    fn round_trips_through_normalized_form() {
        let codec = SchemaCodec::with_context(context());
        let id = TypedId::root().child("Cars").keyed_child("Car", [("id", "7")]).child("Engine");
        let raw = codec.to_normalized(&id).unwrap();
        assert_eq!(raw, car_path("7").node(q("engine")));
        assert_eq!(codec.to_binding_id(&raw).unwrap(), Some(id));
    }

    #[test]
    fn wildcard_maps_to_keyless_entry() {
        let codec = SchemaCodec::with_context(context());
        let id = TypedId::root().child("Cars").wildcard_child("Car");
        let raw = codec.to_normalized(&id).unwrap();
        assert_eq!(raw, RawPath::root().node(q("cars")).keyed(q("car"), Vec::<(QName, String)>::new()));
        assert_eq!(codec.to_binding_id(&raw).unwrap(), Some(id));
    }

    #[test]
    fn terminals_and_trailing_augmentation_have_no_id() {
        let codec = SchemaCodec::with_context(context());
        assert_eq!(codec.to_binding_id(&car_path("1").node(q("color"))).unwrap(), None);
        assert_eq!(codec.to_binding_id(&car_path("1").augmentation([q("color")])).unwrap(), None);
        assert_eq!(codec.to_binding_id(&RawPath::root()).unwrap(), None);
    }

    #[test]
    fn inner_augmentation_is_transparent() {
        let codec = SchemaCodec::with_context(context());
        let path = car_path("1").augmentation([q("engine")]).node(q("engine"));
        let id = codec.to_binding_id(&path).unwrap().unwrap();
        assert_eq!(id.target_type(), Some("Engine"));
        assert_eq!(id.depth(), 3);
    }

    #[test]
    fn unknown_and_malformed_paths_fail() {
        let codec = SchemaCodec::with_context(context());
        assert!(matches!(
            codec.to_binding_id(&RawPath::root().node(q("boats"))),
            Err(TranslationError::UnknownNode { .. })
        ));
        assert!(matches!(
            codec.to_binding_id(&car_path("1").node(q("color")).node(q("cars"))),
            Err(TranslationError::Deserialization { .. })
        ));
        assert!(matches!(
            codec.to_binding_id(&RawPath::root().keyed(q("cars"), [(q("id"), "1")])),
            Err(TranslationError::Deserialization { .. })
        ));
        assert!(matches!(
            codec.to_normalized(&TypedId::root().child("Boats")),
            Err(TranslationError::UnmappedBinding { .. })
        ));
    }

    #[test]
    fn value_translation_uses_target_type() {
        let codec = SchemaCodec::with_context(context());
        let id = TypedId::root().child("Cars").keyed_child("Car", [("id", "1")]);
        let node = RawNode::container(q("car"), vec![RawNode::leaf(q("color"), "red")]);

        let value = codec.to_binding_value(&id, &node).unwrap().unwrap();
        assert_eq!(value.type_name, "Car");
        assert_eq!(value.content, json!({ "color": "red" }));

        let leaf = RawNode::leaf(q("color"), "red");
        assert_eq!(codec.to_binding_value(&id, &leaf).unwrap(), None);
        assert_eq!(codec.to_binding_value(&TypedId::root(), &node).unwrap(), None);
    }

    #[test]
    fn schema_update_replaces_context() {
        let codec = SchemaCodec::new();
        codec.on_schema_updated(&context());
        assert_eq!(codec.current().unwrap().revision(), 1);

        let next = Arc::new(SchemaContext::builder(2).container(q("boats"), "Boats").build());
        codec.on_schema_updated(&next);
        assert_eq!(codec.current().unwrap().revision(), 2);
        assert!(codec.to_binding_id(&RawPath::root().node(q("cars"))).is_err());
    }
}
