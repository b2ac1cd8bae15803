//! Untyped tree nodes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::{PathArgument, QName};

/// A schema-described node in the raw tree.
///
/// Nodes carry no binding type; [`RawNode::to_json`] gives the codec a
/// structural view of their content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawNode {
    /// Terminal value.
    #[allow(missing_docs)]
    Leaf { name: QName, value: Value },

    /// Container, list or list entry.
    Container {
        /// Step addressing this node from its parent.
        identifier: PathArgument,
        #[allow(missing_docs)]
        children: Vec<RawNode>,
    },

    /// Synthetic grouping of augmenting children.
    #[allow(missing_docs)]
    Augmentation { children: Vec<RawNode> },
}

impl RawNode {
    /// A leaf holding `value`.
    #[must_use]
    pub fn leaf(name: QName, value: impl Into<Value>) -> Self {
        Self::Leaf {
            name,
            value: value.into(),
        }
    }

    /// A container addressed by plain name.
    #[must_use]
    pub fn container(name: QName, children: Vec<RawNode>) -> Self {
        Self::Container {
            identifier: PathArgument::Node { name },
            children,
        }
    }

    /// A container addressed by an explicit step, e.g. a keyed list entry.
    #[must_use]
    pub const fn with_identifier(identifier: PathArgument, children: Vec<RawNode>) -> Self {
        Self::Container { identifier, children }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn augmentation(children: Vec<RawNode>) -> Self {
        Self::Augmentation { children }
    }

    /// The path step that addresses this node from its parent.
    #[must_use]
    pub fn identifier(&self) -> PathArgument {
        match self {
            Self::Leaf { name, .. } => PathArgument::Node { name: name.clone() },
            Self::Container { identifier, .. } => identifier.clone(),
            Self::Augmentation { children } => PathArgument::Augmentation {
                children: children
                    .iter()
                    .filter_map(|c| c.identifier().node_name().cloned())
                    .collect(),
            },
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_augmentation(&self) -> bool {
        matches!(self, Self::Augmentation { .. })
    }

    /// Direct children; empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[RawNode] {
        match self {
            Self::Leaf { .. } => &[],
            Self::Container { children, .. } | Self::Augmentation { children } => children,
        }
    }

    /// Structural JSON rendering of the node's content.
    ///
    /// Augmentation children are merged into the enclosing object; list and
    /// leaf-list entries are collected into arrays under their local name.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Leaf { value, .. } => value.clone(),
            Self::Container { children, .. } | Self::Augmentation { children } => {
                let mut object = Map::new();
                merge_children(&mut object, children);
                Value::Object(object)
            }
        }
    }
}

fn merge_children(object: &mut Map<String, Value>, children: &[RawNode]) {
    for child in children {
        if let RawNode::Augmentation { children } = child {
            merge_children(object, children);
            continue;
        }

        let identifier = child.identifier();
        let Some(name) = identifier.node_name() else {
            continue;
        };

        let value = child.to_json();
        match &identifier {
            PathArgument::Keyed { .. } | PathArgument::LeafSetEntry { .. } => {
                let slot = object
                    .entry(name.name.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(items) = slot {
                    items.push(value);
                }
            }
            _ => {
                object.insert(name.name.clone(), value);
            }
        }
    }
}
