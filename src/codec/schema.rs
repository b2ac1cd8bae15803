//! Schema context and the service that publishes it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::path::QName;
use crate::store::Registration;

/// Structural role of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum SchemaNodeKind {
    Container,
    List,
    Leaf,
    LeafList,
}

impl SchemaNodeKind {
    /// Leaves and leaf-lists have no binding object of their own.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Leaf | Self::LeafList)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub kind: SchemaNodeKind,
    /// Binding type generated for this node; `None` for terminals.
    pub binding_type: Option<String>,
}

/// Flattened schema: node name → binding class.
///
/// Contexts are immutable; a schema reload produces a new context with a
/// higher revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaContext {
    revision: u64,
    nodes: BTreeMap<QName, SchemaNode>,
    by_binding: BTreeMap<String, QName>,
}

#[allow(missing_docs)]
impl SchemaContext {
    #[must_use]
    pub fn builder(revision: u64) -> SchemaContextBuilder {
        SchemaContextBuilder {
            context: Self {
                revision,
                ..Self::default()
            },
        }
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn node(&self, name: &QName) -> Option<&SchemaNode> {
        self.nodes.get(name)
    }

    /// Node name a binding type was generated for.
    #[must_use]
    pub fn qname_for_binding(&self, type_name: &str) -> Option<&QName> {
        self.by_binding.get(type_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builder for [`SchemaContext`].
#[derive(Debug)]
pub struct SchemaContextBuilder {
    context: SchemaContext,
}

impl SchemaContextBuilder {
    fn binding(mut self, name: QName, kind: SchemaNodeKind, binding_type: String) -> Self {
        self.context.by_binding.insert(binding_type.clone(), name.clone());
        self.context.nodes.insert(
            name,
            SchemaNode {
                kind,
                binding_type: Some(binding_type),
            },
        );
        self
    }

    fn terminal(mut self, name: QName, kind: SchemaNodeKind) -> Self {
        self.context.nodes.insert(name, SchemaNode { kind, binding_type: None });
        self
    }

    /// Register a container generating `binding_type`.
    #[must_use]
    pub fn container(self, name: QName, binding_type: impl Into<String>) -> Self {
        self.binding(name, SchemaNodeKind::Container, binding_type.into())
    }

    /// Register a list whose entries generate `binding_type`.
    #[must_use]
    pub fn list(self, name: QName, binding_type: impl Into<String>) -> Self {
        self.binding(name, SchemaNodeKind::List, binding_type.into())
    }

    /// Register a leaf.
    #[must_use]
    pub fn leaf(self, name: QName) -> Self {
        self.terminal(name, SchemaNodeKind::Leaf)
    }

    /// Register a leaf-list.
    #[must_use]
    pub fn leaf_list(self, name: QName) -> Self {
        self.terminal(name, SchemaNodeKind::LeafList)
    }

    /// Finish the context.
    #[must_use]
    pub fn build(self) -> SchemaContext {
        self.context
    }
}

/// Receives global schema context updates.
pub trait SchemaContextListener: Send + Sync {
    /// Called with every new global context.
    fn on_global_context_updated(&self, context: &Arc<SchemaContext>);
}

/// Source of schema context updates.
pub trait SchemaService: Send + Sync {
    /// Register `listener` for context updates.
    ///
    /// Implementations deliver the current context (if any) right away.
    fn register_schema_context_listener(&self, listener: Arc<dyn SchemaContextListener>) -> Box<dyn Registration>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(name: &str) -> QName {
        QName::new("test", name)
    }

    #[test]
    fn builder_indexes_bindings_both_ways() {
        let ctx = SchemaContext::builder(3)
            .container(q("cars"), "Cars")
            .list(q("car"), "Car")
            .leaf(q("id"))
            .build();

        assert_eq!(ctx.revision(), 3);
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.qname_for_binding("Car"), Some(&q("car")));
        assert_eq!(ctx.qname_for_binding("Id"), None);
        assert!(ctx.node(&q("id")).is_some_and(|n| n.kind.is_terminal()));
        assert_eq!(
            ctx.node(&q("cars")).and_then(|n| n.binding_type.as_deref()),
            Some("Cars")
        );
    }
}
