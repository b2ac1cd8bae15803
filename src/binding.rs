//! Typed (binding) identifiers and values.
//!
//! These are what listeners see. The codec owns the mapping between a
//! [`TypedId`] and its [`RawPath`](crate::path::RawPath); some raw paths have
//! no typed counterpart at all.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a [`TypedId`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedStep {
    /// A container or other singleton binding.
    #[allow(missing_docs)]
    Item { type_name: String },

    /// A list entry; `key: None` matches every entry.
    Keyed {
        /// Binding type of the list entry.
        type_name: String,
        /// Key field to key value.
        key: Option<BTreeMap<String, String>>,
    },
}

impl TypedStep {
    /// Binding type this step addresses.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Item { type_name } | Self::Keyed { type_name, .. } => type_name,
        }
    }

    /// True for a list step without a key.
    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Self::Keyed { key: None, .. })
    }
}

impl fmt::Display for TypedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item { type_name } => f.write_str(type_name),
            Self::Keyed { type_name, key: None } => write!(f, "{type_name}[*]"),
            Self::Keyed {
                type_name,
                key: Some(key),
            } => {
                f.write_str(type_name)?;
                for (k, v) in key {
                    write!(f, "[{k}={v}]")?;
                }
                Ok(())
            }
        }
    }
}

/// Typed identifier of a binding object.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedId(Vec<TypedStep>);

#[allow(missing_docs)]
impl TypedId {
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn from_steps(steps: impl IntoIterator<Item = TypedStep>) -> Self {
        Self(steps.into_iter().collect())
    }

    #[must_use]
    pub fn steps(&self) -> &[TypedStep] {
        &self.0
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Binding type of the addressed object.
    #[must_use]
    pub fn target_type(&self) -> Option<&str> {
        self.0.last().map(TypedStep::type_name)
    }

    /// True if any list step leaves its key unspecified.
    ///
    /// A wildcarded identifier names a set of objects, never a single value.
    #[must_use]
    pub fn is_wildcarded(&self) -> bool {
        self.0.iter().any(TypedStep::is_wildcard)
    }

    fn push(&self, step: TypedStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    /// Append a singleton step.
    #[must_use]
    pub fn child(&self, type_name: impl Into<String>) -> Self {
        self.push(TypedStep::Item {
            type_name: type_name.into(),
        })
    }

    /// Append a list entry step with its key.
    #[must_use]
    pub fn keyed_child<I, K, V>(&self, type_name: impl Into<String>, key: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.push(TypedStep::Keyed {
            type_name: type_name.into(),
            key: Some(key.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        })
    }

    /// Append a list step matching every entry.
    #[must_use]
    pub fn wildcard_child(&self, type_name: impl Into<String>) -> Self {
        self.push(TypedStep::Keyed {
            type_name: type_name.into(),
            key: None,
        })
    }
}

impl fmt::Display for TypedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for step in &self.0 {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

/// A typed binding object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    /// Binding type this object implements.
    pub type_name: String,
    /// Field values.
    pub content: Value,
}

impl TypedValue {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(type_name: impl Into<String>, content: Value) -> Self {
        Self {
            type_name: type_name.into(),
            content,
        }
    }

    /// Look up one field of an object-shaped value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.content.get(name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wildcard_detection() {
        let cars = TypedId::root().child("Cars");
        assert!(!cars.is_wildcarded());
        assert!(!cars.keyed_child("Car", [("id", "1")]).is_wildcarded());
        assert!(cars.wildcard_child("Car").is_wildcarded());
        assert!(cars.wildcard_child("Car").child("Engine").is_wildcarded());
    }

    #[test]
    fn display_and_target_type() {
        let car = TypedId::root().child("Cars").keyed_child("Car", [("id", "1")]);
        assert_eq!(car.to_string(), "/Cars/Car[id=1]");
        assert_eq!(car.target_type(), Some("Car"));
        assert_eq!(TypedId::root().child("Cars").wildcard_child("Car").to_string(), "/Cars/Car[*]");
        assert_eq!(TypedId::root().target_type(), None);
    }

    #[test]
    fn typed_value_fields() {
        let value = TypedValue::new("Car", json!({ "id": "1", "color": "red" }));
        assert_eq!(value.field("color"), Some(&json!("red")));
        assert_eq!(value.field("missing"), None);
    }
}
