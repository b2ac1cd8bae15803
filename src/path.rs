//! Structural paths into the raw tree.
//!
//! A [`RawPath`] is an ordered sequence of [`PathArgument`]s from the tree
//! root. Paths carry no type information; the codec decides what (if
//! anything) a path means in the typed model.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Qualified name of a schema node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QName {
    /// Module (namespace) the node is defined in.
    pub module: String,
    /// Local node name.
    pub name: String,
}

impl QName {
    /// Create a qualified name.
    #[must_use]
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

/// One step of a [`RawPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathArgument {
    /// A container or list node addressed by name.
    #[allow(missing_docs)]
    Node { name: QName },

    /// A list entry addressed by its key predicates.
    Keyed {
        /// The list node.
        name: QName,
        /// Key leaf to key value. Empty for a wildcard entry.
        #[serde(with = "key_predicates")]
        keys: BTreeMap<QName, String>,
    },

    /// A leaf-list entry addressed by its value.
    #[allow(missing_docs)]
    LeafSetEntry { name: QName, value: String },

    /// Synthetic grouping of augmenting children; has no typed identifier.
    #[allow(missing_docs)]
    Augmentation { children: BTreeSet<QName> },
}

/// Key predicates as a `[[qname, value], ...]` sequence; JSON object keys
/// must be strings.
mod key_predicates {
    use super::{BTreeMap, Deserialize, Deserializer, QName, Serializer};

    pub(super) fn serialize<S>(keys: &BTreeMap<QName, String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(keys)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<QName, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(QName, String)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl PathArgument {
    /// The node name this step addresses, if it is not an augmentation.
    #[must_use]
    pub const fn node_name(&self) -> Option<&QName> {
        match self {
            Self::Node { name } | Self::Keyed { name, .. } | Self::LeafSetEntry { name, .. } => Some(name),
            Self::Augmentation { .. } => None,
        }
    }

    /// True for the synthetic augmentation step.
    #[must_use]
    pub const fn is_augmentation(&self) -> bool {
        matches!(self, Self::Augmentation { .. })
    }
}

impl fmt::Display for PathArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { name } => write!(f, "{name}"),
            Self::Keyed { name, keys } => {
                write!(f, "{name}")?;
                for (k, v) in keys {
                    write!(f, "[{}={v}]", k.name)?;
                }
                Ok(())
            }
            Self::LeafSetEntry { name, value } => write!(f, "{name}[.={value}]"),
            Self::Augmentation { children } => {
                f.write_str("(augmentation")?;
                for child in children {
                    write!(f, " {child}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A location in the raw tree.
///
/// Ordering is lexicographic over the steps; depth ordering is done
/// explicitly via [`RawPath::depth`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPath(Vec<PathArgument>);

impl RawPath {
    /// The empty path addressing the tree root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from its steps, root first.
    #[must_use]
    pub fn from_arguments(arguments: impl IntoIterator<Item = PathArgument>) -> Self {
        Self(arguments.into_iter().collect())
    }

    /// Number of steps from the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True for the empty path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The steps, root first.
    #[must_use]
    pub fn arguments(&self) -> &[PathArgument] {
        &self.0
    }

    /// The final step, or `None` for the root.
    #[must_use]
    pub fn last_argument(&self) -> Option<&PathArgument> {
        self.0.last()
    }

    /// True when `self` is a strict prefix of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// The enclosing path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.split_last().map(|(_, rest)| Self(rest.to_vec()))
    }

    /// Append one step.
    #[must_use]
    pub fn child(&self, argument: PathArgument) -> Self {
        let mut steps = self.0.clone();
        steps.push(argument);
        Self(steps)
    }

    /// Append a plain named node step.
    #[must_use]
    pub fn node(&self, name: QName) -> Self {
        self.child(PathArgument::Node { name })
    }

    /// Append a keyed list entry step.
    #[must_use]
    pub fn keyed<I, V>(&self, name: QName, keys: I) -> Self
    where
        I: IntoIterator<Item = (QName, V)>,
        V: Into<String>,
    {
        self.child(PathArgument::Keyed {
            name,
            keys: keys.into_iter().map(|(k, v)| (k, v.into())).collect(),
        })
    }

    /// Append an augmentation step grouping the given children.
    #[must_use]
    pub fn augmentation(&self, children: impl IntoIterator<Item = QName>) -> Self {
        self.child(PathArgument::Augmentation {
            children: children.into_iter().collect(),
        })
    }
}

impl fmt::Display for RawPath {
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
