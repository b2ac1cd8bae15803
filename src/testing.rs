//! Test doubles shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::binding::{TypedId, TypedValue};
use crate::codec::{NodeCodec, SchemaContext};
use crate::error::TranslationError;
use crate::node::RawNode;
use crate::path::{QName, RawPath};

pub(crate) fn q(name: &str) -> QName {
    QName::new("test", name)
}

/// Codec backed by an explicit path table that records every call.
#[derive(Debug, Default)]
pub(crate) struct StubCodec {
    ids: HashMap<RawPath, TypedId>,
    failing_paths: HashSet<RawPath>,
    failing_ids: HashSet<TypedId>,
    id_calls: Mutex<Vec<RawPath>>,
    value_calls: AtomicUsize,
    schema_updates: Mutex<Vec<u64>>,
}

impl StubCodec {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn map(mut self, path: RawPath, id: TypedId) -> Self {
        self.ids.insert(path, id);
        self
    }

    pub(crate) fn fail_path(mut self, path: RawPath) -> Self {
        self.failing_paths.insert(path);
        self
    }

    pub(crate) fn fail_value(mut self, id: TypedId) -> Self {
        self.failing_ids.insert(id);
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn id_calls(&self) -> Vec<RawPath> {
        self.id_calls.lock().unwrap().clone()
    }

    pub(crate) fn value_calls(&self) -> usize {
        self.value_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.id_calls.lock().unwrap().len() + self.value_calls()
    }

    pub(crate) fn schema_updates(&self) -> Vec<u64> {
        self.schema_updates.lock().unwrap().clone()
    }
}

impl NodeCodec for StubCodec {
    fn to_binding_id(&self, path: &RawPath) -> Result<Option<TypedId>, TranslationError> {
        self.id_calls.lock().unwrap().push(path.clone());
        if self.failing_paths.contains(path) {
            return Err(TranslationError::Deserialization {
                path: path.clone(),
                reason: "stub failure".to_string(),
            });
        }
        Ok(self.ids.get(path).cloned())
    }

    fn to_binding_value(&self, id: &TypedId, node: &RawNode) -> Result<Option<TypedValue>, TranslationError> {
        self.value_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_ids.contains(id) {
            return Err(TranslationError::UnmappedBinding {
                type_name: id.target_type().unwrap_or_default().to_string(),
                id: id.clone(),
            });
        }
        Ok(Some(TypedValue::new(id.target_type().unwrap_or("Root"), node.to_json())))
    }

    fn to_normalized(&self, id: &TypedId) -> Result<RawPath, TranslationError> {
        self.ids
            .iter()
            .find_map(|(path, mapped)| (mapped == id).then(|| path.clone()))
            .ok_or_else(|| TranslationError::UnmappedBinding {
                type_name: id.target_type().unwrap_or_default().to_string(),
                id: id.clone(),
            })
    }

    fn on_schema_updated(&self, context: &Arc<SchemaContext>) {
        self.schema_updates.lock().unwrap().push(context.revision());
    }
}
