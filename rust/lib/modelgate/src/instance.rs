//! One model record and its reconciliation against server state.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{FieldError, RequestError};
use crate::spec::EntityDescriptor;

/// Record key carrying the server-assigned id.
pub const ID_KEY: &str = "id";

/// Lifecycle of an instance relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Not created on the server yet; no id.
    New,
    /// Matches the last successful server round trip.
    Synced,
    /// Deleted on the server. No further requests are issued for it.
    Destroyed,
}

/// A record of one model type.
///
/// Only fields the model declares are ever sent or accepted. Client-only
/// attributes live in a separate map that never reaches the wire.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    descriptor: Arc<EntityDescriptor>,
    id: Option<String>,
    fields: Map<String, Value>,
    locals: Map<String, Value>,
    state: InstanceState,
    dirty: bool,
    pending: bool,
}

impl ModelInstance {
    /// Fresh record awaiting creation. Declared fields start as `null`.
    pub fn new(descriptor: Arc<EntityDescriptor>) -> Self {
        let fields = descriptor
            .field_names()
            .map(|name| (name.to_string(), Value::Null))
            .collect();
        Self {
            descriptor,
            id: None,
            fields,
            locals: Map::new(),
            state: InstanceState::New,
            dirty: false,
            pending: false,
        }
    }

    /// Build from a server record. A record with an id is `Synced`; one
    /// without is treated as a new record carrying initial values.
    pub fn from_record(
        descriptor: Arc<EntityDescriptor>,
        record: &Value,
    ) -> Result<Self, RequestError> {
        let map = record.as_object().ok_or_else(|| {
            RequestError::Decode(format!(
                "{} record must be an object, got {}",
                descriptor.local_name, record
            ))
        })?;

        let mut inst = Self::new(descriptor);
        inst.update(map);
        if let Some(id) = record_id(map) {
            inst.id = Some(id);
            inst.state = InstanceState::Synced;
        }
        Ok(inst)
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn model_name(&self) -> &str {
        &self.descriptor.local_name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// Local field changes not yet confirmed by the server.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// A gateway request for this instance is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == InstanceState::Destroyed
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Change a declared field locally. Marks the instance dirty.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), FieldError> {
        match self.fields.get_mut(field) {
            Some(slot) => {
                *slot = value.into();
                self.dirty = true;
                Ok(())
            }
            None => Err(FieldError::Undeclared {
                model: self.descriptor.local_name.clone(),
                field: field.to_string(),
            }),
        }
    }

    /// Client-only attribute. Never serialized.
    pub fn local(&self, key: &str) -> Option<&Value> {
        self.locals.get(key)
    }

    pub fn set_local(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.locals.insert(key.into(), value.into());
    }

    /// DTO projection: declared fields only, in declaration order.
    pub fn to_dict(&self) -> Map<String, Value> {
        self.descriptor
            .field_names()
            .map(|name| {
                let value = self.fields.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect()
    }

    /// Overwrite every declared field from `server_state`; a field the
    /// server omits becomes `null`. Undeclared keys are ignored, and local
    /// attributes are untouched. Server state wins; no merging.
    pub fn update(&mut self, server_state: &Map<String, Value>) {
        for name in self.descriptor.field_names() {
            let value = server_state.get(name).cloned().unwrap_or(Value::Null);
            self.fields.insert(name.to_string(), value);
        }
        self.dirty = false;
    }

    // ── Gateway bookkeeping ─────────────────────────────────────────

    pub(crate) fn begin_request(&mut self) {
        self.pending = true;
    }

    pub(crate) fn end_request(&mut self) {
        self.pending = false;
    }

    pub(crate) fn mark_created(&mut self, id: String, record: &Map<String, Value>) {
        self.update(record);
        self.id = Some(id);
        self.state = InstanceState::Synced;
    }

    pub(crate) fn mark_synced(&mut self, record: &Map<String, Value>) {
        self.update(record);
        self.state = InstanceState::Synced;
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.state = InstanceState::Destroyed;
    }
}

/// Server id of a record. Numeric ids are kept as their decimal text.
pub fn record_id(record: &Map<String, Value>) -> Option<String> {
    match record.get(ID_KEY)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
