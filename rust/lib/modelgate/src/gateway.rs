//! Per-model REST gateway.
//!
//! Addressing:
//!
//! | call      | URL                                    | wire            |
//! |-----------|----------------------------------------|-----------------|
//! | `get_all` | `/{parent}/{parent_id}/{model}s`       | GET             |
//! | `get`     | `/{model}/{id}`                        | GET             |
//! | `post`    | `/{parent}/{parent_id}/{model}s`       | POST `post`     |
//! | `put`     | `/{model}/{id}`                        | POST `put`      |
//! | `del`     | `/{model}/{id}`                        | POST `delete`   |
//!
//! Mutations always travel as POST with the intended verb inside an
//! [`Envelope`], so one server endpoint can dispatch on `method` and
//! intermediaries that only understand GET/POST pass them through. This is
//! a wire contract; do not switch to native verbs without the server.
//!
//! Calls are independent futures. Nothing orders two calls against each
//! other and nothing is retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RequestError;
use crate::instance::{record_id, InstanceState, ModelInstance};
use crate::spec::EntityDescriptor;
use crate::transport::Transport;

// ── Envelope ────────────────────────────────────────────────────────

/// Verb carried inside a tunneled POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Put,
    Post,
    Delete,
}

/// Body of every mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Target instance id; `null` on create.
    pub instid: Option<String>,
    pub method: Method,
    /// JSON-encoded DTO projection of the target.
    pub payload: String,
}

impl Envelope {
    pub fn new(method: Method, target: &ModelInstance) -> Result<Self, RequestError> {
        Ok(Self {
            instid: target.id().map(str::to_string),
            method,
            payload: serde_json::to_string(&target.to_dict())?,
        })
    }
}

// ── Gateway ─────────────────────────────────────────────────────────

/// REST client for one model type.
pub struct ModelGateway {
    descriptor: Arc<EntityDescriptor>,
    transport: Arc<dyn Transport>,
}

impl ModelGateway {
    pub fn new(descriptor: EntityDescriptor, transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            transport,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.descriptor.local_name
    }

    pub fn parent_name(&self) -> &str {
        &self.descriptor.parent_name
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// `/{parent}/{parent_id}/{model}s`. The plural is a bare `s` suffix.
    pub fn collection_url(&self, parent_id: &str) -> String {
        format!("/{}/{}/{}s", self.parent_name(), parent_id, self.model_name())
    }

    /// `/{model}/{id}`.
    pub fn item_url(&self, id: &str) -> String {
        format!("/{}/{}", self.model_name(), id)
    }

    /// Blank record of this model.
    pub fn new_instance(&self) -> ModelInstance {
        ModelInstance::new(self.descriptor.clone())
    }

    /// Instance built from a server record.
    pub fn hydrate(&self, record: &Value) -> Result<ModelInstance, RequestError> {
        ModelInstance::from_record(self.descriptor.clone(), record)
    }

    /// All children of `parent_id`.
    pub async fn get_all(&self, parent_id: &str) -> Result<Vec<ModelInstance>, RequestError> {
        let url = self.collection_url(parent_id);
        debug!(model = self.model_name(), "get_all {}", url);
        let body = self.transport.get_json(&url).await?;
        let records = match body {
            Value::Array(items) => items,
            other => {
                return Err(RequestError::Decode(format!(
                    "{}: expected a list, got {}",
                    url, other
                )))
            }
        };
        records.iter().map(|r| self.hydrate(r)).collect()
    }

    pub async fn get(&self, target_id: &str) -> Result<ModelInstance, RequestError> {
        let url = self.item_url(target_id);
        debug!(model = self.model_name(), "get {}", url);
        let body = self.transport.get_json(&url).await?;
        self.hydrate(&body)
    }

    /// Push `target`'s declared fields. On success the returned record
    /// replaces every declared field.
    pub async fn put(&self, target: &mut ModelInstance) -> Result<(), RequestError> {
        let url = self.item_url(Self::live_id(target)?);
        let body = self.send(&url, Method::Put, target).await?;
        let record = Self::record(&url, &body)?;
        target.mark_synced(record);
        Ok(())
    }

    /// Create `target` under `parent_id`. Only a `New` instance may be
    /// created. On success `target` takes the server-assigned id and the
    /// returned field values.
    pub async fn post(
        &self,
        parent_id: &str,
        target: &mut ModelInstance,
    ) -> Result<(), RequestError> {
        match (target.state(), target.id()) {
            (InstanceState::Destroyed, _) => return Err(RequestError::Destroyed),
            (InstanceState::New, None) => {}
            (_, id) => {
                let id = id.unwrap_or_default().to_string();
                return Err(RequestError::AlreadyCreated(id));
            }
        }
        let url = self.collection_url(parent_id);
        let body = self.send(&url, Method::Post, target).await?;
        let record = Self::record(&url, &body)?;
        let id = record_id(record)
            .ok_or_else(|| RequestError::Decode(format!("{}: created record has no id", url)))?;
        target.mark_created(id, record);
        Ok(())
    }

    /// Delete `target` on the server. On success it becomes `Destroyed`;
    /// discarding it is up to the caller.
    pub async fn del(&self, target: &mut ModelInstance) -> Result<(), RequestError> {
        let url = self.item_url(Self::live_id(target)?);
        self.send(&url, Method::Delete, target).await?;
        target.mark_destroyed();
        Ok(())
    }

    /// Tunnel one mutation. `target` stays untouched on failure apart from
    /// the pending flag, which is always cleared once the answer arrives.
    async fn send(
        &self,
        url: &str,
        method: Method,
        target: &mut ModelInstance,
    ) -> Result<Value, RequestError> {
        let envelope = Envelope::new(method, target)?;
        let body = serde_json::to_value(&envelope)?;
        debug!(model = self.model_name(), ?method, "POST {}", url);

        target.begin_request();
        let result = self.transport.post_json(url, &body).await;
        target.end_request();
        Ok(result?)
    }

    fn live_id(target: &ModelInstance) -> Result<&str, RequestError> {
        if target.is_destroyed() {
            return Err(RequestError::Destroyed);
        }
        target.id().ok_or(RequestError::MissingId)
    }

    fn record<'a>(url: &str, body: &'a Value) -> Result<&'a Map<String, Value>, RequestError> {
        body.as_object().ok_or_else(|| {
            RequestError::Decode(format!("{}: expected a record, got {}", url, body))
        })
    }
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("model_name", &self.model_name())
            .field("parent_name", &self.parent_name())
            .finish()
    }
}
