use std::path::PathBuf;

use thiserror::Error;

// ── Transport ───────────────────────────────────────────────────────

/// Failure at the HTTP layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),
}

// ── Specification ───────────────────────────────────────────────────

/// The specification payload could not be turned into entity descriptors.
#[derive(Error, Debug)]
pub enum SpecParseError {
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("specification root must be a mapping of model names")]
    NotAMapping,

    #[error("entry '{0}' must be a mapping of fields")]
    EntryNotAMapping(String),

    #[error("model name must not be empty")]
    EmptyName,

    #[error("model name '{0}' has an empty local segment")]
    EmptySegment(String),
}

/// Loading the specification failed. Never retried by the loader.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("fetch specification: {0}")]
    Load(#[from] TransportError),

    #[error("read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse specification: {0}")]
    Parse(#[from] SpecParseError),
}

// ── Gateway requests ────────────────────────────────────────────────

/// A gateway call failed. Reported only to the caller of that call; the
/// target instance keeps its pre-call state.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("decode: {0}")]
    Decode(String),

    #[error("encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("instance has no id yet")]
    MissingId,

    #[error("instance was deleted")]
    Destroyed,

    #[error("instance {0} already exists on the server")]
    AlreadyCreated(String),
}

/// Write to a field the entity does not declare.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("{model} has no field '{field}'")]
    Undeclared { model: String, field: String },
}

/// Session coordination failure.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Spec(#[from] SpecError),
}
