//! Declarative model specification.
//!
//! The server publishes a mapping from full model name to that model's
//! declaration:
//!
//! ```yaml
//! project:
//!   title: string
//! group.Widget:
//!   parent: project
//!   label: string
//!   weight: int
//! ```
//!
//! Every key of a declaration is a field, except the parent reference
//! (`parent`, or the legacy `.parent`) and any other `.`-prefixed metadata key.

use serde_json::{Map, Value};

use crate::error::SpecParseError;

/// Current parent key.
pub const PARENT_KEY: &str = "parent";

/// Parent key used by older specification files.
pub const LEGACY_PARENT_KEY: &str = ".parent";

/// Parent sentinel for root entities.
pub const NO_PARENT: &str = "none";

/// Path the server publishes the specification under.
pub const DEFAULT_SPEC_PATH: &str = "/configuration/models/models.yaml";

// ── Format ──────────────────────────────────────────────────────────

/// Serialization of a specification document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Json,
}

impl SpecFormat {
    /// Pick the format from the response content type, falling back to the
    /// path's extension. Anything not recognisably JSON is read as YAML.
    pub fn negotiate(content_type: Option<&str>, path: &str) -> Self {
        if let Some(ct) = content_type {
            let ct = ct.to_ascii_lowercase();
            if ct.contains("json") {
                return SpecFormat::Json;
            }
            if ct.contains("yaml") {
                return SpecFormat::Yaml;
            }
        }
        Self::from_path(path)
    }

    pub fn from_path(path: &str) -> Self {
        if path.to_ascii_lowercase().ends_with(".json") {
            SpecFormat::Json
        } else {
            SpecFormat::Yaml
        }
    }
}

// ── Specification ───────────────────────────────────────────────────

/// Parsed specification: full model name → declaration, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specification {
    entries: Map<String, Value>,
}

impl Specification {
    pub fn parse(text: &str, format: SpecFormat) -> Result<Self, SpecParseError> {
        match format {
            SpecFormat::Yaml => Self::from_yaml(text),
            SpecFormat::Json => Self::from_json(text),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, SpecParseError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yml::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_json(text: &str) -> Result<Self, SpecParseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Validate the document shape. An empty document is an empty
    /// specification; a null declaration is a model with no fields.
    pub fn from_value(value: Value) -> Result<Self, SpecParseError> {
        let root = match value {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => return Err(SpecParseError::NotAMapping),
        };

        let mut entries = Map::new();
        for (name, body) in root {
            let body = match body {
                Value::Null => Value::Object(Map::new()),
                Value::Object(_) => body,
                _ => return Err(SpecParseError::EntryNotAMapping(name)),
            };
            entries.insert(name, body);
        }
        Ok(Self { entries })
    }

    /// Fold `other` into this specification. Entries with the same full name
    /// are replaced by `other`'s declaration.
    pub fn merge(&mut self, other: Specification) {
        for (name, body) in other.entries {
            self.entries.insert(name, body);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw declarations in document order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.entries.iter().filter_map(|(name, body)| {
            body.as_object().map(|map| (name.as_str(), map))
        })
    }

    /// Resolve every declaration into an [`EntityDescriptor`].
    pub fn descriptors(&self) -> Result<Vec<EntityDescriptor>, SpecParseError> {
        self.entries()
            .map(|(name, body)| EntityDescriptor::from_declaration(name, body))
            .collect()
    }
}

// ── Descriptor ──────────────────────────────────────────────────────

/// One declared field: name and the type named in the specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub type_name: String,
}

/// A model type as resolved from its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub full_name: String,
    pub local_name: String,
    pub parent_name: String,
    pub fields: Vec<FieldDef>,
}

impl EntityDescriptor {
    pub fn from_declaration(
        full_name: &str,
        body: &Map<String, Value>,
    ) -> Result<Self, SpecParseError> {
        let local_name = local_name(full_name)?.to_string();
        let parent_name = resolve_parent(body);
        let fields = body
            .iter()
            .filter(|(key, _)| !is_metadata_key(key))
            .map(|(key, ty)| FieldDef {
                name: key.clone(),
                type_name: value_text(ty),
            })
            .collect();

        Ok(Self {
            full_name: full_name.to_string(),
            local_name,
            parent_name,
            fields,
        })
    }

    pub fn is_root(&self) -> bool {
        self.parent_name == NO_PARENT
    }

    pub fn declares(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Parent reference of a declaration. `parent` wins over the legacy
/// `.parent`; neither means a root entity. A null value counts as absent.
pub fn resolve_parent(body: &Map<String, Value>) -> String {
    [PARENT_KEY, LEGACY_PARENT_KEY]
        .iter()
        .filter_map(|key| body.get(*key))
        .find(|value| !value.is_null())
        .map(value_text)
        .unwrap_or_else(|| NO_PARENT.to_string())
}

/// Local name of a dotted full name: the only segment, or else the second
/// one. `"a.b.c"` is `"b"`, not `"c"`.
pub fn local_name(full_name: &str) -> Result<&str, SpecParseError> {
    if full_name.is_empty() {
        return Err(SpecParseError::EmptyName);
    }
    let mut parts = full_name.split('.');
    let first = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or(first);
    if name.is_empty() {
        return Err(SpecParseError::EmptySegment(full_name.to_string()));
    }
    Ok(name)
}

fn is_metadata_key(key: &str) -> bool {
    key == PARENT_KEY || key.starts_with('.')
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
