use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::SpecError;
use crate::spec::{SpecFormat, Specification, DEFAULT_SPEC_PATH};
use crate::transport::Transport;

/// Fetches the model specification. One request per call, no retries, no
/// shared state touched.
pub struct SpecLoader {
    transport: Arc<dyn Transport>,
    path: String,
}

impl SpecLoader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            path: DEFAULT_SPEC_PATH.to_string(),
        }
    }

    /// Override the configuration path (server-relative, leading `/`).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') { path } else { format!("/{}", path) };
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn load_specification(&self) -> Result<Specification, SpecError> {
        let resp = self.transport.get_text(&self.path).await?;
        let format = SpecFormat::negotiate(resp.content_type.as_deref(), &self.path);
        debug!("specification {} read as {:?}", self.path, format);
        Ok(Specification::parse(&resp.body, format)?)
    }

    /// Merge every `*.yaml`, `*.yml` and `*.json` file of `dir`, in file
    /// name order. A later file's declaration replaces an earlier one with
    /// the same full name.
    pub fn load_dir(dir: &Path) -> Result<Specification, SpecError> {
        let io_err = |source| SpecError::Io { path: dir.to_path_buf(), source };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            if Self::is_spec_file(&path) {
                paths.push(path);
            } else {
                warn!("skipping non-specification file {:?}", path);
            }
        }
        paths.sort();

        let mut spec = Specification::default();
        for path in paths {
            let text = std::fs::read_to_string(&path)
                .map_err(|source| SpecError::Io { path: path.clone(), source })?;
            let format = SpecFormat::from_path(&path.to_string_lossy());
            spec.merge(Specification::parse(&text, format)?);
            debug!("loaded specification file {:?}", path);
        }
        Ok(spec)
    }

    fn is_spec_file(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml") | Some("json")
        )
    }
}
