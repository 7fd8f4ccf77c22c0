//! Client-side context management.
//!
//! Reads/writes `~/.modelgate/config.toml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modelgate::{HttpTransport, NoAuth, SpecLoader, StaticToken, TokenSource};
use serde::{Deserialize, Serialize};

/// A single context: one model server to talk to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    /// Context name (e.g. "local").
    pub name: String,

    /// Server URL (e.g. "http://localhost:8080").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// Specification path on the server. Empty means the default path.
    #[serde(rename = "spec-path", default, skip_serializing_if = "String::is_empty")]
    pub spec_path: String,
}

impl Context {
    /// Transport and specification loader for this context.
    pub fn connect(&self) -> anyhow::Result<(Arc<HttpTransport>, SpecLoader)> {
        if self.server.is_empty() {
            anyhow::bail!(
                "No server URL set for context \"{}\". Run `modelgate context set {} --server <url>`.",
                self.name, self.name
            );
        }

        let token_source: Arc<dyn TokenSource> = if self.token.is_empty() {
            Arc::new(NoAuth)
        } else {
            Arc::new(StaticToken::new(self.token.clone()))
        };
        let transport = Arc::new(HttpTransport::new(&self.server, token_source));

        let mut loader = SpecLoader::new(transport.clone());
        if !self.spec_path.is_empty() {
            loader = loader.with_path(self.spec_path.clone());
        }
        Ok((transport, loader))
    }
}

/// Client configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name of the currently active context.
    #[serde(rename = "current-context", default)]
    pub current_context: String,

    /// List of configured contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,
}

impl ClientConfig {
    /// Default config file path: ~/.modelgate/config.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the currently active context, if any.
    pub fn current(&self) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == self.current_context)
    }

    pub fn require_current(&self) -> anyhow::Result<&Context> {
        self.current().ok_or_else(|| {
            anyhow::anyhow!("No current context. Run `modelgate context create <name> --server <url>`.")
        })
    }

    /// Get a mutable reference to a context by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    /// Add or update a context.
    pub fn upsert_context(&mut self, ctx: Context) {
        if let Some(existing) = self.get_mut(&ctx.name) {
            *existing = ctx;
        } else {
            self.contexts.push(ctx);
        }
    }

    /// Remove a context by name. Returns true if it was found.
    pub fn remove_context(&mut self, name: &str) -> bool {
        let len = self.contexts.len();
        self.contexts.retain(|c| c.name != name);
        if self.current_context == name {
            self.current_context = String::new();
        }
        self.contexts.len() < len
    }
}

/// Return the config directory (~/.modelgate).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".modelgate")
}
