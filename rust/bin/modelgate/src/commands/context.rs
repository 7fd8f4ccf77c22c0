//! Context management commands.

use std::path::Path;

use anyhow::Result;

use crate::config::{ClientConfig, Context};

/// Optional context properties, shared by `create` and `set`.
#[derive(Debug, Default)]
pub struct ContextProps<'a> {
    pub server: Option<&'a str>,
    pub token: Option<&'a str>,
    pub spec_path: Option<&'a str>,
}

impl ContextProps<'_> {
    fn apply(&self, ctx: &mut Context) {
        if let Some(s) = self.server {
            ctx.server = s.to_string();
        }
        if let Some(t) = self.token {
            ctx.token = t.to_string();
        }
        if let Some(p) = self.spec_path {
            ctx.spec_path = p.to_string();
        }
    }
}

/// Register a new context. The first one created becomes current.
pub fn create(name: &str, props: ContextProps<'_>, client_config_path: &Path) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("Context name cannot be empty.");
    }

    let mut config = ClientConfig::load(client_config_path)?;
    if config.contexts.iter().any(|c| c.name == name) {
        anyhow::bail!("Context \"{}\" already exists. Use `modelgate context set`.", name);
    }

    let mut ctx = Context {
        name: name.to_string(),
        ..Default::default()
    };
    props.apply(&mut ctx);
    config.upsert_context(ctx);
    if config.current_context.is_empty() {
        config.current_context = name.to_string();
    }
    config.save(client_config_path)?;

    println!("Context \"{}\" created.", name);
    Ok(())
}

/// List all contexts.
pub fn list(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!("Run: modelgate context create <name> --server <url>");
        return Ok(());
    }

    println!("{:2} {:20} {:40} {:12}", "", "NAME", "SERVER", "SPEC");
    for ctx in &config.contexts {
        let marker = if ctx.name == config.current_context { "*" } else { " " };
        let server = if ctx.server.is_empty() { "-" } else { &ctx.server };
        let spec = if ctx.spec_path.is_empty() { "(default)" } else { &ctx.spec_path };
        println!("{:2} {:20} {:40} {:12}", marker, ctx.name, server, spec);
    }

    Ok(())
}

/// Switch current context.
pub fn use_context(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    if !config.contexts.iter().any(|c| c.name == name) {
        anyhow::bail!(
            "Context \"{}\" not found. Run `modelgate context list` to see available contexts.",
            name
        );
    }

    config.current_context = name.to_string();
    config.save(client_config_path)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}

/// Set properties on a context.
pub fn set(name: &str, props: ContextProps<'_>, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let ctx = config
        .get_mut(name)
        .ok_or_else(|| anyhow::anyhow!("Context \"{}\" not found.", name))?;
    props.apply(ctx);

    config.save(client_config_path)?;
    println!("Context \"{}\" updated.", name);
    Ok(())
}

/// Delete a context.
pub fn delete(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    if !config.remove_context(name) {
        anyhow::bail!("Context \"{}\" not found.", name);
    }

    config.save(client_config_path)?;
    println!("Context \"{}\" deleted.", name);
    Ok(())
}
