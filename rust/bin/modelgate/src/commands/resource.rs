//! Generic record CRUD commands.
//!
//! `modelgate list Widget 42`, `modelgate get Widget 7`, etc.
//! Model names and their parents come from the server's specification.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use modelgate::{ModelFactory, ModelGateway, ModelInstance, Session};
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::ClientConfig;

/// Load the specification of the current context.
pub async fn load_models(client_config_path: &Path) -> Result<Arc<ModelFactory>> {
    let config = ClientConfig::load(client_config_path)?;
    let ctx = config.require_current()?;
    let (transport, loader) = ctx.connect()?;
    let session = Session::new(loader, transport);
    Ok(session.load().await?)
}

fn gateway<'a>(models: &'a ModelFactory, model: &str) -> Result<&'a ModelGateway> {
    models.gateway_for(model).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown model: {}. Known models: {}",
            model,
            models.names().join(", ")
        )
    })
}

/// LIST children of a parent.
pub async fn list(
    model: &str,
    parent_id: &str,
    output_json: bool,
    client_config_path: &Path,
) -> Result<()> {
    let models = load_models(client_config_path).await?;
    let gw = gateway(&models, model)?;
    let items = gw.get_all(parent_id).await?;
    print_records(gw, &items, output_json)
}

/// GET one record.
pub async fn get(model: &str, id: &str, output_json: bool, client_config_path: &Path) -> Result<()> {
    let models = load_models(client_config_path).await?;
    let gw = gateway(&models, model)?;
    let item = gw.get(id).await?;
    print_records(gw, std::slice::from_ref(&item), output_json)
}

/// CREATE a record under a parent.
pub async fn create(
    model: &str,
    parent_id: &str,
    json_body: &str,
    client_config_path: &Path,
) -> Result<()> {
    let models = load_models(client_config_path).await?;
    let gw = gateway(&models, model)?;

    let mut inst = gw.new_instance();
    apply_json(&mut inst, json_body)?;
    gw.post(parent_id, &mut inst).await?;

    println!("{} created.", gw.model_name());
    println!("{}", serde_json::to_string_pretty(&record_json(&inst))?);
    Ok(())
}

/// UPDATE a record: fetch, apply the given fields, push.
pub async fn update(model: &str, id: &str, json_body: &str, client_config_path: &Path) -> Result<()> {
    let models = load_models(client_config_path).await?;
    let gw = gateway(&models, model)?;

    let mut inst = gw.get(id).await?;
    apply_json(&mut inst, json_body)?;
    gw.put(&mut inst).await?;

    println!("{} {} updated.", gw.model_name(), id);
    println!("{}", serde_json::to_string_pretty(&record_json(&inst))?);
    Ok(())
}

/// DELETE a record.
pub async fn delete(model: &str, id: &str, client_config_path: &Path) -> Result<()> {
    let models = load_models(client_config_path).await?;
    let gw = gateway(&models, model)?;

    let mut inst = gw.hydrate(&serde_json::json!({ "id": id }))?;
    gw.del(&mut inst).await?;

    println!("{} {} deleted.", gw.model_name(), id);
    Ok(())
}

/// Set every declared key of a JSON object on `inst`. Undeclared keys are
/// skipped, as the server would ignore them anyway.
fn apply_json(inst: &mut ModelInstance, json_body: &str) -> Result<()> {
    let body: Value = serde_json::from_str(json_body)
        .map_err(|e| anyhow::anyhow!("Invalid JSON: {}", e))?;
    let Value::Object(fields) = body else {
        anyhow::bail!("Expected a JSON object.");
    };

    for (key, value) in fields {
        if let Err(e) = inst.set(&key, value) {
            warn!("{}", e);
            eprintln!("Skipping {}.", e);
        }
    }
    Ok(())
}

/// Record with its id first, as shown to the user.
fn record_json(inst: &ModelInstance) -> Value {
    let mut out = Map::new();
    out.insert(
        "id".into(),
        inst.id().map(|id| Value::String(id.to_string())).unwrap_or(Value::Null),
    );
    out.extend(inst.to_dict());
    Value::Object(out)
}

fn print_records(gw: &ModelGateway, items: &[ModelInstance], output_json: bool) -> Result<()> {
    if output_json {
        let all: Vec<Value> = items.iter().map(record_json).collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No {} records.", gw.model_name());
        return Ok(());
    }

    let columns: Vec<&str> = gw.descriptor().field_names().collect();
    let mut header = format!("{:12}", "ID");
    for c in &columns {
        header.push_str(&format!(" {:20}", c.to_uppercase()));
    }
    println!("{}", header.trim_end());

    for item in items {
        let mut row = format!("{:12}", item.id().unwrap_or("-"));
        for c in &columns {
            row.push_str(&format!(" {:20}", cell(item.get(c))));
        }
        println!("{}", row.trim_end());
    }
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
