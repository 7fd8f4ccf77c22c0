//! `modelgate models`: show the model hierarchy of the current context.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use anyhow::Result;
use modelgate::spec::NO_PARENT;
use modelgate::{ModelFactory, ModelGateway};
use serde_json::json;

use super::resource::load_models;

pub async fn show(output_json: bool, client_config_path: &Path) -> Result<()> {
    let models = load_models(client_config_path).await?;

    if output_json {
        let all: Vec<_> = models
            .gateways()
            .into_iter()
            .map(|g| {
                let fields: serde_json::Map<String, serde_json::Value> = g
                    .descriptor()
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), json!(f.type_name)))
                    .collect();
                json!({
                    "name": g.model_name(),
                    "full_name": g.descriptor().full_name,
                    "parent": g.parent_name(),
                    "fields": fields,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    for line in render_tree(&models) {
        println!("{}", line);
    }
    Ok(())
}

/// Indented hierarchy. Models whose parent is not itself a model hang under
/// that parent's name.
pub fn render_tree(models: &ModelFactory) -> Vec<String> {
    let mut lines = Vec::new();
    let mut seen = HashSet::new();

    for root in models.roots() {
        walk(models, root, 0, &mut seen, &mut lines);
    }

    let external: BTreeSet<&str> = models
        .gateways()
        .into_iter()
        .map(|g| g.parent_name())
        .filter(|p| *p != NO_PARENT && !models.contains(p))
        .collect();
    for parent in external {
        lines.push(format!("{} (not a model)", parent));
        for child in models.children_of(parent) {
            walk(models, child, 1, &mut seen, &mut lines);
        }
    }

    // Anything left is part of a parent cycle.
    for gw in models.gateways() {
        if !seen.contains(gw.model_name()) {
            lines.push(format!("{} (cyclic parent {})", gw.model_name(), gw.parent_name()));
        }
    }
    lines
}

fn walk<'a>(
    models: &'a ModelFactory,
    gw: &'a ModelGateway,
    depth: usize,
    seen: &mut HashSet<&'a str>,
    lines: &mut Vec<String>,
) {
    if !seen.insert(gw.model_name()) {
        return;
    }
    let fields: Vec<String> = gw
        .descriptor()
        .fields
        .iter()
        .map(|f| format!("{}: {}", f.name, f.type_name))
        .collect();
    lines.push(format!("{}{} [{}]", "  ".repeat(depth), gw.model_name(), fields.join(", ")));
    for child in models.children_of(gw.model_name()) {
        walk(models, child, depth + 1, seen, lines);
    }
}
