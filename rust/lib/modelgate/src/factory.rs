//! Gateway registry built from a loaded specification.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::SpecParseError;
use crate::gateway::ModelGateway;
use crate::spec::{Specification, NO_PARENT};
use crate::transport::Transport;

/// One gateway per model local name. Immutable once built, so it can be
/// shared behind an `Arc` and read from any task.
pub struct ModelFactory {
    gateways: HashMap<String, ModelGateway>,
}

impl ModelFactory {
    /// Build the registry. Pure: no I/O happens here.
    ///
    /// Two full names resolving to the same local name (`a.Widget` and
    /// `b.Widget`) collide; the later declaration replaces the earlier one.
    pub fn from_specification(
        spec: &Specification,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SpecParseError> {
        let mut gateways = HashMap::new();

        for descriptor in spec.descriptors()? {
            let name = descriptor.local_name.clone();
            let full_name = descriptor.full_name.clone();
            let gateway = ModelGateway::new(descriptor, transport.clone());
            if let Some(previous) = gateways.insert(name.clone(), gateway) {
                warn!(
                    "model '{}' from '{}' replaces '{}'",
                    name,
                    full_name,
                    previous.descriptor().full_name
                );
            }
        }

        info!("model factory ready with {} gateways", gateways.len());
        Ok(Self { gateways })
    }

    /// Gateway for a local model name; `None` when the model is unknown.
    pub fn gateway_for(&self, local_name: &str) -> Option<&ModelGateway> {
        self.gateways.get(local_name)
    }

    pub fn contains(&self, local_name: &str) -> bool {
        self.gateways.contains_key(local_name)
    }

    /// Local names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.gateways.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All gateways sorted by local name.
    pub fn gateways(&self) -> Vec<&ModelGateway> {
        let mut all: Vec<&ModelGateway> = self.gateways.values().collect();
        all.sort_by(|a, b| a.model_name().cmp(b.model_name()));
        all
    }

    /// Gateways whose parent is `parent_name`, sorted by local name.
    pub fn children_of(&self, parent_name: &str) -> Vec<&ModelGateway> {
        self.gateways()
            .into_iter()
            .filter(|g| g.parent_name() == parent_name)
            .collect()
    }

    /// Gateways with no parent.
    pub fn roots(&self) -> Vec<&ModelGateway> {
        self.children_of(NO_PARENT)
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::local_name;
    use crate::transport::mock::{MockTransport, Recorded};
    use serde_json::json;

    fn build(yaml: &str) -> (ModelFactory, Arc<MockTransport>) {
        let t = Arc::new(MockTransport::new());
        let spec = Specification::from_yaml(yaml).unwrap();
        (ModelFactory::from_specification(&spec, t.clone()).unwrap(), t)
    }

    #[tokio::test]
    async fn single_grouped_model() {
        let (factory, t) = build("group.Widget:\n  parent: group\n");
        assert_eq!(factory.len(), 1);

        let gw = factory.gateway_for("Widget").unwrap();
        assert_eq!(gw.model_name(), "Widget");
        assert_eq!(gw.parent_name(), "group");

        t.answer(json!([]));
        gw.get_all("1").await.unwrap();
        assert_eq!(t.recorded(), vec![Recorded::Get("/group/1/Widgets".into())]);
    }

    #[test]
    fn every_entry_gets_a_gateway_with_its_parent() {
        let yaml = "\
project:
  title: string
game.Scene:
  parent: project
  name: string
game.Sprite.Extra:
  .parent: Scene
  x: int
Asset:
  parent: project
  .parent: ignored
";
        let (factory, _) = build(yaml);
        let spec = Specification::from_yaml(yaml).unwrap();

        for (full_name, body) in spec.entries() {
            let name = local_name(full_name).unwrap();
            let gw = factory.gateway_for(name).unwrap();
            assert_eq!(gw.parent_name(), crate::spec::resolve_parent(body));
        }
        assert_eq!(factory.names(), vec!["Asset", "Scene", "Sprite", "project"]);
        assert_eq!(factory.gateway_for("project").unwrap().parent_name(), "none");
        assert_eq!(factory.gateway_for("Sprite").unwrap().parent_name(), "Scene");
        assert_eq!(factory.gateway_for("Asset").unwrap().parent_name(), "project");
    }

    #[test]
    fn unknown_name_is_none() {
        let (factory, _) = build("Widget: {}\n");
        assert!(factory.gateway_for("Gadget").is_none());
        assert!(factory.gateway_for("").is_none());
        assert!(!factory.contains("Gadget"));
    }

    #[test]
    fn duplicate_local_name_last_wins() {
        let (factory, _) = build(
            "a.Widget:\n  parent: alpha\nb.Widget:\n  parent: beta\n",
        );
        assert_eq!(factory.len(), 1);
        let gw = factory.gateway_for("Widget").unwrap();
        assert_eq!(gw.parent_name(), "beta");
        assert_eq!(gw.descriptor().full_name, "b.Widget");
    }

    #[test]
    fn empty_full_name_fails() {
        let spec = Specification::from_json(r#"{"": {}}"#).unwrap();
        let err = ModelFactory::from_specification(&spec, Arc::new(MockTransport::new()))
            .err()
            .unwrap();
        assert!(matches!(err, SpecParseError::EmptyName));
    }

    #[test]
    fn hierarchy_queries() {
        let (factory, _) = build(
            "project: {}\nScene:\n  parent: project\nAsset:\n  parent: project\nSprite:\n  parent: Scene\n",
        );
        let roots: Vec<&str> = factory.roots().iter().map(|g| g.model_name()).collect();
        assert_eq!(roots, vec!["project"]);
        let kids: Vec<&str> = factory.children_of("project").iter().map(|g| g.model_name()).collect();
        assert_eq!(kids, vec!["Asset", "Scene"]);
        assert!(factory.children_of("Sprite").is_empty());
    }

    #[test]
    fn empty_spec_builds_empty_factory() {
        let (factory, _) = build("");
        assert!(factory.is_empty());
    }
}
