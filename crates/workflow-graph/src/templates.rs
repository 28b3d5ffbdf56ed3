//! Template catalog
//!
//! Templates use the canvas-library shape (`{id, type, position, data}` with
//! a `label` in `data`, edges as `source`/`target`). Loading one adapts it to
//! the graph model: the label becomes the title and embedded positions are
//! replaced with a fresh tiered auto-layout.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{Extra, NodeData};
use crate::error::{ImportError, Result};
use crate::layout::{auto_layout, LayoutStrategy};
use crate::model::GraphModel;
use crate::types::{Edge, Node, NodeKind, Position};

const BUILTIN_CATALOG: &str = include_str!("../templates/catalog.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateEdge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    /// Branch label on if/else outputs; not carried into the graph
    #[serde(default)]
    pub label: Option<String>,
}

/// A pre-built workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub nodes: Vec<TemplateNode>,
    pub edges: Vec<TemplateEdge>,
}

impl WorkflowTemplate {
    /// Adapt the template into a graph model
    pub fn to_graph(&self) -> std::result::Result<GraphModel, ImportError> {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, raw)| adapt_node(index, raw))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let edges: Vec<Edge> = self
            .edges
            .iter()
            .map(|e| Edge::new(e.source.clone(), e.target.clone()))
            .collect();

        let positions = auto_layout(&nodes, &edges, LayoutStrategy::Tiered);
        let mut graph = GraphModel::from_parts(nodes, edges);
        graph.set_positions(positions);
        Ok(graph)
    }
}

fn adapt_node(index: usize, raw: &TemplateNode) -> std::result::Result<Node, ImportError> {
    let kind: NodeKind = raw
        .node_type
        .parse()
        .map_err(|_| ImportError::UnknownNodeType {
            index,
            node_type: raw.node_type.clone(),
        })?;

    let mut data = raw.data.clone();
    let title = match data.remove("label") {
        Some(Value::String(label)) => label,
        _ => kind.label().to_string(),
    };

    Ok(Node::new(raw.id.clone(), kind)
        .with_title(title)
        .with_data(NodeData::from_wire(kind, data)))
}

/// Queryable collection of templates
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: Vec<WorkflowTemplate>,
}

impl TemplateCatalog {
    /// The templates shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse a catalog from a JSON array of templates
    pub fn from_json(text: &str) -> Result<Self> {
        let templates: Vec<WorkflowTemplate> = serde_json::from_str(text)?;
        log::debug!("Loaded {} workflow template(s)", templates.len());
        Ok(Self { templates })
    }

    pub fn all(&self) -> &[WorkflowTemplate] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn by_category(&self, category: &str) -> Vec<&WorkflowTemplate> {
        self.templates
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&WorkflowTemplate> {
        self.templates
            .iter()
            .filter(|t| t.tags.iter().any(|candidate| candidate == tag))
            .collect()
    }

    /// Distinct categories in catalog order
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for template in &self.templates {
            if !out.contains(&template.category.as_str()) {
                out.push(&template.category);
            }
        }
        out
    }

    /// Distinct tags in first-seen order
    pub fn tags(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for tag in self.templates.iter().flat_map(|t| t.tags.iter()) {
            if !out.contains(&tag.as_str()) {
                out.push(tag);
            }
        }
        out
    }

    /// Adapt the template with the given id into a graph model
    pub fn load(&self, id: &str) -> std::result::Result<(&WorkflowTemplate, GraphModel), ImportError> {
        let template = self
            .get(id)
            .ok_or_else(|| ImportError::UnknownTemplate(id.to_string()))?;
        let graph = template.to_graph()?;
        log::info!(
            "Loaded template '{}' ({} nodes, {} edges)",
            template.id,
            graph.len(),
            graph.edges().len()
        );
        Ok((template, graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tiered_layout;
    use crate::validation::{validate, GraphIssue};

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::builtin().unwrap()
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = catalog();
        assert_eq!(catalog.all().len(), 5);
        assert_eq!(
            catalog.categories(),
            vec!["Web Scraping", "Research", "Business", "Data Processing", "Monitoring"]
        );
        assert!(catalog.tags().contains(&"analysis"));
        assert_eq!(catalog.by_tag("analysis").len(), 2);
        assert_eq!(catalog.by_category("Research")[0].id, "multi-page-research");
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn test_load_adapts_label_and_layout() {
        let catalog = catalog();
        let (template, graph) = catalog.load("simple-scraper").unwrap();
        assert_eq!(template.name, "Simple Web Scraper");

        let scrape = graph.node("scrape").unwrap();
        assert_eq!(scrape.title, "Scrape Page");
        assert_eq!(scrape.kind(), NodeKind::Mcp);
        let wire = scrape.data.to_wire();
        assert!(wire.get("label").is_none());
        assert_eq!(wire["scrapeUrl"], "{{input.url}}");

        assert_eq!(graph.edges(), &[Edge::new("start", "scrape"), Edge::new("scrape", "end")]);

        let expected = tiered_layout(graph.nodes());
        assert_eq!(graph.positions(), &expected);
        // template placed scrape at (100, 250)
        assert_ne!(graph.position_of("scrape"), Some(Position::new(100.0, 250.0)));
    }

    #[test]
    fn test_every_template_loads() {
        let catalog = catalog();
        for template in catalog.all() {
            let (_, graph) = catalog.load(&template.id).unwrap();
            assert_eq!(graph.len(), template.nodes.len());
            let issues = validate(graph.nodes(), graph.edges());
            assert!(
                issues.iter().all(|i| matches!(i, GraphIssue::Cycle { .. })),
                "{}: {:?}",
                template.id,
                issues
            );
        }
    }

    #[test]
    fn test_unknown_template() {
        assert!(matches!(
            catalog().load("missing"),
            Err(ImportError::UnknownTemplate(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_unknown_node_type_in_custom_catalog() {
        let json = r#"[{"id": "t", "name": "T", "nodes": [{"id": "a", "type": "robot"}], "edges": []}]"#;
        let catalog = TemplateCatalog::from_json(json).unwrap();
        assert!(matches!(
            catalog.load("t"),
            Err(ImportError::UnknownNodeType { index: 0, .. })
        ));
    }
}
