//! Fluent builder for workflow graphs
//!
//! Provides a compact API for constructing graphs programmatically,
//! mostly for templates and tests.

use std::collections::HashMap;

use crate::data::NodeData;
use crate::model::GraphModel;
use crate::types::{Edge, Node, NodeId, NodeKind, PhaseItem, Position};

/// Fluent builder for [`GraphModel`]
///
/// # Example
///
/// ```
/// use workflow_graph::builder::GraphBuilder;
/// use workflow_graph::NodeKind;
///
/// let graph = GraphBuilder::new()
///     .node("start", NodeKind::Start)
///     .node("writer", NodeKind::Agent)
///     .with_data(serde_json::json!({"model": "gpt-4"}))
///     .edge("start", "writer")
///     .build();
///
/// assert_eq!(graph.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    positions: HashMap<NodeId, Position>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with its kind's default title
    pub fn node(mut self, id: impl Into<String>, kind: NodeKind) -> Self {
        self.nodes.push(Node::new(id, kind));
        self
    }

    /// Set the title of the most recently added node
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.title = title.into();
        }
        self
    }

    /// Set the subtitle of the most recently added node
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.subtitle = subtitle.into();
        }
        self
    }

    /// Set the phase items of the most recently added node
    pub fn with_items(mut self, items: Vec<PhaseItem>) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.items = items;
        }
        self
    }

    /// Set wire-form data on the most recently added node
    ///
    /// Non-object values are ignored.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        if let (Some(node), serde_json::Value::Object(bag)) = (self.nodes.last_mut(), data) {
            node.data = NodeData::from_wire(node.kind(), bag);
        }
        self
    }

    /// Pin the most recently added node to a world position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        if let Some(node) = self.nodes.last() {
            self.positions.insert(node.id.clone(), Position::new(x, y));
        }
        self
    }

    /// Add a directed edge
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    /// Build the graph without validation
    ///
    /// Nodes without a pinned position get their grid slot.
    pub fn build(self) -> GraphModel {
        let mut graph = GraphModel::from_parts(self.nodes, self.edges);
        if !self.positions.is_empty() {
            let mut positions = graph.positions().clone();
            positions.extend(self.positions);
            graph.set_positions(positions);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::grid_slot;

    #[test]
    fn test_builder_basic() {
        let graph = GraphBuilder::new()
            .node("in", NodeKind::Start)
            .node("write", NodeKind::Agent)
            .with_title("Writer")
            .with_data(serde_json::json!({"model": "gpt-4"}))
            .at(500.0, 120.0)
            .edge("in", "write")
            .build();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        let writer = graph.node("write").unwrap();
        assert_eq!(writer.title, "Writer");
        assert_eq!(writer.data.to_wire()["model"], "gpt-4");
        assert_eq!(graph.position_of("write"), Some(Position::new(500.0, 120.0)));
        assert_eq!(graph.position_of("in"), Some(grid_slot(0)));
    }
}
