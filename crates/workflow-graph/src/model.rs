//! Graph model: the canonical node list, edge list and position map
//!
//! Every operation is total. Referencing an ID that does not exist is a
//! no-op rather than an error, since interactive callers can race with
//! themselves (double clicks, stale selections).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::placement;
use crate::data::NodeData;
use crate::layout::grid_slot;
use crate::types::{Edge, Node, NodeId, NodeKind, PhaseItem, Position};

/// Partial update applied by [`GraphModel::update_node`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub kind: Option<NodeKind>,
    pub data: Option<NodeData>,
    pub items: Option<Vec<PhaseItem>>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn data(mut self, data: NodeData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn items(mut self, items: Vec<PhaseItem>) -> Self {
        self.items = Some(items);
        self
    }
}

/// In-memory workflow graph with layout bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphModel {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    positions: HashMap<NodeId, Position>,
    #[serde(default)]
    selected: Option<NodeId>,
    /// Monotonic ID counter, never decremented
    counter: u64,
}

impl GraphModel {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from imported content
    ///
    /// Positions are regenerated from the grid; incoming positions are never
    /// trusted. The ID counter starts past every imported node so generated
    /// IDs cannot collide with imported ones.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let positions = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), grid_slot(index)))
            .collect();
        let counter = nodes.len() as u64;
        Self {
            nodes,
            edges,
            positions,
            selected: None,
            counter,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn positions(&self) -> &HashMap<NodeId, Position> {
        &self.positions
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Find a node by ID
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Select a node; selecting an unknown ID clears the selection
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.filter(|id| self.contains(id)).map(str::to_string);
    }

    /// Stored position, or the grid slot derived from the node's index
    pub fn position_of(&self, id: &str) -> Option<Position> {
        if let Some(pos) = self.positions.get(id) {
            return Some(*pos);
        }
        self.index_of(id).map(grid_slot)
    }

    /// Add a node of the given kind in the next free grid slot
    ///
    /// Returns the generated ID, `{kind}_{counter}`.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.next_id(kind);
        let position = grid_slot(self.nodes.len());
        self.nodes.push(Node::new(id.clone(), kind));
        self.positions.insert(id.clone(), position);
        log::debug!("Added node '{}' at ({}, {})", id, position.x, position.y);
        id
    }

    /// Insert a prebuilt node, keeping its ID if unused
    ///
    /// A clashing ID is replaced by a generated one. Returns the final ID.
    pub fn insert_node(&mut self, mut node: Node, position: Option<Position>) -> NodeId {
        if node.id.is_empty() || self.contains(&node.id) {
            node.id = self.next_id(node.kind());
        }
        let id = node.id.clone();
        let position = position.unwrap_or_else(|| grid_slot(self.nodes.len()));
        self.nodes.push(node);
        self.positions.insert(id.clone(), position);
        id
    }

    /// Copy a node under a fresh ID, offset from the source
    pub fn duplicate_node(&mut self, id: &str) -> Option<NodeId> {
        let source = self.node(id)?.clone();
        let position = self
            .positions
            .get(id)
            .map(|p| p.offset(placement::DUPLICATE_OFFSET, placement::DUPLICATE_OFFSET))
            .unwrap_or(Position::new(
                placement::DUPLICATE_DEFAULT,
                placement::DUPLICATE_DEFAULT,
            ));

        let new_id = self.next_id(source.kind());
        let copy = Node {
            id: new_id.clone(),
            ..source
        };
        self.nodes.push(copy);
        self.positions.insert(new_id.clone(), position);
        log::debug!("Duplicated node '{}' as '{}'", id, new_id);
        Some(new_id)
    }

    /// Remove a node with its edges and position entry
    pub fn delete_node(&mut self, id: &str) -> Option<Node> {
        let index = self.index_of(id)?;
        let node = self.nodes.remove(index);
        let before = self.edges.len();
        self.edges.retain(|e| e.from != id && e.to != id);
        self.positions.remove(id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        log::debug!(
            "Deleted node '{}' and {} connected edge(s)",
            id,
            before - self.edges.len()
        );
        Some(node)
    }

    /// Append an edge; self-loops are rejected
    ///
    /// Duplicates are allowed here and resolved by the analyzer.
    pub fn connect(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            log::debug!("Rejected self-loop on '{}'", from);
            return false;
        }
        self.edges.push(Edge::new(from, to));
        true
    }

    /// Remove an edge by its position in the edge list
    pub fn remove_edge(&mut self, index: usize) -> Option<Edge> {
        if index < self.edges.len() {
            Some(self.edges.remove(index))
        } else {
            None
        }
    }

    /// Replace the edge list wholesale (used to apply analyzer cleanups)
    pub fn replace_edges(&mut self, edges: Vec<Edge>) {
        self.edges = edges;
    }

    /// Merge the given fields into an existing node
    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };

        let NodeUpdate {
            title,
            subtitle,
            kind,
            data,
            items,
        } = update;

        if let Some(title) = title {
            node.title = title;
        }
        if let Some(subtitle) = subtitle {
            node.subtitle = subtitle;
        }
        if let Some(items) = items {
            node.items = items;
        }
        // Incoming data never changes the kind on its own.
        let kind = kind.unwrap_or_else(|| node.kind());
        if let Some(data) = data {
            node.data = data;
        }
        node.data = node.data.rekey(kind);
        true
    }

    /// Overwrite the position of a node
    ///
    /// Snapping is the caller's concern.
    pub fn set_position(&mut self, id: &str, position: Position) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.positions.insert(id.to_string(), position);
        true
    }

    /// Replace every position (auto-layout, import)
    pub fn set_positions(&mut self, positions: HashMap<NodeId, Position>) {
        self.positions = positions;
    }

    /// Remove everything, keeping the ID counter
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.positions.clear();
        self.selected = None;
    }

    fn next_id(&mut self, kind: NodeKind) -> NodeId {
        loop {
            self.counter += 1;
            let id = format!("{}_{}", kind, self.counter);
            if !self.contains(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_add_node_ids_and_grid() {
        let mut graph = GraphModel::new();
        let a = graph.add_node(NodeKind::Start);
        let b = graph.add_node(NodeKind::Agent);
        assert_eq!(a, "start_1");
        assert_eq!(b, "agent_2");
        assert_eq!(graph.position_of(&a), Some(Position::new(40.0, 40.0)));
        assert_eq!(graph.position_of(&b), Some(Position::new(360.0, 40.0)));

        for _ in 0..3 {
            graph.add_node(NodeKind::Phase);
        }
        // Fifth node wraps to the second row
        let fifth = &graph.nodes()[4].id;
        assert_eq!(graph.position_of(fifth), Some(Position::new(40.0, 300.0)));
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let mut graph = GraphModel::new();
        let mut seen = HashSet::new();
        for i in 0..20 {
            let id = graph.add_node(NodeKind::Tool);
            assert!(seen.insert(id.clone()));
            if i % 3 == 0 {
                graph.delete_node(&id);
            }
            if let Some(first) = graph.nodes().first().map(|n| n.id.clone()) {
                let dup = graph.duplicate_node(&first).unwrap();
                assert!(seen.insert(dup));
            }
        }
    }

    #[test]
    fn test_duplicate_offsets_position() {
        let mut graph = GraphModel::new();
        let id = graph.add_node(NodeKind::Agent);
        graph.update_node(&id, NodeUpdate::new().title("Writer"));
        let dup = graph.duplicate_node(&id).unwrap();

        assert_eq!(graph.position_of(&dup), Some(Position::new(80.0, 80.0)));
        let copy = graph.node(&dup).unwrap();
        assert_eq!(copy.title, "Writer");
        assert_eq!(copy.kind(), NodeKind::Agent);
    }

    #[test]
    fn test_duplicate_without_position_uses_default() {
        let mut graph = GraphModel::from_parts(vec![Node::new("n1", NodeKind::Note)], vec![]);
        graph.set_positions(HashMap::new());
        let dup = graph.duplicate_node("n1").unwrap();
        assert_eq!(graph.position_of(&dup), Some(Position::new(100.0, 100.0)));
    }

    #[test]
    fn test_delete_cascades() {
        let mut graph = GraphModel::new();
        let a = graph.add_node(NodeKind::Start);
        let b = graph.add_node(NodeKind::Agent);
        let c = graph.add_node(NodeKind::End);
        graph.connect(&a, &b);
        graph.connect(&b, &c);
        graph.connect(&a, &c);
        graph.select(Some(&b));

        let removed = graph.delete_node(&b).unwrap();
        assert_eq!(removed.id, b);
        assert!(graph.edges().iter().all(|e| e.from != b && e.to != b));
        assert!(!graph.positions().contains_key(&b));
        assert_eq!(graph.selected(), None);
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_missing_ids_are_noops() {
        let mut graph = GraphModel::new();
        let a = graph.add_node(NodeKind::Start);
        graph.delete_node(&a);
        assert!(graph.delete_node(&a).is_none());
        assert!(graph.duplicate_node("ghost").is_none());
        assert!(!graph.update_node("ghost", NodeUpdate::new().title("x")));
        assert!(!graph.set_position("ghost", Position::new(1.0, 1.0)));
        assert!(graph.remove_edge(3).is_none());
    }

    #[test]
    fn test_connect_rejects_self_loop_but_keeps_duplicates() {
        let mut graph = GraphModel::new();
        let a = graph.add_node(NodeKind::Start);
        let b = graph.add_node(NodeKind::End);
        assert!(!graph.connect(&a, &a));
        assert!(graph.connect(&a, &b));
        assert!(graph.connect(&a, &b));
        assert_eq!(graph.edges().len(), 2);

        let removed = graph.remove_edge(0).unwrap();
        assert_eq!(removed, Edge::new(&a, &b));
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_update_node_changes_kind() {
        let mut graph = GraphModel::new();
        let id = graph.add_node(NodeKind::Phase);
        let data = NodeData::from_wire(
            NodeKind::While,
            serde_json::json!({"condition": "i < 3"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert!(graph.update_node(
            &id,
            NodeUpdate::new()
                .subtitle("loop")
                .data(data)
                .kind(NodeKind::IfElse)
        ));
        let node = graph.node(&id).unwrap();
        assert_eq!(node.kind(), NodeKind::IfElse);
        assert_eq!(node.subtitle, "loop");
        assert_eq!(node.data.to_wire()["condition"], "i < 3");
    }

    #[test]
    fn test_data_update_keeps_node_kind() {
        let mut graph = GraphModel::new();
        let id = graph.add_node(NodeKind::Phase);
        let data = NodeData::from_wire(
            NodeKind::Agent,
            serde_json::json!({"model": "gpt-4o"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert!(graph.update_node(&id, NodeUpdate::new().data(data)));

        let node = graph.node(&id).unwrap();
        assert_eq!(node.kind(), NodeKind::Phase);
        assert_eq!(node.data.to_wire()["model"], "gpt-4o");
    }

    #[test]
    fn test_generated_ids_skip_imported_ones() {
        let nodes = vec![Node::new("agent_2", NodeKind::Agent)];
        let mut graph = GraphModel::from_parts(nodes, vec![]);
        let id = graph.add_node(NodeKind::Agent);
        assert_ne!(id, "agent_2");
        assert_eq!(id, "agent_3");
    }
}
