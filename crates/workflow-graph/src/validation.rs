//! Graph analysis for workflow graphs
//!
//! Read-only passes over `(nodes, edges)`: orphaned-edge filtering,
//! duplicate-edge removal, isolated-node detection, cycle detection and
//! per-kind configuration lint. Nothing here mutates the graph.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::data::NodeData;
use crate::types::{Edge, Node, NodeId, NodeKind};

/// Structural issue that blocks a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum GraphIssue {
    /// The graph has no nodes at all
    NoNodes,
    /// An edge references a node that does not exist
    InvalidEdge { from: NodeId, to: NodeId },
    /// A node has no incoming or outgoing edges
    #[serde(rename_all = "camelCase")]
    Isolated { node_id: NodeId },
    /// The graph contains a directed cycle
    Cycle { path: Vec<NodeId> },
}

impl GraphIssue {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoNodes => "no_nodes",
            Self::InvalidEdge { .. } => "invalid_edge",
            Self::Isolated { .. } => "isolated",
            Self::Cycle { .. } => "cycle",
        }
    }
}

impl std::fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoNodes => write!(f, "Workflow has no nodes"),
            Self::InvalidEdge { from, to } => {
                write!(f, "Edge '{}' -> '{}' references a missing node", from, to)
            }
            Self::Isolated { node_id } => {
                write!(f, "Node '{}' has no connections", node_id)
            }
            Self::Cycle { path } => {
                if path.is_empty() {
                    write!(f, "Cycle detected in graph")
                } else {
                    write!(f, "Cycle detected: {}", path.join(" -> "))
                }
            }
        }
    }
}

impl std::error::Error for GraphIssue {}

/// Non-blocking configuration warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum LintWarning {
    MissingStart,
    #[serde(rename_all = "camelCase")]
    MultipleStart { node_ids: Vec<NodeId> },
    MissingEnd,
    #[serde(rename_all = "camelCase")]
    MissingField { node_id: NodeId, field: &'static str },
}

impl std::fmt::Display for LintWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStart => write!(f, "Workflow has no Start node"),
            Self::MultipleStart { node_ids } => {
                write!(f, "Workflow has multiple Start nodes: {}", node_ids.join(", "))
            }
            Self::MissingEnd => write!(f, "Workflow should have at least one End node"),
            Self::MissingField { node_id, field } => {
                write!(f, "Node '{}' is missing required field '{}'", node_id, field)
            }
        }
    }
}

fn node_ids(nodes: &[Node]) -> HashSet<&str> {
    nodes.iter().map(|n| n.id.as_str()).collect()
}

/// Edges whose `from` or `to` is not a current node
pub fn invalid_edges<'a>(nodes: &[Node], edges: &'a [Edge]) -> Vec<&'a Edge> {
    let ids = node_ids(nodes);
    edges
        .iter()
        .filter(|e| !ids.contains(e.from.as_str()) || !ids.contains(e.to.as_str()))
        .collect()
}

/// Edges whose endpoints both exist
pub fn valid_edges<'a>(nodes: &[Node], edges: &'a [Edge]) -> Vec<&'a Edge> {
    let ids = node_ids(nodes);
    edges
        .iter()
        .filter(|e| ids.contains(e.from.as_str()) && ids.contains(e.to.as_str()))
        .collect()
}

/// Drop repeated `from->to` pairs, keeping the first occurrence
pub fn dedupe_edges(edges: &[Edge]) -> Vec<Edge> {
    let mut seen = HashSet::new();
    edges
        .iter()
        .filter(|e| seen.insert(e.key()))
        .cloned()
        .collect()
}

/// Valid, deduplicated edge list ready for compiling or running
pub fn clean_edges(nodes: &[Node], edges: &[Edge]) -> Vec<Edge> {
    let valid: Vec<Edge> = valid_edges(nodes, edges).into_iter().cloned().collect();
    dedupe_edges(&valid)
}

/// Nodes with neither incoming nor outgoing valid edges
///
/// A single-node graph is never reported.
pub fn isolated_nodes(nodes: &[Node], edges: &[Edge]) -> Vec<NodeId> {
    if nodes.len() <= 1 {
        return Vec::new();
    }
    let mut connected: HashSet<&str> = HashSet::new();
    for edge in valid_edges(nodes, edges) {
        connected.insert(edge.from.as_str());
        connected.insert(edge.to.as_str());
    }
    nodes
        .iter()
        .filter(|n| !connected.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Whether the valid-edge subgraph contains a directed cycle
pub fn has_cycle(nodes: &[Node], edges: &[Edge]) -> bool {
    find_cycle(nodes, edges).is_some()
}

/// Path of the first cycle found, closing node repeated at the end
///
/// Three-color DFS with an explicit stack, so graph size cannot exhaust
/// the call stack. Edges with a missing endpoint are excluded.
pub fn find_cycle(nodes: &[Node], edges: &[Edge]) -> Option<Vec<NodeId>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in valid_edges(nodes, edges) {
        adjacency
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
    }

    let mut color: HashMap<&str, Color> =
        nodes.iter().map(|n| (n.id.as_str(), Color::White)).collect();

    for root in nodes.iter().map(|n| n.id.as_str()) {
        if color.get(root) != Some(&Color::White) {
            continue;
        }

        // (node, index of next child to visit)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        color.insert(root, Color::Gray);

        while let Some(top) = stack.last_mut() {
            let (node, next_child) = *top;
            top.1 += 1;
            let children = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);
            if let Some(&child) = children.get(next_child) {
                match color.get(child).copied().unwrap_or(Color::White) {
                    Color::White => {
                        color.insert(child, Color::Gray);
                        stack.push((child, 0));
                    }
                    Color::Gray => {
                        let start = stack.iter().position(|(id, _)| *id == child).unwrap_or(0);
                        let mut path: Vec<NodeId> =
                            stack[start..].iter().map(|(id, _)| id.to_string()).collect();
                        path.push(child.to_string());
                        return Some(path);
                    }
                    Color::Black => {}
                }
            } else {
                color.insert(node, Color::Black);
                stack.pop();
            }
        }
    }

    None
}

/// Structural check run before executing a workflow
///
/// An empty graph yields only `NoNodes`. Otherwise invalid edges, isolated
/// nodes and cycles are reported, in that order.
pub fn validate(nodes: &[Node], edges: &[Edge]) -> Vec<GraphIssue> {
    if nodes.is_empty() {
        return vec![GraphIssue::NoNodes];
    }

    let mut issues: Vec<GraphIssue> = invalid_edges(nodes, edges)
        .into_iter()
        .map(|e| GraphIssue::InvalidEdge {
            from: e.from.clone(),
            to: e.to.clone(),
        })
        .collect();

    issues.extend(
        isolated_nodes(nodes, edges)
            .into_iter()
            .map(|node_id| GraphIssue::Isolated { node_id }),
    );

    if let Some(path) = find_cycle(nodes, edges) {
        issues.push(GraphIssue::Cycle { path });
    }

    issues
}

/// Per-kind configuration lint
///
/// Reports missing start/end nodes and required fields left empty. These
/// are warnings for the editor and never block a run.
pub fn lint_nodes(nodes: &[Node]) -> Vec<LintWarning> {
    let mut warnings = Vec::new();

    let starts: Vec<NodeId> = nodes
        .iter()
        .filter(|n| n.kind() == NodeKind::Start)
        .map(|n| n.id.clone())
        .collect();
    match starts.len() {
        0 => warnings.push(LintWarning::MissingStart),
        1 => {}
        _ => warnings.push(LintWarning::MultipleStart { node_ids: starts }),
    }
    if !nodes.iter().any(|n| n.kind() == NodeKind::End) {
        warnings.push(LintWarning::MissingEnd);
    }

    for node in nodes {
        for field in missing_fields(node) {
            warnings.push(LintWarning::MissingField {
                node_id: node.id.clone(),
                field,
            });
        }
    }

    warnings
}

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn empty_list<T>(value: Option<&Vec<T>>) -> bool {
    value.map_or(true, |v| v.is_empty())
}

fn missing_fields(node: &Node) -> Vec<&'static str> {
    let mut missing = Vec::new();
    match &node.data {
        NodeData::Agent(d) => {
            if blank(d.instructions.as_deref()) {
                missing.push("instructions");
            }
            if blank(d.model.as_deref()) {
                missing.push("model");
            }
        }
        NodeData::Mcp(d) => {
            if empty_list(d.mcp_servers.as_ref()) {
                missing.push("mcpServers");
            }
        }
        NodeData::Condition(d) => {
            if blank(d.expression.as_deref()) {
                missing.push("condition");
            }
        }
        NodeData::IfElse(d) => {
            if blank(d.condition.as_deref()) {
                missing.push("condition");
            }
        }
        NodeData::Loop(d) | NodeData::While(d) => {
            if blank(d.condition.as_deref()) {
                missing.push("condition");
            }
        }
        NodeData::Transform(d) => {
            if blank(d.script.as_deref()) {
                missing.push("transformScript");
            }
        }
        NodeData::SetState(d) => {
            if blank(d.state_key.as_deref()) {
                missing.push("stateKey");
            }
        }
        NodeData::Tool(d) => {
            if empty_list(d.tools.as_ref()) {
                missing.push("tools");
            }
        }
        NodeData::UserApproval(d) => {
            if blank(d.approval_message.as_deref()) {
                missing.push("approvalMessage");
            }
        }
        NodeData::Guardrail(d) => {
            if blank(d.guardrail_type.as_deref()) {
                missing.push("guardrailType");
            }
        }
        NodeData::Phase(_) => {
            if node.title.trim().is_empty() {
                missing.push("title");
            }
        }
        NodeData::Note(_) | NodeData::Start(_) | NodeData::End(_) => {}
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;

    #[test]
    fn test_detect_cycle() {
        let graph = GraphBuilder::new()
            .node("A", NodeKind::Agent)
            .node("B", NodeKind::Agent)
            .node("C", NodeKind::Agent)
            .edge("A", "B")
            .edge("B", "C")
            .edge("C", "A")
            .build();

        assert!(has_cycle(graph.nodes(), graph.edges()));
        let path = find_cycle(graph.nodes(), graph.edges()).unwrap();
        assert_eq!(path, vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn test_no_cycle_linear() {
        let graph = GraphBuilder::new()
            .node("A", NodeKind::Agent)
            .node("B", NodeKind::Agent)
            .node("C", NodeKind::Agent)
            .edge("A", "B")
            .edge("B", "C")
            .build();

        assert!(!has_cycle(graph.nodes(), graph.edges()));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let graph = GraphBuilder::new()
            .node("A", NodeKind::Start)
            .node("B", NodeKind::Agent)
            .node("C", NodeKind::Agent)
            .node("D", NodeKind::End)
            .edge("A", "B")
            .edge("A", "C")
            .edge("B", "D")
            .edge("C", "D")
            .build();

        assert!(!has_cycle(graph.nodes(), graph.edges()));
    }

    #[test]
    fn test_cycle_through_missing_node_is_ignored() {
        let graph = GraphBuilder::new()
            .node("A", NodeKind::Agent)
            .node("B", NodeKind::Agent)
            .edge("A", "B")
            .edge("B", "ghost")
            .edge("ghost", "A")
            .build();

        assert!(!has_cycle(graph.nodes(), graph.edges()));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut builder = GraphBuilder::new();
        for i in 0..10_000 {
            builder = builder.node(format!("n{}", i), NodeKind::Phase);
        }
        for i in 1..10_000 {
            builder = builder.edge(format!("n{}", i - 1), format!("n{}", i));
        }
        let graph = builder.build();
        assert!(!has_cycle(graph.nodes(), graph.edges()));
    }

    #[test]
    fn test_isolated_single_node_exception() {
        let single = GraphBuilder::new().node("A", NodeKind::Agent).build();
        assert!(isolated_nodes(single.nodes(), single.edges()).is_empty());

        let pair = GraphBuilder::new()
            .node("A", NodeKind::Agent)
            .node("B", NodeKind::Agent)
            .build();
        let issues = validate(pair.nodes(), pair.edges());
        let isolated: Vec<_> = issues
            .iter()
            .filter(|i| matches!(i, GraphIssue::Isolated { .. }))
            .collect();
        assert_eq!(isolated.len(), 2);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let edges = vec![Edge::new("A", "B"), Edge::new("A", "B"), Edge::new("B", "C")];
        let deduped = dedupe_edges(&edges);
        assert_eq!(deduped, vec![Edge::new("A", "B"), Edge::new("B", "C")]);
    }

    #[test]
    fn test_invalid_edges() {
        let graph = GraphBuilder::new()
            .node("A", NodeKind::Agent)
            .node("B", NodeKind::Agent)
            .edge("A", "B")
            .edge("A", "missing")
            .build();

        let invalid = invalid_edges(graph.nodes(), graph.edges());
        assert_eq!(invalid, vec![&Edge::new("A", "missing")]);

        let cleaned = clean_edges(graph.nodes(), graph.edges());
        assert_eq!(cleaned, vec![Edge::new("A", "B")]);
    }

    #[test]
    fn test_empty_graph_reports_only_no_nodes() {
        let issues = validate(&[], &[Edge::new("A", "B")]);
        assert_eq!(issues, vec![GraphIssue::NoNodes]);
        assert_eq!(issues[0].code(), "no_nodes");
    }

    #[test]
    fn test_validate_is_idempotent() {
        let graph = GraphBuilder::new()
            .node("A", NodeKind::Agent)
            .node("B", NodeKind::Agent)
            .node("C", NodeKind::Agent)
            .edge("A", "B")
            .edge("B", "A")
            .edge("B", "nope")
            .build();

        let first = validate(graph.nodes(), graph.edges());
        let second = validate(graph.nodes(), graph.edges());
        assert_eq!(first, second);
        let codes: HashSet<_> = first.iter().map(GraphIssue::code).collect();
        assert!(codes.contains("invalid_edge"));
        assert!(codes.contains("isolated"));
        assert!(codes.contains("cycle"));
    }

    #[test]
    fn test_issue_serializes_with_code() {
        let issue = GraphIssue::Isolated {
            node_id: "n1".to_string(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json, serde_json::json!({"code": "isolated", "nodeId": "n1"}));
    }

    #[test]
    fn test_lint_warning_fields_are_camel_case() {
        let warning = LintWarning::MissingField {
            node_id: "a".to_string(),
            field: "model",
        };
        assert_eq!(
            serde_json::to_value(&warning).unwrap(),
            serde_json::json!({"code": "missing_field", "nodeId": "a", "field": "model"})
        );

        let warning = LintWarning::MultipleStart {
            node_ids: vec!["s1".to_string(), "s2".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&warning).unwrap(),
            serde_json::json!({"code": "multiple_start", "nodeIds": ["s1", "s2"]})
        );
    }

    #[test]
    fn test_lint_reports_missing_fields() {
        let graph = GraphBuilder::new()
            .node("s", NodeKind::Start)
            .node("a", NodeKind::Agent)
            .node("t", NodeKind::Transform)
            .build();

        let warnings = lint_nodes(graph.nodes());
        assert!(warnings.contains(&LintWarning::MissingEnd));
        assert!(warnings.contains(&LintWarning::MissingField {
            node_id: "a".to_string(),
            field: "instructions",
        }));
        assert!(warnings.contains(&LintWarning::MissingField {
            node_id: "a".to_string(),
            field: "model",
        }));
        assert!(warnings.contains(&LintWarning::MissingField {
            node_id: "t".to_string(),
            field: "transformScript",
        }));
        assert!(!warnings.contains(&LintWarning::MissingStart));
    }
}
