//! Core types for workflow graphs
//!
//! These types define the structure of the editable workflow graph:
//! nodes, edges, phase items and world-space positions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::{Extra, NodeData};

/// Unique identifier for a node
pub type NodeId = String;

/// The closed set of node kinds a workflow can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Phase,
    Tool,
    Condition,
    #[serde(alias = "guardrails")]
    Guardrail,
    Loop,
    Agent,
    #[serde(alias = "mcp-tool")]
    Mcp,
    Transform,
    #[serde(alias = "approval")]
    UserApproval,
    #[serde(alias = "set state")]
    SetState,
    Note,
    #[serde(alias = "if / else")]
    IfElse,
    While,
    Start,
    End,
}

impl NodeKind {
    /// Every kind, in palette order
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Start,
        NodeKind::Agent,
        NodeKind::Phase,
        NodeKind::Tool,
        NodeKind::Mcp,
        NodeKind::Condition,
        NodeKind::IfElse,
        NodeKind::While,
        NodeKind::Loop,
        NodeKind::Transform,
        NodeKind::SetState,
        NodeKind::UserApproval,
        NodeKind::Guardrail,
        NodeKind::Note,
        NodeKind::End,
    ];

    /// Wire name, also used as the prefix of generated node IDs
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Phase => "phase",
            NodeKind::Tool => "tool",
            NodeKind::Condition => "condition",
            NodeKind::Guardrail => "guardrail",
            NodeKind::Loop => "loop",
            NodeKind::Agent => "agent",
            NodeKind::Mcp => "mcp",
            NodeKind::Transform => "transform",
            NodeKind::UserApproval => "user-approval",
            NodeKind::SetState => "set-state",
            NodeKind::Note => "note",
            NodeKind::IfElse => "if-else",
            NodeKind::While => "while",
            NodeKind::Start => "start",
            NodeKind::End => "end",
        }
    }

    /// Human-readable label, used as the default title of new nodes
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Phase => "Phase",
            NodeKind::Tool => "Tool",
            NodeKind::Condition => "Condition",
            NodeKind::Guardrail => "Guardrails",
            NodeKind::Loop => "Loop",
            NodeKind::Agent => "Agent",
            NodeKind::Mcp => "MCP",
            NodeKind::Transform => "Transform",
            NodeKind::UserApproval => "User Approval",
            NodeKind::SetState => "Set State",
            NodeKind::Note => "Note",
            NodeKind::IfElse => "If / Else",
            NodeKind::While => "While",
            NodeKind::Start => "Start",
            NodeKind::End => "End",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown node kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNodeKind(pub String);

impl fmt::Display for UnknownNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node type '{}'", self.0)
    }
}

impl std::error::Error for UnknownNodeKind {}

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| UnknownNodeKind(s.to_string()))
    }
}

/// Progress of a single phase item
///
/// Statuses reported by other producers are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Running,
    Completed,
    Failed,
    Error,
    #[serde(untagged)]
    Other(String),
}

/// A sub-entry shown in a phase node's step list
///
/// Keys beyond the modelled ones survive in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseItem {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PhaseItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: None,
            extra: Extra::new(),
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// A node instance in a graph
///
/// The node's kind is carried by its [`NodeData`] variant, so the two can
/// never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireNode", from = "WireNode")]
pub struct Node {
    /// Unique identifier, stable for the node's lifetime
    pub id: NodeId,
    pub title: String,
    pub subtitle: String,
    /// Step list (meaningful for phase nodes)
    pub items: Vec<PhaseItem>,
    /// Kind-specific configuration
    pub data: NodeData,
}

impl Node {
    /// Create a node of the given kind with empty configuration
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            title: kind.label().to_string(),
            subtitle: String::new(),
            items: Vec::new(),
            data: NodeData::empty(kind),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_items(mut self, items: Vec<PhaseItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }
}

/// Untyped wire shape of a node: `{id, type, title, subtitle, items, data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub items: Vec<PhaseItem>,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl From<Node> for WireNode {
    fn from(node: Node) -> Self {
        Self {
            id: node.id,
            kind: node.data.kind(),
            title: node.title,
            subtitle: node.subtitle,
            items: node.items,
            data: node.data.to_wire(),
        }
    }
}

impl From<WireNode> for Node {
    fn from(wire: WireNode) -> Self {
        Self {
            id: wire.id,
            title: wire.title,
            subtitle: wire.subtitle,
            items: wire.items,
            data: NodeData::from_wire(wire.kind, wire.data),
        }
    }
}

/// A directed connection between two nodes
///
/// Edges have no identity beyond the ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Deduplication key, `"{from}->{to}"`
    pub fn key(&self) -> String {
        format!("{}->{}", self.from, self.to)
    }
}

/// A point in world or screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_wire_names() {
        for kind in NodeKind::ALL {
            let parsed: NodeKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert_eq!("guardrails".parse::<NodeKind>().unwrap(), NodeKind::Guardrail);
        assert_eq!("mcp-tool".parse::<NodeKind>().unwrap(), NodeKind::Mcp);
        assert!("custom".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_node_serializes_to_wire_shape() {
        let node = Node::new("agent_1", NodeKind::Agent).with_subtitle("gpt");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "agent_1");
        assert_eq!(json["type"], "agent");
        assert_eq!(json["title"], "Agent");
        assert_eq!(json["subtitle"], "gpt");
        assert!(json["data"].as_object().unwrap().is_empty());

        let restored: Node = serde_json::from_value(json).unwrap();
        assert_eq!(restored, node);
    }

    #[test]
    fn test_phase_item_status_wire() {
        let item = PhaseItem::new("Fetch").with_status(ItemStatus::InProgress);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"title": "Fetch", "status": "in_progress"}));
    }

    #[test]
    fn test_phase_item_keeps_foreign_status_and_keys() {
        let raw = serde_json::json!({"title": "parse", "status": "retrying", "id": "x1", "attempt": 2});
        let item: PhaseItem = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.status, Some(ItemStatus::Other("retrying".to_string())));
        assert_eq!(item.extra["id"], "x1");
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);

        let item: PhaseItem = serde_json::from_value(serde_json::json!({"status": "failed"})).unwrap();
        assert_eq!(item.status, Some(ItemStatus::Failed));
        assert_eq!(item.title, "");
    }

    #[test]
    fn test_edge_key() {
        assert_eq!(Edge::new("a", "b").key(), "a->b");
    }
}
