//! Workflow DSL compiler
//!
//! Maps the graph model to and from the portable, position-free workflow
//! description used for publish, export and import:
//!
//! ```json
//! { "name": "...", "nodes": [{"id", "type", "title", "subtitle", "items", "data"}],
//!   "edges": [{"from", "to"}] }
//! ```
//!
//! Import never trusts incoming positions; layout is always recomputed.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{Extra, NodeData};
use crate::error::{ImportError, Result};
use crate::model::GraphModel;
use crate::types::{Edge, Node, NodeKind, PhaseItem, WireNode};

/// Portable workflow description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDsl {
    pub name: String,
    pub nodes: Vec<WireNode>,
    pub edges: Vec<Edge>,
}

/// Legacy progress shape: a titled phase with its step list
///
/// Produced by agent update streams that never went through the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub items: Vec<PhaseItem>,
}

impl Phase {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: String::new(),
            items: Vec::new(),
        }
    }
}

/// Result of a successful import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedWorkflow {
    /// Name carried by the description, if any
    pub name: Option<String>,
    pub graph: GraphModel,
}

/// Compile the graph into its DSL form
pub fn compile(graph: &GraphModel, name: &str) -> WorkflowDsl {
    WorkflowDsl {
        name: name.to_string(),
        nodes: graph.nodes().iter().cloned().map(WireNode::from).collect(),
        edges: graph.edges().to_vec(),
    }
}

/// Compile a linear chain of phases, one node per phase
pub fn compile_phases(phases: &[Phase], name: &str) -> WorkflowDsl {
    let nodes: Vec<WireNode> = phases
        .iter()
        .enumerate()
        .map(|(index, phase)| WireNode {
            id: format!("phase_{}", index + 1),
            kind: NodeKind::Phase,
            title: phase.title.clone(),
            subtitle: phase.subtitle.clone(),
            items: phase.items.clone(),
            data: Extra::new(),
        })
        .collect();
    let edges = nodes
        .windows(2)
        .map(|pair| Edge::new(pair[0].id.clone(), pair[1].id.clone()))
        .collect();
    WorkflowDsl {
        name: name.to_string(),
        nodes,
        edges,
    }
}

/// Compile the graph, falling back to the phase chain when it is empty
pub fn compile_or_phases(graph: &GraphModel, phases: &[Phase], name: &str) -> WorkflowDsl {
    if graph.is_empty() {
        compile_phases(phases, name)
    } else {
        compile(graph, name)
    }
}

/// Parse and import a DSL document from text
pub fn parse(text: &str) -> std::result::Result<ImportedWorkflow, ImportError> {
    let value: Value = serde_json::from_str(text).map_err(ImportError::Parse)?;
    import_value(&value)
}

/// Import an already-parsed DSL document
///
/// Missing node IDs default to `node_{index+1}`, missing types to `phase`.
/// Edges without both endpoints are dropped. A repeated node ID keeps its
/// first occurrence.
pub fn import_value(value: &Value) -> std::result::Result<ImportedWorkflow, ImportError> {
    let object = value.as_object().ok_or(ImportError::NotAnObject)?;
    let raw_nodes = object
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or(ImportError::NodesNotArray)?;

    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for (index, raw) in raw_nodes.iter().enumerate() {
        let node = import_node(index, raw)?;
        if !seen.insert(node.id.clone()) {
            log::warn!("Dropping node with repeated id '{}'", node.id);
            continue;
        }
        nodes.push(node);
    }

    let edges: Vec<Edge> = object
        .get("edges")
        .and_then(Value::as_array)
        .map(|raw| raw.iter().filter_map(import_edge).collect())
        .unwrap_or_default();

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);

    log::info!(
        "Imported workflow {:?}: {} node(s), {} edge(s)",
        name,
        nodes.len(),
        edges.len()
    );

    Ok(ImportedWorkflow {
        name,
        graph: GraphModel::from_parts(nodes, edges),
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn import_node(index: usize, raw: &Value) -> std::result::Result<Node, ImportError> {
    let empty = Extra::new();
    let object = raw.as_object().unwrap_or(&empty);

    let id = non_empty_str(object.get("id")).unwrap_or_else(|| format!("node_{}", index + 1));

    let kind = match object.get("type") {
        None | Some(Value::Null) => NodeKind::Phase,
        Some(Value::String(s)) if s.is_empty() => NodeKind::Phase,
        Some(Value::String(s)) => {
            s.parse::<NodeKind>()
                .map_err(|_| ImportError::UnknownNodeType {
                    index,
                    node_type: s.clone(),
                })?
        }
        Some(other) => {
            return Err(ImportError::UnknownNodeType {
                index,
                node_type: other.to_string(),
            })
        }
    };

    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let items = match object.get("items") {
        Some(Value::Array(raw)) => raw
            .iter()
            .enumerate()
            .map(|(item, value)| {
                serde_json::from_value::<PhaseItem>(value.clone()).map_err(|e| {
                    ImportError::InvalidItem {
                        node_id: id.clone(),
                        item,
                        reason: e.to_string(),
                    }
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    let data = match object.get("data") {
        Some(Value::Object(bag)) => bag.clone(),
        None | Some(Value::Null) => Extra::new(),
        Some(other) => {
            log::warn!("Ignoring non-object data on node '{}': {}", id, other);
            Extra::new()
        }
    };

    Ok(Node {
        title: text("title"),
        subtitle: text("subtitle"),
        items,
        data: NodeData::from_wire(kind, data),
        id,
    })
}

fn import_edge(raw: &Value) -> Option<Edge> {
    let from = non_empty_str(raw.get("from"))?;
    let to = non_empty_str(raw.get("to"))?;
    Some(Edge { from, to })
}

/// Write the DSL as formatted JSON
pub async fn write_file(dsl: &WorkflowDsl, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(dsl)?;
    tokio::fs::write(path, content).await?;
    log::info!("Exported workflow '{}' to {:?}", dsl.name, path);
    Ok(())
}

/// Read and import a DSL file
pub async fn read_file(path: impl AsRef<Path>) -> Result<ImportedWorkflow> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let imported = parse(&content)?;
    log::debug!("Read workflow from {:?}", path);
    Ok(imported)
}
