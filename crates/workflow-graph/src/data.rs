//! Kind-specific node configuration
//!
//! Each node kind has its own statically-known set of fields. Keys the
//! engine does not model are kept in a flattened `extra` map so that the
//! untyped wire form survives a compile/import round trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::NodeKind;

/// Untyped key/value bag as it appears on the wire
pub type Extra = Map<String, Value>;

/// Configuration for kinds without modelled fields (phase, end)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlainData {
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionData {
    #[serde(rename = "condition", default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrail_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_on_violation: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Iteration cap, entered either as a number or free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IterationLimit {
    Count(u64),
    Text(String),
}

/// Shared by `loop` and `while` nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<IterationLimit>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_chat_history: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// An MCP server reference attached to an `mcp` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Vec<McpServer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_action: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformData {
    #[serde(rename = "transformScript", default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_type: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserApprovalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_message: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_value: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_text: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfElseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_label: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A workflow input declared on the start node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputVariable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_variables: Option<Vec<InputVariable>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Node configuration, one variant per [`NodeKind`]
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Phase(PlainData),
    Tool(ToolData),
    Condition(ConditionData),
    Guardrail(GuardrailData),
    Loop(LoopData),
    Agent(AgentData),
    Mcp(McpData),
    Transform(TransformData),
    UserApproval(UserApprovalData),
    SetState(SetStateData),
    Note(NoteData),
    IfElse(IfElseData),
    While(LoopData),
    Start(StartData),
    End(PlainData),
}

impl NodeData {
    /// Empty configuration for a kind
    pub fn empty(kind: NodeKind) -> Self {
        Self::with_extra(kind, Extra::new())
    }

    /// The kind this configuration belongs to
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Phase(_) => NodeKind::Phase,
            NodeData::Tool(_) => NodeKind::Tool,
            NodeData::Condition(_) => NodeKind::Condition,
            NodeData::Guardrail(_) => NodeKind::Guardrail,
            NodeData::Loop(_) => NodeKind::Loop,
            NodeData::Agent(_) => NodeKind::Agent,
            NodeData::Mcp(_) => NodeKind::Mcp,
            NodeData::Transform(_) => NodeKind::Transform,
            NodeData::UserApproval(_) => NodeKind::UserApproval,
            NodeData::SetState(_) => NodeKind::SetState,
            NodeData::Note(_) => NodeKind::Note,
            NodeData::IfElse(_) => NodeKind::IfElse,
            NodeData::While(_) => NodeKind::While,
            NodeData::Start(_) => NodeKind::Start,
            NodeData::End(_) => NodeKind::End,
        }
    }

    /// Build typed configuration from the untyped wire bag
    ///
    /// Never fails. If a modelled key carries a value of the wrong shape the
    /// whole bag is kept verbatim as unmodelled keys.
    pub fn from_wire(kind: NodeKind, bag: Extra) -> Self {
        match Self::parse(kind, &bag) {
            Ok(data) if data.to_wire() == bag => data,
            Ok(_) => {
                log::warn!("Node data for '{}' is not lossless when typed, keeping it raw", kind);
                Self::with_extra(kind, bag)
            }
            Err(e) => {
                log::warn!("Node data for '{}' does not match its schema: {}", kind, e);
                Self::with_extra(kind, bag)
            }
        }
    }

    /// Convert back to the untyped wire bag
    pub fn to_wire(&self) -> Extra {
        match self {
            NodeData::Phase(d) | NodeData::End(d) => object_of(d),
            NodeData::Tool(d) => object_of(d),
            NodeData::Condition(d) => object_of(d),
            NodeData::Guardrail(d) => object_of(d),
            NodeData::Loop(d) | NodeData::While(d) => object_of(d),
            NodeData::Agent(d) => object_of(d),
            NodeData::Mcp(d) => object_of(d),
            NodeData::Transform(d) => object_of(d),
            NodeData::UserApproval(d) => object_of(d),
            NodeData::SetState(d) => object_of(d),
            NodeData::Note(d) => object_of(d),
            NodeData::IfElse(d) => object_of(d),
            NodeData::Start(d) => object_of(d),
        }
    }

    /// Reinterpret this configuration under another kind
    pub fn rekey(&self, kind: NodeKind) -> Self {
        if self.kind() == kind {
            return self.clone();
        }
        Self::from_wire(kind, self.to_wire())
    }

    /// Whether the wire bag is empty
    pub fn is_empty(&self) -> bool {
        self.to_wire().is_empty()
    }

    fn parse(kind: NodeKind, bag: &Extra) -> Result<Self, serde_json::Error> {
        let value = Value::Object(bag.clone());
        Ok(match kind {
            NodeKind::Phase => NodeData::Phase(serde_json::from_value(value)?),
            NodeKind::Tool => NodeData::Tool(serde_json::from_value(value)?),
            NodeKind::Condition => NodeData::Condition(serde_json::from_value(value)?),
            NodeKind::Guardrail => NodeData::Guardrail(serde_json::from_value(value)?),
            NodeKind::Loop => NodeData::Loop(serde_json::from_value(value)?),
            NodeKind::Agent => NodeData::Agent(serde_json::from_value(value)?),
            NodeKind::Mcp => NodeData::Mcp(serde_json::from_value(value)?),
            NodeKind::Transform => NodeData::Transform(serde_json::from_value(value)?),
            NodeKind::UserApproval => NodeData::UserApproval(serde_json::from_value(value)?),
            NodeKind::SetState => NodeData::SetState(serde_json::from_value(value)?),
            NodeKind::Note => NodeData::Note(serde_json::from_value(value)?),
            NodeKind::IfElse => NodeData::IfElse(serde_json::from_value(value)?),
            NodeKind::While => NodeData::While(serde_json::from_value(value)?),
            NodeKind::Start => NodeData::Start(serde_json::from_value(value)?),
            NodeKind::End => NodeData::End(serde_json::from_value(value)?),
        })
    }

    fn with_extra(kind: NodeKind, extra: Extra) -> Self {
        match kind {
            NodeKind::Phase => NodeData::Phase(PlainData { extra }),
            NodeKind::Tool => NodeData::Tool(ToolData { extra, ..Default::default() }),
            NodeKind::Condition => {
                NodeData::Condition(ConditionData { extra, ..Default::default() })
            }
            NodeKind::Guardrail => {
                NodeData::Guardrail(GuardrailData { extra, ..Default::default() })
            }
            NodeKind::Loop => NodeData::Loop(LoopData { extra, ..Default::default() }),
            NodeKind::Agent => NodeData::Agent(AgentData { extra, ..Default::default() }),
            NodeKind::Mcp => NodeData::Mcp(McpData { extra, ..Default::default() }),
            NodeKind::Transform => {
                NodeData::Transform(TransformData { extra, ..Default::default() })
            }
            NodeKind::UserApproval => {
                NodeData::UserApproval(UserApprovalData { extra, ..Default::default() })
            }
            NodeKind::SetState => NodeData::SetState(SetStateData { extra, ..Default::default() }),
            NodeKind::Note => NodeData::Note(NoteData { extra, ..Default::default() }),
            NodeKind::IfElse => NodeData::IfElse(IfElseData { extra, ..Default::default() }),
            NodeKind::While => NodeData::While(LoopData { extra, ..Default::default() }),
            NodeKind::Start => NodeData::Start(StartData { extra, ..Default::default() }),
            NodeKind::End => NodeData::End(PlainData { extra }),
        }
    }
}

fn object_of<T: Serialize>(value: &T) -> Extra {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Extra::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> Extra {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_condition_uses_wire_key() {
        let data = NodeData::from_wire(NodeKind::Condition, bag(json!({"condition": "x > 1"})));
        match &data {
            NodeData::Condition(c) => assert_eq!(c.expression.as_deref(), Some("x > 1")),
            other => panic!("Expected condition data, got {:?}", other),
        }
        assert_eq!(data.to_wire(), bag(json!({"condition": "x > 1"})));
    }

    #[test]
    fn test_unknown_keys_survive() {
        let input = bag(json!({
            "instructions": "Summarise",
            "model": "gpt-4",
            "reasoningEffort": "high"
        }));
        let data = NodeData::from_wire(NodeKind::Agent, input.clone());
        match &data {
            NodeData::Agent(a) => {
                assert_eq!(a.model.as_deref(), Some("gpt-4"));
                assert_eq!(a.extra.get("reasoningEffort"), Some(&json!("high")));
            }
            other => panic!("Expected agent data, got {:?}", other),
        }
        assert_eq!(data.to_wire(), input);
    }

    #[test]
    fn test_wrong_field_type_is_kept_raw() {
        let input = bag(json!({"transformScript": 42}));
        let data = NodeData::from_wire(NodeKind::Transform, input.clone());
        match &data {
            NodeData::Transform(t) => assert!(t.script.is_none()),
            other => panic!("Expected transform data, got {:?}", other),
        }
        assert_eq!(data.to_wire(), input);
    }

    #[test]
    fn test_null_value_is_preserved() {
        let input = bag(json!({"stateKey": "count", "stateValue": null}));
        let data = NodeData::from_wire(NodeKind::SetState, input.clone());
        assert_eq!(data.to_wire(), input);
    }

    #[test]
    fn test_mcp_servers_typed() {
        let input = bag(json!({
            "mcpServers": [{"id": "firecrawl", "url": "https://api.firecrawl.dev", "authType": "api_key"}],
            "mcpAction": "scrape"
        }));
        let data = NodeData::from_wire(NodeKind::Mcp, input.clone());
        match &data {
            NodeData::Mcp(m) => {
                let servers = m.mcp_servers.as_ref().unwrap();
                assert_eq!(servers[0].auth_type.as_deref(), Some("api_key"));
            }
            other => panic!("Expected mcp data, got {:?}", other),
        }
        assert_eq!(data.to_wire(), input);
    }

    #[test]
    fn test_rekey_moves_shared_fields() {
        let data = NodeData::from_wire(NodeKind::While, bag(json!({"condition": "i < 3"})));
        let rekeyed = data.rekey(NodeKind::IfElse);
        assert_eq!(rekeyed.kind(), NodeKind::IfElse);
        match rekeyed {
            NodeData::IfElse(d) => assert_eq!(d.condition.as_deref(), Some("i < 3")),
            other => panic!("Expected if-else data, got {:?}", other),
        }
    }

    #[test]
    fn test_iteration_limit_accepts_text() {
        let input = bag(json!({"maxIterations": "10"}));
        let data = NodeData::from_wire(NodeKind::Loop, input);
        match data {
            NodeData::Loop(l) => {
                assert_eq!(l.max_iterations, Some(IterationLimit::Text("10".to_string())))
            }
            other => panic!("Expected loop data, got {:?}", other),
        }
    }
}
