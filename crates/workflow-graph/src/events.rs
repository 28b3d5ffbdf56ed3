//! Editor events and the observer list that fans them out
//!
//! The editor store owns an [`EventBus`]. Anything interested in editor
//! activity (a UI shell, an automation panel, a test) subscribes a sink.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::validation::GraphIssue;

/// Subscriber attached to an [`EventBus`]
///
/// `send` runs on the editor's thread; slow subscribers should hand the
/// event off rather than block.
pub trait EventSink: Send + Sync {
    fn send(&self, event: EditorEvent) -> Result<(), EventError>;
}

/// Why a subscriber could not take an event
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The subscriber has gone away and will never accept events again
    #[error("subscriber disconnected")]
    Disconnected,
    /// The subscriber refused this particular event
    #[error("subscriber refused event: {0}")]
    Refused(String),
}

/// Events emitted by the workflow editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// The graph changed; `nodes`/`edges` are the new counts
    GraphChanged { nodes: usize, edges: usize },

    /// A workflow was loaded from a template or file
    #[serde(rename_all = "camelCase")]
    WorkflowLoaded { name: Option<String> },

    /// The backend accepted a publish
    #[serde(rename_all = "camelCase")]
    Published { workflow_id: String },

    /// A run was refused by graph checks
    RunBlocked { issues: Vec<String> },

    /// The automation panel should become visible
    #[serde(rename = "automation:show")]
    AutomationShow,

    /// A new automation session began
    #[serde(rename = "automation:start", rename_all = "camelCase")]
    AutomationStart { session_id: String },
}

impl EditorEvent {
    pub fn run_blocked(issues: &[GraphIssue]) -> Self {
        Self::RunBlocked {
            issues: issues.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Sink that discards everything
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EditorEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Sink that records events in memory
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<EditorEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EditorEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

/// Observer list for editor events
///
/// Delivery is best effort: a failing sink is logged and skipped so the
/// remaining subscribers still see the event.
#[derive(Default, Clone)]
pub struct EventBus {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn emit(&self, event: EditorEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event.clone()) {
                log::warn!("Dropped editor event {:?}: {}", event, e);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sinks.len())
            .finish()
    }
}
