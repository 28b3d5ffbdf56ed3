//! Workflow editor store
//!
//! [`WorkflowEditor`] owns one graph, its viewport, the edit history and an
//! observer list. Every graph mutation goes through here so undo and change
//! notifications stay consistent; the engine modules underneath stay pure.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::{BackendClient, Execution};
use crate::constants::defaults;
use crate::dsl::{self, Phase, WorkflowDsl};
use crate::error::{Result, WorkflowError};
use crate::events::{EditorEvent, EventBus, EventSink};
use crate::layout::{auto_layout, snap_position, CanvasRect, LayoutStrategy, Viewport};
use crate::model::{GraphModel, NodeUpdate};
use crate::templates::TemplateCatalog;
use crate::types::{Node, NodeId, NodeKind, Position};
use crate::undo::History;
use crate::validation::{clean_edges, lint_nodes, validate, GraphIssue, LintWarning};

/// Editor preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    pub snap_to_grid: bool,
    pub history_limit: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            snap_to_grid: false,
            history_limit: defaults::HISTORY_LIMIT,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub workflow_id: String,
    pub session_id: String,
}

/// Stateful editor over a single workflow graph
#[derive(Debug)]
pub struct WorkflowEditor {
    name: String,
    graph: GraphModel,
    phases: Vec<Phase>,
    viewport: Viewport,
    history: History,
    events: EventBus,
    published_id: Option<String>,
}

impl Default for WorkflowEditor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl WorkflowEditor {
    pub fn new(options: EditorOptions) -> Self {
        Self {
            name: defaults::WORKFLOW_NAME.to_string(),
            graph: GraphModel::new(),
            phases: Vec::new(),
            viewport: Viewport::default().with_snap_to_grid(options.snap_to_grid),
            history: History::new(options.history_limit),
            events: EventBus::new(),
            published_id: None,
        }
    }

    /// Start from an existing graph
    pub fn with_graph(mut self, graph: GraphModel) -> Self {
        self.graph = graph;
        self
    }

    pub fn subscribe(&mut self, sink: Arc<dyn EventSink>) {
        self.events.subscribe(sink);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Backend ID from the last successful publish
    pub fn published_id(&self) -> Option<&str> {
        self.published_id.as_deref()
    }

    /// Phase list compiled when the graph itself is empty
    pub fn set_phases(&mut self, phases: Vec<Phase>) {
        self.phases = phases;
    }

    pub fn set_snap_to_grid(&mut self, enabled: bool) {
        self.viewport.snap_to_grid = enabled;
    }

    /// Apply a mutation, recording history and notifying only on change
    fn edit<R>(&mut self, mutate: impl FnOnce(&mut GraphModel) -> R) -> R {
        let before = self.graph.clone();
        let result = mutate(&mut self.graph);
        if self.graph != before {
            self.commit(&before);
        }
        result
    }

    fn commit(&mut self, before: &GraphModel) {
        if let Err(e) = self.history.record(before) {
            log::warn!("Failed to record undo step: {}", e);
        }
        self.published_id = None;
        self.notify_changed();
    }

    /// Swap in a snapshot from history; it no longer matches what was published
    fn restore(&mut self, graph: GraphModel) {
        self.graph = graph;
        self.published_id = None;
        self.notify_changed();
    }

    fn notify_changed(&self) {
        self.events.emit(EditorEvent::GraphChanged {
            nodes: self.graph.len(),
            edges: self.graph.edges().len(),
        });
    }

    // ---- graph edits ----

    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.edit(|graph| graph.add_node(kind))
    }

    /// Add a node where it was dropped on the canvas
    pub fn drop_node(&mut self, kind: NodeKind, page: Position, canvas: &CanvasRect) -> NodeId {
        let position = self.viewport.drop_position(page, canvas);
        self.edit(|graph| graph.insert_node(Node::new("", kind), Some(position)))
    }

    pub fn duplicate(&mut self, id: &str) -> Option<NodeId> {
        self.edit(|graph| graph.duplicate_node(id))
    }

    pub fn delete(&mut self, id: &str) -> Option<Node> {
        self.edit(|graph| graph.delete_node(id))
    }

    pub fn connect(&mut self, from: &str, to: &str) -> bool {
        self.edit(|graph| graph.connect(from, to))
    }

    pub fn remove_edge(&mut self, index: usize) -> bool {
        self.edit(|graph| graph.remove_edge(index)).is_some()
    }

    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> bool {
        self.edit(|graph| graph.update_node(id, update))
    }

    /// Move a node, snapping to the grid when enabled
    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        let position = if self.viewport.snap_to_grid {
            snap_position(position)
        } else {
            position
        };
        self.edit(|graph| graph.set_position(id, position))
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.graph.select(id);
    }

    /// Drop orphaned and duplicate edges
    pub fn clean_edges(&mut self) -> usize {
        self.edit(|graph| {
            let cleaned = clean_edges(graph.nodes(), graph.edges());
            let removed = graph.edges().len() - cleaned.len();
            graph.replace_edges(cleaned);
            removed
        })
    }

    pub fn auto_layout(&mut self, strategy: LayoutStrategy) {
        self.edit(|graph| {
            let positions = auto_layout(graph.nodes(), graph.edges(), strategy);
            graph.set_positions(positions);
        });
    }

    // ---- viewport ----

    pub fn zoom_by(&mut self, factor: f64) -> f64 {
        self.viewport.zoom_by(factor)
    }

    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.viewport.set_zoom(zoom)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.pan_by(dx, dy);
    }

    /// Fit the graph into the canvas at zoom 1
    pub fn center(&mut self, canvas: &CanvasRect) {
        self.viewport.center_on(self.graph.positions().values(), canvas);
    }

    // ---- history ----

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Returns false when there is nothing to undo
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo(&self.graph)? {
            Some(graph) => {
                self.restore(graph);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo(&self.graph)? {
            Some(graph) => {
                self.restore(graph);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ---- analysis and compile ----

    pub fn validate(&self) -> Vec<GraphIssue> {
        validate(self.graph.nodes(), self.graph.edges())
    }

    pub fn lint(&self) -> Vec<LintWarning> {
        lint_nodes(self.graph.nodes())
    }

    pub fn compile(&self) -> WorkflowDsl {
        dsl::compile_or_phases(&self.graph, &self.phases, &self.name)
    }

    // ---- import / export ----

    fn replace_graph(&mut self, graph: GraphModel, name: Option<String>) {
        let before = std::mem::replace(&mut self.graph, graph);
        if let Some(name) = name {
            self.name = name;
        }
        self.commit(&before);
        self.events.emit(EditorEvent::WorkflowLoaded {
            name: Some(self.name.clone()),
        });
    }

    /// Replace the graph with an imported DSL document
    ///
    /// On error the current graph is left untouched.
    pub fn import_dsl(&mut self, value: &Value) -> Result<()> {
        let imported = dsl::import_value(value)?;
        self.replace_graph(imported.graph, imported.name);
        Ok(())
    }

    pub fn import_json(&mut self, text: &str) -> Result<()> {
        let imported = dsl::parse(text)?;
        self.replace_graph(imported.graph, imported.name);
        Ok(())
    }

    pub async fn import_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let imported = dsl::read_file(path).await?;
        self.replace_graph(imported.graph, imported.name);
        Ok(())
    }

    pub async fn export_file(&self, path: impl AsRef<Path>) -> Result<()> {
        dsl::write_file(&self.compile(), path).await
    }

    /// Replace the graph with a catalog template
    pub fn load_template(&mut self, catalog: &TemplateCatalog, id: &str) -> Result<()> {
        let (template, graph) = catalog.load(id)?;
        let name = template.name.clone();
        self.replace_graph(graph, Some(name));
        Ok(())
    }

    // ---- backend ----

    pub async fn publish(&mut self, client: &BackendClient) -> Result<String> {
        let workflow_id = client.publish(&self.compile(), &self.name).await?;
        self.published_id = Some(workflow_id.clone());
        self.events.emit(EditorEvent::Published {
            workflow_id: workflow_id.clone(),
        });
        Ok(workflow_id)
    }

    /// Check, publish, then announce a new automation session
    ///
    /// Any graph issue blocks the run before anything is sent.
    pub async fn run(&mut self, client: &BackendClient) -> Result<RunOutcome> {
        let issues = self.validate();
        if !issues.is_empty() {
            log::warn!("Run blocked by {} issue(s)", issues.len());
            self.events.emit(EditorEvent::run_blocked(&issues));
            return Err(WorkflowError::RunBlocked(issues));
        }

        let workflow_id = self.publish(client).await?;
        let session_id = uuid::Uuid::new_v4().to_string();
        self.events.emit(EditorEvent::AutomationShow);
        self.events.emit(EditorEvent::AutomationStart {
            session_id: session_id.clone(),
        });
        log::info!("Automation session {} started for {}", session_id, workflow_id);
        Ok(RunOutcome {
            workflow_id,
            session_id,
        })
    }

    /// Execute the last published workflow
    pub async fn execute(
        &self,
        client: &BackendClient,
        input_variables: &Map<String, Value>,
    ) -> Result<Option<Execution>> {
        match &self.published_id {
            Some(id) => Ok(Some(client.execute(id, input_variables).await?)),
            None => {
                log::warn!("Execute requested before publish");
                Ok(None)
            }
        }
    }
}
