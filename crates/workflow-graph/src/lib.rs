//! Workflow Graph - the engine behind the visual workflow canvas
//!
//! This crate holds an editable directed graph of typed workflow nodes and
//! everything needed to work with it:
//!
//! - `GraphModel`: nodes, edges and per-node positions with total mutations
//! - `layout`: screen/world transforms, grid snapping and auto-layout
//! - `validation`: orphaned/duplicate edges, isolated nodes, cycles, lint
//! - `dsl`: compile to and import from the portable workflow description
//! - `templates`: the built-in template catalog and its adapter
//!
//! On top sits `WorkflowEditor`, a store that adds undo/redo, an event
//! observer list and the publish/run flow against the backend.
//!
//! # Example
//!
//! ```
//! use workflow_graph::{GraphModel, NodeKind, validation};
//!
//! let mut graph = GraphModel::new();
//! let start = graph.add_node(NodeKind::Start);
//! let agent = graph.add_node(NodeKind::Agent);
//! graph.connect(&start, &agent);
//!
//! assert!(validation::validate(graph.nodes(), graph.edges()).is_empty());
//! let dsl = workflow_graph::dsl::compile(&graph, "demo");
//! assert_eq!(dsl.nodes.len(), 2);
//! ```

pub mod builder;
pub mod client;
pub mod constants;
pub mod data;
pub mod dsl;
pub mod editor;
pub mod error;
pub mod events;
pub mod layout;
pub mod model;
pub mod templates;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use client::{BackendClient, Execution, ExecutionStatus};
pub use data::NodeData;
pub use dsl::{Phase, WorkflowDsl};
pub use editor::{EditorOptions, RunOutcome, WorkflowEditor};
pub use error::{ImportError, Result, WorkflowError};
pub use events::{EditorEvent, EventSink};
pub use layout::{LayoutStrategy, Viewport};
pub use model::{GraphModel, NodeUpdate};
pub use templates::{TemplateCatalog, WorkflowTemplate};
pub use types::{Edge, ItemStatus, Node, NodeId, NodeKind, PhaseItem, Position};
pub use undo::History;
pub use validation::{GraphIssue, LintWarning};
