//! Error types for the workflow graph engine

use thiserror::Error;

use crate::validation::GraphIssue;

/// Result type alias using WorkflowError
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur at the engine's boundaries
///
/// Graph mutations never fail; only import, file IO and backend calls do.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Incoming workflow description could not be applied
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error (undo snapshots)
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend URL could not be turned into a request URL
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// Run was refused because the graph has structural issues
    #[error("Run blocked by {} graph issue(s)", .0.len())]
    RunBlocked(Vec<GraphIssue>),
}

impl WorkflowError {
    /// Create a backend error from a status code and response body
    pub fn backend(status: u16, body: impl Into<String>) -> Self {
        Self::Backend {
            status,
            body: body.into(),
        }
    }
}

/// Reasons an import (DSL, file or template) is rejected
#[derive(Debug, Error)]
pub enum ImportError {
    /// The payload is not valid JSON
    #[error("Invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The payload is valid JSON but not an object
    #[error("Workflow description must be a JSON object")]
    NotAnObject,

    /// `nodes` is missing or not an array
    #[error("Workflow description has no `nodes` array")]
    NodesNotArray,

    /// A node declares a type outside the known set
    #[error("Node at index {index} has unknown type '{node_type}'")]
    UnknownNodeType { index: usize, node_type: String },

    /// A phase item on a node is not an object of the expected shape
    #[error("Item {item} on node '{node_id}' is malformed: {reason}")]
    InvalidItem {
        node_id: String,
        item: usize,
        reason: String,
    },

    /// No template with the requested id exists
    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),
}
