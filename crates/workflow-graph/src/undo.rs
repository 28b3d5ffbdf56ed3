//! Edit history for the workflow editor
//!
//! Every mutating editor operation records the graph state it is about to
//! replace. Snapshots are stored as zstd-compressed JSON so a long editing
//! session with large graphs stays small in memory.

use std::collections::VecDeque;

use crate::constants::defaults;
use crate::error::{Result, WorkflowError};
use crate::model::GraphModel;

const COMPRESSION_LEVEL: i32 = 3;

/// Undo and redo stacks of compressed graph snapshots
#[derive(Debug)]
pub struct History {
    past: VecDeque<Vec<u8>>,
    future: Vec<Vec<u8>>,
    limit: usize,
}

impl History {
    /// Create a history keeping at most `limit` undo steps
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state an edit is about to replace
    ///
    /// Clears the redo stack. The oldest step is dropped once the limit is hit.
    pub fn record(&mut self, before: &GraphModel) -> Result<()> {
        let snapshot = compress(before)?;
        self.future.clear();
        self.past.push_back(snapshot);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        Ok(())
    }

    /// Step back, returning the graph to restore
    ///
    /// `current` is kept for redo. Returns `Ok(None)` when nothing is recorded.
    pub fn undo(&mut self, current: &GraphModel) -> Result<Option<GraphModel>> {
        let Some(snapshot) = self.past.pop_back() else {
            return Ok(None);
        };
        let restored = decompress(&snapshot)?;
        self.future.push(compress(current)?);
        Ok(Some(restored))
    }

    /// Step forward again after an undo
    pub fn redo(&mut self, current: &GraphModel) -> Result<Option<GraphModel>> {
        let Some(snapshot) = self.future.pop() else {
            return Ok(None);
        };
        let restored = decompress(&snapshot)?;
        self.past.push_back(compress(current)?);
        Ok(Some(restored))
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo steps available
    pub fn depth(&self) -> usize {
        self.past.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Total compressed bytes held across both stacks
    pub fn compressed_size(&self) -> usize {
        self.past.iter().chain(self.future.iter()).map(Vec::len).sum()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(defaults::HISTORY_LIMIT)
    }
}

fn compress(graph: &GraphModel) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(graph)?;
    zstd::encode_all(&json[..], COMPRESSION_LEVEL)
        .map_err(|e| WorkflowError::Compression(e.to_string()))
}

fn decompress(snapshot: &[u8]) -> Result<GraphModel> {
    let json = zstd::decode_all(snapshot).map_err(|e| WorkflowError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    fn graph_with(kinds: &[NodeKind]) -> GraphModel {
        let mut graph = GraphModel::new();
        for kind in kinds {
            graph.add_node(*kind);
        }
        graph
    }

    #[test]
    fn test_undo_then_redo() {
        let mut history = History::new(10);
        let first = graph_with(&[NodeKind::Start]);
        let second = graph_with(&[NodeKind::Start, NodeKind::Agent]);

        history.record(&first).unwrap();
        assert!(history.can_undo());

        let restored = history.undo(&second).unwrap().unwrap();
        assert_eq!(restored, first);
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let redone = history.redo(&restored).unwrap().unwrap();
        assert_eq!(redone, second);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_history_is_noop() {
        let mut history = History::default();
        let graph = GraphModel::new();
        assert!(history.undo(&graph).unwrap().is_none());
        assert!(history.redo(&graph).unwrap().is_none());
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new(10);
        let a = graph_with(&[NodeKind::Start]);
        let b = graph_with(&[NodeKind::Start, NodeKind::End]);

        history.record(&a).unwrap();
        history.undo(&b).unwrap();
        assert!(history.can_redo());

        history.record(&a).unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(3);
        for n in 0..5 {
            let kinds = vec![NodeKind::Phase; n];
            history.record(&graph_with(&kinds)).unwrap();
        }
        assert_eq!(history.depth(), 3);

        let current = graph_with(&[NodeKind::Phase; 5]);
        let restored = history.undo(&current).unwrap().unwrap();
        assert_eq!(restored.len(), 4);
        assert!(history.compressed_size() > 0);
    }
}
