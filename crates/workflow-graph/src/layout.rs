//! Layout engine
//!
//! Converts between screen and world coordinates under pan/zoom and
//! computes default placements for nodes.
//!
//! World coordinates are what the graph model stores; screen coordinates
//! are pixels inside the rendered canvas. The mapping is
//! `screen = world * zoom + pan`.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::constants::{auto_layout, grid, placement, zoom};
use crate::types::{Edge, Node, NodeId, NodeKind, Position};

/// Deterministic 4-column grid slot for the node at `index`
pub fn grid_slot(index: usize) -> Position {
    let col = index % placement::COLUMNS;
    let row = index / placement::COLUMNS;
    Position::new(
        placement::ORIGIN_X + col as f64 * placement::CELL_WIDTH,
        placement::ORIGIN_Y + row as f64 * placement::CELL_HEIGHT,
    )
}

/// Round a world coordinate to the nearest grid unit
pub fn snap(value: f64) -> f64 {
    (value / grid::UNIT).round() * grid::UNIT
}

/// Round both components of a world point to the grid
pub fn snap_position(position: Position) -> Position {
    Position::new(snap(position.x), snap(position.y))
}

/// Clamp a zoom factor into the canonical range
pub fn clamp_zoom(value: f64) -> f64 {
    if value.is_nan() {
        return 1.0;
    }
    value.clamp(zoom::MIN, zoom::MAX)
}

/// Bounding rectangle of the canvas element, in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Translate a page point into canvas-local screen space
    pub fn to_local(&self, page: Position) -> Position {
        Position::new(page.x - self.left, page.y - self.top)
    }

    pub fn center(&self) -> Position {
        Position::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Ephemeral canvas viewport state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    zoom: f64,
    pub pan: Position,
    pub snap_to_grid: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Position::default(),
            snap_to_grid: false,
        }
    }
}

impl Viewport {
    pub fn new(zoom: f64, pan: Position) -> Self {
        Self {
            zoom: clamp_zoom(zoom),
            pan,
            snap_to_grid: false,
        }
    }

    pub fn with_snap_to_grid(mut self, snap_to_grid: bool) -> Self {
        self.snap_to_grid = snap_to_grid;
        self
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom factor, clamped to `[0.25, 3]`
    pub fn set_zoom(&mut self, value: f64) -> f64 {
        self.zoom = clamp_zoom(value);
        self.zoom
    }

    /// Multiply the zoom factor, clamped to `[0.25, 3]`
    pub fn zoom_by(&mut self, factor: f64) -> f64 {
        self.set_zoom(self.zoom * factor)
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom_by(zoom::STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom_by(1.0 / zoom::STEP)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan.offset(dx, dy);
    }

    /// `world = (screen - pan) / zoom`
    pub fn screen_to_world(&self, screen: Position) -> Position {
        Position::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// `screen = world * zoom + pan`
    pub fn world_to_screen(&self, world: Position) -> Position {
        Position::new(
            world.x * self.zoom + self.pan.x,
            world.y * self.zoom + self.pan.y,
        )
    }

    /// World position for a node dropped at a page point
    ///
    /// The point is made canvas-local, unprojected, then snapped when
    /// snap-to-grid is on.
    pub fn drop_position(&self, page: Position, canvas: &CanvasRect) -> Position {
        let world = self.screen_to_world(canvas.to_local(page));
        if self.snap_to_grid {
            snap_position(world)
        } else {
            world
        }
    }

    /// Pan so the bounding box of `positions` sits in the canvas center
    ///
    /// Resets zoom to 1. An empty map resets pan to the origin.
    pub fn center_on<'a>(
        &mut self,
        positions: impl IntoIterator<Item = &'a Position>,
        canvas: &CanvasRect,
    ) {
        self.zoom = 1.0;
        let Some(bounds) = Bounds::of(positions) else {
            self.pan = Position::default();
            return;
        };
        let content = bounds.center();
        let view = canvas.center();
        self.pan = Position::new(view.x - content.x, view.y - content.y);
    }
}

/// Axis-aligned bounding box of a set of positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn of<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(
            Bounds {
                min: first,
                max: first,
            },
            |b, p| Bounds {
                min: Position::new(b.min.x.min(p.x), b.min.y.min(p.y)),
                max: Position::new(b.max.x.max(p.x), b.max.y.max(p.y)),
            },
        ))
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }
}

/// Auto-layout flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategy {
    /// Start column, tiled middle, end column; ignores edges
    #[default]
    Tiered,
    /// Columns by longest-path depth over valid edges
    Layered,
}

/// Compute fresh positions for every node
pub fn auto_layout(
    nodes: &[Node],
    edges: &[Edge],
    strategy: LayoutStrategy,
) -> HashMap<NodeId, Position> {
    match strategy {
        LayoutStrategy::Tiered => tiered_layout(nodes),
        LayoutStrategy::Layered => layered_layout(nodes, edges),
    }
}

fn column_x(column: usize) -> f64 {
    auto_layout::ORIGIN_X + column as f64 * auto_layout::COLUMN_SPACING
}

fn row_y(row: usize) -> f64 {
    auto_layout::ORIGIN_Y + row as f64 * auto_layout::ROW_SPACING
}

/// Three-tier placement
///
/// `start` nodes stack in column 0, other nodes tile rows of four from
/// column 1, `end` nodes stack one column past the last used middle column.
pub fn tiered_layout(nodes: &[Node]) -> HashMap<NodeId, Position> {
    let mut positions = HashMap::with_capacity(nodes.len());
    let (starts, rest): (Vec<&Node>, Vec<&Node>) =
        nodes.iter().partition(|n| n.kind() == NodeKind::Start);
    let (ends, others): (Vec<&Node>, Vec<&Node>) =
        rest.into_iter().partition(|n| n.kind() == NodeKind::End);

    for (row, node) in starts.iter().enumerate() {
        positions.insert(node.id.clone(), Position::new(column_x(0), row_y(row)));
    }

    for (index, node) in others.iter().enumerate() {
        let col = index % auto_layout::COLUMNS;
        let row = index / auto_layout::COLUMNS;
        positions.insert(node.id.clone(), Position::new(column_x(col + 1), row_y(row)));
    }

    let used_columns = others.len().min(auto_layout::COLUMNS);
    let end_column = used_columns + 1;
    for (row, node) in ends.iter().enumerate() {
        positions.insert(node.id.clone(), Position::new(column_x(end_column), row_y(row)));
    }

    positions
}

/// Longest-path layering
///
/// Edges with a missing endpoint are ignored. Nodes that never reach
/// in-degree zero (cycle members and their descendants) share a trailing
/// column.
pub fn layered_layout(nodes: &[Node], edges: &[Edge]) -> HashMap<NodeId, Position> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut in_degree: HashMap<&str, usize> = ids.iter().map(|id| (*id, 0)).collect();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for edge in edges {
        if ids.contains(edge.from.as_str()) && ids.contains(edge.to.as_str()) {
            adjacency
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
            if let Some(deg) = in_degree.get_mut(edge.to.as_str()) {
                *deg += 1;
            }
        }
    }

    // Seed in node order so the result is deterministic
    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();
    let mut depth: HashMap<&str, usize> = queue.iter().map(|id| (*id, 0)).collect();

    while let Some(id) = queue.pop_front() {
        let current = depth.get(id).copied().unwrap_or(0);
        for &next in adjacency.get(id).into_iter().flatten() {
            let entry = depth.entry(next).or_insert(0);
            *entry = (*entry).max(current + 1);
            if let Some(deg) = in_degree.get_mut(next) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    let resolved_max = nodes
        .iter()
        .filter(|n| in_degree.get(n.id.as_str()) == Some(&0))
        .filter_map(|n| depth.get(n.id.as_str()))
        .max()
        .copied();
    let trailing = resolved_max.map_or(0, |d| d + 1);

    let mut rows_per_column: HashMap<usize, usize> = HashMap::new();
    let mut positions = HashMap::with_capacity(nodes.len());
    for node in nodes {
        let id = node.id.as_str();
        let column = if in_degree.get(id) == Some(&0) {
            depth.get(id).copied().unwrap_or(0)
        } else {
            trailing
        };
        let row = rows_per_column.entry(column).or_insert(0);
        positions.insert(node.id.clone(), Position::new(column_x(column), row_y(*row)));
        *row += 1;
    }
    positions
}
