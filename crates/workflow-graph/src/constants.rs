//! Engine-wide constants
//!
//! Single source of truth for the canvas geometry used by the model,
//! the layout engine and the editor.

/// Snap-to-grid configuration
pub mod grid {
    /// Grid unit, in world pixels
    pub const UNIT: f64 = 20.0;
}

/// Viewport zoom limits
pub mod zoom {
    pub const MIN: f64 = 0.25;
    pub const MAX: f64 = 3.0;
    /// Factor applied by a single zoom-in/zoom-out step
    pub const STEP: f64 = 1.1;
}

/// Placement of nodes added interactively (and the fallback for missing positions)
pub mod placement {
    pub const COLUMNS: usize = 4;
    pub const CELL_WIDTH: f64 = 320.0;
    pub const CELL_HEIGHT: f64 = 260.0;
    pub const ORIGIN_X: f64 = 40.0;
    pub const ORIGIN_Y: f64 = 40.0;
    /// Offset of a duplicate from its source
    pub const DUPLICATE_OFFSET: f64 = 40.0;
    /// Duplicate position when the source has none
    pub const DUPLICATE_DEFAULT: f64 = 100.0;
}

/// Auto-layout spacing
pub mod auto_layout {
    pub const COLUMNS: usize = 4;
    pub const ORIGIN_X: f64 = 100.0;
    pub const ORIGIN_Y: f64 = 100.0;
    pub const COLUMN_SPACING: f64 = 350.0;
    pub const ROW_SPACING: f64 = 200.0;
}

/// Backend API paths
pub mod api {
    pub const PUBLISH: &str = "/api/workflows/publish";
    pub const EXECUTE: &str = "/api/workflows/execute";
    pub const EXECUTIONS: &str = "/api/workflows/executions";
}

/// Editor defaults
pub mod defaults {
    pub const WORKFLOW_NAME: &str = "Untitled Workflow";
    pub const EXPORT_FILE_NAME: &str = "workflow.json";
    pub const HISTORY_LIMIT: usize = 100;
}
