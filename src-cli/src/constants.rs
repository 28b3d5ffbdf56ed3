//! Application-wide constants
//!
//! Defaults for the command line app. Engine constants live in
//! `workflow_graph::constants`.

/// Configuration storage
pub mod paths {
    /// Directory name under the platform config dir
    pub const APP_DIR: &str = "workflow-canvas";
    /// Configuration file inside the app dir
    pub const CONFIG_FILE: &str = "config.json";
}

/// Default values for configuration
pub mod defaults {
    /// Backend the editor publishes to
    pub const BACKEND_URL: &str = "http://127.0.0.1:8000";
}
