//! Command implementations
//!
//! Each command loads what it needs, drives the engine and prints a JSON or
//! line-oriented result to stdout. Diagnostics go through the logger.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use workflow_graph::events::{EventError, EventSink};
use workflow_graph::layout::auto_layout;
use workflow_graph::{
    dsl, BackendClient, EditorEvent, GraphModel, LayoutStrategy, TemplateCatalog, WorkflowEditor,
    WorkflowError,
};

use crate::config::{AppConfig, ConfigError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("Invalid input variable '{0}', expected key=value")]
    InvalidInput(String),
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;

/// Forwards editor events to the log
struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        match &event {
            EditorEvent::AutomationStart { session_id } => {
                log::info!("Automation session {} started", session_id)
            }
            other => log::debug!("Editor event: {:?}", other),
        }
        Ok(())
    }
}

fn print_json(value: &impl serde::Serialize) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(WorkflowError::from)?;
    println!("{}", text);
    Ok(())
}

async fn load_graph(path: &Path) -> CliResult<(Option<String>, GraphModel)> {
    let imported = dsl::read_file(path).await?;
    Ok((imported.name, imported.graph))
}

fn client_for(config: &AppConfig) -> CliResult<BackendClient> {
    Ok(BackendClient::with_timeout(
        &config.backend_url,
        config.request_timeout(),
    )?)
}

async fn editor_for(path: &Path, config: &AppConfig) -> CliResult<WorkflowEditor> {
    let mut editor = WorkflowEditor::new(config.editor.clone());
    editor.subscribe(Arc::new(LogEventSink));
    editor.import_file(path).await?;
    Ok(editor)
}

/// Print structural issues; returns whether the graph is runnable
pub async fn validate(path: &Path) -> CliResult<bool> {
    let (_, graph) = load_graph(path).await?;
    let issues = workflow_graph::validation::validate(graph.nodes(), graph.edges());
    if issues.is_empty() {
        println!("ok: {} node(s), {} edge(s)", graph.len(), graph.edges().len());
    }
    for issue in &issues {
        println!("{}: {}", issue.code(), issue);
    }
    Ok(issues.is_empty())
}

/// Print node configuration warnings
pub async fn lint(path: &Path) -> CliResult<usize> {
    let (_, graph) = load_graph(path).await?;
    let warnings = workflow_graph::validation::lint_nodes(graph.nodes());
    for warning in &warnings {
        println!("warning: {}", warning);
    }
    Ok(warnings.len())
}

/// Re-export a workflow file in normalised form
pub async fn compile(path: &Path, out: Option<&Path>, name: Option<&str>) -> CliResult<()> {
    let (imported_name, graph) = load_graph(path).await?;
    let name = name
        .map(str::to_string)
        .or(imported_name)
        .unwrap_or_else(|| workflow_graph::constants::defaults::WORKFLOW_NAME.to_string());
    let compiled = dsl::compile(&graph, &name);
    match out {
        Some(out) => dsl::write_file(&compiled, out).await?,
        None => print_json(&compiled)?,
    }
    Ok(())
}

/// Print auto-layout positions in node order
pub async fn layout(path: &Path, strategy: LayoutStrategy) -> CliResult<()> {
    let (_, graph) = load_graph(path).await?;
    let positions = auto_layout(graph.nodes(), graph.edges(), strategy);
    let rows: Vec<Value> = graph
        .nodes()
        .iter()
        .filter_map(|node| {
            positions
                .get(&node.id)
                .map(|p| json!({"id": node.id, "x": p.x, "y": p.y}))
        })
        .collect();
    print_json(&rows)
}

pub fn templates_list(category: Option<&str>, tag: Option<&str>) -> CliResult<()> {
    let catalog = TemplateCatalog::builtin()?;
    let templates = match (category, tag) {
        (Some(category), _) => catalog.by_category(category),
        (None, Some(tag)) => catalog.by_tag(tag),
        (None, None) => catalog.all().iter().collect(),
    };
    for template in templates {
        println!(
            "{:<24} {:<18} {}",
            template.id, template.category, template.name
        );
    }
    Ok(())
}

/// Write a template as a workflow description
pub async fn templates_export(id: &str, out: Option<&Path>) -> CliResult<()> {
    let catalog = TemplateCatalog::builtin()?;
    let (template, graph) = catalog.load(id).map_err(WorkflowError::from)?;
    let compiled = dsl::compile(&graph, &template.name);
    match out {
        Some(out) => dsl::write_file(&compiled, out).await?,
        None => print_json(&compiled)?,
    }
    Ok(())
}

pub async fn publish(path: &Path, config: &AppConfig) -> CliResult<()> {
    let client = client_for(config)?;
    let mut editor = editor_for(path, config).await?;
    let workflow_id = editor.publish(&client).await?;
    println!("{}", workflow_id);
    Ok(())
}

/// Validate, publish and start an automation session
pub async fn run(path: &Path, config: &AppConfig) -> CliResult<()> {
    let client = client_for(config)?;
    let mut editor = editor_for(path, config).await?;
    let outcome = editor.run(&client).await?;
    print_json(&json!({
        "workflowId": outcome.workflow_id,
        "sessionId": outcome.session_id,
    }))
}

pub async fn execute(workflow_id: &str, inputs: &[String], config: &AppConfig) -> CliResult<()> {
    let variables = parse_inputs(inputs)?;
    let execution = client_for(config)?.execute(workflow_id, &variables).await?;
    print_json(&execution)
}

pub async fn status(execution_id: &str, config: &AppConfig) -> CliResult<()> {
    let execution = client_for(config)?.execution_status(execution_id).await?;
    print_json(&execution)
}

pub fn config_show(config: &AppConfig) -> CliResult<()> {
    print_json(config)
}

pub async fn config_set_backend(url: &str, config_dir: &Path) -> CliResult<()> {
    let mut config = AppConfig::load(config_dir).await?;
    config.backend_url = url.trim_end_matches('/').to_string();
    config.save(config_dir).await?;
    println!("backend: {}", config.backend_url);
    Ok(())
}

/// Default export target for a workflow name
pub fn export_path(config: &AppConfig, dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_default().join(&config.export_file_name)
}

/// Parse `key=value` pairs; values that parse as JSON keep their type
pub fn parse_inputs(inputs: &[String]) -> CliResult<Map<String, Value>> {
    let mut variables = Map::new();
    for input in inputs {
        let (key, raw) = input
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| CliError::InvalidInput(input.clone()))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        variables.insert(key.to_string(), value);
    }
    Ok(variables)
}
