mod commands;
mod config;
mod constants;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use workflow_graph::LayoutStrategy;

use commands::CliResult;
use config::{AppConfig, ConfigError};

/// Build, check and publish workflow graphs from the command line
#[derive(Parser, Debug)]
#[command(name = "workflow-canvas", version, about, long_about = None)]
struct Cli {
    /// Directory holding config.json (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the structural checks that gate a run
    Validate { file: PathBuf },
    /// Report incomplete node configuration
    Lint { file: PathBuf },
    /// Import a workflow file and write it back out in normalised form
    Compile {
        file: PathBuf,
        /// Output path (stdout when omitted)
        #[arg(short, long, conflicts_with = "save")]
        out: Option<PathBuf>,
        /// Write to the configured export file name in the current directory
        #[arg(long)]
        save: bool,
        /// Override the workflow name
        #[arg(long)]
        name: Option<String>,
    },
    /// Print auto-layout positions
    Layout {
        file: PathBuf,
        /// Use edge-aware layered placement
        #[arg(long)]
        layered: bool,
    },
    /// Browse and export the built-in templates
    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },
    /// Publish a workflow to the backend
    Publish { file: PathBuf },
    /// Validate, publish and start an automation session
    Run { file: PathBuf },
    /// Execute a published workflow
    Execute {
        workflow_id: String,
        /// Input variable as key=value (repeatable)
        #[arg(short, long = "input")]
        inputs: Vec<String>,
    },
    /// Show the state of an execution
    Status { execution_id: String },
    /// Inspect or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TemplatesCommand {
    /// List templates, optionally filtered
    List {
        #[arg(long, conflicts_with = "tag")]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Export a template as a workflow file
    Export {
        id: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Set the backend base URL
    SetBackend { url: String },
}

fn resolve_config_dir(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    explicit
        .or_else(AppConfig::default_dir)
        .ok_or(ConfigError::NoConfigDir)
}

async fn dispatch(command: Command, config_dir: &Path) -> CliResult<ExitCode> {
    let config = AppConfig::load(config_dir).await?;

    match command {
        Command::Validate { file } => {
            if !commands::validate(&file).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Lint { file } => {
            commands::lint(&file).await?;
        }
        Command::Compile {
            file,
            out,
            save,
            name,
        } => {
            let out = if save {
                Some(commands::export_path(&config, None))
            } else {
                out
            };
            commands::compile(&file, out.as_deref(), name.as_deref()).await?;
        }
        Command::Layout { file, layered } => {
            let strategy = if layered {
                LayoutStrategy::Layered
            } else {
                LayoutStrategy::Tiered
            };
            commands::layout(&file, strategy).await?;
        }
        Command::Templates { command } => match command {
            TemplatesCommand::List { category, tag } => {
                commands::templates_list(category.as_deref(), tag.as_deref())?
            }
            TemplatesCommand::Export { id, out } => {
                commands::templates_export(&id, out.as_deref()).await?
            }
        },
        Command::Publish { file } => commands::publish(&file, &config).await?,
        Command::Run { file } => commands::run(&file, &config).await?,
        Command::Execute {
            workflow_id,
            inputs,
        } => commands::execute(&workflow_id, &inputs, &config).await?,
        Command::Status { execution_id } => commands::status(&execution_id, &config).await?,
        Command::Config { command } => match command {
            ConfigCommand::Show => commands::config_show(&config)?,
            ConfigCommand::SetBackend { url } => {
                commands::config_set_backend(&url, config_dir).await?
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config_dir = match resolve_config_dir(cli.config_dir) {
        Ok(dir) => dir,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match dispatch(cli.command, &config_dir).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_execute_inputs() {
        let cli = Cli::parse_from([
            "workflow-canvas",
            "execute",
            "wf-1",
            "--input",
            "url=https://example.com",
            "-i",
            "limit=3",
        ]);
        match cli.command {
            Command::Execute {
                workflow_id,
                inputs,
            } => {
                assert_eq!(workflow_id, "wf-1");
                assert_eq!(inputs.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_config_dir_wins() {
        let dir = resolve_config_dir(Some(PathBuf::from("/tmp/wc"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/wc"));
    }
}
