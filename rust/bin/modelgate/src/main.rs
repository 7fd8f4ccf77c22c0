//! `modelgate`: command-line client for schema-driven model servers.
//!
//! Reads the server's model specification and exposes every declared model
//! through generic list/get/create/update/delete commands.

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};

use commands::context::ContextProps;

/// Model gateway CLI.
#[derive(Parser, Debug)]
#[command(name = "modelgate", about = "Schema-driven model CLI client")]
struct Cli {
    /// Path to client config file (default: ~/.modelgate/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Output format.
    #[arg(long = "output", short = 'o', global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage server contexts.
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    Use {
        #[command(subcommand)]
        what: UseWhat,
    },

    /// Show the model hierarchy from the server's specification.
    Models,

    /// List records of a model under one parent.
    List {
        /// Model name (as declared in the specification).
        model: String,
        /// Parent record ID.
        parent_id: String,
    },

    /// Get one record.
    Get {
        model: String,
        id: String,
    },

    /// Create a record under a parent.
    Create {
        model: String,
        parent_id: String,
        /// JSON object of field values.
        #[arg(long = "json")]
        json_body: Option<String>,
        /// Read JSON from file.
        #[arg(short = 'f', long = "file")]
        file: Option<String>,
    },

    /// Update fields of a record.
    Update {
        model: String,
        id: String,
        /// JSON object of field values.
        #[arg(long = "json")]
        json_body: String,
    },

    /// Delete a record.
    Delete {
        model: String,
        id: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create a new context.
    Create {
        name: String,
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        token: Option<String>,
        /// Specification path on the server.
        #[arg(long)]
        spec_path: Option<String>,
    },
    /// List all contexts.
    List,
    /// Set properties on a context.
    Set {
        name: String,
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        spec_path: Option<String>,
    },
    /// Delete a context.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum UseWhat {
    /// Switch to a context.
    Context { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let json_output = cli.output == OutputFormat::Json;

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Create { name, server, token, spec_path } => {
                let props = ContextProps {
                    server: server.as_deref(),
                    token: token.as_deref(),
                    spec_path: spec_path.as_deref(),
                };
                commands::context::create(&name, props, &config_path)?;
            }
            ContextAction::List => {
                commands::context::list(&config_path)?;
            }
            ContextAction::Set { name, server, token, spec_path } => {
                let props = ContextProps {
                    server: server.as_deref(),
                    token: token.as_deref(),
                    spec_path: spec_path.as_deref(),
                };
                commands::context::set(&name, props, &config_path)?;
            }
            ContextAction::Delete { name } => {
                commands::context::delete(&name, &config_path)?;
            }
        },

        Commands::Use { what } => match what {
            UseWhat::Context { name } => {
                commands::context::use_context(&name, &config_path)?;
            }
        },

        Commands::Models => {
            commands::models::show(json_output, &config_path).await?;
        }

        Commands::List { model, parent_id } => {
            commands::resource::list(&model, &parent_id, json_output, &config_path).await?;
        }

        Commands::Get { model, id } => {
            commands::resource::get(&model, &id, json_output, &config_path).await?;
        }

        Commands::Create { model, parent_id, json_body, file } => {
            let body = if let Some(path) = file {
                std::fs::read_to_string(&path)?
            } else if let Some(json) = json_body {
                json
            } else {
                anyhow::bail!("Provide --json or -f <file>.");
            };
            commands::resource::create(&model, &parent_id, &body, &config_path).await?;
        }

        Commands::Update { model, id, json_body } => {
            commands::resource::update(&model, &id, &json_body, &config_path).await?;
        }

        Commands::Delete { model, id, yes } => {
            if !yes {
                eprint!("Are you sure? [y/N]: ");
                let mut s = String::new();
                std::io::stdin().read_line(&mut s)?;
                if !s.trim().eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            commands::resource::delete(&model, &id, &config_path).await?;
        }

        Commands::Version => {
            println!("modelgate cli v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
