//! kubeprov - provenance graph of Kubernetes resources
//!
//! Polls the cluster, rebuilds the ownership tree of every resource kind
//! declared in the composition schema, and answers queries about it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kubeprov::cli::{self, ConfigSubcommand};
use kubeprov::config::{Config, ConfigLoader};
use kubeprov::registry::{EtcdKeysClient, KeyValueStore};
use kubeprov::services::ProvenanceSession;

/// kubeprov - provenance graph of Kubernetes resources
#[derive(Parser, Debug)]
#[command(name = "kubeprov")]
#[command(about = "Discovers Kubernetes ownership trees and serves them as a queryable provenance graph", long_about = None)]
struct Args {
    /// Enable debug logging to a temporary file
    #[arg(long, short = 'd')]
    debug: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Keep refreshing in the background and answer commands from stdin
    Watch,
    /// Refresh once and print the composition of a resource as JSON
    Query {
        /// Kind, singular or plural, any case
        kind: String,
        /// Resource name, or * for every instance of the kind
        name: String,
    },
    /// Refresh once and print every stored composition
    Dump,
    /// Load the composition schema once and print it as YAML
    Schema,
    /// Print the OpenAPI specification registered for a custom kind
    Openapi {
        kind: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(log_path) = cli::init_logging(args.debug) {
        eprintln!("Debug log: {}", log_path.display());
    }

    let config_path = args.config.as_deref();
    match args.command {
        Command::Config { subcommand } => cli::handle_config_command(subcommand, config_path)?,
        Command::Version => cli::display_version(),
        Command::Watch => {
            let session = connect(config_path).await?;
            let refresh = session.spawn_refresh();
            let result = cli::run_interactive(&session).await;
            refresh.abort();
            result?;
        }
        Command::Query { kind, name } => {
            let session = connect(config_path).await?;
            session.refresh_once().await;
            println!("{}", session.query(&kind, &name)?);
        }
        Command::Dump => {
            let session = connect(config_path).await?;
            session.refresh_once().await;
            print!("{}", session.dump());
        }
        Command::Schema => {
            let config = ConfigLoader::validate(config_path)?;
            print_schema(&config).await?;
        }
        Command::Openapi { kind } => {
            let session = connect(config_path).await?;
            println!("{}", session.openapi_spec(&kind).await?);
        }
    }

    Ok(())
}

async fn connect(config_path: Option<&Path>) -> Result<ProvenanceSession> {
    let config = ConfigLoader::validate(config_path)?;
    tracing::debug!("Configuration: {:?}", config);
    ProvenanceSession::connect(&config).await
}

/// Load the schema without touching the cluster
async fn print_schema(config: &Config) -> Result<()> {
    let key_value: Arc<dyn KeyValueStore> = Arc::new(
        EtcdKeysClient::new(&config.registry_url)
            .context("Failed to create operator registry client")?,
    );
    let registry = ProvenanceSession::registry_for(config, key_value);
    registry
        .load()
        .await
        .with_context(|| format!("Failed to load schema from {}", registry.source_description()))?;

    let yaml = serde_yaml::to_string(&registry.snapshot()).context("Failed to serialize schema")?;
    print!("{}", yaml);
    Ok(())
}
