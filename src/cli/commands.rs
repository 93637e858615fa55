use crate::app::build_service;
use crate::logging::init_logging;
use crate::resources::AppState;
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::server::HttpServer;
use crate::spec::load_spec;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Schema-validated users and products API server
#[derive(Debug, Parser)]
#[command(name = "resource-server", version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// OpenAPI 3.1 schema (YAML or JSON)
        #[arg(long, env = "RSRV_SPEC")]
        spec: Option<PathBuf>,

        /// Address to listen on
        #[arg(long, env = "RSRV_ADDR")]
        addr: Option<String>,

        /// Do not check handler responses against the schema
        #[arg(long, default_value_t = false)]
        no_response_validation: bool,
    },
    /// Print the routing table loaded from the schema and exit
    Routes {
        #[arg(long, env = "RSRV_SPEC")]
        spec: Option<PathBuf>,
    },
}

impl Commands {
    /// Overlay the flags on `config`.
    pub fn apply_to(&self, mut config: RuntimeConfig) -> RuntimeConfig {
        match self {
            Commands::Serve {
                spec,
                addr,
                no_response_validation,
            } => {
                if let Some(spec) = spec {
                    config.spec_path = spec.clone();
                }
                if let Some(addr) = addr {
                    config.addr = addr.clone();
                }
                if *no_response_validation {
                    config.validate_responses = false;
                }
            }
            Commands::Routes { spec } => {
                if let Some(spec) = spec {
                    config.spec_path = spec.clone();
                }
            }
        }
        config
    }
}

/// Parse arguments from the process and run the chosen command.
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.command.apply_to(RuntimeConfig::from_env());
    match cli.command {
        Commands::Serve { .. } => serve(&config),
        Commands::Routes { .. } => {
            let spec = load_spec(&config.spec_path)?;
            Router::new(spec.routes)?.dump_routes();
            Ok(())
        }
    }
}

fn serve(config: &RuntimeConfig) -> anyhow::Result<()> {
    let _log_guard = init_logging()?;
    info!(
        spec = %config.spec_path.display(),
        addr = %config.addr,
        stack_size = config.stack_size,
        "Starting resource server"
    );

    let spec = load_spec(&config.spec_path)?;
    let state = AppState::new();
    let service = build_service(&spec, &state, config)?;

    let handle = HttpServer(service)
        .start(config.addr.as_str())
        .with_context(|| format!("cannot listen on {}", config.addr))?;
    handle
        .join()
        .map_err(|e| anyhow!("server coroutine panicked: {e:?}"))
}
