//! Edge deployment coordinator - main entry point

use clap::{Parser, Subcommand};
use edge_deploy::config::EdgeConfig;
use edge_deploy::messaging::EdgeMessagingClient;
use edge_deploy::observability::init_default_logging;
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tracing::{error, info};

/// Edge deployment coordinator with an MQTT messaging core
#[derive(Parser)]
#[command(name = "edge-deploy")]
#[command(about = "Edge deployment coordinator with an MQTT messaging core")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the messaging client until interrupted
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!(
        "Starting edge deployment coordinator v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_client(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Shutdown complete");
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<EdgeConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(EdgeConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = vec!["edge-deploy.toml", "config/edge-deploy.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(EdgeConfig::load_from_file(&path)?);
                }
            }

            error!(
                "No configuration file found. Provide one with -c/--config or create edge-deploy.toml"
            );
            process::exit(1);
        }
    }
}

async fn run_client(config: EdgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = EdgeMessagingClient::new(config.mqtt);

    client.register_handler("edge/commands", |payload| {
        info!("Remote command received: {}", payload);
    });

    if !client.start().await {
        return Err("failed to connect to broker within the bounded wait".into());
    }

    info!("Messaging client running; press Ctrl-C to stop");
    signal::ctrl_c().await?;
    info!("Received shutdown signal");

    client.stop().await;
    Ok(())
}

fn handle_config_command(
    config: EdgeConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Configuration is valid");
    if show {
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
