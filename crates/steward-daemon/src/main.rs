//! Steward daemon
//!
//! Supervises agent instances on this host until interrupted. Running
//! backends are left alone on shutdown; the next start reconciles them.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use steward_core::{AgentManager, ContextFileBuilder, ManagerConfig, TemplateRegistry};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "steward", bin_name = "steward")]
#[command(about = "Single-host supervisor for agent backend processes", version)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, short = 'c', env = "STEWARD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of template JSON files, overriding `templatesDir`
    #[arg(long)]
    templates_dir: Option<PathBuf>,
}

fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".steward")
        .join("config.json")
}

fn init_tracing(config: &ManagerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ManagerConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    init_tracing(&config);
    info!(
        config = %config_path.display(),
        instances_dir = %config.instances_dir.display(),
        "Starting steward daemon"
    );

    let templates = Arc::new(TemplateRegistry::new());
    match cli.templates_dir.or_else(|| config.templates_dir.clone()) {
        Some(dir) => {
            templates
                .load_dir(&dir)
                .with_context(|| format!("failed to load templates from {}", dir.display()))?;
        }
        None => warn!("No templates directory configured, instance creation will fail"),
    }

    let manager = AgentManager::with_defaults(&config, templates, Arc::new(ContextFileBuilder::new()));
    manager
        .initialize()
        .await
        .context("failed to initialize agent manager")?;
    info!(instances = manager.len(), "Supervising agent instances");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutdown requested");
    manager.dispose();
    Ok(())
}
