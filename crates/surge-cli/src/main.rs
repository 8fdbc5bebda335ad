//! surge — capacity-doubling rolling deployments for managed scaling groups.
//!
//! Doubles the fleet behind a load balancer, waits for the new half to be
//! healthy in both the scaling group and the balancer, retires the old
//! half, and restores steady-state capacity.
//!
//! # Usage
//!
//! ```text
//! surge --application checkout --config /etc/surge/deploy.toml
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use surge_cloud::{CloudError, HttpCloud};
use surge_deploy::{DeployError, Orchestrator};

mod config;
use config::ConfigError;

#[derive(Parser)]
#[command(
    name = "surge",
    about = "Capacity-doubling rolling deployments for managed scaling groups",
    version
)]
struct Cli {
    /// Increase output verbosity.
    #[arg(long)]
    debug: bool,

    /// Cloud credential profile to use.
    #[arg(long, default_value = "ec2")]
    profile: String,

    /// Cloud region to operate in.
    #[arg(long, default_value = "eu-west-1")]
    region: String,

    /// Application to deploy.
    #[arg(long)]
    application: String,

    /// Path to the deployment configuration file.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error(transparent)]
    Deploy(#[from] DeployError),
}

impl RunError {
    fn exit_code(&self) -> i32 {
        match self {
            RunError::Config(err) => err.exit_code(),
            RunError::Cloud(CloudError::Unavailable(_))
            | RunError::Deploy(DeployError::Cloud(CloudError::Unavailable(_))) => 3,
            RunError::Deploy(DeployError::InsufficientCapacity { .. }) => 4,
            RunError::Deploy(DeployError::HealthCheckTimeout { .. }) => 5,
            RunError::Deploy(DeployError::Aborted { .. }) => 130,
            // Any other provider failure mid-run is a plain fatal error.
            RunError::Cloud(_) | RunError::Deploy(DeployError::Cloud(_)) => 1,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        error!("{err}");
        process::exit(err.exit_code());
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

async fn run(cli: Cli) -> Result<(), RunError> {
    let group = config::scaling_group_for(&cli.config, &cli.application)?;
    let cloud = HttpCloud::connect(&cli.profile, &cli.region)?;

    // Ctrl-C aborts the run at the next polling suspension point.
    let (abort_tx, abort_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            let _ = abort_tx.send(true);
        }
    });

    info!(
        application = %cli.application,
        group = %group,
        region = %cli.region,
        "starting rolling deployment"
    );
    let report = Orchestrator::new(&cloud, &cloud, &cloud, &group)
        .run(abort_rx)
        .await?;
    info!(
        original_capacity = report.original_capacity,
        target_capacity = report.target_capacity,
        terminated = report.terminated.len(),
        "deployment finished"
    );
    Ok(())
}
