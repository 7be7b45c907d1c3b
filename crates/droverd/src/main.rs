//! droverd — converges one instance group until interrupted.
//!
//! Loads a group definition, validates it against the built-in simulator
//! plugins, then hands the composed group to the supervisor matching its
//! allocation: the size scaler for fluid pools, the quorum for pinned
//! identities. Ctrl-C stops the supervisor at the next pass boundary.
//!
//! # Usage
//!
//! ```text
//! droverd run --config group.toml
//! droverd run --config group.toml --log-json
//! droverd check --config group.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use drover_group::{validate_group, ScaledGroup};
use drover_scaler::{Quorum, Scaler};
use drover_sim::{SimInstancePlugin, VanillaFlavor};
use drover_spi::Allocation;

mod config;

use config::GroupFile;

#[derive(Parser)]
#[command(name = "droverd", version, about = "drover group daemon")]
struct Cli {
    /// Emit logs as JSON instead of text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Converge a group against the built-in simulator backend.
    Run {
        /// Path to the group definition (TOML).
        #[arg(long)]
        config: PathBuf,
    },
    /// Validate a group definition and exit.
    Check {
        /// Path to the group definition (TOML).
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Check { config } => check(&config).await,
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,droverd=debug,drover_scaler=debug,drover_group=debug"
            .parse()
            .unwrap()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn check(path: &Path) -> anyhow::Result<()> {
    let group = GroupFile::from_path(path)?.into_group_config()?;
    validate_group(&group, &SimInstancePlugin::new(), &VanillaFlavor::new()).await?;
    info!(group = %group.id, "group definition is valid");
    Ok(())
}

async fn run(path: &Path) -> anyhow::Result<()> {
    let group = GroupFile::from_path(path)?.into_group_config()?;

    info!(
        group = %group.id,
        allocation = ?group.allocation,
        interval = ?group.poll_interval,
        "droverd starting"
    );

    let instances = SimInstancePlugin::new();
    let flavor = VanillaFlavor::new();
    validate_group(&group, &instances, &flavor).await?;

    let scaled = ScaledGroup::new(instances, flavor, group)?;
    let config = scaled.config();
    let poll_interval = config.poll_interval;
    let buffer = config.buffer;
    let allocation = config.allocation.clone();

    match allocation {
        Allocation::Size(target) => {
            let supervisor = Arc::new(Scaler::new(scaled, target, poll_interval, buffer)?);
            let runner = tokio::spawn({
                let supervisor = supervisor.clone();
                async move { supervisor.run().await }
            });

            tokio::signal::ctrl_c().await?;
            info!("interrupt received, stopping");
            supervisor.stop();
            runner.await?;
        }
        Allocation::LogicalIds(ids) => {
            let supervisor = Arc::new(Quorum::new(scaled, ids, poll_interval)?);
            let runner = tokio::spawn({
                let supervisor = supervisor.clone();
                async move { supervisor.run().await }
            });

            tokio::signal::ctrl_c().await?;
            info!("interrupt received, stopping");
            supervisor.stop();
            runner.await?;
        }
    }

    info!("droverd stopped");
    Ok(())
}
