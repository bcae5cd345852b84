use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nerve::config::NerveConfig;
use nerve::{reconciliation, AppContext};

#[derive(Parser)]
#[command(name = "nerve", about = "Nerve control plane and MCP enforcement gateway", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the control-plane HTTP API (default when no subcommand given).
    Serve,
    /// Run pending database migrations and exit.
    Migrate,
    /// Run one pass of both reconciliation jobs and exit (spec §4.6).
    Reconcile,
    /// Print a freshly generated break-glass admin key to stdout and exit.
    /// Doesn't touch the database or start anything — just generation.
    BootstrapKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NerveConfig::from_env();
    setup_logging(&config.log);

    match Args::parse().command {
        Some(Command::Migrate) => {
            // `AppContext::new` runs migrations as part of connecting.
            AppContext::new(config).await?;
            tracing::info!("migrations applied");
        }
        Some(Command::Reconcile) => {
            let ctx = AppContext::new(config).await?;
            let corrected = reconciliation::reconcile_usage_counters(&ctx.storage).await?;
            let advanced = reconciliation::reconcile_stale_periods(&ctx.storage, ctx.clock.as_ref()).await?;
            tracing::info!(corrected, advanced, "reconciliation pass complete");
        }
        Some(Command::BootstrapKey) => {
            println!("{}", nerve::credentials::bootstrap::generate_bootstrap_key());
        }
        None | Some(Command::Serve) => {
            run_server(config).await?;
        }
    }

    Ok(())
}

async fn run_server(config: NerveConfig) -> Result<()> {
    let ctx = AppContext::new(config).await?;
    spawn_reconciliation_loops(ctx.clone());
    nerve::http::start_server(ctx).await
}

/// Spawns the two reconciliation passes on independent intervals (spec
/// §4.6: "hourly" usage-counter reconciliation, "daily" stale-period
/// backstop). Failures are logged and the loop continues — a transient
/// database hiccup should not stop future passes.
fn spawn_reconciliation_loops(ctx: std::sync::Arc<AppContext>) {
    let hourly_ctx = ctx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = reconciliation::reconcile_usage_counters(&hourly_ctx.storage).await {
                tracing::error!(err = %e, "usage counter reconciliation failed");
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(86_400));
        loop {
            interval.tick().await;
            if let Err(e) = reconciliation::reconcile_stale_periods(&ctx.storage, ctx.clock.as_ref()).await {
                tracing::error!(err = %e, "stale period reconciliation failed");
            }
        }
    });
}

fn setup_logging(log_level: &str) {
    tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
}
