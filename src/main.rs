use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use flexlink::{bootstrap, init_logging, Settings};
use tokio::runtime::Handle;

/// Server command line.
#[derive(Parser)]
#[command(name = "flexlink")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Subscription-driven messaging broker", long_about = None)]
struct Cli {
    /// Configuration file (toml, json or yaml)
    #[arg(short, long, env = "FLEXLINK_CONFIG")]
    config: Option<PathBuf>,
    /// Log level, overrides the configuration
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    let logging = init_logging(&settings.logging).context("initializing logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT"),
        built = env!("BUILD_TIME"),
        destinations = settings.destinations.len(),
        "starting flexlink"
    );

    let app = bootstrap::build(&settings, Handle::current())?;
    app.broker.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutdown requested");

    let result = app.shutdown();
    logging.shutdown();
    result.map_err(Into::into)
}
