//! keysweep Binary
//!
//! Loads the cleaning units from the config file and sweeps them in order.

use clap::Parser;
use keysweep::{CliArgs, Config, LogFormat, LoggingConfig, Runner, TcpConnector};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = Config::load(&args)?;

    init_logging(&config.logging)?;

    info!(
        config = %args.config.display(),
        units = config.units.len(),
        "keysweep starting"
    );

    let report = Runner::new(TcpConnector).run(&config.units).await;

    // Skipped keys and failed units are reported, not turned into an exit code
    info!(
        units = report.units.len(),
        failed = report.failed_units(),
        deleted = report.deleted(),
        "keysweep finished"
    );

    Ok(())
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
    }
    Ok(())
}
