use anyhow::Context;
use clap::Parser;
use gcodeprep::cli::{self, Cli};
use gcodeprep::{init_logging, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    init_logging(cli.log_level(&config), cli.json_log || config.logging.json)?;
    tracing::debug!("gcodeprep {} (built {})", gcodeprep::VERSION, gcodeprep::BUILD_DATE);

    cli::run(&cli, &config)?;
    Ok(())
}
