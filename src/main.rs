//! Poster renamer - entry point
//!
//! Loads the configuration, initializes logging and runs one renaming pass.

use anyhow::Result;

use poster_renamer::cli::CliOptions;
use poster_renamer::config::Config;
use poster_renamer::jobs;
use poster_renamer::services::logging::{LogFormat, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = CliOptions::from_args();

    let config_path = Config::resolve_path(cli.config_path);
    let mut config = Config::load(&config_path)?;
    if cli.dry_run {
        config.renamer.dry_run = true;
    }
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        config.log_format
    };

    init_tracing(&config.log_level, format)?;
    tracing::info!(config = %config_path.display(), "Starting poster renamer");

    let summary = jobs::run(&config).await?;

    for (instance, error) in &summary.failures {
        tracing::error!(instance = %instance, error = %error, "Instance was not processed");
    }
    Ok(())
}
