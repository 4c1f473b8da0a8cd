//! Logging setup and run banners.
//!
//! A single subscriber is installed at startup: an [`EnvFilter`] (from
//! `RUST_LOG`, falling back to the configured level) plus a fmt layer that
//! writes either human-readable or JSON lines.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::RenamerConfig;

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Filter directive for the configured level, scoped to this crate.
fn default_directive(level: &str) -> String {
    format!("poster_renamer={},warn", level.to_lowercase())
}

/// Install the global subscriber.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?,
    }
    Ok(())
}

/// Hide all but the last five characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "Not Set".to_string();
    }
    let count = secret.chars().count();
    let visible: String = secret.chars().skip(count.saturating_sub(5)).collect();
    format!("{}{}", "*".repeat(count.saturating_sub(5)), visible)
}

fn or_not_set<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "Not Set".to_string())
}

/// Dump the effective renamer settings at debug level.
pub fn log_settings(settings: &RenamerConfig, dry_run: bool, log_level: &str) {
    debug!("{}", "*".repeat(40));
    debug!("{:<20}{}", "Dry_run:", dry_run);
    debug!("{:<20}{}", "Log level:", log_level);
    debug!("{:<20}{}", "Asset folders:", settings.asset_folders);
    debug!(
        "{:<20}{}",
        "Library names:",
        if settings.library_names.is_empty() {
            "Not Set".to_string()
        } else {
            settings.library_names.join(", ")
        }
    );
    debug!("{:<20}{}", "Source dir:", or_not_set(settings.source_dir.as_ref().map(|p| p.display())));
    debug!(
        "{:<20}{}",
        "Source overrides:",
        if settings.source_overrides.is_empty() {
            "Not Set".to_string()
        } else {
            settings
                .source_overrides
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    debug!(
        "{:<20}{}",
        "Destination dir:",
        or_not_set(settings.destination_dir.as_ref().map(|p| p.display()))
    );
    debug!("{:<20}{}", "Threshold:", settings.collection_threshold);
    debug!("{:<20}{}", "Action type:", settings.action_type);
    debug!("{:<20}{}", "Print only renames:", settings.print_only_renames);
    debug!("{}", "*".repeat(40));

    if dry_run {
        info!("Dry Run: NO CHANGES WILL BE MADE");
    }
}

/// Dump the connection settings of one instance at debug level.
pub fn log_instance_settings(instance_type: &str, name: &str, url: &str, api_key: &str) {
    debug!("{}", "*".repeat(40));
    debug!("Script Settings for {}:", name);
    debug!("{:<20}{}", "URL:", if url.is_empty() { "Not Set" } else { url });
    debug!("{:<20}{}", "API:", mask_secret(api_key));
    debug!("{:<20}{}", "Instance Type:", instance_type);
    debug!("{}", "*".repeat(40));
}
