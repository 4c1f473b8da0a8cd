//! Poster renaming job
//!
//! One run builds the asset inventory once, then processes every selected
//! instance in turn: fetch its titles, match them against the inventory and
//! place the matched files. A failing instance is logged and skipped.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{Config, InstanceType};
use crate::media::{LibraryEntry, LibraryKind};
use crate::services::arr::ArrClient;
use crate::services::file_matcher::{CollectionMatcher, LibraryMatcher, MatchOptions, MatchOutcome};
use crate::services::logging;
use crate::services::notifications::DiscordNotifier;
use crate::services::organizer::{OrganizeOptions, Organizer};
use crate::services::plex::PlexClient;
use crate::services::scanner::{AssetCategory, AssetInventory};
use crate::services::sources::{CollectionSource, LibrarySource, LogSink, ReportSink};

/// Everything shared by the instances of one run
pub struct RunContext<'a> {
    pub inventory: &'a AssetInventory,
    pub match_options: &'a MatchOptions,
    pub organize_options: &'a OrganizeOptions,
    /// Plex libraries whose collections are processed
    pub library_names: &'a [String],
}

/// A source to process
pub enum Instance {
    Collections(Box<dyn CollectionSource>),
    Library(Box<dyn LibrarySource>),
}

impl Instance {
    pub fn name(&self) -> &str {
        match self {
            Self::Collections(source) => source.server_name(),
            Self::Library(source) => source.instance_name(),
        }
    }
}

/// Output of one processed instance
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceReport {
    pub instance: String,
    pub matched: usize,
    pub almost_matched: usize,
    pub messages: Vec<String>,
    pub notifications: Vec<String>,
}

/// Output of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<InstanceReport>,
    /// Instances that failed, with the error
    pub failures: Vec<(String, String)>,
}

impl RunSummary {
    pub fn total_notifications(&self) -> usize {
        self.reports.iter().map(|r| r.notifications.len()).sum()
    }
}

fn finish(instance: &str, outcome: MatchOutcome, ctx: &RunContext<'_>) -> InstanceReport {
    let mut report = InstanceReport {
        instance: instance.to_string(),
        matched: outcome.matched.len(),
        almost_matched: outcome.almost_matched.len(),
        ..Default::default()
    };

    if outcome.matched.is_empty() {
        report.messages.push(format!("No matches found for {}", instance));
        return report;
    }

    let placed = Organizer::new(ctx.organize_options).materialize(&outcome.matched, ctx.inventory);
    report.messages = placed.messages;
    report.notifications = placed.notifications;
    report
}

/// Match a media server's collections and place their posters.
pub async fn run_collection_instance(
    source: &dyn CollectionSource,
    ctx: &RunContext<'_>,
) -> Result<InstanceReport> {
    let name = source.server_name().to_string();
    info!(server = %name, "Plex Server: {}", name);

    if ctx.library_names.is_empty() {
        return Ok(InstanceReport {
            instance: name.clone(),
            messages: vec![format!("Error: No library names specified for {}", name)],
            ..Default::default()
        });
    }

    let collections = source
        .fetch_collections(ctx.library_names)
        .await
        .with_context(|| format!("Failed to fetch collections from {}", name))?;

    let matcher = CollectionMatcher::new(ctx.inventory.bundles(AssetCategory::Collection), ctx.match_options);
    let outcome = matcher.match_collections(&collections);
    outcome.log_diagnostics(&name);

    Ok(finish(&name, outcome, ctx))
}

/// Match a Radarr/Sonarr library and place its posters.
pub async fn run_library_instance(
    source: &dyn LibrarySource,
    ctx: &RunContext<'_>,
) -> Result<InstanceReport> {
    let name = source.instance_name().to_string();
    info!(instance = %name, "{}", name);

    let items = source
        .fetch_entries()
        .await
        .with_context(|| format!("Failed to fetch library from {}", name))?;

    let entries: Vec<LibraryEntry> = items
        .into_iter()
        .map(|item| LibraryEntry::from_item(item, &ctx.match_options.normalizer))
        .collect();

    let category = source.kind().asset_category();
    let matcher = LibraryMatcher::new(ctx.inventory.bundles(category));
    let outcome = matcher.match_entries(&entries);
    outcome.log_diagnostics(&name);

    Ok(finish(&name, outcome, ctx))
}

/// Process every instance in order and hand each report to the sinks.
pub async fn run_instances(
    instances: &[Instance],
    ctx: &RunContext<'_>,
    sinks: &[Box<dyn ReportSink>],
) -> RunSummary {
    let mut summary = RunSummary::default();

    for instance in instances {
        let result = match instance {
            Instance::Collections(source) => run_collection_instance(source.as_ref(), ctx).await,
            Instance::Library(source) => run_library_instance(source.as_ref(), ctx).await,
        };

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!(instance = %instance.name(), error = %format!("{:#}", e), "Instance failed");
                summary
                    .failures
                    .push((instance.name().to_string(), format!("{:#}", e)));
                continue;
            }
        };

        for sink in sinks {
            if let Err(e) = sink.deliver(&report.messages, &report.notifications).await {
                warn!(instance = %report.instance, error = %e, "Failed to deliver report");
            }
        }
        summary.reports.push(report);
    }

    summary
}

/// Build the configured instances, resolving their display names.
async fn build_instances(config: &Config) -> Vec<Instance> {
    let mut instances = Vec::new();

    for (instance_type, settings) in config.selected_instances() {
        logging::log_instance_settings(
            &instance_type.to_string(),
            &settings.name,
            &settings.url,
            &settings.api,
        );

        match instance_type {
            InstanceType::Plex => {
                let mut client =
                    PlexClient::new(settings.name.clone(), settings.url.clone(), settings.api.clone());
                if let Err(e) = client.resolve_server_name().await {
                    warn!(instance = %settings.name, error = %format!("{:#}", e), "Unable to resolve Plex server name");
                }
                instances.push(Instance::Collections(Box::new(client)));
            }
            InstanceType::Radarr | InstanceType::Sonarr => {
                let kind = if instance_type == InstanceType::Radarr {
                    LibraryKind::Movies
                } else {
                    LibraryKind::Series
                };
                let mut client = ArrClient::new(
                    settings.name.clone(),
                    settings.url.clone(),
                    settings.api.clone(),
                    kind,
                );
                if let Err(e) = client.resolve_instance_name().await {
                    warn!(instance = %settings.name, error = %format!("{:#}", e), "Unable to resolve instance name");
                }
                instances.push(Instance::Library(Box::new(client)));
            }
        }
    }

    instances
}

/// Run the renamer with the given configuration.
pub async fn run(config: &Config) -> Result<RunSummary> {
    logging::log_settings(&config.renamer, config.renamer.dry_run, &config.log_level);

    let scan_options = config.scan_options()?;
    let match_options = config.match_options()?;
    let organize_options = config.organize_options()?;

    let inventory = AssetInventory::build(
        config.renamer.source_dir.as_deref(),
        &config.renamer.source_overrides,
        &scan_options,
    );
    if inventory.is_empty() {
        warn!("No asset files found");
    }

    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(LogSink)];
    if let Some(webhook) = config.discord.webhook.as_ref().filter(|w| !w.is_empty()) {
        sinks.push(Box::new(DiscordNotifier::new(webhook.clone())));
    }

    let instances = build_instances(config).await;
    if instances.is_empty() {
        warn!("No instances selected in the renamer section");
    }

    let ctx = RunContext {
        inventory: &inventory,
        match_options: &match_options,
        organize_options: &organize_options,
        library_names: &config.renamer.library_names,
    };
    let summary = run_instances(&instances, &ctx, &sinks).await;

    info!(
        instances = summary.reports.len(),
        failures = summary.failures.len(),
        posters = summary.total_notifications(),
        "Renamer run complete"
    );
    Ok(summary)
}
