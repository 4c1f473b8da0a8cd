//! Integration tests for the renamer pipeline
//!
//! These tests drive a complete run against temporary directories:
//! - Asset inventory with override directories
//! - Collection and library matching through in-memory sources
//! - File placement, dry-run parity and idempotent re-runs
//! - Failure isolation between instances

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use poster_renamer::jobs::{Instance, RunContext, run_instances};
use poster_renamer::media::{EntryStatus, LibraryItem, LibraryKind};
use poster_renamer::services::organizer::DRY_RUN_PREFIX;
use poster_renamer::services::{
    AssetInventory, CollectionSource, LibrarySource, MatchOptions, OrganizeOptions, ReportSink,
    ScanOptions,
};

// ============================================================================
// In-memory collaborators
// ============================================================================

struct StaticCollections {
    name: String,
    collections: Vec<String>,
}

#[async_trait]
impl CollectionSource for StaticCollections {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn fetch_collections(&self, _library_names: &[String]) -> Result<Vec<String>> {
        Ok(self.collections.clone())
    }
}

struct StaticLibrary {
    name: String,
    kind: LibraryKind,
    items: Vec<LibraryItem>,
}

#[async_trait]
impl LibrarySource for StaticLibrary {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> LibraryKind {
        self.kind
    }

    async fn fetch_entries(&self) -> Result<Vec<LibraryItem>> {
        Ok(self.items.clone())
    }
}

struct BrokenLibrary;

#[async_trait]
impl LibrarySource for BrokenLibrary {
    fn instance_name(&self) -> &str {
        "broken"
    }

    fn kind(&self) -> LibraryKind {
        LibraryKind::Movies
    }

    async fn fetch_entries(&self) -> Result<Vec<LibraryItem>> {
        anyhow::bail!("connection refused")
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    delivered: Arc<Mutex<Vec<(Vec<String>, Vec<String>)>>>,
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn deliver(&self, messages: &[String], notifications: &[String]) -> Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .push((messages.to_vec(), notifications.to_vec()));
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn touch(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn movie(title: &str, path: &str, year: i32) -> LibraryItem {
    LibraryItem {
        title: title.to_string(),
        path: path.to_string(),
        year: Some(year),
        status: EntryStatus::Released,
        ..Default::default()
    }
}

struct Fixture {
    source: TempDir,
    overrides: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let source = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        touch(source.path(), "Dune (2021).jpg", "dune-2021");
        touch(source.path(), "Dune (1984).jpg", "dune-1984");
        touch(source.path(), "Dark (2017).jpg", "dark");
        touch(source.path(), "Dark (2017) - Season 1.jpg", "dark-s1");
        touch(source.path(), "Dark (2017) - Specials.jpg", "dark-s0");
        touch(source.path(), "The Matrix Collection.jpg", "matrix");
        touch(overrides.path(), "Dark (2017) - Season 1.jpg", "dark-s1-override");
        Self { source, overrides }
    }

    fn inventory(&self) -> AssetInventory {
        AssetInventory::build(
            Some(self.source.path()),
            &[self.overrides.path().to_path_buf()],
            &ScanOptions::default(),
        )
    }

    fn instances(&self) -> Vec<Instance> {
        vec![
            Instance::Collections(Box::new(StaticCollections {
                name: "plex".to_string(),
                collections: vec!["The Matrix".to_string(), "Jurassic Park".to_string()],
            })),
            Instance::Library(Box::new(BrokenLibrary)),
            Instance::Library(Box::new(StaticLibrary {
                name: "radarr".to_string(),
                kind: LibraryKind::Movies,
                items: vec![movie("Dune", "/movies/Dune (2021)", 2021)],
            })),
            Instance::Library(Box::new(StaticLibrary {
                name: "sonarr".to_string(),
                kind: LibraryKind::Series,
                items: vec![movie("Dark", "/tv/Dark (2017)", 2017)],
            })),
        ]
    }
}

async fn run(fixture: &Fixture, options: &OrganizeOptions) -> (poster_renamer::jobs::RunSummary, RecordingSink) {
    let inventory = fixture.inventory();
    let match_options = MatchOptions::default();
    let library_names = vec!["Movies".to_string()];
    let ctx = RunContext {
        inventory: &inventory,
        match_options: &match_options,
        organize_options: options,
        library_names: &library_names,
    };
    let sink = RecordingSink::default();
    let sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(sink.clone())];
    let summary = run_instances(&fixture.instances(), &ctx, &sinks).await;
    (summary, sink)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_run_places_matched_assets() {
    let fixture = Fixture::new();
    let dest = TempDir::new().unwrap();
    let options = OrganizeOptions::new(dest.path());

    let (summary, sink) = run(&fixture, &options).await;

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "broken");
    assert_eq!(summary.reports.len(), 3);
    assert_eq!(sink.delivered.lock().unwrap().len(), 3);

    let read = |name: &str| fs::read_to_string(dest.path().join(name)).unwrap();
    assert_eq!(read("The Matrix.jpg"), "matrix");
    assert_eq!(read("Dune (2021).jpg"), "dune-2021");
    assert_eq!(read("Dark (2017).jpg"), "dark");
    assert_eq!(read("Dark (2017)_Season01.jpg"), "dark-s1-override");
    assert_eq!(read("Dark (2017)_Season00.jpg"), "dark-s0");
    assert!(!dest.path().join("Dune (1984).jpg").exists());

    // Override files sort by their own directory, so compare as a set
    let sonarr = summary.reports.iter().find(|r| r.instance == "sonarr").unwrap();
    let mut notifications = sonarr.notifications.clone();
    notifications.sort();
    assert_eq!(
        notifications,
        vec![
            "Dark (2017)".to_string(),
            "Dark (2017)_Season00".to_string(),
            "Dark (2017)_Season01".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let fixture = Fixture::new();
    let dest = TempDir::new().unwrap();
    let options = OrganizeOptions::new(dest.path());

    run(&fixture, &options).await;
    let (summary, _) = run(&fixture, &options).await;

    assert_eq!(summary.total_notifications(), 0);
    assert!(summary.reports.iter().all(|r| r.messages.is_empty()));
}

#[tokio::test]
async fn test_dry_run_reports_like_real_run() {
    let fixture = Fixture::new();
    let dry_dest = TempDir::new().unwrap();
    let real_dest = TempDir::new().unwrap();

    let mut dry = OrganizeOptions::new(dry_dest.path());
    dry.asset_folders = true;
    dry.dry_run = true;
    let mut real = OrganizeOptions::new(real_dest.path());
    real.asset_folders = true;

    let (dry_summary, _) = run(&fixture, &dry).await;
    let (real_summary, _) = run(&fixture, &real).await;

    assert_eq!(fs::read_dir(dry_dest.path()).unwrap().count(), 0);
    for (dry_report, real_report) in dry_summary.reports.iter().zip(&real_summary.reports) {
        let stripped: Vec<String> = dry_report
            .messages
            .iter()
            .map(|m| m.strip_prefix(DRY_RUN_PREFIX).unwrap_or(m).to_string())
            .collect();
        assert_eq!(stripped, real_report.messages);
        assert_eq!(dry_report.notifications, real_report.notifications);
    }
    assert!(real_dest.path().join("Dark (2017)/Season01.jpg").exists());
    assert!(real_dest.path().join("Dune (2021)/poster.jpg").exists());
}

#[tokio::test]
async fn test_collection_instance_without_library_names() {
    let fixture = Fixture::new();
    let dest = TempDir::new().unwrap();
    let inventory = fixture.inventory();
    let match_options = MatchOptions::default();
    let options = OrganizeOptions::new(dest.path());
    let ctx = RunContext {
        inventory: &inventory,
        match_options: &match_options,
        organize_options: &options,
        library_names: &[],
    };
    let source = StaticCollections {
        name: "plex".to_string(),
        collections: vec!["The Matrix".to_string()],
    };

    let report = poster_renamer::jobs::run_collection_instance(&source, &ctx).await.unwrap();
    assert_eq!(report.messages, vec!["Error: No library names specified for plex".to_string()]);
    assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_library_instance_without_matches() {
    let fixture = Fixture::new();
    let dest = TempDir::new().unwrap();
    let inventory = fixture.inventory();
    let match_options = MatchOptions::default();
    let options = OrganizeOptions::new(dest.path());
    let ctx = RunContext {
        inventory: &inventory,
        match_options: &match_options,
        organize_options: &options,
        library_names: &[],
    };
    let source = StaticLibrary {
        name: "radarr".to_string(),
        kind: LibraryKind::Movies,
        items: vec![movie("Dune", "/movies/Dune (2000)", 2000)],
    };

    let report = poster_renamer::jobs::run_library_instance(&source, &ctx).await.unwrap();
    assert_eq!(report.matched, 0);
    assert_eq!(report.messages, vec!["No matches found for radarr".to_string()]);
}
