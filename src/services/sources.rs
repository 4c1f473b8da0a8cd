//! Collaborator interfaces
//!
//! The renamer only needs three things from the outside world: library entries
//! (Radarr/Sonarr), collection names (Plex) and somewhere to send the report.
//! Each is a trait so runs can be driven by in-memory implementations.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::media::{LibraryItem, LibraryKind};

/// Source of movie or series entries for one configured instance
#[async_trait]
pub trait LibrarySource: Send + Sync {
    /// Display name of the instance
    fn instance_name(&self) -> &str;

    /// Which kind of entries this source returns
    fn kind(&self) -> LibraryKind;

    /// Fetch a complete snapshot of the library
    async fn fetch_entries(&self) -> Result<Vec<LibraryItem>>;
}

/// Source of collection names for one media server
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Display name of the server
    fn server_name(&self) -> &str;

    /// Collection names across the given libraries.
    ///
    /// Unknown library names are logged and skipped.
    async fn fetch_collections(&self, library_names: &[String]) -> Result<Vec<String>>;
}

/// Destination for run output
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver the ordered report lines and the list of newly placed assets.
    async fn deliver(&self, messages: &[String], notifications: &[String]) -> Result<()>;
}

/// Report sink that writes every line to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn deliver(&self, messages: &[String], notifications: &[String]) -> Result<()> {
        for message in messages {
            info!("{}", message);
        }
        if !notifications.is_empty() {
            info!(count = notifications.len(), "Posters added");
        }
        Ok(())
    }
}
