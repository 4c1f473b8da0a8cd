//! Radarr/Sonarr API client
//!
//! Only the read endpoints needed to list a library are used:
//! - `/api/v3/system/status` for the instance name
//! - `/api/v3/movie` (Radarr) or `/api/v3/series` (Sonarr) for the entries

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::sources::LibrarySource;
use crate::media::{EntryStatus, LibraryItem, LibraryKind};

/// Alternate title attached to a Radarr/Sonarr entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrAlternateTitle {
    pub title: String,
}

/// Movie or series record as returned by Radarr/Sonarr
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrMediaRecord {
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub alternate_titles: Vec<ArrAlternateTitle>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub year: Option<i32>,
    /// Radarr only
    #[serde(default)]
    pub secondary_year: Option<i32>,
    #[serde(default)]
    pub status: EntryStatus,
}

impl From<ArrMediaRecord> for LibraryItem {
    fn from(record: ArrMediaRecord) -> Self {
        Self {
            title: record.title,
            original_title: record.original_title,
            alternate_titles: record.alternate_titles.into_iter().map(|a| a.title).collect(),
            path: record.path,
            year: record.year,
            secondary_year: record.secondary_year,
            status: record.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemStatus {
    #[serde(default)]
    instance_name: Option<String>,
    #[serde(default)]
    app_name: Option<String>,
}

/// Radarr/Sonarr API client
pub struct ArrClient {
    client: Client,
    base_url: String,
    api_key: String,
    kind: LibraryKind,
    /// Configured name, replaced by the instance's own name once resolved
    name: String,
}

impl ArrClient {
    pub fn new(name: String, base_url: String, api_key: String, kind: LibraryKind) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            kind,
            name,
        }
    }

    fn media_endpoint(&self) -> &'static str {
        match self.kind {
            LibraryKind::Movies => "movie",
            LibraryKind::Series => "series",
        }
    }

    /// Ask the instance for its display name and use it from now on.
    pub async fn resolve_instance_name(&mut self) -> Result<&str> {
        let url = format!("{}/api/v3/system/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.name))?;

        if !response.status().is_success() {
            anyhow::bail!("{} status request failed with status: {}", self.name, response.status());
        }

        let status: SystemStatus = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} system status", self.name))?;

        if let Some(name) = status.instance_name.or(status.app_name).filter(|n| !n.is_empty()) {
            self.name = name;
        }
        Ok(&self.name)
    }
}

#[async_trait]
impl LibrarySource for ArrClient {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> LibraryKind {
        self.kind
    }

    async fn fetch_entries(&self) -> Result<Vec<LibraryItem>> {
        info!(instance = %self.name, endpoint = self.media_endpoint(), "Fetching library");

        let url = format!("{}/api/v3/{}", self.base_url, self.media_endpoint());
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch library from {}", self.name))?;

        if !response.status().is_success() {
            anyhow::bail!("{} library request failed with status: {}", self.name, response.status());
        }

        let records: Vec<ArrMediaRecord> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse library from {}", self.name))?;

        debug!(instance = %self.name, count = records.len(), "Library fetched");
        Ok(records.into_iter().map(LibraryItem::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_radarr_movie() {
        let json = r#"{
            "title": "Seven",
            "originalTitle": "Se7en",
            "alternateTitles": [{"title": "Se7en", "sourceType": "tmdb"}],
            "path": "/movies/Seven (1995)",
            "year": 1995,
            "secondaryYear": 1996,
            "status": "released",
            "monitored": true
        }"#;
        let record: ArrMediaRecord = serde_json::from_str(json).unwrap();
        let item = LibraryItem::from(record);

        assert_eq!(item.original_title.as_deref(), Some("Se7en"));
        assert_eq!(item.alternate_titles, vec!["Se7en".to_string()]);
        assert_eq!(item.secondary_year, Some(1996));
        assert_eq!(item.status, EntryStatus::Released);
    }

    #[test]
    fn test_parse_sonarr_series_without_optional_fields() {
        let json = r#"{"title": "Dark", "path": "/tv/Dark (2017)", "year": 2017, "status": "ended"}"#;
        let item = LibraryItem::from(serde_json::from_str::<ArrMediaRecord>(json).unwrap());

        assert!(item.alternate_titles.is_empty());
        assert_eq!(item.original_title, None);
        assert_eq!(item.secondary_year, None);
        assert_eq!(item.status, EntryStatus::Ended);
    }

    #[test]
    fn test_media_endpoint() {
        let radarr = ArrClient::new("radarr_1".into(), "http://localhost:7878/".into(), "k".into(), LibraryKind::Movies);
        let sonarr = ArrClient::new("sonarr_1".into(), "http://localhost:8989".into(), "k".into(), LibraryKind::Series);
        assert_eq!(radarr.media_endpoint(), "movie");
        assert_eq!(radarr.base_url, "http://localhost:7878");
        assert_eq!(sonarr.media_endpoint(), "series");
        assert_eq!(sonarr.instance_name(), "sonarr_1");
    }
}
