//! Plex Media Server client
//!
//! Lists collection names per library section. Responses are requested as JSON;
//! every payload is wrapped in a `MediaContainer` object.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::sources::CollectionSource;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    media_container: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfo {
    #[serde(default)]
    friendly_name: Option<String>,
}

/// Library section as listed by `/library/sections`
#[derive(Debug, Clone, Deserialize)]
pub struct PlexSection {
    pub key: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub section_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SectionList {
    #[serde(rename = "Directory", default)]
    directories: Vec<PlexSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlexCollection {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionList {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexCollection>,
}

/// Plex API client
pub struct PlexClient {
    client: Client,
    base_url: String,
    token: String,
    name: String,
}

impl PlexClient {
    pub fn new(name: String, base_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            name,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to reach Plex server {}", self.name))?;

        if !response.status().is_success() {
            anyhow::bail!("Plex request {} failed with status: {}", path, response.status());
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Plex response for {}", path))?;
        Ok(envelope.media_container)
    }

    /// Ask the server for its friendly name and use it from now on.
    pub async fn resolve_server_name(&mut self) -> Result<&str> {
        let info: ServerInfo = self.get("/").await?;
        if let Some(name) = info.friendly_name.filter(|n| !n.is_empty()) {
            self.name = name;
        }
        Ok(&self.name)
    }

    pub async fn sections(&self) -> Result<Vec<PlexSection>> {
        let list: SectionList = self.get("/library/sections").await?;
        Ok(list.directories)
    }

    async fn section_collections(&self, section: &PlexSection) -> Result<Vec<String>> {
        let list: CollectionList = self
            .get(&format!("/library/sections/{}/collections", section.key))
            .await?;
        Ok(list.metadata.into_iter().map(|c| c.title).collect())
    }
}

/// Sections whose titles appear in `library_names`, in the order the names are
/// given, plus the names that matched no section.
fn select_sections<'a>(
    sections: &'a [PlexSection],
    library_names: &'a [String],
) -> (Vec<&'a PlexSection>, Vec<&'a str>) {
    let mut selected = Vec::new();
    let mut missing = Vec::new();
    for name in library_names {
        match sections.iter().find(|s| &s.title == name) {
            Some(section) => selected.push(section),
            None => missing.push(name.as_str()),
        }
    }
    (selected, missing)
}

#[async_trait]
impl CollectionSource for PlexClient {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn fetch_collections(&self, library_names: &[String]) -> Result<Vec<String>> {
        let sections = self.sections().await?;
        let (selected, missing) = select_sections(&sections, library_names);

        for name in missing {
            error!(library = name, server = %self.name, "Library does not exist");
        }

        let mut names = Vec::new();
        for section in selected {
            debug!(library = %section.title, server = %self.name, "Library found");
            names.extend(self.section_collections(section).await?);
        }

        info!(server = %self.name, count = names.len(), "Fetched collections");
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let json = r#"{"MediaContainer": {"size": 2, "Directory": [
            {"key": "1", "title": "Movies", "type": "movie"},
            {"key": "2", "title": "TV Shows", "type": "show"}
        ]}}"#;
        let envelope: Envelope<SectionList> = serde_json::from_str(json).unwrap();
        let sections = envelope.media_container.directories;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].key, "2");
        assert_eq!(sections[1].section_type.as_deref(), Some("show"));
    }

    #[test]
    fn test_parse_empty_collections() {
        let envelope: Envelope<CollectionList> =
            serde_json::from_str(r#"{"MediaContainer": {"size": 0}}"#).unwrap();
        assert!(envelope.media_container.metadata.is_empty());
    }

    #[test]
    fn test_select_sections_reports_unknown_names() {
        let sections = vec![
            PlexSection { key: "1".into(), title: "Movies".into(), section_type: None },
            PlexSection { key: "2".into(), title: "Anime".into(), section_type: None },
        ];
        let names = vec!["Anime".to_string(), "Kids".to_string(), "Movies".to_string()];
        let (selected, missing) = select_sections(&sections, &names);

        assert_eq!(selected.iter().map(|s| s.key.as_str()).collect::<Vec<_>>(), vec!["2", "1"]);
        assert_eq!(missing, vec!["Kids"]);
    }
}
