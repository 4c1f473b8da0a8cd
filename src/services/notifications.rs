//! Discord webhook notifications
//!
//! Newly placed posters are announced as embeds. Discord limits an embed field
//! value to 1024 characters and a message to 25 fields, so long lists are split
//! across fields and then across messages.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use super::sources::ReportSink;

pub const FIELD_VALUE_LIMIT: usize = 1024;
pub const FIELDS_PER_MESSAGE: usize = 25;
pub const EMBED_COLOR: u32 = 0x00FF00;

const FIELD_NAME: &str = "Renamed Posters";

/// Embed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: String,
    color: u32,
    fields: &'a [EmbedField],
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    username: &'a str,
    embeds: Vec<Embed<'a>>,
}

/// Split `items` into embed fields of at most [`FIELD_VALUE_LIMIT`] characters,
/// one item per line. An item longer than the limit is truncated.
pub fn field_builder(items: &[String], name: &str) -> Vec<EmbedField> {
    let mut fields = Vec::new();
    let mut value = String::new();

    for item in items {
        let item: String = item.chars().take(FIELD_VALUE_LIMIT).collect();
        let needed = if value.is_empty() {
            item.chars().count()
        } else {
            value.chars().count() + 1 + item.chars().count()
        };
        if needed > FIELD_VALUE_LIMIT && !value.is_empty() {
            fields.push(std::mem::take(&mut value));
        }
        if !value.is_empty() {
            value.push('\n');
        }
        value.push_str(&item);
    }
    if !value.is_empty() {
        fields.push(value);
    }

    let total = fields.len();
    fields
        .into_iter()
        .enumerate()
        .map(|(i, value)| EmbedField {
            name: if total > 1 {
                format!("{} ({}/{})", name, i + 1, total)
            } else {
                name.to_string()
            },
            value,
            inline: false,
        })
        .collect()
}

/// Posts run results to a Discord webhook
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
            username: "poster-renamer".to_string(),
        }
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .context("Failed to send Discord notification")?;

        if !response.status().is_success() {
            anyhow::bail!("Discord webhook failed with status: {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl ReportSink for DiscordNotifier {
    async fn deliver(&self, _messages: &[String], notifications: &[String]) -> Result<()> {
        if notifications.is_empty() {
            debug!("Nothing to notify");
            return Ok(());
        }

        let fields = field_builder(notifications, FIELD_NAME);
        let description = format!("Number of posters added {}", notifications.len());

        for chunk in fields.chunks(FIELDS_PER_MESSAGE) {
            let payload = WebhookPayload {
                username: &self.username,
                embeds: vec![Embed {
                    title: FIELD_NAME,
                    description: description.clone(),
                    color: EMBED_COLOR,
                    fields: chunk,
                }],
            };
            self.post(&payload).await?;
        }

        info!(posters = notifications.len(), "Discord notification sent");
        Ok(())
    }
}
