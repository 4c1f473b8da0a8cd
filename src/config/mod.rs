//! Application configuration management
//!
//! Settings come from a YAML file. Its path is taken from `--config`, else the
//! `RENAMER_CONFIG` environment variable, else `./config.yml`. A handful of
//! environment variables override file values afterwards.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::services::file_matcher::{
    DEFAULT_COLLECTION_THRESHOLD, DEFAULT_PREFIXES, DEFAULT_SUFFIXES, MatchOptions,
};
use crate::services::filename_parser::{DEFAULT_SEASON_WORDS, DEFAULT_SPECIALS_WORDS, SeasonMarkers};
use crate::services::logging::LogFormat;
use crate::services::organizer::{FileAction, OrganizeOptions};
use crate::services::scanner::ScanOptions;
use crate::services::text_utils::{DEFAULT_NOISE_WORDS, TitleAffixes, TitleNormalizer};

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";
pub const CONFIG_PATH_ENV: &str = "RENAMER_CONFIG";
pub const DRY_RUN_ENV: &str = "RENAMER_DRY_RUN";
pub const DESTINATION_DIR_ENV: &str = "RENAMER_DESTINATION_DIR";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Accepts either a single value or a list
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(PathBuf),
        Many(Vec<PathBuf>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(path)) => vec![path],
        Some(OneOrMany::Many(paths)) => paths,
        None => Vec::new(),
    })
}

/// Kind of external instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceType {
    Plex,
    Radarr,
    Sonarr,
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plex => "Plex",
            Self::Radarr => "Radarr",
            Self::Sonarr => "Sonarr",
        })
    }
}

/// Connection settings of one Plex/Radarr/Sonarr instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub api: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstancesConfig {
    pub plex: Vec<InstanceConfig>,
    pub radarr: Vec<InstanceConfig>,
    pub sonarr: Vec<InstanceConfig>,
}

/// Renamer behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenamerConfig {
    pub source_dir: Option<PathBuf>,
    #[serde(deserialize_with = "one_or_many")]
    pub source_overrides: Vec<PathBuf>,
    pub destination_dir: Option<PathBuf>,
    pub asset_folders: bool,
    pub collection_threshold: u8,
    pub action_type: FileAction,
    pub print_only_renames: bool,
    pub dry_run: bool,
    /// Plex libraries whose collections are processed
    pub library_names: Vec<String>,
    /// Instance names to process, per instance type
    pub plex: Vec<String>,
    pub radarr: Vec<String>,
    pub sonarr: Vec<String>,
}

impl Default for RenamerConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            source_overrides: Vec::new(),
            destination_dir: None,
            asset_folders: false,
            collection_threshold: DEFAULT_COLLECTION_THRESHOLD,
            action_type: FileAction::Copy,
            print_only_renames: false,
            dry_run: false,
            library_names: Vec::new(),
            plex: Vec::new(),
            radarr: Vec::new(),
            sonarr: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook: Option<String>,
}

/// Word lists used by the normalizer and matchers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub noise_words: Vec<String>,
    pub season_words: Vec<String>,
    pub specials_words: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            prefixes: strings(DEFAULT_PREFIXES),
            suffixes: strings(DEFAULT_SUFFIXES),
            noise_words: strings(DEFAULT_NOISE_WORDS),
            season_words: strings(DEFAULT_SEASON_WORDS),
            specials_words: strings(DEFAULT_SPECIALS_WORDS),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub renamer: RenamerConfig,
    pub instances: InstancesConfig,
    pub discord: DiscordConfig,
    pub matching: MatchingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            renamer: RenamerConfig::default(),
            instances: InstancesConfig::default(),
            discord: DiscordConfig::default(),
            matching: MatchingConfig::default(),
        }
    }
}

impl Config {
    /// Config file location: explicit path, else `RENAMER_CONFIG`, else `./config.yml`.
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_yaml(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw).context("Failed to parse YAML")?;
        Ok(config)
    }

    /// Apply environment overrides looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(DRY_RUN_ENV) {
            self.renamer.dry_run = matches!(value.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(value) = lookup(DESTINATION_DIR_ENV).filter(|v| !v.is_empty()) {
            self.renamer.destination_dir = Some(PathBuf::from(value));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.renamer.collection_threshold > 100 {
            anyhow::bail!(
                "collection_threshold must be between 0 and 100, got {}",
                self.renamer.collection_threshold
            );
        }
        if self.renamer.destination_dir.is_none() {
            anyhow::bail!("renamer.destination_dir is required");
        }
        if self.renamer.source_dir.is_none() && self.renamer.source_overrides.is_empty() {
            anyhow::bail!("renamer.source_dir or renamer.source_overrides is required");
        }
        Ok(())
    }

    /// Instances listed in the renamer section, in Plex, Radarr, Sonarr order.
    pub fn selected_instances(&self) -> Vec<(InstanceType, &InstanceConfig)> {
        let mut selected = Vec::new();
        for (instance_type, instances, names) in [
            (InstanceType::Plex, &self.instances.plex, &self.renamer.plex),
            (InstanceType::Radarr, &self.instances.radarr, &self.renamer.radarr),
            (InstanceType::Sonarr, &self.instances.sonarr, &self.renamer.sonarr),
        ] {
            selected.extend(
                instances
                    .iter()
                    .filter(|i| names.contains(&i.name))
                    .map(|i| (instance_type, i)),
            );
        }
        selected
    }

    pub fn normalizer(&self) -> TitleNormalizer {
        TitleNormalizer::new(self.matching.noise_words.clone())
    }

    fn season_markers(&self) -> Result<SeasonMarkers> {
        SeasonMarkers::new(&self.matching.season_words, &self.matching.specials_words)
            .context("Invalid season words")
    }

    pub fn scan_options(&self) -> Result<ScanOptions> {
        Ok(ScanOptions {
            normalizer: self.normalizer(),
            season_markers: self.season_markers()?,
        })
    }

    pub fn match_options(&self) -> Result<MatchOptions> {
        Ok(MatchOptions {
            normalizer: self.normalizer(),
            affixes: TitleAffixes::new(&self.matching.prefixes, &self.matching.suffixes)
                .context("Invalid prefixes or suffixes")?,
            threshold: self.renamer.collection_threshold,
        })
    }

    pub fn organize_options(&self) -> Result<OrganizeOptions> {
        let destination_dir = self
            .renamer
            .destination_dir
            .clone()
            .context("renamer.destination_dir is required")?;
        Ok(OrganizeOptions {
            destination_dir,
            asset_folders: self.renamer.asset_folders,
            dry_run: self.renamer.dry_run,
            action: self.renamer.action_type,
            print_only_renames: self.renamer.print_only_renames,
            season_markers: self.season_markers()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
log_level: debug
renamer:
  source_dir: /assets
  source_overrides: /overrides
  destination_dir: /posters
  asset_folders: true
  collection_threshold: 95
  action_type: hardlink
  library_names:
    - Movies
  plex:
    - plex_1
  radarr:
    - radarr_1
instances:
  plex:
    - name: plex_1
      url: http://plex:32400
      api: token
  radarr:
    - name: radarr_1
      url: http://radarr:7878
      api: key
    - name: radarr_4k
      url: http://radarr4k:7878
      api: key
  sonarr:
    - name: sonarr_1
      url: http://sonarr:8989
      api: key
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.renamer.source_overrides, vec![PathBuf::from("/overrides")]);
        assert_eq!(config.renamer.action_type, FileAction::Hardlink);
        assert_eq!(config.renamer.collection_threshold, 95);
        assert_eq!(config.matching.prefixes, vec!["The", "A", "An"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides_accept_a_list() {
        let config = Config::from_yaml(
            "renamer:\n  destination_dir: /d\n  source_overrides:\n    - /a\n    - /b\n",
        )
        .unwrap();
        assert_eq!(
            config.renamer.source_overrides,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert_eq!(config.renamer.collection_threshold, 90);
    }

    #[test]
    fn test_selected_instances_follow_renamer_lists() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let selected: Vec<(InstanceType, &str)> = config
            .selected_instances()
            .into_iter()
            .map(|(t, i)| (t, i.name.as_str()))
            .collect();
        assert_eq!(
            selected,
            vec![(InstanceType::Plex, "plex_1"), (InstanceType::Radarr, "radarr_1")]
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_yaml(SAMPLE).unwrap();
        config.apply_overrides(|key| match key {
            DRY_RUN_ENV => Some("TRUE".to_string()),
            DESTINATION_DIR_ENV => Some("/elsewhere".to_string()),
            _ => None,
        });
        assert!(config.renamer.dry_run);
        assert_eq!(config.renamer.destination_dir, Some(PathBuf::from("/elsewhere")));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::from_yaml(SAMPLE).unwrap();
        config.renamer.collection_threshold = 101;
        assert!(config.validate().is_err());

        let config = Config::from_yaml("renamer:\n  source_dir: /a\n").unwrap();
        assert!(config.validate().is_err());
        assert!(config.organize_options().is_err());
    }

    #[test]
    fn test_option_builders() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let organize = config.organize_options().unwrap();
        assert!(organize.asset_folders);
        assert_eq!(organize.action, FileAction::Hardlink);
        assert_eq!(config.match_options().unwrap().threshold, 95);
        assert!(config.scan_options().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
