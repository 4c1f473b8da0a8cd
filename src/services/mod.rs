//! Renamer services and external integrations

pub mod arr;
pub mod file_matcher;
pub mod file_utils;
pub mod filename_parser;
pub mod logging;
pub mod notifications;
pub mod organizer;
pub mod plex;
pub mod scanner;
pub mod sources;
pub mod text_utils;

pub use arr::ArrClient;
pub use file_matcher::{
    CollectionMatcher, ConfidenceBucket, LibraryMatcher, MatchOptions, MatchOutcome, MatchRecord,
};
pub use notifications::DiscordNotifier;
pub use organizer::{FileAction, OrganizeError, OrganizeOptions, OrganizeReport, Organizer};
pub use plex::PlexClient;
pub use scanner::{AssetBundle, AssetCategory, AssetInventory, ScanOptions};
pub use sources::{CollectionSource, LibrarySource, LogSink, ReportSink};
pub use text_utils::TitleNormalizer;
