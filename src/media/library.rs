//! Movies and series as reported by the library indexers

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::services::scanner::AssetCategory;
use crate::services::text_utils::{self, TitleNormalizer};

/// Which kind of library an instance serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
    Movies,
    Series,
}

impl LibraryKind {
    pub fn asset_category(&self) -> AssetCategory {
        match self {
            Self::Movies => AssetCategory::Movie,
            Self::Series => AssetCategory::Series,
        }
    }
}

/// Lifecycle status of a library entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryStatus {
    Announced,
    Upcoming,
    InCinemas,
    Released,
    Continuing,
    Ended,
    Deleted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EntryStatus {
    /// Not yet released; such entries usually have no dated folder yet.
    pub fn is_unreleased(&self) -> bool {
        matches!(self, Self::Announced | Self::Upcoming)
    }
}

/// Raw library record handed over by a library source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub title: String,
    pub original_title: Option<String>,
    pub alternate_titles: Vec<String>,
    /// Filesystem path of the title's folder on the media server
    pub path: String,
    pub year: Option<i32>,
    pub secondary_year: Option<i32>,
    pub status: EntryStatus,
}

/// Library entry with every derived key the matcher compares against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryEntry {
    pub title: String,
    pub normalized_title: String,
    pub original_title: Option<String>,
    pub alternate_titles: Vec<String>,
    pub normalized_alternate_titles: Vec<String>,
    pub path: String,
    /// Year-stripped base name of `path`
    pub path_title: String,
    pub normalized_path_title: String,
    /// Year parsed from the title, else the catalog year
    pub primary_year: Option<i32>,
    pub catalog_year: Option<i32>,
    pub secondary_year: Option<i32>,
    /// Year parsed from the folder path
    pub path_year: Option<i32>,
    pub status: EntryStatus,
}

impl LibraryEntry {
    pub fn from_item(item: LibraryItem, normalizer: &TitleNormalizer) -> Self {
        let catalog_year = item.year.filter(|y| *y > 0);
        let primary_year = text_utils::extract_year(&item.title).or(catalog_year);
        let path_year = text_utils::extract_year(&item.path);

        let path_title = text_utils::strip_year(&folder_name(&item.path))
            .trim()
            .to_string();

        Self {
            normalized_title: normalizer.normalize(&item.title),
            normalized_alternate_titles: item
                .alternate_titles
                .iter()
                .map(|t| normalizer.normalize(t))
                .collect(),
            normalized_path_title: normalizer.normalize(&path_title),
            path_title,
            primary_year,
            catalog_year,
            secondary_year: item.secondary_year.filter(|y| *y > 0),
            path_year,
            title: item.title,
            original_title: item.original_title.filter(|t| !t.is_empty()),
            alternate_titles: item.alternate_titles,
            path: item.path,
            status: item.status,
        }
    }

    /// Destination folder name for this entry's assets.
    pub fn folder(&self) -> String {
        folder_name(&self.path)
    }

    /// Every year the entry may be filed under, without duplicates.
    pub fn candidate_years(&self) -> Vec<i32> {
        let mut years = Vec::with_capacity(4);
        for year in [
            self.primary_year,
            self.catalog_year,
            self.secondary_year,
            self.path_year,
        ]
        .into_iter()
        .flatten()
        {
            if !years.contains(&year) {
                years.push(year);
            }
        }
        years
    }
}

/// Base name of a path, ignoring trailing separators.
fn folder_name(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}
