//! Asset inventory scanner
//!
//! Scans a primary asset directory plus any number of override directories and
//! groups poster files into per-title bundles:
//! - files without a `(YYYY)` token are collection assets
//! - files carrying a season marker (or whose stem prefixes a sibling season
//!   poster) are series assets
//! - everything else is a movie asset
//!
//! Override directories are merged after the primary directory. An override
//! file replaces any existing file of the same name in the matching bundle and
//! is appended otherwise, so overrides can add assets or swap single images.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use super::filename_parser::{self, SeasonMarkers};
use super::text_utils::TitleNormalizer;

/// Asset category a bundle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Movie,
    Series,
    Collection,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movies",
            Self::Series => "series",
            Self::Collection => "collections",
        }
    }
}

/// Category-specific bundle data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum AssetKind {
    Movie,
    /// Seasons present among the bundle files (0 = specials)
    Series { seasons: BTreeSet<u32> },
    Collection,
}

impl AssetKind {
    pub fn category(&self) -> AssetCategory {
        match self {
            Self::Movie => AssetCategory::Movie,
            Self::Series { .. } => AssetCategory::Series,
            Self::Collection => AssetCategory::Collection,
        }
    }

    fn empty(category: AssetCategory) -> Self {
        match category {
            AssetCategory::Movie => Self::Movie,
            AssetCategory::Series => Self::Series {
                seasons: BTreeSet::new(),
            },
            AssetCategory::Collection => Self::Collection,
        }
    }
}

/// Image files belonging to one (title, year) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetBundle {
    pub kind: AssetKind,
    pub title: String,
    pub normalized_title: String,
    pub year: Option<i32>,
    pub files: Vec<PathBuf>,
}

impl AssetBundle {
    pub fn new(category: AssetCategory, title: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            kind: AssetKind::empty(category),
            title: title.into(),
            normalized_title: String::new(),
            year,
            files: Vec::new(),
        }
    }

    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn category(&self) -> AssetCategory {
        self.kind.category()
    }

    /// Seasons covered by a series bundle; `None` for other categories.
    pub fn seasons(&self) -> Option<&BTreeSet<u32>> {
        match &self.kind {
            AssetKind::Series { seasons } => Some(seasons),
            _ => None,
        }
    }

    fn is_same_asset(&self, title: &str, year: Option<i32>) -> bool {
        self.title == title && self.year == year
    }

    /// Insert an override file, replacing an existing file of the same name.
    fn upsert_file(&mut self, file: PathBuf) {
        let name = file.file_name().map(|n| n.to_owned());
        self.files.retain(|existing| existing.file_name().map(|n| n.to_owned()) != name);
        self.files.push(file);
    }

    fn finalize(&mut self, normalizer: &TitleNormalizer, markers: &SeasonMarkers) {
        self.normalized_title = normalizer.normalize(&self.title);
        self.files.sort();

        if let AssetKind::Series { seasons } = &mut self.kind {
            seasons.clear();
            for file in &self.files {
                let name = file_name_str(file);
                if markers.contains_marker(&name)
                    && let Some(tag) = markers.season_tag(&name)
                {
                    seasons.insert(tag.number());
                }
            }
        }
    }
}

/// Options for building an inventory
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub normalizer: TitleNormalizer,
    pub season_markers: SeasonMarkers,
}

/// All bundles found in the asset directories, split by category
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetInventory {
    pub movies: Vec<AssetBundle>,
    pub series: Vec<AssetBundle>,
    pub collections: Vec<AssetBundle>,
    #[serde(skip)]
    override_dirs: Vec<PathBuf>,
}

impl AssetInventory {
    /// Scan `primary_dir` and merge `override_dirs` on top of it, in order.
    pub fn build(
        primary_dir: Option<&Path>,
        override_dirs: &[PathBuf],
        options: &ScanOptions,
    ) -> Self {
        let mut inventory = AssetInventory::default();

        if let Some(dir) = primary_dir {
            let files = list_asset_files(dir);
            info!(
                directory = %dir.display(),
                files = files.len(),
                "Sorting assets from primary directory"
            );
            inventory.sort_files(dir, &files, &options.season_markers);
        }

        for dir in override_dirs {
            let files = list_asset_files(dir);
            info!(
                directory = %dir.display(),
                files = files.len(),
                "Processing override directory"
            );
            let mut overrides = AssetInventory::default();
            overrides.sort_files(dir, &files, &options.season_markers);
            inventory.merge_overrides(overrides, dir);
        }

        inventory.override_dirs = override_dirs.to_vec();

        for bundle in inventory
            .movies
            .iter_mut()
            .chain(inventory.series.iter_mut())
            .chain(inventory.collections.iter_mut())
        {
            bundle.finalize(&options.normalizer, &options.season_markers);
        }

        for bundle in &inventory.series {
            if let Some(seasons) = bundle.seasons() {
                debug!(title = %bundle.title, year = ?bundle.year, seasons = ?seasons, "Series seasons");
            }
        }

        debug!(
            movies = inventory.movies.len(),
            series = inventory.series.len(),
            collections = inventory.collections.len(),
            "Asset inventory built"
        );

        inventory
    }

    pub fn bundles(&self, category: AssetCategory) -> &[AssetBundle] {
        match category {
            AssetCategory::Movie => &self.movies,
            AssetCategory::Series => &self.series,
            AssetCategory::Collection => &self.collections,
        }
    }

    fn bundles_mut(&mut self, category: AssetCategory) -> &mut Vec<AssetBundle> {
        match category {
            AssetCategory::Movie => &mut self.movies,
            AssetCategory::Series => &mut self.series,
            AssetCategory::Collection => &mut self.collections,
        }
    }

    /// Whether `file` was picked up from one of the override directories.
    pub fn is_override_source(&self, file: &Path) -> bool {
        file.parent()
            .is_some_and(|parent| self.override_dirs.iter().any(|dir| dir.as_path() == parent))
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && self.series.is_empty() && self.collections.is_empty()
    }

    /// Classify every file of one directory into bundles.
    fn sort_files(&mut self, dir: &Path, files: &[String], markers: &SeasonMarkers) {
        let show_stems = season_poster_stems(files, markers);

        for file in files {
            if file.starts_with('.') {
                continue;
            }
            let full_path = dir.join(file);
            let (stem, _) = filename_parser::split_extension(file);
            let parsed = filename_parser::parse_asset_stem(stem);

            let Some(year) = parsed.year else {
                self.add_file(AssetCategory::Collection, stem, None, full_path);
                continue;
            };

            if show_stems.contains(stem) {
                self.add_file(AssetCategory::Series, &parsed.title, Some(year), full_path);
            } else if markers.contains_marker(file) {
                let mut title = parsed.title.as_str();
                while let Some(marker) = markers.find_marker(title) {
                    title = title.split(marker).next().unwrap_or_default();
                }
                self.add_file(AssetCategory::Series, title.trim(), Some(year), full_path);
            } else {
                self.add_file(AssetCategory::Movie, &parsed.title, Some(year), full_path);
            }
        }
    }

    fn add_file(&mut self, category: AssetCategory, title: &str, year: Option<i32>, file: PathBuf) {
        let bundles = self.bundles_mut(category);
        match bundles.iter_mut().find(|b| b.is_same_asset(title, year)) {
            Some(bundle) => bundle.files.push(file),
            None => bundles.push(AssetBundle::new(category, title, year).with_files([file])),
        }
    }

    /// Merge bundles scanned from one override directory.
    fn merge_overrides(&mut self, overrides: AssetInventory, source: &Path) {
        for (category, bundles) in [
            (AssetCategory::Series, overrides.series),
            (AssetCategory::Movie, overrides.movies),
            (AssetCategory::Collection, overrides.collections),
        ] {
            merge_bundles(self.bundles_mut(category), bundles, source);
        }
    }
}

/// Apply override bundles onto `existing`, matching by (title, year).
pub fn merge_bundles(existing: &mut Vec<AssetBundle>, overrides: Vec<AssetBundle>, source: &Path) {
    for override_bundle in overrides {
        match existing
            .iter_mut()
            .find(|b| b.is_same_asset(&override_bundle.title, override_bundle.year))
        {
            Some(bundle) => {
                for file in override_bundle.files {
                    debug!(
                        file = %file.display(),
                        title = %bundle.title,
                        "Override: replacing asset file"
                    );
                    bundle.upsert_file(file);
                }
            }
            None => {
                debug!(
                    title = %override_bundle.title,
                    category = override_bundle.category().as_str(),
                    source = %source.display(),
                    "Override: adding new asset"
                );
                existing.push(override_bundle);
            }
        }
    }
}

/// Every file name prefix that is directly followed by a season marker.
///
/// A stem in this set has at least one season poster next to it, which makes
/// the file carrying that stem the show's main poster.
fn season_poster_stems<'a>(files: &'a [String], markers: &SeasonMarkers) -> HashSet<&'a str> {
    let mut stems = HashSet::new();
    for file in files {
        for marker in markers.markers() {
            for (pos, _) in file.match_indices(marker.as_str()) {
                stems.insert(&file[..pos]);
            }
        }
    }
    stems
}

/// List file names directly inside `dir`, sorted by name.
///
/// A missing or unreadable directory is logged and yields no files.
fn list_asset_files(dir: &Path) -> Vec<String> {
    if !dir.is_dir() {
        error!(path = %dir.display(), "Path not found");
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!(path = %dir.display(), error = %e, "Failed to read asset directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
        .collect()
}

fn file_name_str(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
