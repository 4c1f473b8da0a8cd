//! Matching engine
//!
//! Reconciles library titles with asset bundles. Two strategies:
//!
//! - **Collections** have no year, so names are fuzzy-scored against every
//!   collection bundle title and its prefix/suffix-stripped variants. The best
//!   score is bucketed into matched / almost matched / not matched.
//! - **Movies and series** are matched exactly: some title form of the entry
//!   must equal the bundle's raw or normalized title, and some year of the entry
//!   must equal the bundle year.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use super::scanner::AssetBundle;
use super::text_utils::{self, TitleAffixes, TitleNormalizer};
use crate::media::LibraryEntry;

/// Default fuzzy score required for a collection match
pub const DEFAULT_COLLECTION_THRESHOLD: u8 = 90;

/// Width of the almost-matched band below the threshold
pub const ALMOST_MATCHED_BAND: u8 = 10;

pub const DEFAULT_PREFIXES: &[&str] = &["The", "A", "An"];
pub const DEFAULT_SUFFIXES: &[&str] = &["Collection"];

/// Confidence bucket of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBucket {
    Matched,
    AlmostMatched,
    NotMatched,
}

impl ConfidenceBucket {
    /// Bucket a fuzzy score against `threshold`.
    pub fn from_score(score: u8, threshold: u8) -> Self {
        if score >= threshold {
            Self::Matched
        } else if score >= threshold.saturating_sub(ALMOST_MATCHED_BAND) {
            Self::AlmostMatched
        } else {
            Self::NotMatched
        }
    }
}

/// Outcome of evaluating one library entry or collection against one bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    /// Library-side title (entry title or collection name)
    pub source_title: String,
    pub normalized_source_title: String,
    /// Asset bundle title
    pub target_title: String,
    pub normalized_target_title: String,
    pub year: Option<i32>,
    pub files: Vec<PathBuf>,
    /// Fuzzy score; `None` for exact (movie/series) matches
    pub score: Option<u8>,
    pub bucket: ConfidenceBucket,
    /// Destination folder name
    pub folder: String,
}

/// Match records of one run, split by confidence
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchOutcome {
    pub matched: Vec<MatchRecord>,
    pub almost_matched: Vec<MatchRecord>,
    pub not_matched: Vec<MatchRecord>,
}

impl MatchOutcome {
    pub fn push(&mut self, record: MatchRecord) {
        match record.bucket {
            ConfidenceBucket::Matched => self.matched.push(record),
            ConfidenceBucket::AlmostMatched => self.almost_matched.push(record),
            ConfidenceBucket::NotMatched => self.not_matched.push(record),
        }
    }

    /// Dump every bucket at debug level.
    pub fn log_diagnostics(&self, label: &str) {
        for (bucket, records) in [
            ("matched", &self.matched),
            ("almost_matched", &self.almost_matched),
            ("not_matched", &self.not_matched),
        ] {
            if records.is_empty() {
                continue;
            }
            match serde_json::to_string_pretty(records) {
                Ok(json) => debug!(label = label, bucket = bucket, count = records.len(), "{}", json),
                Err(e) => debug!(label = label, bucket = bucket, error = %e, "Failed to serialize match records"),
            }
        }
    }
}

/// Options shared by both matchers
#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub normalizer: TitleNormalizer,
    pub affixes: TitleAffixes,
    /// Collection threshold, 0-100
    pub threshold: u8,
}

impl Default for MatchOptions {
    fn default() -> Self {
        let prefixes: Vec<String> = DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect();
        let suffixes: Vec<String> = DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect();
        Self {
            normalizer: TitleNormalizer::default(),
            affixes: TitleAffixes::new(&prefixes, &suffixes).expect("default affixes are valid"),
            threshold: DEFAULT_COLLECTION_THRESHOLD,
        }
    }
}

// =========================================================================
// Collections
// =========================================================================

/// Which query form a variant is scored against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariantSide {
    Raw,
    Normalized,
}

#[derive(Debug, Clone)]
struct TitleVariant {
    text: String,
    processed: String,
    side: VariantSide,
}

/// Best scoring variant for one collection name
#[derive(Debug, Clone, PartialEq)]
struct BestCandidate<'a> {
    text: &'a str,
    score: u8,
}

/// Fuzzy matcher over collection bundles.
///
/// Every variant of every bundle title is computed once when the matcher is
/// built; names are then scored against the precomputed list.
pub struct CollectionMatcher<'a> {
    bundles: &'a [AssetBundle],
    options: &'a MatchOptions,
    variants: Vec<TitleVariant>,
    /// Variant text -> lowest index of the bundles owning it
    owners: HashMap<String, usize>,
}

impl<'a> CollectionMatcher<'a> {
    pub fn new(bundles: &'a [AssetBundle], options: &'a MatchOptions) -> Self {
        let mut variants = Vec::new();
        let mut owners: HashMap<String, usize> = HashMap::new();

        let mut add = |text: String, side: VariantSide, owner: usize| {
            owners
                .entry(text.clone())
                .and_modify(|o| *o = (*o).min(owner))
                .or_insert(owner);
            variants.push(TitleVariant {
                processed: text_utils::full_process(&text),
                text,
                side,
            });
        };

        // Variant lists in scoring order: raw titles, normalized titles, then
        // per prefix and per suffix the stripped raw and normalized titles.
        for (idx, bundle) in bundles.iter().enumerate() {
            add(bundle.title.clone(), VariantSide::Raw, idx);
        }
        for (idx, bundle) in bundles.iter().enumerate() {
            add(bundle.normalized_title.clone(), VariantSide::Normalized, idx);
        }

        let prefix_count = options.affixes.prefix_count();
        let stripped: Vec<(Vec<String>, Vec<String>)> = bundles
            .iter()
            .map(|b| {
                (
                    options.affixes.without_prefixes(&b.title),
                    options.affixes.without_prefixes(&b.normalized_title),
                )
            })
            .collect();
        for p in 0..prefix_count {
            for (idx, (raw, normalized)) in stripped.iter().enumerate() {
                add(raw[p].clone(), VariantSide::Raw, idx);
                add(normalized[p].clone(), VariantSide::Normalized, idx);
            }
        }

        let suffix_count = options.affixes.suffix_count();
        let stripped: Vec<(Vec<String>, Vec<String>)> = bundles
            .iter()
            .map(|b| {
                (
                    options.affixes.without_suffixes(&b.title),
                    options.affixes.without_suffixes(&b.normalized_title),
                )
            })
            .collect();
        for s in 0..suffix_count {
            for (idx, (raw, normalized)) in stripped.iter().enumerate() {
                add(raw[s].clone(), VariantSide::Raw, idx);
                add(normalized[s].clone(), VariantSide::Normalized, idx);
            }
        }

        debug!(
            bundles = bundles.len(),
            variants = variants.len(),
            "Built collection variant index"
        );

        Self {
            bundles,
            options,
            variants,
            owners,
        }
    }

    /// Highest scoring variant for `name`. Ties prefer the variant equal to
    /// `name`, then the earliest variant.
    fn best_candidate(&self, name: &str, normalized: &str) -> Option<BestCandidate<'_>> {
        let raw_query = text_utils::full_process(name);
        let normalized_query = text_utils::full_process(normalized);

        let mut best: Option<BestCandidate<'_>> = None;
        for variant in &self.variants {
            let query = match variant.side {
                VariantSide::Raw => &raw_query,
                VariantSide::Normalized => &normalized_query,
            };
            let score = text_utils::ratio_processed(query, &variant.processed);
            let replace = match &best {
                None => true,
                Some(current) => {
                    score > current.score || (score == current.score && variant.text == name)
                }
            };
            if replace {
                best = Some(BestCandidate {
                    text: &variant.text,
                    score,
                });
            }
        }
        best
    }

    /// Match a single collection name. `None` when there are no bundles.
    pub fn match_collection(&self, name: &str) -> Option<MatchRecord> {
        let normalized = self.options.normalizer.normalize(name);
        let best = self.best_candidate(name, &normalized)?;
        let owner = *self.owners.get(best.text)?;
        let bundle = &self.bundles[owner];

        Some(MatchRecord {
            source_title: name.to_string(),
            normalized_source_title: normalized,
            target_title: bundle.title.clone(),
            normalized_target_title: bundle.normalized_title.clone(),
            year: None,
            files: bundle.files.clone(),
            score: Some(best.score),
            bucket: ConfidenceBucket::from_score(best.score, self.options.threshold),
            folder: text_utils::strip_illegal_chars(name),
        })
    }

    pub fn match_collections(&self, names: &[String]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        for (i, name) in names.iter().enumerate() {
            debug!(collection = %name, progress = i + 1, total = names.len(), "Matching collection");
            if let Some(record) = self.match_collection(name) {
                outcome.push(record);
            }
        }
        outcome
    }
}

// =========================================================================
// Movies and series
// =========================================================================

/// Result of looking up one library entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryLookup {
    /// Title and year match; index of the first matching bundle
    Matched(usize),
    /// Title matches but no year does
    YearMismatch(Vec<usize>),
    NoMatch,
}

/// Exact matcher over movie or series bundles.
///
/// Bundles are indexed by (title, year) for raw and normalized titles. When
/// several bundles share a key the earliest one in list order wins.
pub struct LibraryMatcher<'a> {
    bundles: &'a [AssetBundle],
    by_title_year: HashMap<(&'a str, Option<i32>), usize>,
    by_normalized_year: HashMap<(&'a str, Option<i32>), usize>,
    by_title: HashMap<&'a str, Vec<usize>>,
    by_normalized: HashMap<&'a str, Vec<usize>>,
}

impl<'a> LibraryMatcher<'a> {
    pub fn new(bundles: &'a [AssetBundle]) -> Self {
        let mut by_title_year = HashMap::new();
        let mut by_normalized_year = HashMap::new();
        let mut by_title: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut by_normalized: HashMap<&str, Vec<usize>> = HashMap::new();

        for (idx, bundle) in bundles.iter().enumerate() {
            by_title_year
                .entry((bundle.title.as_str(), bundle.year))
                .or_insert(idx);
            by_normalized_year
                .entry((bundle.normalized_title.as_str(), bundle.year))
                .or_insert(idx);
            by_title.entry(bundle.title.as_str()).or_default().push(idx);
            by_normalized
                .entry(bundle.normalized_title.as_str())
                .or_default()
                .push(idx);
        }

        Self {
            bundles,
            by_title_year,
            by_normalized_year,
            by_title,
            by_normalized,
        }
    }

    pub fn bundle(&self, idx: usize) -> &'a AssetBundle {
        &self.bundles[idx]
    }

    fn raw_titles<'e>(entry: &'e LibraryEntry) -> impl Iterator<Item = &'e str> {
        [Some(entry.title.as_str()), Some(entry.path_title.as_str()), entry.original_title.as_deref()]
            .into_iter()
            .flatten()
            .chain(entry.alternate_titles.iter().map(String::as_str))
    }

    fn normalized_titles<'e>(entry: &'e LibraryEntry) -> impl Iterator<Item = &'e str> {
        [entry.normalized_title.as_str(), entry.normalized_path_title.as_str()]
            .into_iter()
            .chain(entry.normalized_alternate_titles.iter().map(String::as_str))
    }

    /// Find the bundle for `entry`.
    pub fn lookup(&self, entry: &LibraryEntry) -> EntryLookup {
        let years = entry.candidate_years();

        let matched = years
            .iter()
            .flat_map(|year| {
                let raw = Self::raw_titles(entry)
                    .filter_map(move |title| self.by_title_year.get(&(title, Some(*year))));
                let normalized = Self::normalized_titles(entry)
                    .filter(|title| !title.is_empty())
                    .filter_map(move |title| self.by_normalized_year.get(&(title, Some(*year))));
                raw.chain(normalized)
            })
            .copied()
            .min();
        if let Some(idx) = matched {
            return EntryLookup::Matched(idx);
        }

        let mut title_only: Vec<usize> = Self::raw_titles(entry)
            .filter_map(|title| self.by_title.get(title))
            .chain(
                Self::normalized_titles(entry)
                    .filter(|title| !title.is_empty())
                    .filter_map(|title| self.by_normalized.get(title)),
            )
            .flatten()
            .copied()
            .collect();
        title_only.sort_unstable();
        title_only.dedup();

        if title_only.is_empty() {
            EntryLookup::NoMatch
        } else {
            EntryLookup::YearMismatch(title_only)
        }
    }

    fn record(&self, entry: &LibraryEntry, idx: usize, bucket: ConfidenceBucket) -> MatchRecord {
        let bundle = self.bundle(idx);
        MatchRecord {
            source_title: entry.title.clone(),
            normalized_source_title: entry.normalized_title.clone(),
            target_title: bundle.title.clone(),
            normalized_target_title: bundle.normalized_title.clone(),
            year: bundle.year,
            files: bundle.files.clone(),
            score: None,
            bucket,
            folder: entry.folder(),
        }
    }

    /// Match every entry. Year-mismatched title matches land in `not_matched`
    /// for diagnostics only.
    pub fn match_entries(&self, entries: &[LibraryEntry]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        for (i, entry) in entries.iter().enumerate() {
            debug!(title = %entry.title, progress = i + 1, total = entries.len(), "Matching media");

            if entry.path_year.is_none() {
                if entry.status.is_unreleased() {
                    continue;
                }
                warn!(title = %entry.title, path = %entry.path, "Unable to find year in path");
            }
            if entry.candidate_years().is_empty() {
                warn!(title = %entry.title, "No usable year for entry, skipping");
                continue;
            }

            match self.lookup(entry) {
                EntryLookup::Matched(idx) => {
                    outcome.push(self.record(entry, idx, ConfidenceBucket::Matched));
                }
                EntryLookup::YearMismatch(indices) => {
                    for idx in indices {
                        outcome.push(self.record(entry, idx, ConfidenceBucket::NotMatched));
                    }
                }
                EntryLookup::NoMatch => {}
            }
        }

        outcome
    }
}
