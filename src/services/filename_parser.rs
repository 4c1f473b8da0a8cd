//! Asset filename parser
//!
//! Parses poster filenames like:
//! - "The Matrix (1999).jpg"
//! - "Breaking Bad (2008) - Season 1.png"
//! - "Breaking Bad (2008) - Specials.jpg"
//! - "Dark (2017)_Season02.jpg"
//! - "Alien Collection.jpg"

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Any four-digit parenthesized token; presence makes a file a movie or series asset.
static YEAR_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d{4})\)").unwrap());

pub const DEFAULT_SEASON_WORDS: &[&str] = &["Season", "Staffel", "Saison", "Temporada", "Stagione"];
pub const DEFAULT_SPECIALS_WORDS: &[&str] = &["Specials"];

/// Season information found in an asset filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeasonTag {
    /// Explicit season number
    Number(u32),
    /// Specials, stored as season 0
    Specials,
}

impl SeasonTag {
    pub fn number(&self) -> u32 {
        match self {
            Self::Number(n) => *n,
            Self::Specials => 0,
        }
    }
}

/// Localized set of markers that identify season posters.
///
/// A marker is `" - <word>"` or `"_<word>"` for season words and `" - <word>"`
/// for specials words. Marker detection is case-sensitive.
#[derive(Debug, Clone)]
pub struct SeasonMarkers {
    markers: Vec<String>,
    specials_markers: Vec<String>,
    number_regex: Option<Regex>,
}

impl Default for SeasonMarkers {
    fn default() -> Self {
        let season_words: Vec<String> = DEFAULT_SEASON_WORDS.iter().map(|w| w.to_string()).collect();
        let specials_words: Vec<String> =
            DEFAULT_SPECIALS_WORDS.iter().map(|w| w.to_string()).collect();
        Self::new(&season_words, &specials_words).expect("default season markers are valid")
    }
}

impl SeasonMarkers {
    pub fn new(season_words: &[String], specials_words: &[String]) -> Result<Self, regex::Error> {
        let season_words: Vec<&String> = season_words.iter().filter(|w| !w.is_empty()).collect();
        let specials_words: Vec<&String> =
            specials_words.iter().filter(|w| !w.is_empty()).collect();

        let mut markers = Vec::new();
        for word in &season_words {
            markers.push(format!(" - {}", word));
            markers.push(format!("_{}", word));
        }
        let specials_markers: Vec<String> =
            specials_words.iter().map(|w| format!(" - {}", w)).collect();
        markers.extend(specials_markers.iter().cloned());

        let number_regex = if season_words.is_empty() {
            None
        } else {
            let alternation = season_words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(
                r"(?:\s-\s|_)(?:{})\s*(\d+)",
                alternation
            ))?)
        };

        Ok(Self {
            markers,
            specials_markers,
            number_regex,
        })
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// First marker (in configuration order) contained in `text`.
    pub fn find_marker(&self, text: &str) -> Option<&str> {
        self.markers
            .iter()
            .find(|m| text.contains(m.as_str()))
            .map(|m| m.as_str())
    }

    pub fn contains_marker(&self, text: &str) -> bool {
        self.find_marker(text).is_some()
    }

    /// Resolve the season of a season poster filename.
    ///
    /// Numbered markers win over specials markers. Returns `None` when the
    /// filename has a marker but no resolvable number.
    pub fn season_tag(&self, file_name: &str) -> Option<SeasonTag> {
        if let Some(number) = self
            .number_regex
            .as_ref()
            .and_then(|re| re.captures(file_name))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            return Some(SeasonTag::Number(number));
        }

        if self
            .specials_markers
            .iter()
            .any(|m| file_name.contains(m.as_str()))
        {
            return Some(SeasonTag::Specials);
        }

        None
    }
}

/// Title and year parsed from an asset file stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAssetName {
    pub title: String,
    pub year: Option<i32>,
}

/// Split an asset stem into title and year.
///
/// `"The Matrix (1999)"` becomes `("The Matrix", Some(1999))`; a stem without a
/// four-digit parenthesized token is returned whole with no year.
pub fn parse_asset_stem(stem: &str) -> ParsedAssetName {
    let Some(caps) = YEAR_TOKEN_REGEX.captures(stem) else {
        return ParsedAssetName {
            title: stem.to_string(),
            year: None,
        };
    };

    let year: Option<i32> = caps.get(1).and_then(|m| m.as_str().parse().ok());
    let token = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
    let title = stem.replacen(token, "", 1).trim().to_string();

    debug!(stem = stem, title = %title, year = ?year, "Parsed asset name");

    ParsedAssetName { title, year }
}

/// Split a file name into stem and extension (extension keeps its leading dot).
///
/// Dot-files have no extension, matching `os.path.splitext` semantics.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(pos) => {
            let (stem, ext) = file_name.split_at(pos);
            if stem.chars().all(|c| c == '.') {
                (file_name, "")
            } else {
                (stem, ext)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_asset_stem_with_year() {
        let parsed = parse_asset_stem("The Matrix (1999)");
        assert_eq!(parsed.title, "The Matrix");
        assert_eq!(parsed.year, Some(1999));
    }

    #[test]
    fn test_parse_asset_stem_collection() {
        let parsed = parse_asset_stem("Alien Collection");
        assert_eq!(parsed.title, "Alien Collection");
        assert_eq!(parsed.year, None);
    }

    #[test]
    fn test_parse_asset_stem_season() {
        let parsed = parse_asset_stem("Breaking Bad (2008) - Season 1");
        assert_eq!(parsed.title, "Breaking Bad  - Season 1");
        assert_eq!(parsed.year, Some(2008));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("poster.jpg"), ("poster", ".jpg"));
        assert_eq!(split_extension("Dune (2021).tar.png"), ("Dune (2021).tar", ".png"));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
        assert_eq!(split_extension("noext"), ("noext", ""));
    }

    #[test]
    fn test_season_markers() {
        let markers = SeasonMarkers::default();
        assert!(markers.contains_marker("Show (2020) - Season 3.jpg"));
        assert!(markers.contains_marker("Show (2020) - Specials.jpg"));
        assert!(markers.contains_marker("Show (2020)_Season03.jpg"));
        assert!(markers.contains_marker("Dark (2017) - Staffel 2.jpg"));
        assert!(!markers.contains_marker("Seasons (2015).jpg"));
        assert_eq!(markers.find_marker("Show - Season 1.jpg"), Some(" - Season"));
    }

    #[test]
    fn test_season_tag() {
        let markers = SeasonMarkers::default();
        assert_eq!(markers.season_tag("Show - Season 3.jpg"), Some(SeasonTag::Number(3)));
        assert_eq!(markers.season_tag("Show - Season 12.jpg"), Some(SeasonTag::Number(12)));
        assert_eq!(markers.season_tag("Show_Season07.jpg"), Some(SeasonTag::Number(7)));
        assert_eq!(markers.season_tag("Show - Saison 4.png"), Some(SeasonTag::Number(4)));
        assert_eq!(markers.season_tag("Show - Specials.jpg"), Some(SeasonTag::Specials));
        assert_eq!(markers.season_tag("Show - Season X.jpg"), None);
        assert_eq!(SeasonTag::Specials.number(), 0);
    }
}
