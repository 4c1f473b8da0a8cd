//! Shared text normalization and comparison utilities
//!
//! Every title that takes part in matching (asset file names, library titles,
//! collection names) goes through [`TitleNormalizer`] before it is compared.
//! The normalized form is a comparison key only and is never displayed.

use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity, unescape_with};
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Parenthesized release year, e.g. `(1999)` or `(2021)`.
pub static YEAR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((19|20)\d{2}\)").unwrap());

/// Characters that cannot appear in a file name on common filesystems.
pub static ILLEGAL_CHARS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]+"#).unwrap());

static HTML_ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap()
});

/// Substrings removed from every title before comparison.
pub const DEFAULT_NOISE_WORDS: &[&str] = &["(US)"];

/// Canonicalizes titles into comparison keys.
///
/// The pipeline is order dependent:
/// 1. remove configured noise substrings
/// 2. remove parenthesized years
/// 3. remove filesystem-illegal characters
/// 4. decode HTML entities and fold diacritics to plain text
/// 5. trim trailing whitespace
/// 6. replace `&` with `and`
/// 7. lower-case and drop everything that is not alphanumeric or whitespace
/// 8. remove all whitespace
#[derive(Debug, Clone)]
pub struct TitleNormalizer {
    noise_words: Vec<String>,
}

impl Default for TitleNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_WORDS.iter().map(|w| w.to_string()).collect())
    }
}

impl TitleNormalizer {
    pub fn new(noise_words: Vec<String>) -> Self {
        Self {
            noise_words: noise_words.into_iter().filter(|w| !w.is_empty()).collect(),
        }
    }

    pub fn normalize(&self, title: &str) -> String {
        let mut normalized = title.to_string();
        for word in &self.noise_words {
            normalized = normalized.replace(word.as_str(), "");
        }

        let normalized = strip_year(&normalized);
        let normalized = strip_illegal_chars(&normalized);
        let normalized = fold_to_plain_text(&unescape_html(&normalized));
        let normalized = normalized.trim_end().replace('&', "and");

        normalized
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect()
    }
}

/// Normalize a title with the default noise words.
pub fn normalize_title(title: &str) -> String {
    TitleNormalizer::default().normalize(title)
}

/// Remove every parenthesized year token.
pub fn strip_year(title: &str) -> String {
    YEAR_REGEX.replace_all(title, "").into_owned()
}

/// Extract the first parenthesized year in `text`.
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_REGEX
        .find(text)
        .and_then(|m| m.as_str().trim_matches(['(', ')']).parse().ok())
}

pub fn strip_illegal_chars(text: &str) -> String {
    ILLEGAL_CHARS_REGEX.replace_all(text, "").into_owned()
}

/// Decode HTML entities. Bare ampersands and unknown entities are left as-is.
pub fn unescape_html(text: &str) -> String {
    HTML_ENTITY_REGEX
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[0];
            unescape_with(entity, |name| {
                resolve_predefined_entity(name).or_else(|| resolve_html5_entity(name))
            })
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| entity.to_string())
        })
        .into_owned()
}

/// Fold accented and ligature characters to their closest plain-text form.
pub fn fold_to_plain_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        match ch {
            'ß' => out.push_str("ss"),
            'ẞ' => out.push_str("SS"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'đ' | 'ð' => out.push('d'),
            'Đ' | 'Ð' => out.push('D'),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("TH"),
            'ı' => out.push('i'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            other => out.push(other),
        }
    }
    out
}

/// Pre-processing applied to both sides of a fuzzy comparison:
/// non-alphanumerics become spaces, the result is lower-cased and trimmed.
pub fn full_process(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Similarity ratio (0-100) between two strings after [`full_process`].
pub fn ratio(s1: &str, s2: &str) -> u8 {
    ratio_processed(&full_process(s1), &full_process(s2))
}

/// Similarity ratio (0-100) between two already processed strings.
///
/// Empty input on either side scores 0.
pub fn ratio_processed(s1: &str, s2: &str) -> u8 {
    use rapidfuzz::distance::indel;

    if s1.is_empty() || s2.is_empty() {
        return 0;
    }

    let similarity = indel::normalized_similarity(s1.chars(), s2.chars());
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Removes leading words ("The", "A", ...) and trailing words ("Collection")
/// from titles. Matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct TitleAffixes {
    prefixes: Vec<Regex>,
    suffixes: Vec<Regex>,
}

impl TitleAffixes {
    pub fn new(prefixes: &[String], suffixes: &[String]) -> Result<Self, regex::Error> {
        let prefixes = prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| Regex::new(&format!(r"(?i)^{}\s(\S)", regex::escape(p))))
            .collect::<Result<Vec<_>, _>>()?;
        let suffixes = suffixes
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| Regex::new(&format!(r"(?i)\s*{}$", regex::escape(s))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { prefixes, suffixes })
    }

    pub fn prefix_count(&self) -> usize {
        self.prefixes.len()
    }

    pub fn suffix_count(&self) -> usize {
        self.suffixes.len()
    }

    /// One entry per configured prefix, in configuration order.
    /// Titles the prefix does not apply to come back unchanged.
    pub fn without_prefixes(&self, title: &str) -> Vec<String> {
        self.prefixes
            .iter()
            .map(|re| re.replace(title, "$1").into_owned())
            .collect()
    }

    /// One entry per configured suffix, in configuration order.
    pub fn without_suffixes(&self, title: &str) -> Vec<String> {
        self.suffixes
            .iter()
            .map(|re| re.replace(title, "").into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title_basic() {
        assert_eq!(normalize_title("The Matrix (1999)"), "thematrix");
        assert_eq!(normalize_title("Spider-Man: No Way Home"), "spidermannowayhome");
        assert_eq!(normalize_title("Law & Order"), "lawandorder");
    }

    #[test]
    fn test_normalize_title_removes_noise_words() {
        assert_eq!(normalize_title("The Office (US)"), normalize_title("The Office"));
        let normalizer = TitleNormalizer::new(vec!["(US)".into(), "(UK)".into()]);
        assert_eq!(normalizer.normalize("Ghosts (UK) (2019)"), "ghosts");
        assert_eq!(normalizer.normalize("Ghosts (US) (2021)"), "ghosts");
    }

    #[test]
    fn test_normalize_title_case_and_diacritics() {
        assert_eq!(normalize_title("Amélie"), normalize_title("AMELIE"));
        assert_eq!(normalize_title("Pokémon: Detective Pikachu"), "pokemondetectivepikachu");
        assert_eq!(normalize_title("Die Straße"), "diestrasse");
    }

    #[test]
    fn test_normalize_title_html_entities() {
        assert_eq!(normalize_title("Tom &amp; Jerry"), "tomandjerry");
        assert_eq!(normalize_title("Am&eacute;lie"), "amelie");
        assert_eq!(normalize_title("Rock &#38; Roll"), "rockandroll");
        assert_eq!(normalize_title("Fast & Furious"), "fastandfurious");
    }

    #[test]
    fn test_normalize_title_is_idempotent() {
        let samples = [
            "The Lord of the Rings: The Return of the King (2003)",
            "Amélie (2001)",
            "Marvel's Agents of S.H.I.E.L.D.",
            "Léon: The Professional",
            "Tom &amp; Jerry",
            "千と千尋の神隠し",
            "   ",
            "",
        ];
        for sample in samples {
            let once = normalize_title(sample);
            assert_eq!(normalize_title(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_extract_and_strip_year() {
        assert_eq!(extract_year("/movies/Dune (2021)"), Some(2021));
        assert_eq!(extract_year("Dune"), None);
        assert_eq!(extract_year("Show (1850)"), None);
        assert_eq!(strip_year("Dune (2021)").trim(), "Dune");
    }

    #[test]
    fn test_strip_illegal_chars() {
        assert_eq!(strip_illegal_chars("Mission: Impossible"), "Mission Impossible");
        assert_eq!(strip_illegal_chars("What/If?"), "WhatIf");
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("Matrix", "matrix"), 100);
        assert_eq!(ratio("", "matrix"), 0);
        assert!(ratio("The Matrix", "Matrix") > 70);
        assert!(ratio("abc", "xyz") < 10);
    }

    #[test]
    fn test_affixes() {
        let affixes = TitleAffixes::new(
            &["The".into(), "A".into(), "An".into()],
            &["Collection".into()],
        )
        .unwrap();

        assert_eq!(
            affixes.without_prefixes("The Matrix"),
            vec!["Matrix", "The Matrix", "The Matrix"]
        );
        assert_eq!(affixes.without_prefixes("A Quiet Place")[1], "Quiet Place");
        assert_eq!(affixes.without_prefixes("Theodore")[0], "Theodore");
        assert_eq!(
            affixes.without_suffixes("The Matrix Collection"),
            vec!["The Matrix"]
        );
        assert_eq!(
            affixes.without_suffixes("thematrixcollection"),
            vec!["thematrix"]
        );
    }
}
