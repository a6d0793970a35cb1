// src/language.rs
//! Language names as reported by the model, plus the text clean-up shared by
//! every single-answer classification call.

use serde::{Deserialize, Serialize};
use std::fmt;

const UNKNOWN: &str = "unknown";
/// Longest answer still accepted as a language name.
const MAX_LANGUAGE_NAME_CHARS: usize = 40;

/// Free-form language name ("English", "Tamil") or the `unknown` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageName(String);

impl LanguageName {
    pub fn unknown() -> Self {
        Self(UNKNOWN.to_string())
    }

    pub fn english() -> Self {
        Self("English".to_string())
    }

    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN) {
            return Self::unknown();
        }
        Self(trimmed.to_string())
    }

    /// Builds a name from a raw model answer. Anything that does not look like
    /// a short name collapses to `unknown`.
    pub fn from_model_answer(raw: &str) -> Self {
        let cleaned = normalize_model_text(raw);
        if cleaned.chars().count() > MAX_LANGUAGE_NAME_CHARS {
            return Self::unknown();
        }
        Self::new(cleaned)
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Language the notes must be written in: the detected one, or English.
    pub fn or_english(&self) -> Self {
        if self.is_unknown() {
            Self::english()
        } else {
            self.clone()
        }
    }

    pub fn mentions_english(&self) -> bool {
        self.0.to_lowercase().contains("english")
    }
}

impl Default for LanguageName {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for LanguageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First line, entities decoded, markup and quotes stripped, cut at the first
/// sentence end, trailing punctuation removed.
pub fn normalize_model_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let first_line = decoded
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    let mut s: String = first_line
        .chars()
        .filter(|c| {
            !matches!(c, '*' | '#' | '`' | '_' | '"' | '“' | '”' | '«' | '»' | '<' | '>')
        })
        .collect();

    // Single quotes only when they wrap the answer ('English').
    let trimmed = s.trim();
    let unquoted = trimmed
        .trim_start_matches(['\'', '‘', '’'])
        .trim_end_matches(['\'', '‘', '’']);
    s = unquoted.to_string();

    // "Language: Tamil" / "Subject: Physics"
    if let Some((head, tail)) = s.split_once(':') {
        let head = head.trim().to_lowercase();
        if matches!(head.as_str(), "language" | "subject" | "answer" | "label") {
            s = tail.to_string();
        }
    }

    if let Some(pos) = s.find(['.', '!', '?', '。']) {
        s.truncate(pos);
    }

    s.trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_string()
}

/// True when the raw answer still carries markdown that a plain one-word
/// answer should not have.
pub fn has_markdown_artifacts(raw: &str) -> bool {
    raw.contains(['*', '#', '`', '_'])
}

/// Share of non-ASCII letters at or above 30% reads as "not English".
pub fn presumed_non_english(text: &str) -> bool {
    let mut letters = 0usize;
    let mut non_ascii = 0usize;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if !c.is_ascii() {
            non_ascii += 1;
        }
    }
    letters > 0 && non_ascii * 10 >= letters * 3
}

/// Char-boundary safe prefix.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_decorated_answers() {
        assert_eq!(normalize_model_text("**English**\n"), "English");
        assert_eq!(normalize_model_text("\"Tamil.\""), "Tamil");
        assert_eq!(normalize_model_text("Language: Spanish!"), "Spanish");
        assert_eq!(
            normalize_model_text("\n\nFrench. The text is clearly French."),
            "French"
        );
        assert_eq!(normalize_model_text("&quot;German&quot;"), "German");
    }

    #[test]
    fn long_or_empty_answers_are_unknown() {
        assert!(LanguageName::from_model_answer("").is_unknown());
        assert!(LanguageName::from_model_answer("   ").is_unknown());
        assert!(LanguageName::from_model_answer(
            "I think this could be a mixture of several languages including"
        )
        .is_unknown());
        assert_eq!(LanguageName::from_model_answer("Hindi").as_str(), "Hindi");
    }

    #[test]
    fn unknown_falls_back_to_english() {
        assert_eq!(LanguageName::unknown().or_english(), LanguageName::english());
        assert_eq!(LanguageName::new("Tamil").or_english().as_str(), "Tamil");
    }

    #[test]
    fn non_english_presumption() {
        assert!(!presumed_non_english("Photosynthesis converts light energy."));
        assert!(presumed_non_english("ஒளிச்சேர்க்கை என்பது தாவரங்கள்"));
        assert!(!presumed_non_english("12345 !!"));
    }

    #[test]
    fn markdown_artifacts() {
        assert!(has_markdown_artifacts("**English**"));
        assert!(has_markdown_artifacts("# Tamil"));
        assert!(has_markdown_artifacts("_French_"));
        assert!(!has_markdown_artifacts("English"));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
