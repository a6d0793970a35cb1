// src/subject.rs
//! Closed set of academic subjects plus the synonym table used to map loose
//! model answers ("cs", "coding", "maths") onto canonical labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubjectLabel {
    Mathematics,
    Physics,
    Chemistry,
    Biology,
    Programming,
    #[serde(rename = "Computer Science")]
    ComputerScience,
    History,
    Geography,
    Literature,
    Language,
    Art,
    Music,
    Sports,
    Entertainment,
    General,
}

impl Default for SubjectLabel {
    fn default() -> Self {
        SubjectLabel::General
    }
}

impl SubjectLabel {
    /// Declaration order doubles as the tie-break order for rankings.
    pub const ALL: [SubjectLabel; 15] = [
        SubjectLabel::Mathematics,
        SubjectLabel::Physics,
        SubjectLabel::Chemistry,
        SubjectLabel::Biology,
        SubjectLabel::Programming,
        SubjectLabel::ComputerScience,
        SubjectLabel::History,
        SubjectLabel::Geography,
        SubjectLabel::Literature,
        SubjectLabel::Language,
        SubjectLabel::Art,
        SubjectLabel::Music,
        SubjectLabel::Sports,
        SubjectLabel::Entertainment,
        SubjectLabel::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectLabel::Mathematics => "Mathematics",
            SubjectLabel::Physics => "Physics",
            SubjectLabel::Chemistry => "Chemistry",
            SubjectLabel::Biology => "Biology",
            SubjectLabel::Programming => "Programming",
            SubjectLabel::ComputerScience => "Computer Science",
            SubjectLabel::History => "History",
            SubjectLabel::Geography => "Geography",
            SubjectLabel::Literature => "Literature",
            SubjectLabel::Language => "Language",
            SubjectLabel::Art => "Art",
            SubjectLabel::Music => "Music",
            SubjectLabel::Sports => "Sports",
            SubjectLabel::Entertainment => "Entertainment",
            SubjectLabel::General => "General",
        }
    }

    /// Position in [`SubjectLabel::ALL`].
    pub fn ordinal(&self) -> usize {
        SubjectLabel::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(SubjectLabel::ALL.len() - 1)
    }

    /// Comma-separated label list for model instructions.
    pub fn allowed_list() -> String {
        SubjectLabel::ALL
            .iter()
            .map(SubjectLabel::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SubjectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSubject(pub String);

impl fmt::Display for UnknownSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown subject label '{}'", self.0)
    }
}

impl std::error::Error for UnknownSubject {}

impl FromStr for SubjectLabel {
    type Err = UnknownSubject;

    /// Exact, case-insensitive label match only. Loose answers go through
    /// [`map_model_answer`](crate::analyze::classifier::map_model_answer).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        SubjectLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownSubject(s.to_string()))
    }
}

/// Synonym keys (lowercase) → canonical label. Order matters: the first key
/// found wins in the post-generation re-check.
pub const SYNONYMS: &[(&str, SubjectLabel)] = &[
    ("cs", SubjectLabel::ComputerScience),
    ("comp sci", SubjectLabel::ComputerScience),
    ("computing", SubjectLabel::ComputerScience),
    ("informatics", SubjectLabel::ComputerScience),
    ("coding", SubjectLabel::Programming),
    ("software development", SubjectLabel::Programming),
    ("software engineering", SubjectLabel::Programming),
    ("maths", SubjectLabel::Mathematics),
    ("math", SubjectLabel::Mathematics),
    ("algebra", SubjectLabel::Mathematics),
    ("calculus", SubjectLabel::Mathematics),
    ("bio", SubjectLabel::Biology),
    ("life science", SubjectLabel::Biology),
    ("chem", SubjectLabel::Chemistry),
    ("organic chemistry", SubjectLabel::Chemistry),
    ("lit", SubjectLabel::Literature),
    ("english literature", SubjectLabel::Literature),
    ("linguistics", SubjectLabel::Language),
    ("grammar", SubjectLabel::Language),
    ("fine arts", SubjectLabel::Art),
    ("visual arts", SubjectLabel::Art),
    ("athletics", SubjectLabel::Sports),
    ("physical education", SubjectLabel::Sports),
    ("sport", SubjectLabel::Sports),
    ("film", SubjectLabel::Entertainment),
    ("movies", SubjectLabel::Entertainment),
    ("geo", SubjectLabel::Geography),
];

/// Looks up an exact synonym key (case-insensitive).
pub fn synonym_for(answer: &str) -> Option<SubjectLabel> {
    let needle = answer.trim().to_lowercase();
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == needle)
        .map(|(_, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("computer science".parse(), Ok(SubjectLabel::ComputerScience));
        assert_eq!("  BIOLOGY ".parse(), Ok(SubjectLabel::Biology));
        assert!("Astrology".parse::<SubjectLabel>().is_err());
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&SubjectLabel::ComputerScience).unwrap();
        assert_eq!(json, "\"Computer Science\"");
        let back: SubjectLabel = serde_json::from_str("\"Sports\"").unwrap();
        assert_eq!(back, SubjectLabel::Sports);
    }

    #[test]
    fn general_is_default_and_last() {
        assert_eq!(SubjectLabel::default(), SubjectLabel::General);
        assert_eq!(SubjectLabel::General.ordinal(), SubjectLabel::ALL.len() - 1);
        assert_eq!(SubjectLabel::Mathematics.ordinal(), 0);
    }

    #[test]
    fn synonyms_map_to_members() {
        assert_eq!(synonym_for("CS"), Some(SubjectLabel::ComputerScience));
        assert_eq!(synonym_for("coding"), Some(SubjectLabel::Programming));
        assert_eq!(synonym_for("maths"), Some(SubjectLabel::Mathematics));
        assert_eq!(synonym_for("astronomy"), None);
    }
}
