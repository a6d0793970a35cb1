// src/analyze/mod.rs
//! Subject/language detection pipeline: keyword scoring, excerpting, model
//! classification, reconciliation before and after generation, and prompts.

pub mod ai_adapter;
pub mod classifier;
pub mod excerpt;
pub mod heuristic;
pub mod prompt;
pub mod recheck;
pub mod reconcile;

// Re-export convenient types.
pub use crate::analyze::classifier::{map_model_answer, ModelClassifier};
pub use crate::analyze::excerpt::format_excerpt;
pub use crate::analyze::heuristic::{score_subjects, DetectionSignal, SubjectScores};
pub use crate::analyze::recheck::{recheck_subject, RecheckOutcome, RecheckRule};
pub use crate::analyze::reconcile::{reconcile, DecisionSource, SubjectDecision};

use crate::subject::SubjectLabel;

/// Label names shorter than this ("Art") only count as whole words.
const MIN_SUBSTRING_LABEL_CHARS: usize = 4;

/// Case-sensitive substring search where the match must not touch another
/// alphanumeric character on either side. Callers lowercase both sides.
pub(crate) fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// True when `label`'s name occurs in the lowercased `haystack`. Longer names
/// match anywhere ("biochemistry" mentions Chemistry).
pub(crate) fn mentions_label(haystack: &str, label: SubjectLabel) -> bool {
    let name = label.as_str().to_lowercase();
    if name.chars().count() < MIN_SUBSTRING_LABEL_CHARS {
        contains_word(haystack, &name)
    } else {
        haystack.contains(&name)
    }
}
