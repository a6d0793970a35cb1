//! Keyword-frequency subject scorer.
//!
//! Score of a subject = number of its lexicon terms that occur anywhere in the
//! text (case-insensitive substring). Pure: no I/O, no hidden state.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::lexicon::{Lexicon, LexiconScope};
use crate::subject::SubjectLabel;

/// One (subject, score) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectionSignal {
    pub subject: SubjectLabel,
    pub score: u32,
}

/// Scores for every subject; absent subjects score 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubjectScores {
    scores: BTreeMap<SubjectLabel, u32>,
}

impl SubjectScores {
    pub fn score(&self, subject: SubjectLabel) -> u32 {
        self.scores.get(&subject).copied().unwrap_or(0)
    }

    pub fn set(&mut self, subject: SubjectLabel, score: u32) {
        self.scores.insert(subject, score);
    }

    /// Score descending, ties in declaration order.
    pub fn ranked(&self) -> Vec<DetectionSignal> {
        let mut out: Vec<DetectionSignal> = SubjectLabel::ALL
            .iter()
            .map(|&subject| DetectionSignal {
                subject,
                score: self.score(subject),
            })
            .collect();
        out.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.subject.ordinal().cmp(&b.subject.ordinal()))
        });
        out
    }

    pub fn top(&self) -> DetectionSignal {
        self.ranked()[0]
    }

    /// Second entry of the ranking.
    pub fn runner_up(&self) -> DetectionSignal {
        self.ranked()[1]
    }

    pub fn is_all_zero(&self) -> bool {
        self.scores.values().all(|&s| s == 0)
    }

    /// Non-zero entries only, for logs.
    pub fn nonzero(&self) -> Vec<(SubjectLabel, u32)> {
        self.ranked()
            .into_iter()
            .filter(|s| s.score > 0)
            .map(|s| (s.subject, s.score))
            .collect()
    }
}

/// Scores `text` against the lexicon terms selected by `scope`.
pub fn score_subjects(text: &str, lexicon: &Lexicon, scope: LexiconScope) -> SubjectScores {
    let haystack = text.to_lowercase();
    let mut scores = SubjectScores::default();
    for entry in lexicon.entries() {
        let hits = entry
            .terms(scope)
            .into_iter()
            .filter(|term| haystack.contains(term))
            .count();
        scores.set(entry.subject, hits as u32);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> std::sync::Arc<Lexicon> {
        Lexicon::builtin()
    }

    #[test]
    fn empty_and_whitespace_text_scores_zero() {
        for text in ["", "   \n\t  "] {
            let s = score_subjects(text, &lex(), LexiconScope::Full);
            assert!(s.is_all_zero());
            assert_eq!(s.top().score, 0);
        }
    }

    #[test]
    fn counts_distinct_terms_case_insensitively() {
        let s = score_subjects(
            "Explain the MITOCHONDRIA and its role in ATP synthesis. Mitochondria again.",
            &lex(),
            LexiconScope::Full,
        );
        assert_eq!(s.score(SubjectLabel::Biology), 2);
        assert_eq!(s.top().subject, SubjectLabel::Biology);
    }

    #[test]
    fn scoring_is_idempotent() {
        let text = "Newton's laws relate velocity, acceleration and momentum.";
        let a = score_subjects(text, &lex(), LexiconScope::Full);
        let b = score_subjects(text, &lex(), LexiconScope::Full);
        assert_eq!(a, b);
        assert_eq!(a.score(SubjectLabel::Physics), 4);
    }

    #[test]
    fn ties_rank_in_declaration_order() {
        let mut s = SubjectScores::default();
        s.set(SubjectLabel::Sports, 3);
        s.set(SubjectLabel::Physics, 3);
        s.set(SubjectLabel::Music, 1);
        let ranked = s.ranked();
        assert_eq!(ranked[0].subject, SubjectLabel::Physics);
        assert_eq!(ranked[1].subject, SubjectLabel::Sports);
        assert_eq!(s.runner_up().score, 3);
        assert_eq!(s.nonzero().len(), 3);
    }

    #[test]
    fn recheck_scope_ignores_extended_terms() {
        // "torque" is extended-only for Physics.
        let text = "torque";
        let full = score_subjects(text, &lex(), LexiconScope::Full);
        let recheck = score_subjects(text, &lex(), LexiconScope::Recheck);
        assert_eq!(full.score(SubjectLabel::Physics), 1);
        assert_eq!(recheck.score(SubjectLabel::Physics), 0);
    }
}
