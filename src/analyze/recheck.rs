//! Post-generation subject re-check over `generated + original`.
//!
//! Rules, first match wins:
//! 1. a label name mentioned verbatim (anywhere, `Art` as a whole word only,
//!    `General` excluded),
//! 2. a synonym key mentioned (word-bounded),
//! 3. recheck-scope keyword top scorer with >= 3 hits and a lead of >= 2,
//! 4. Sports with >= 2 hits and strictly ahead of every other subject,
//! 5. otherwise the current subject stays.

use serde::Serialize;

use crate::analyze::{contains_word, mentions_label};
use crate::analyze::heuristic::score_subjects;
use crate::lexicon::{Lexicon, LexiconScope};
use crate::subject::{SubjectLabel, SYNONYMS};

pub const KEYWORD_MIN_HITS: u32 = 3;
pub const KEYWORD_MIN_LEAD: u32 = 2;
pub const SPORTS_MIN_HITS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecheckRule {
    LabelMention,
    SynonymMention,
    KeywordLead,
    SportsCarveOut,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecheckOutcome {
    pub subject: SubjectLabel,
    pub rule: RecheckRule,
}

impl RecheckOutcome {
    pub fn changed_from(&self, previous: SubjectLabel) -> bool {
        self.subject != previous
    }
}

pub fn recheck_subject(
    generated: &str,
    original: &str,
    current: SubjectLabel,
    lexicon: &Lexicon,
) -> RecheckOutcome {
    let combined = format!("{generated}\n{original}").to_lowercase();

    // (1)
    let mentioned = SubjectLabel::ALL
        .iter()
        .copied()
        .filter(|l| *l != SubjectLabel::General)
        .find(|l| mentions_label(&combined, *l));
    if let Some(subject) = mentioned {
        return RecheckOutcome {
            subject,
            rule: RecheckRule::LabelMention,
        };
    }

    // (2)
    if let Some((_, subject)) = SYNONYMS.iter().find(|(key, _)| contains_word(&combined, key)) {
        return RecheckOutcome {
            subject: *subject,
            rule: RecheckRule::SynonymMention,
        };
    }

    // (3)
    let scores = score_subjects(&combined, lexicon, LexiconScope::Recheck);
    let top = scores.top();
    let runner_up = scores.runner_up();
    if top.score >= KEYWORD_MIN_HITS && top.score - runner_up.score >= KEYWORD_MIN_LEAD {
        return RecheckOutcome {
            subject: top.subject,
            rule: RecheckRule::KeywordLead,
        };
    }

    // (4)
    let sports = scores.score(SubjectLabel::Sports);
    let sports_leads = SubjectLabel::ALL
        .iter()
        .filter(|l| **l != SubjectLabel::Sports)
        .all(|l| scores.score(*l) < sports);
    if sports >= SPORTS_MIN_HITS && sports_leads {
        return RecheckOutcome {
            subject: SubjectLabel::Sports,
            rule: RecheckRule::SportsCarveOut,
        };
    }

    RecheckOutcome {
        subject: current,
        rule: RecheckRule::Unchanged,
    }
}
