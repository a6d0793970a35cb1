//! Pre-generation subject reconciliation.
//!
//! The model's label wins unless the keyword signal for a *different* subject
//! has at least [`OVERRIDE_MIN_SCORE`] hits and strictly more hits than the
//! model's label. Without a model label the keyword top scorer is used when
//! it has any hit, else `General`.

use serde::Serialize;

use crate::analyze::heuristic::SubjectScores;
use crate::subject::SubjectLabel;

pub const OVERRIDE_MIN_SCORE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Model label accepted.
    Model,
    /// Keyword top scorer replaced the model label.
    HeuristicOverride,
    /// No model label; keyword top scorer used.
    HeuristicFallback,
    /// Nothing to go on.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectDecision {
    pub subject: SubjectLabel,
    pub source: DecisionSource,
}

pub fn reconcile(scores: &SubjectScores, model_label: Option<SubjectLabel>) -> SubjectDecision {
    let top = scores.top();

    match model_label {
        Some(model) => {
            let model_score = scores.score(model);
            if top.subject != model && top.score >= OVERRIDE_MIN_SCORE && top.score > model_score {
                SubjectDecision {
                    subject: top.subject,
                    source: DecisionSource::HeuristicOverride,
                }
            } else {
                SubjectDecision {
                    subject: model,
                    source: DecisionSource::Model,
                }
            }
        }
        None if top.score > 0 => SubjectDecision {
            subject: top.subject,
            source: DecisionSource::HeuristicFallback,
        },
        None => SubjectDecision {
            subject: SubjectLabel::General,
            source: DecisionSource::Default,
        },
    }
}
