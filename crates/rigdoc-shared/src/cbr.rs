//! Case-based retrieval.
//!
//! Scores every eligible stored case against the current feature set with a
//! weighted Jaccard index, then adjusts for trust:
//!
//! 1. Cases with feedback below [`MIN_FEEDBACK_SCORE`] are not candidates.
//! 2. PENDING cases score half.
//! 3. Each net upvote adds 5% (uncapped).
//!
//! Ties keep the first case in store order.

use crate::case_store::{CaseRecord, CaseStatus, CaseStore};
use crate::error::Result;
use crate::features::{FeatureSet, FeatureWeights};
use serde::{Deserialize, Serialize};

/// Cases with a lower feedback score are soft-deleted from retrieval.
pub const MIN_FEEDBACK_SCORE: i32 = -2;

/// Multiplier applied to unverified cases.
pub const PENDING_PENALTY: f64 = 0.5;

/// Score boost per net upvote.
pub const FEEDBACK_BONUS_PER_VOTE: f64 = 0.05;

/// Coarse label for a match score (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    High,
    Medium,
    Low,
}

impl MatchQuality {
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            MatchQuality::High
        } else if score > 40.0 {
            MatchQuality::Medium
        } else {
            MatchQuality::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchQuality::High => "High",
            MatchQuality::Medium => "Medium",
            MatchQuality::Low => "Low",
        }
    }
}

/// Best retrieved case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CbrMatch {
    pub case: CaseRecord,
    /// Adjusted score (0-100 before the feedback bonus; may exceed 100 after)
    pub score: f64,
    pub quality: MatchQuality,
    /// Tokens shared between the query and the case
    pub matched: FeatureSet,
}

/// Whether a case may be retrieved at all.
pub fn is_candidate(case: &CaseRecord) -> bool {
    case.feedback_score >= MIN_FEEDBACK_SCORE
}

/// Weighted Jaccard similarity in [0, 100].
///
/// Both sets empty scores 0.
pub fn weighted_jaccard(query: &FeatureSet, case: &FeatureSet, weights: &FeatureWeights) -> f64 {
    let mut union_weight = 0.0;
    let mut intersection_weight = 0.0;

    for token in query.union(case) {
        let w = weights.token_weight(token);
        union_weight += w;
        if query.contains(token) && case.contains(token) {
            intersection_weight += w;
        }
    }

    if union_weight == 0.0 {
        0.0
    } else {
        100.0 * intersection_weight / union_weight
    }
}

/// Similarity after the verification penalty and feedback bonus.
pub fn score_case(query: &FeatureSet, case: &CaseRecord, weights: &FeatureWeights) -> f64 {
    let mut score = weighted_jaccard(query, &case.features, weights);

    if case.status == CaseStatus::Pending {
        score *= PENDING_PENALTY;
    }
    if case.feedback_score > 0 {
        score *= 1.0 + FEEDBACK_BONUS_PER_VOTE * case.feedback_score as f64;
    }
    score
}

/// Best-scoring candidate among `cases`, first one winning ties.
///
/// Cases sharing no weight with the query score 0 and are never returned.
pub fn best_match<'a, I>(query: &FeatureSet, cases: I, weights: &FeatureWeights) -> Option<CbrMatch>
where
    I: IntoIterator<Item = &'a CaseRecord>,
{
    let mut best: Option<(&CaseRecord, f64)> = None;

    for case in cases.into_iter().filter(|c| is_candidate(c)) {
        let score = score_case(query, case, weights);
        if score <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((case, score)),
        }
    }

    best.map(|(case, score)| CbrMatch {
        matched: query.intersection(&case.features).cloned().collect(),
        case: case.clone(),
        score,
        quality: MatchQuality::from_score(score),
    })
}

/// Run retrieval against the store.
///
/// Returns the best match (if any) and its score; no match scores 0.
pub fn run_cbr_analysis(
    query: &FeatureSet,
    store: &CaseStore,
    weights: &FeatureWeights,
) -> Result<(Option<CbrMatch>, f64)> {
    let cases = store.read_all()?;
    let found = best_match(query, &cases, weights);
    let score = found.as_ref().map(|m| m.score).unwrap_or(0.0);

    tracing::debug!(
        "CBR scored {} cases, best {:?} at {:.1}",
        cases.len(),
        found.as_ref().map(|m| m.case.id.as_str()),
        score
    );
    Ok((found, score))
}
