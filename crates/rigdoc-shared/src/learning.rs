//! Case learning: retain new cases and fold community feedback back in.
//!
//! Retain: user-submitted solutions pass a quality gate, then land in the
//! library as PENDING (VERIFIED when submitted in expert mode).
//!
//! Feedback: each vote moves the case's score by one. PENDING cases are
//! re-scored on every vote and promoted to VERIFIED once the combined
//! trust signals reach [`PROMOTION_THRESHOLD`]:
//!
//! - community: 20 points per net vote (may be negative)
//! - semantic endorsement: agreement with the current top rule diagnosis
//! - convergence: other cases recorded for exactly the same symptoms
//!
//! Promotion is one-way.

use crate::case_store::{CaseRecord, CaseStatus, CaseStore};
use crate::error::{DiagError, Result};
use crate::features::FeatureSet;
use crate::rbr::Diagnosis;
use crate::semantic::SemanticSimilarity;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Minimum trimmed solution length.
pub const MIN_SOLUTION_CHARS: usize = 10;

/// Case-insensitive substrings that mark a submission as spam.
pub const SPAM_TOKENS: &[&str] = &[
    "http://",
    "https://",
    "www.",
    "buy now",
    "click here",
    "free money",
    "casino",
    "lorem ipsum",
];

pub const PROMOTION_THRESHOLD: i32 = 100;
pub const POINTS_PER_VOTE: i32 = 20;

/// Result of a submission attempt. Rejections are not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub saved: bool,
    pub case_id: Option<String>,
    pub status: Option<CaseStatus>,
    pub message: String,
}

impl SaveOutcome {
    fn saved(case_id: String, status: CaseStatus) -> Self {
        Self {
            message: format!("Case {} saved as {}", case_id, status),
            saved: true,
            case_id: Some(case_id),
            status: Some(status),
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            saved: false,
            case_id: None,
            status: None,
            message: reason.into(),
        }
    }
}

/// Quality gate for submitted solution text. `Err` carries the reason.
pub fn validate_solution(text: &str) -> std::result::Result<(), String> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_SOLUTION_CHARS {
        return Err(format!(
            "Solution is too short: describe the fix in at least {} characters.",
            MIN_SOLUTION_CHARS
        ));
    }
    let lower = trimmed.to_lowercase();
    if let Some(token) = SPAM_TOKENS.iter().find(|t| lower.contains(*t)) {
        return Err(format!("Solution looks like spam (contains {:?}).", token));
    }
    Ok(())
}

/// Retain phase: validate and append a new case.
pub fn save_new_case(
    store: &CaseStore,
    features: &FeatureSet,
    solution: &str,
    is_verified: bool,
) -> Result<SaveOutcome> {
    if let Err(reason) = validate_solution(solution) {
        debug!("Rejected submission: {}", reason);
        return Ok(SaveOutcome::rejected(reason));
    }

    let status = if is_verified {
        CaseStatus::Verified
    } else {
        CaseStatus::Pending
    };
    let id = store.next_id()?;
    let record = CaseRecord::new(id.clone(), status, features.clone(), solution.trim());
    store.append(&record)?;

    info!("Retained case {} ({}) with {} features", id, status, features.len());
    Ok(SaveOutcome::saved(id, status))
}

/// Breakdown of a promotion check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionScore {
    pub community: i32,
    pub semantic: i32,
    pub convergence: i32,
    /// Similarity reported by the semantic scorer, if one was used
    pub similarity: Option<f64>,
    /// Stored cases with exactly the current feature set
    pub matching_cases: usize,
}

impl PromotionScore {
    pub fn total(&self) -> i32 {
        self.community + self.semantic + self.convergence
    }

    pub fn promotes(&self) -> bool {
        meets_promotion_threshold(self.total())
    }
}

pub fn meets_promotion_threshold(total: i32) -> bool {
    total >= PROMOTION_THRESHOLD
}

/// Points for agreeing with the current top rule solution.
///
/// With a scorer: >0.85 -> 50, >0.65 -> 30, >0.45 -> 15. Without one:
/// exact case-insensitive match -> 50, containing the first three words of
/// the rule solution -> 25.
pub fn semantic_points(
    case_solution: &str,
    rbr_solution: Option<&str>,
    scorer: Option<&dyn SemanticSimilarity>,
) -> (i32, Option<f64>) {
    let Some(rbr_solution) = rbr_solution.map(str::trim).filter(|s| !s.is_empty()) else {
        return (0, None);
    };
    let case_solution = case_solution.trim();

    if let Some(scorer) = scorer {
        let sim = scorer.similarity(case_solution, rbr_solution);
        let points = if sim > 0.85 {
            50
        } else if sim > 0.65 {
            30
        } else if sim > 0.45 {
            15
        } else {
            0
        };
        return (points, Some(sim));
    }

    let case_lower = case_solution.to_lowercase();
    let rbr_lower = rbr_solution.to_lowercase();
    if case_lower == rbr_lower {
        return (50, None);
    }
    let lead: String = rbr_lower.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    if !lead.is_empty() && case_lower.contains(&lead) {
        return (25, None);
    }
    (0, None)
}

/// Points for independent cases recorded against the same symptoms.
pub fn convergence_points(matching_cases: usize) -> i32 {
    match matching_cases {
        0 | 1 => 0,
        2 => 20,
        _ => 40,
    }
}

/// Score a PENDING case for promotion.
///
/// `library` is the whole case library; cases whose feature set equals
/// `features` exactly count toward convergence. An empty feature set never
/// converges.
pub fn check_and_promote_hybrid(
    case: &CaseRecord,
    new_feedback_score: i32,
    features: &FeatureSet,
    library: &[CaseRecord],
    rbr: Option<&Diagnosis>,
    scorer: Option<&dyn SemanticSimilarity>,
) -> PromotionScore {
    let (semantic, similarity) =
        semantic_points(&case.solution, rbr.map(|d| d.solution.as_str()), scorer);

    let matching_cases = if features.is_empty() {
        0
    } else {
        library.iter().filter(|c| &c.features == features).count()
    };

    PromotionScore {
        community: new_feedback_score.saturating_mul(POINTS_PER_VOTE),
        semantic,
        convergence: convergence_points(matching_cases),
        similarity,
        matching_cases,
    }
}

/// Result of applying one vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub case_id: String,
    pub previous_score: i32,
    pub new_score: i32,
    pub status: CaseStatus,
    pub promoted: bool,
    /// Present when a promotion check ran
    pub details: Option<PromotionScore>,
    pub message: String,
}

/// Apply a +1/-1 vote, running the promotion check for PENDING cases
/// before the new score is persisted.
pub fn update_case_feedback(
    store: &CaseStore,
    case_id: &str,
    vote: i32,
    features: &FeatureSet,
    rbr: Option<&Diagnosis>,
    scorer: Option<&dyn SemanticSimilarity>,
) -> Result<FeedbackOutcome> {
    if vote != 1 && vote != -1 {
        return Err(DiagError::InvalidVote(vote));
    }

    let records = store.read_all()?;
    let case = records
        .iter()
        .find(|r| r.id == case_id)
        .ok_or_else(|| DiagError::CaseNotFound(case_id.to_string()))?;

    let previous_score = case.feedback_score;
    let new_score = previous_score.saturating_add(vote);

    let details = (case.status == CaseStatus::Pending)
        .then(|| check_and_promote_hybrid(case, new_score, features, &records, rbr, scorer));
    let promoted = details.as_ref().is_some_and(PromotionScore::promotes);

    let updated = store.update(case_id, |record| {
        record.feedback_score = new_score;
        if promoted {
            record.status = CaseStatus::Verified;
        }
    })?;
    let status = updated.status;

    let message = match &details {
        Some(d) if promoted => {
            info!("Promoted case {} to VERIFIED ({} points)", case_id, d.total());
            format!(
                "Case {} promoted to VERIFIED ({} points: community {}, semantic {}, convergence {})",
                case_id,
                d.total(),
                d.community,
                d.semantic,
                d.convergence
            )
        }
        Some(d) => format!(
            "Feedback recorded for {} (score {} -> {}); {} of {} points needed for verification",
            case_id,
            previous_score,
            new_score,
            d.total(),
            PROMOTION_THRESHOLD
        ),
        None => format!(
            "Feedback recorded for {} (score {} -> {})",
            case_id, previous_score, new_score
        ),
    };

    Ok(FeedbackOutcome {
        case_id: case_id.to_string(),
        previous_score,
        new_score,
        status,
        promoted,
        details,
        message,
    })
}
