//! Meta-reasoning: reconcile the rule-based and case-based answers.
//!
//! Branches are evaluated strictly in order; the first match wins even
//! when a later branch's condition also holds.
//!
//! 1. RBR > 80%: rules win; a CBR match > 40 rides along as alternative.
//! 2. CBR > 70 and RBR < 50%: the case wins.
//! 3. Both present and within 20 points: hybrid (mean confidence).
//! 4. RBR present: rules win.
//! 5. CBR present: the case wins.
//! 6. Nothing: consult a professional.

use crate::case_store::CaseRecord;
use crate::rbr::Diagnosis;
use serde::{Deserialize, Serialize};

pub const RBR_DOMINANT_PERCENT: f64 = 80.0;
pub const CBR_ALTERNATIVE_SCORE: f64 = 40.0;
pub const CBR_DOMINANT_SCORE: f64 = 70.0;
pub const RBR_WEAK_PERCENT: f64 = 50.0;
pub const HYBRID_MAX_GAP: f64 = 20.0;

pub const CONSULT_PROFESSIONAL: &str =
    "No diagnosis could be reached. Please consult a qualified hardware technician.";

/// Which reasoner the recommendation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primary {
    Rbr,
    Cbr,
    Hybrid,
    None,
}

impl Primary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primary::Rbr => "rbr",
            Primary::Cbr => "cbr",
            Primary::Hybrid => "hybrid",
            Primary::None => "none",
        }
    }
}

/// The meta-reasoner's decision for one session. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub primary: Primary,
    pub recommendation: String,
    pub reason: String,
    /// 0-100
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_confidence: Option<f64>,
    #[serde(default)]
    pub requires_comparison: bool,
}

impl Resolution {
    fn new(primary: Primary, recommendation: impl Into<String>, reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            primary,
            recommendation: recommendation.into(),
            reason: reason.into(),
            confidence,
            alternative_solution: None,
            alternative_reason: None,
            alternative_confidence: None,
            requires_comparison: false,
        }
    }

    fn with_alternative(mut self, solution: impl Into<String>, reason: impl Into<String>, confidence: f64) -> Self {
        self.alternative_solution = Some(solution.into());
        self.alternative_reason = Some(reason.into());
        self.alternative_confidence = Some(confidence);
        self
    }
}

/// Reconcile the top RBR diagnosis (CF in [0, 1]) and the best CBR case
/// (score 0-100).
pub fn resolve_conflict(
    rbr: Option<&Diagnosis>,
    rbr_cf: f64,
    cbr: Option<&CaseRecord>,
    cbr_score: f64,
) -> Resolution {
    let rbr_pct = if rbr.is_some() { rbr_cf * 100.0 } else { 0.0 };
    let cbr_score = if cbr.is_some() { cbr_score } else { 0.0 };

    // 1. Strong rules
    if let Some(d) = rbr.filter(|_| rbr_pct > RBR_DOMINANT_PERCENT) {
        let res = Resolution::new(
            Primary::Rbr,
            d.solution.as_str(),
            format!("Expert rules identified \"{}\" with high certainty ({:.0}%).", d.fault, rbr_pct),
            rbr_pct,
        );
        return match cbr.filter(|_| cbr_score > CBR_ALTERNATIVE_SCORE) {
            Some(case) => res.with_alternative(
                case.solution.as_str(),
                format!("A similar past case ({}) matched at {:.0}%.", case.id, cbr_score),
                cbr_score,
            ),
            None => res,
        };
    }

    // 2. Strong case, weak rules
    if let Some(case) = cbr.filter(|_| cbr_score > CBR_DOMINANT_SCORE && rbr_pct < RBR_WEAK_PERCENT) {
        return Resolution::new(
            Primary::Cbr,
            case.solution.as_str(),
            format!(
                "Past case {} matches closely ({:.0}%) while rule certainty is low ({:.0}%).",
                case.id, cbr_score, rbr_pct
            ),
            cbr_score,
        );
    }

    // 3. Comparable confidence
    if let (Some(d), Some(case)) = (rbr, cbr) {
        if (rbr_pct - cbr_score).abs() < HYBRID_MAX_GAP {
            let confidence = (rbr_pct + cbr_score) / 2.0;
            if d.solution == case.solution {
                return Resolution::new(
                    Primary::Hybrid,
                    d.solution.as_str(),
                    format!(
                        "Rules ({:.0}%) and past case {} ({:.0}%) converge on the same solution.",
                        rbr_pct, case.id, cbr_score
                    ),
                    confidence,
                );
            }
            let mut res = Resolution::new(
                Primary::Hybrid,
                d.solution.as_str(),
                format!(
                    "Rules ({:.0}%) and past case {} ({:.0}%) are comparably confident but disagree; compare both.",
                    rbr_pct, case.id, cbr_score
                ),
                confidence,
            )
            .with_alternative(
                case.solution.as_str(),
                format!("Solution from past case {}.", case.id),
                cbr_score,
            );
            res.requires_comparison = true;
            return res;
        }
    }

    // 4. Rules by default
    if let Some(d) = rbr {
        return Resolution::new(
            Primary::Rbr,
            d.solution.as_str(),
            format!("Expert rules suggest \"{}\" ({:.0}%).", d.fault, rbr_pct),
            rbr_pct,
        );
    }

    // 5. Only a case
    if let Some(case) = cbr {
        return Resolution::new(
            Primary::Cbr,
            case.solution.as_str(),
            format!("No rule matched; closest past case {} ({:.0}%).", case.id, cbr_score),
            cbr_score,
        );
    }

    // 6. Nothing
    Resolution::new(
        Primary::None,
        CONSULT_PROFESSIONAL,
        "Neither the rule base nor the case library produced a result.",
        0.0,
    )
}
