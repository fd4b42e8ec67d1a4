//! Certainty factor interpretation.
//!
//! Pure, total functions: free text -> CF in [-1.0, 1.0], CF -> label.
//! Bands are stored as enums and mapped to text at the edge.

use serde::{Deserialize, Serialize};

/// CF used when free text matches no band.
pub const DEFAULT_USER_CF: f64 = 0.7;

/// Stated-confidence bands recognised in free text.
/// Declaration order is match order: "not sure" must win over "sure",
/// "almost certain" over "certain".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Unknown,
    AlmostCertain,
    Definite,
    Probable,
    Possible,
}

impl ConfidenceBand {
    const ALL: [ConfidenceBand; 5] = [
        ConfidenceBand::Unknown,
        ConfidenceBand::AlmostCertain,
        ConfidenceBand::Definite,
        ConfidenceBand::Probable,
        ConfidenceBand::Possible,
    ];

    pub fn cf(&self) -> f64 {
        match self {
            Self::Definite => 1.0,
            Self::AlmostCertain => 0.85,
            Self::Probable => 0.65,
            Self::Possible => 0.4,
            Self::Unknown => 0.0,
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Unknown => &[
                "don't know",
                "dont know",
                "not sure",
                "no idea",
                "unknown",
                "unsure",
                "uncertain",
            ],
            Self::AlmostCertain => &[
                "almost certain",
                "almost sure",
                "pretty sure",
                "very likely",
                "nearly certain",
            ],
            Self::Definite => &[
                "definitely",
                "definite",
                "certain",
                "absolutely",
                "sure",
                "always",
                "100%",
            ],
            Self::Probable => &["probably", "likely", "usually", "often"],
            Self::Possible => &["maybe", "possibly", "perhaps", "might", "sometimes"],
        }
    }

    /// First band whose keyword appears in `text`.
    pub fn detect(text: &str) -> Option<ConfidenceBand> {
        let lower = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|band| band.keywords().iter().any(|k| lower.contains(k)))
    }
}

/// Map a free-text confidence statement to a CF.
///
/// Unrecognised text yields [`DEFAULT_USER_CF`], i.e. moderate confidence.
pub fn interpret_user_confidence(text: &str) -> f64 {
    ConfidenceBand::detect(text)
        .map(|band| band.cf())
        .unwrap_or(DEFAULT_USER_CF)
}

/// Nine ordered CF levels, strongest belief first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CfLevel {
    Definitely,
    AlmostCertainly,
    Probably,
    Maybe,
    Unknown,
    MaybeNot,
    ProbablyNot,
    AlmostCertainlyNot,
    DefinitelyNot,
}

impl CfLevel {
    /// Lower bound (inclusive) of each band; the last band is open below.
    const LOWER_BOUNDS: [(f64, CfLevel); 8] = [
        (0.9, CfLevel::Definitely),
        (0.8, CfLevel::AlmostCertainly),
        (0.6, CfLevel::Probably),
        (0.3, CfLevel::Maybe),
        (-0.2, CfLevel::Unknown),
        (-0.5, CfLevel::MaybeNot),
        (-0.7, CfLevel::ProbablyNot),
        (-0.9, CfLevel::AlmostCertainlyNot),
    ];

    pub fn from_cf(cf: f64) -> CfLevel {
        Self::LOWER_BOUNDS
            .iter()
            .find(|(bound, _)| cf >= *bound)
            .map(|(_, level)| *level)
            .unwrap_or(CfLevel::DefinitelyNot)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Definitely => "Definitely",
            Self::AlmostCertainly => "Almost Certainly",
            Self::Probably => "Probably",
            Self::Maybe => "Maybe",
            Self::Unknown => "Unknown",
            Self::MaybeNot => "Maybe Not",
            Self::ProbablyNot => "Probably Not",
            Self::AlmostCertainlyNot => "Almost Certainly Not",
            Self::DefinitelyNot => "Definitely Not",
        }
    }
}

impl std::fmt::Display for CfLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Human-readable label for a CF value.
pub fn interpret_cf_level(cf: f64) -> &'static str {
    CfLevel::from_cf(cf).label()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_confidence_bands() {
        assert_eq!(interpret_user_confidence("Definitely, every time"), 1.0);
        assert_eq!(interpret_user_confidence("I'm almost certain"), 0.85);
        assert_eq!(interpret_user_confidence("probably"), 0.65);
        assert_eq!(interpret_user_confidence("Maybe?"), 0.4);
        assert_eq!(interpret_user_confidence("I don't know"), 0.0);
    }

    #[test]
    fn test_not_sure_is_unknown_not_definite() {
        assert_eq!(interpret_user_confidence("not sure"), 0.0);
        assert_eq!(interpret_user_confidence("pretty sure"), 0.85);
    }

    #[test]
    fn test_unrecognised_text_defaults_to_moderate() {
        assert_eq!(interpret_user_confidence("purple"), DEFAULT_USER_CF);
        assert_eq!(interpret_user_confidence(""), DEFAULT_USER_CF);
    }

    #[test]
    fn test_band_boundaries_are_upper_inclusive() {
        assert_eq!(interpret_cf_level(0.9), "Definitely");
        assert_eq!(interpret_cf_level(0.8999), "Almost Certainly");
        assert_eq!(interpret_cf_level(0.8), "Almost Certainly");
        assert_eq!(interpret_cf_level(0.6), "Probably");
        assert_eq!(interpret_cf_level(0.3), "Maybe");
        assert_eq!(interpret_cf_level(0.29), "Unknown");
        assert_eq!(interpret_cf_level(-0.2), "Unknown");
        assert_eq!(interpret_cf_level(-0.21), "Maybe Not");
        assert_eq!(interpret_cf_level(-0.5), "Maybe Not");
        assert_eq!(interpret_cf_level(-0.7), "Probably Not");
        assert_eq!(interpret_cf_level(-0.9), "Almost Certainly Not");
        assert_eq!(interpret_cf_level(-0.91), "Definitely Not");
        assert_eq!(interpret_cf_level(-1.0), "Definitely Not");
    }

    #[test]
    fn test_levels_are_monotonic() {
        let mut prev = CfLevel::from_cf(1.0);
        let mut cf = 1.0;
        while cf >= -1.0 {
            let level = CfLevel::from_cf(cf);
            assert!(level >= prev, "{} went back to {}", cf, level);
            prev = level;
            cf -= 0.01;
        }
    }
}
