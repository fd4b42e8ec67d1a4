//! Symptom vocabulary, feature tokens and the feature extractor.
//!
//! A feature token is `category:value`, e.g. `cpu-temp:above-85`.
//! Absence of a token means "no evidence", never negative evidence.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Answers at or below this confidence never become evidence.
pub const MIN_EVIDENCE_CONFIDENCE: f64 = 0.2;

/// Canonical id meaning "the user could not tell".
pub const UNKNOWN_SENTINEL: &str = "unknown";

/// Weight for categories outside the fixed vocabulary.
pub const DEFAULT_CATEGORY_WEIGHT: f64 = 1.0;

/// Fixed symptom vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymptomCategory {
    PowerState,
    BeepCodes,
    ScreenVisuals,
    BootProgress,
    CpuTemp,
    ShutdownPattern,
    SoundOutput,
    VolumeBar,
    FanNoise,
    StorageNoise,
    UsbDevices,
    NetworkLink,
}

impl SymptomCategory {
    pub const ALL: [SymptomCategory; 12] = [
        SymptomCategory::PowerState,
        SymptomCategory::BeepCodes,
        SymptomCategory::ScreenVisuals,
        SymptomCategory::BootProgress,
        SymptomCategory::CpuTemp,
        SymptomCategory::ShutdownPattern,
        SymptomCategory::SoundOutput,
        SymptomCategory::VolumeBar,
        SymptomCategory::FanNoise,
        SymptomCategory::StorageNoise,
        SymptomCategory::UsbDevices,
        SymptomCategory::NetworkLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerState => "power-state",
            Self::BeepCodes => "beep-codes",
            Self::ScreenVisuals => "screen-visuals",
            Self::BootProgress => "boot-progress",
            Self::CpuTemp => "cpu-temp",
            Self::ShutdownPattern => "shutdown-pattern",
            Self::SoundOutput => "sound-output",
            Self::VolumeBar => "volume-bar",
            Self::FanNoise => "fan-noise",
            Self::StorageNoise => "storage-noise",
            Self::UsbDevices => "usb-devices",
            Self::NetworkLink => "network-link",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Static diagnostic weight. Power and thermal evidence dominate,
    /// peripheral evidence counts least.
    pub fn weight(&self) -> f64 {
        match self {
            Self::PowerState => 3.0,
            Self::BeepCodes => 2.5,
            Self::CpuTemp => 2.5,
            Self::ScreenVisuals => 2.0,
            Self::BootProgress => 2.0,
            Self::ShutdownPattern => 2.0,
            Self::StorageNoise => 1.8,
            Self::SoundOutput => 1.5,
            Self::FanNoise => 1.2,
            Self::VolumeBar => 1.0,
            Self::UsbDevices => 0.8,
            Self::NetworkLink => 0.8,
        }
    }
}

impl std::fmt::Display for SymptomCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of evidence, `category:value`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureToken {
    category: String,
    value: String,
}

impl FeatureToken {
    pub fn new(category: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            value: value.into(),
        }
    }

    /// Parse `category:value`. Splits on the first colon; both halves must be
    /// non-empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (category, value) = s.trim().split_once(':')?;
        if category.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self::new(category, value))
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for FeatureToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.category, self.value)
    }
}

impl TryFrom<String> for FeatureToken {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        FeatureToken::parse(&s).ok_or_else(|| format!("invalid feature token: {:?}", s))
    }
}

impl From<FeatureToken> for String {
    fn from(token: FeatureToken) -> String {
        token.to_string()
    }
}

/// Order-free, duplicate-free set of feature tokens.
pub type FeatureSet = BTreeSet<FeatureToken>;

/// Parse a whitespace-separated token list; invalid tokens are dropped.
pub fn parse_feature_list(s: &str) -> FeatureSet {
    s.split_whitespace().filter_map(FeatureToken::parse).collect()
}

/// Render a feature set as a whitespace-separated list.
pub fn format_feature_list(features: &FeatureSet) -> String {
    features
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Category -> weight table used by the CBR matcher.
#[derive(Debug, Clone)]
pub struct FeatureWeights {
    weights: HashMap<String, f64>,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        let weights = SymptomCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), c.weight()))
            .collect();
        Self { weights }
    }
}

impl FeatureWeights {
    /// Table where every category weighs the same.
    pub fn uniform() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }

    /// Merge overrides over the current table. Non-positive weights are ignored.
    pub fn with_overrides<'a>(mut self, overrides: impl IntoIterator<Item = (&'a String, &'a f64)>) -> Self {
        for (category, weight) in overrides {
            if *weight > 0.0 {
                self.weights.insert(category.clone(), *weight);
            } else {
                tracing::warn!("Ignoring non-positive weight {} for {}", weight, category);
            }
        }
        self
    }

    pub fn weight(&self, category: &str) -> f64 {
        self.weights
            .get(category)
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_WEIGHT)
    }

    pub fn token_weight(&self, token: &FeatureToken) -> f64 {
        self.weight(token.category())
    }
}

/// What one answer label means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerChoice {
    pub canonical_id: String,
    pub confidence: f64,
}

impl AnswerChoice {
    pub fn new(canonical_id: impl Into<String>, confidence: f64) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            confidence,
        }
    }

    /// Whether this choice is confident enough to count as evidence.
    pub fn is_evidence(&self) -> bool {
        self.confidence > MIN_EVIDENCE_CONFIDENCE && self.canonical_id != UNKNOWN_SENTINEL
    }
}

/// Answer label -> meaning, for one question.
pub type AnswerTable = BTreeMap<String, AnswerChoice>;

/// A user's selection together with the table that interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub selection: String,
    pub table: AnswerTable,
}

impl Answer {
    pub fn new(selection: impl Into<String>, table: AnswerTable) -> Self {
        Self {
            selection: selection.into(),
            table,
        }
    }

    /// The confident interpretation of the selection, if any.
    pub fn choice(&self) -> Option<&AnswerChoice> {
        self.table.get(&self.selection).filter(|c| c.is_evidence())
    }
}

/// Category name -> answer.
pub type Answers = BTreeMap<String, Answer>;

/// Convert questionnaire answers into feature tokens.
pub fn extract_features(answers: &Answers) -> FeatureSet {
    answers
        .iter()
        .filter_map(|(category, answer)| {
            answer
                .choice()
                .map(|choice| FeatureToken::new(category.as_str(), choice.canonical_id.as_str()))
        })
        .collect()
}

/// A symptom ready to be asserted into the rule engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symptom {
    pub name: String,
    pub value: String,
    pub cf: f64,
}

impl Symptom {
    pub fn token(&self) -> FeatureToken {
        FeatureToken::new(self.name.as_str(), self.value.as_str())
    }
}

/// Like [`extract_features`], but keeps certainty: answer confidence scaled
/// by the user's stated confidence for that category (1.0 when unstated).
pub fn extract_symptoms(answers: &Answers, stated: &BTreeMap<String, f64>) -> Vec<Symptom> {
    answers
        .iter()
        .filter_map(|(category, answer)| {
            let choice = answer.choice()?;
            let scale = stated.get(category).copied().unwrap_or(1.0);
            Some(Symptom {
                name: category.clone(),
                value: choice.canonical_id.clone(),
                cf: (choice.confidence * scale).clamp(-1.0, 1.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str, f64)]) -> AnswerTable {
        entries
            .iter()
            .map(|(label, id, cf)| (label.to_string(), AnswerChoice::new(*id, *cf)))
            .collect()
    }

    #[test]
    fn test_token_parse() {
        let t = FeatureToken::parse("cpu-temp:above-85").unwrap();
        assert_eq!(t.category(), "cpu-temp");
        assert_eq!(t.value(), "above-85");
        assert_eq!(t.to_string(), "cpu-temp:above-85");
        assert!(FeatureToken::parse("nocolon").is_none());
        assert!(FeatureToken::parse(":black").is_none());
        assert!(FeatureToken::parse("screen:").is_none());
    }

    #[test]
    fn test_token_serde_as_string() {
        let t = FeatureToken::new("volume-bar", "frozen");
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"volume-bar:frozen\"");
        let back: FeatureToken = serde_json::from_str("\"volume-bar:frozen\"").unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_extract_skips_low_confidence_and_unknown() {
        let mut answers = Answers::new();
        answers.insert(
            "screen-visuals".into(),
            Answer::new("Black", table(&[("Black", "black", 1.0)])),
        );
        answers.insert(
            "cpu-temp".into(),
            Answer::new("Not sure", table(&[("Not sure", "unknown", 0.9)])),
        );
        answers.insert(
            "fan-noise".into(),
            Answer::new("Faint", table(&[("Faint", "faint", 0.2)])),
        );
        answers.insert(
            "sound-output".into(),
            Answer::new("Unlisted", table(&[("None", "none", 1.0)])),
        );

        let features = extract_features(&answers);
        assert_eq!(features.len(), 1);
        assert!(features.contains(&FeatureToken::new("screen-visuals", "black")));
    }

    #[test]
    fn test_extract_symptoms_scales_by_stated_confidence() {
        let mut answers = Answers::new();
        answers.insert(
            "beep-codes".into(),
            Answer::new("Yes", table(&[("Yes", "present", 0.8)])),
        );
        let mut stated = BTreeMap::new();
        stated.insert("beep-codes".to_string(), 0.5);

        let symptoms = extract_symptoms(&answers, &stated);
        assert_eq!(symptoms.len(), 1);
        assert!((symptoms[0].cf - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_weights_default_and_override() {
        let mut overrides = HashMap::new();
        overrides.insert("volume-bar".to_string(), 2.0);
        overrides.insert("fan-noise".to_string(), 0.0);
        let w = FeatureWeights::default().with_overrides(overrides.iter());

        assert_eq!(w.weight("power-state"), 3.0);
        assert_eq!(w.weight("volume-bar"), 2.0);
        assert_eq!(w.weight("fan-noise"), 1.2);
        assert_eq!(w.weight("never-heard-of-it"), DEFAULT_CATEGORY_WEIGHT);
    }

    #[test]
    fn test_category_roundtrip() {
        for c in SymptomCategory::ALL {
            assert_eq!(SymptomCategory::parse(c.as_str()), Some(c));
        }
    }
}
