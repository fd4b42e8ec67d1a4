//! Rule-based reasoning adapter.
//!
//! Translates symptoms into facts for a [`RuleEngine`], runs inference and
//! harvests diagnoses ranked by certainty.

use crate::error::Result;
use crate::fact::Fact;
use crate::features::{Symptom, MIN_EVIDENCE_CONFIDENCE};
use crate::rule_engine::RuleEngine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Alternatives kept after the primary diagnosis.
pub const MAX_ALTERNATIVES: usize = 6;

/// Asserted symptoms above this CF are shown as supporting evidence.
pub const EXPLANATION_MIN_CF: f64 = 0.5;

/// A diagnosis read back from the rule engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub fault: String,
    pub solution: String,
    pub category: String,
    /// Certainty in [0, 1]
    pub cf: f64,
    pub citation: String,
}

impl Diagnosis {
    /// Read a `diagnosis` fact. Citation may be absent; everything else is
    /// required.
    pub fn from_fact(fact: &Fact) -> Option<Self> {
        if fact.template != "diagnosis" {
            return None;
        }
        Some(Self {
            fault: fact.text("fault")?.to_string(),
            solution: fact.text("solution")?.to_string(),
            category: fact.text("category")?.to_string(),
            cf: fact.number("cf")?.clamp(0.0, 1.0),
            citation: fact.text("citation").unwrap_or_default().to_string(),
        })
    }

    pub fn percent(&self) -> f64 {
        self.cf * 100.0
    }
}

/// Result of one inference run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RbrOutcome {
    pub primary: Option<Diagnosis>,
    pub alternatives: Vec<Diagnosis>,
    /// Exactly the symptoms asserted in this run
    pub asserted: Vec<Symptom>,
}

impl RbrOutcome {
    /// CF of the primary diagnosis, 0 if none.
    pub fn top_cf(&self) -> f64 {
        self.primary.as_ref().map(|d| d.cf).unwrap_or(0.0)
    }

    /// "Why this diagnosis": asserted symptoms with CF above 0.5.
    pub fn explanation(&self) -> Vec<&Symptom> {
        self.asserted
            .iter()
            .filter(|s| s.cf > EXPLANATION_MIN_CF)
            .collect()
    }
}

/// Drives a rule engine for one diagnostic run at a time.
pub struct RbrAdapter {
    engine: Box<dyn RuleEngine>,
}

impl RbrAdapter {
    pub fn new(engine: Box<dyn RuleEngine>) -> Self {
        Self { engine }
    }

    /// Reset working memory, assert confident symptoms, infer, harvest.
    pub fn run(&mut self, symptoms: &[Symptom]) -> Result<RbrOutcome> {
        self.engine.reset();

        let mut asserted = Vec::new();
        for symptom in symptoms {
            if symptom.cf <= MIN_EVIDENCE_CONFIDENCE {
                debug!(
                    "Not asserting {}:{} (cf {:.2})",
                    symptom.name, symptom.value, symptom.cf
                );
                continue;
            }
            self.engine
                .assert_string(&Fact::symptom(symptom).to_string())?;
            asserted.push(symptom.clone());
        }

        let fired = self.engine.run()?;
        debug!("Asserted {} symptoms, {} rules fired", asserted.len(), fired);

        let mut diagnoses: Vec<Diagnosis> = Vec::new();
        for fact in self.engine.facts().iter().filter(|f| f.template == "diagnosis") {
            match Diagnosis::from_fact(fact) {
                Some(d) => diagnoses.push(d),
                None => warn!("Ignoring incomplete diagnosis fact: {}", fact),
            }
        }
        diagnoses.sort_by(|a, b| b.cf.total_cmp(&a.cf));

        let mut ranked = diagnoses.into_iter();
        let primary = ranked.next();
        let alternatives = ranked.take(MAX_ALTERNATIVES).collect();

        Ok(RbrOutcome {
            primary,
            alternatives,
            asserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagError;
    use crate::fact::SlotValue;

    /// Engine that records assertions and replays canned diagnoses.
    #[derive(Default)]
    struct ScriptedEngine {
        asserted: Vec<String>,
        canned: Vec<Fact>,
        fail_run: bool,
    }

    impl RuleEngine for ScriptedEngine {
        fn reset(&mut self) {
            self.asserted.clear();
        }

        fn assert_string(&mut self, fact: &str) -> Result<()> {
            self.asserted.push(fact.to_string());
            Ok(())
        }

        fn run(&mut self) -> Result<usize> {
            if self.fail_run {
                return Err(DiagError::RuleEngine("boom".into()));
            }
            Ok(self.canned.len())
        }

        fn facts(&self) -> Vec<Fact> {
            self.canned.clone()
        }
    }

    fn diag(fault: &str, cf: f64) -> Fact {
        Fact::new("diagnosis")
            .with("fault", SlotValue::Str(fault.into()))
            .with("solution", SlotValue::Str(format!("fix {}", fault)))
            .with("category", SlotValue::Symbol("x".into()))
            .with("cf", SlotValue::Number(cf))
    }

    fn symptom(name: &str, cf: f64) -> Symptom {
        Symptom {
            name: name.into(),
            value: "v".into(),
            cf,
        }
    }

    #[test]
    fn test_ranks_and_caps_alternatives() {
        let canned = (0..9).map(|i| diag(&format!("f{}", i), i as f64 / 10.0)).collect();
        let mut adapter = RbrAdapter::new(Box::new(ScriptedEngine {
            canned,
            ..Default::default()
        }));

        let outcome = adapter.run(&[symptom("a", 1.0)]).unwrap();
        assert_eq!(outcome.primary.as_ref().unwrap().fault, "f8");
        assert_eq!(outcome.alternatives.len(), MAX_ALTERNATIVES);
        assert_eq!(outcome.alternatives[0].fault, "f7");
        assert!((outcome.top_cf() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_low_confidence_symptoms_not_asserted() {
        let mut adapter = RbrAdapter::new(Box::new(ScriptedEngine::default()));
        let outcome = adapter
            .run(&[symptom("a", 0.2), symptom("b", 0.21), symptom("c", 0.9)])
            .unwrap();
        let names: Vec<&str> = outcome.asserted.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(outcome.primary.is_none());
    }

    #[test]
    fn test_explanation_reflects_asserted_facts() {
        let mut adapter = RbrAdapter::new(Box::new(ScriptedEngine::default()));
        let outcome = adapter
            .run(&[symptom("a", 0.5), symptom("b", 0.51), symptom("c", 0.1)])
            .unwrap();
        let why: Vec<&str> = outcome.explanation().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(why, vec!["b"]);
    }

    #[test]
    fn test_engine_failure_propagates() {
        let mut adapter = RbrAdapter::new(Box::new(ScriptedEngine {
            fail_run: true,
            ..Default::default()
        }));
        assert!(adapter.run(&[symptom("a", 1.0)]).is_err());
    }

    #[test]
    fn test_incomplete_diagnosis_ignored() {
        let broken = Fact::new("diagnosis").with("fault", SlotValue::Str("half".into()));
        let mut adapter = RbrAdapter::new(Box::new(ScriptedEngine {
            canned: vec![broken, diag("whole", 0.6)],
            ..Default::default()
        }));
        let outcome = adapter.run(&[]).unwrap();
        assert_eq!(outcome.primary.unwrap().fault, "whole");
        assert!(outcome.alternatives.is_empty());
    }
}
