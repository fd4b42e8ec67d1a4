//! Forward-chaining rule engine.
//!
//! The diagnostic core only talks to [`RuleEngine`]: it asserts textual
//! symptom facts, runs inference and reads facts back. [`ForwardChainer`] is
//! the built-in implementation over a TOML rule base:
//!
//! ```toml
//! [[rule]]
//! name = "psu-dead"
//! when = ["power-state:dead"]
//! cf = 0.9
//! [rule.diagnosis]
//! fault = "Power supply failure"
//! solution = "Test the PSU with a paperclip jump or a known-good unit."
//! category = "power"
//! citation = "ATX12V design guide"
//!
//! [[rule]]
//! name = "no-post"
//! when = ["power-state:on", "screen-visuals:black"]
//! derive = "post:failed"
//! ```
//!
//! Conclusion CF = rule CF x weakest condition CF. Conclusions from different
//! rules for the same fault combine as `a + b(1 - a)`. A rule counts once per
//! run: if a later pass raises one of its conditions, it fires again and its
//! new CF replaces its earlier contribution, so results do not depend on rule
//! order. Passes repeat until no rule fires.

use crate::error::{DiagError, Result};
use crate::fact::{parse_fact, Fact, SlotValue};
use crate::features::{FeatureToken, Symptom};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const BUILTIN_RULES: &str = include_str!("../rules/default_rules.toml");

/// Boundary to an inference engine.
pub trait RuleEngine {
    /// Clear working memory. Rules stay loaded.
    fn reset(&mut self);

    /// Assert one textual fact.
    fn assert_string(&mut self, fact: &str) -> Result<()>;

    /// Run to fixpoint; returns how many rules fired.
    fn run(&mut self) -> Result<usize>;

    /// Current working memory.
    fn facts(&self) -> Vec<Fact>;
}

/// Diagnosis a rule concludes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagnosisTemplate {
    pub fault: String,
    pub solution: String,
    pub category: String,
    #[serde(default)]
    pub citation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Conclusion {
    Diagnose(DiagnosisTemplate),
    Derive(FeatureToken),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub conditions: Vec<FeatureToken>,
    pub cf: f64,
    pub conclusion: Conclusion,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default, rename = "rule")]
    rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    name: String,
    when: Vec<String>,
    #[serde(default = "default_rule_cf")]
    cf: f64,
    diagnosis: Option<DiagnosisTemplate>,
    derive: Option<String>,
}

fn default_rule_cf() -> f64 {
    1.0
}

impl RuleSpec {
    fn compile(self) -> Result<Rule> {
        let bad = |reason: String| DiagError::RuleLoad(format!("rule {:?}: {}", self.name, reason));

        if self.when.is_empty() {
            return Err(bad("empty `when`".to_string()));
        }
        if !(self.cf > 0.0 && self.cf <= 1.0) {
            return Err(bad(format!("cf {} outside (0, 1]", self.cf)));
        }

        let mut conditions = Vec::with_capacity(self.when.len());
        for raw in &self.when {
            conditions.push(FeatureToken::parse(raw).ok_or_else(|| bad(format!("bad condition {:?}", raw)))?);
        }

        let conclusion = match (&self.diagnosis, &self.derive) {
            (Some(d), None) => Conclusion::Diagnose(d.clone()),
            (None, Some(raw)) => Conclusion::Derive(
                FeatureToken::parse(raw).ok_or_else(|| bad(format!("bad derive token {:?}", raw)))?,
            ),
            (Some(_), Some(_)) => return Err(bad("has both `diagnosis` and `derive`".to_string())),
            (None, None) => return Err(bad("has neither `diagnosis` nor `derive`".to_string())),
        };

        Ok(Rule {
            name: self.name,
            conditions,
            cf: self.cf,
            conclusion,
        })
    }
}

#[derive(Debug, Clone)]
struct Concluded {
    template: DiagnosisTemplate,
    /// (rule index, cf) per contributing rule.
    contributions: Vec<(usize, f64)>,
}

impl Concluded {
    fn cf(&self) -> f64 {
        self.contributions
            .iter()
            .fold(0.0, |acc, (_, cf)| acc + cf * (1.0 - acc))
    }
}

/// Built-in forward chainer.
#[derive(Debug, Clone)]
pub struct ForwardChainer {
    rules: Vec<Rule>,
    /// Symptom -> CF, plus insertion order for stable fact listing.
    symptoms: HashMap<FeatureToken, f64>,
    order: Vec<FeatureToken>,
    diagnoses: Vec<Concluded>,
    /// Rule index -> CF it last fired at.
    fired: HashMap<usize, f64>,
}

impl ForwardChainer {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            symptoms: HashMap::new(),
            order: Vec::new(),
            diagnoses: Vec::new(),
            fired: HashMap::new(),
        }
    }

    /// Compile a TOML rule base.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(src).map_err(|e| DiagError::RuleLoad(e.to_string()))?;
        let rules = file
            .rules
            .into_iter()
            .map(RuleSpec::compile)
            .collect::<Result<Vec<_>>>()?;
        if rules.is_empty() {
            return Err(DiagError::RuleLoad("rule base is empty".to_string()));
        }
        Ok(Self::new(rules))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| DiagError::RuleLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&src)
    }

    /// The rule base shipped with the library.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn add_symptom(&mut self, token: FeatureToken, cf: f64) -> bool {
        match self.symptoms.get_mut(&token) {
            Some(existing) if *existing >= cf => false,
            Some(existing) => {
                *existing = cf;
                true
            }
            None => {
                self.order.push(token.clone());
                self.symptoms.insert(token, cf);
                true
            }
        }
    }

    fn add_diagnosis(&mut self, rule: usize, template: &DiagnosisTemplate, cf: f64) {
        let Some(existing) = self
            .diagnoses
            .iter_mut()
            .find(|d| d.template.fault == template.fault)
        else {
            self.diagnoses.push(Concluded {
                template: template.clone(),
                contributions: vec![(rule, cf)],
            });
            return;
        };
        match existing.contributions.iter_mut().find(|(idx, _)| *idx == rule) {
            Some(slot) => slot.1 = cf,
            None => existing.contributions.push((rule, cf)),
        }
    }

    /// Weakest condition CF, if every condition holds.
    fn match_rule(&self, rule: &Rule) -> Option<f64> {
        rule.conditions
            .iter()
            .map(|c| self.symptoms.get(c).copied())
            .try_fold(f64::INFINITY, |min, cf| cf.map(|cf| min.min(cf)))
    }
}

impl RuleEngine for ForwardChainer {
    fn reset(&mut self) {
        self.symptoms.clear();
        self.order.clear();
        self.diagnoses.clear();
        self.fired.clear();
    }

    fn assert_string(&mut self, fact: &str) -> Result<()> {
        let fact = parse_fact(fact)?;
        let symptom = fact
            .to_symptom()
            .ok_or_else(|| DiagError::RuleEngine(format!("cannot assert {}: only complete symptom facts are accepted", fact)))?;
        self.add_symptom(symptom.token(), symptom.cf);
        Ok(())
    }

    fn run(&mut self) -> Result<usize> {
        let before = self.fired.len();
        loop {
            let mut progressed = false;
            for idx in 0..self.rules.len() {
                let Some(weakest) = self.match_rule(&self.rules[idx]) else {
                    continue;
                };
                let rule = self.rules[idx].clone();
                let cf = rule.cf * weakest;
                if self.fired.get(&idx).is_some_and(|&prev| prev >= cf) {
                    continue;
                }
                self.fired.insert(idx, cf);
                progressed = true;

                debug!("Rule {} fired at cf {:.2}", rule.name, cf);
                match &rule.conclusion {
                    Conclusion::Derive(token) => {
                        self.add_symptom(token.clone(), cf);
                    }
                    Conclusion::Diagnose(template) => self.add_diagnosis(idx, template, cf),
                }
            }
            if !progressed {
                break;
            }
        }
        Ok(self.fired.len() - before)
    }

    fn facts(&self) -> Vec<Fact> {
        let symptoms = self.order.iter().map(|token| {
            Fact::symptom(&Symptom {
                name: token.category().to_string(),
                value: token.value().to_string(),
                cf: self.symptoms.get(token).copied().unwrap_or(0.0),
            })
        });
        let diagnoses = self.diagnoses.iter().map(|d| {
            Fact::new("diagnosis")
                .with("fault", SlotValue::Str(d.template.fault.clone()))
                .with("solution", SlotValue::Str(d.template.solution.clone()))
                .with("category", SlotValue::text(d.template.category.as_str()))
                .with("cf", SlotValue::Number(d.cf()))
                .with("citation", SlotValue::Str(d.template.citation.clone()))
        });
        symptoms.chain(diagnoses).collect()
    }
}
