//! Diagnostic sessions.
//!
//! A [`SessionContext`] carries everything one user interaction accumulates
//! (answers, stated confidence, votes). A [`Diagnostician`] owns the shared
//! machinery and runs the pipeline against a context:
//!
//! answers -> features/symptoms -> RBR + CBR -> meta-reasoner -> report

use crate::case_store::CaseStore;
use crate::cbr::{run_cbr_analysis, CbrMatch};
use crate::certainty::interpret_user_confidence;
use crate::config::DiagConfig;
use crate::error::{DiagError, Result};
use crate::features::{extract_features, extract_symptoms, Answers, FeatureSet, FeatureWeights, Symptom};
use crate::gap_log::{GapLog, RuleGap};
use crate::learning::{self, FeedbackOutcome, SaveOutcome};
use crate::meta::{resolve_conflict, Resolution};
use crate::questionnaire::{self, Question};
use crate::rbr::{Diagnosis, RbrAdapter, RbrOutcome};
use crate::rule_engine::{ForwardChainer, RuleEngine};
use crate::semantic::{BagOfWords, SemanticSimilarity};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// State of one diagnostic session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Questions answered so far
    pub step: usize,
    pub answers: Answers,
    /// Category -> free-text confidence ("pretty sure", "maybe", ...)
    pub stated_confidence: BTreeMap<String, String>,
    /// Cases voted on in this session
    pub voted_cases: HashSet<String>,
    pub expert_mode: bool,
    /// Features of the last inference run
    pub features: FeatureSet,
    /// Top rule diagnosis of the last inference run
    pub last_rbr: Option<Diagnosis>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expert() -> Self {
        Self {
            expert_mode: true,
            ..Self::default()
        }
    }

    /// Record an answer from the question bank. Labels match case-insensitively.
    pub fn answer(&mut self, category: &str, label: &str) -> Result<()> {
        let answer =
            questionnaire::answer(category, label).ok_or_else(|| DiagError::InvalidAnswer {
                category: category.to_string(),
                label: label.to_string(),
            })?;
        self.answers.insert(category.to_string(), answer);
        self.step = self.answers.len();
        Ok(())
    }

    pub fn state_confidence(&mut self, category: &str, text: &str) {
        self.stated_confidence
            .insert(category.to_string(), text.to_string());
    }

    /// Stated confidence interpreted as CF per category.
    pub fn stated_cf(&self) -> BTreeMap<String, f64> {
        self.stated_confidence
            .iter()
            .map(|(category, text)| (category.clone(), interpret_user_confidence(text)))
            .collect()
    }

    pub fn unanswered(&self) -> Vec<&'static Question> {
        questionnaire::unanswered(&self.answers)
    }

    pub fn is_complete(&self) -> bool {
        self.unanswered().is_empty()
    }
}

/// Everything one diagnostic run produced.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub features: FeatureSet,
    pub symptoms: Vec<Symptom>,
    pub rbr: Option<RbrOutcome>,
    /// Set when the rule engine failed; CBR still ran
    pub rbr_error: Option<String>,
    pub cbr: Option<CbrMatch>,
    pub cbr_score: f64,
    pub resolution: Resolution,
    /// Categories still unanswered when the run started
    pub unanswered: Vec<String>,
}

impl DiagnosisReport {
    /// Asserted symptoms that support the rule diagnosis.
    pub fn explanation(&self) -> Vec<&Symptom> {
        self.rbr
            .as_ref()
            .map(RbrOutcome::explanation)
            .unwrap_or_default()
    }
}

/// Runs diagnoses and feedback against one case library and rule base.
pub struct Diagnostician {
    store: CaseStore,
    rbr: RbrAdapter,
    weights: FeatureWeights,
    semantic: Option<Box<dyn SemanticSimilarity>>,
    gaps: Option<GapLog>,
}

impl Diagnostician {
    pub fn new(store: CaseStore, engine: Box<dyn RuleEngine>) -> Self {
        Self {
            store,
            rbr: RbrAdapter::new(engine),
            weights: FeatureWeights::default(),
            semantic: None,
            gaps: None,
        }
    }

    /// Store, rule base, weights and gap log from configuration, with the
    /// bag-of-words scorer for promotion checks.
    pub fn from_config(config: &DiagConfig) -> Result<Self> {
        let engine = match &config.rules.path {
            Some(path) => {
                if !path.exists() {
                    return Err(DiagError::Config(format!(
                        "rule base {} does not exist",
                        path.display()
                    )));
                }
                ForwardChainer::from_path(path)?
            }
            None => ForwardChainer::builtin()?,
        };
        debug!("Loaded {} rules", engine.rules().len());

        Ok(Self::new(CaseStore::new(config.store_path()), Box::new(engine))
            .with_weights(config.feature_weights())
            .with_semantic(Box::new(BagOfWords))
            .with_gap_log(GapLog::new(config.gap_log_path())))
    }

    pub fn with_weights(mut self, weights: FeatureWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_semantic(mut self, scorer: Box<dyn SemanticSimilarity>) -> Self {
        self.semantic = Some(scorer);
        self
    }

    pub fn with_gap_log(mut self, gaps: GapLog) -> Self {
        self.gaps = Some(gaps);
        self
    }

    pub fn store(&self) -> &CaseStore {
        &self.store
    }

    /// Extract features and run the rule engine, refreshing the context's
    /// `features` and `last_rbr`. Returns the symptoms and the RBR result.
    pub fn infer(
        &mut self,
        ctx: &mut SessionContext,
    ) -> (Vec<Symptom>, std::result::Result<RbrOutcome, DiagError>) {
        ctx.features = extract_features(&ctx.answers);
        let symptoms = extract_symptoms(&ctx.answers, &ctx.stated_cf());

        let outcome = self.rbr.run(&symptoms);
        ctx.last_rbr = match &outcome {
            Ok(o) => o.primary.clone(),
            Err(e) => {
                warn!("Rule engine failed, continuing with case matching only: {}", e);
                None
            }
        };
        (symptoms, outcome)
    }

    /// Full pipeline. Only case library I/O errors are fatal.
    pub fn diagnose(&mut self, ctx: &mut SessionContext) -> Result<DiagnosisReport> {
        let unanswered = ctx
            .unanswered()
            .iter()
            .map(|q| q.category.as_str().to_string())
            .collect();

        let (symptoms, outcome) = self.infer(ctx);
        let (rbr, rbr_error) = match outcome {
            Ok(o) => (Some(o), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let (cbr, cbr_score) = run_cbr_analysis(&ctx.features, &self.store, &self.weights)?;

        let top = rbr.as_ref().and_then(|o| o.primary.as_ref());
        let resolution = resolve_conflict(
            top,
            top.map(|d| d.cf).unwrap_or(0.0),
            cbr.as_ref().map(|m| &m.case),
            cbr_score,
        );

        if rbr.as_ref().is_some_and(|o| o.primary.is_none()) && !ctx.features.is_empty() {
            if let Some(gaps) = &self.gaps {
                gaps.record(&RuleGap::new(&ctx.features, &ctx.answers));
            }
        }

        info!(
            "Diagnosis: {} ({:.0}%) from {} features",
            resolution.primary.as_str(),
            resolution.confidence,
            ctx.features.len()
        );

        Ok(DiagnosisReport {
            features: ctx.features.clone(),
            symptoms,
            rbr,
            rbr_error,
            cbr,
            cbr_score,
            resolution,
            unanswered,
        })
    }

    /// Vote on a case once per session. `vote` is +1 or -1.
    pub fn vote(
        &self,
        ctx: &mut SessionContext,
        case_id: &str,
        vote: i32,
    ) -> Result<FeedbackOutcome> {
        if ctx.voted_cases.contains(case_id) {
            return Err(DiagError::DuplicateVote(case_id.to_string()));
        }
        let outcome = learning::update_case_feedback(
            &self.store,
            case_id,
            vote,
            &ctx.features,
            ctx.last_rbr.as_ref(),
            self.semantic.as_deref(),
        )?;
        ctx.voted_cases.insert(case_id.to_string());
        Ok(outcome)
    }

    /// Retain the session's features with a user-supplied solution.
    pub fn submit(&self, ctx: &SessionContext, solution: &str) -> Result<SaveOutcome> {
        let features = extract_features(&ctx.answers);
        learning::save_new_case(&self.store, &features, solution, ctx.expert_mode)
    }
}
