//! Shared types and reasoning engines for rigdoc.
//!
//! Hybrid hardware fault diagnosis: expert rules (RBR) and a learned case
//! library (CBR), reconciled by a meta-reasoner, with community feedback
//! promoting user-submitted cases.

pub mod case_store;
pub mod cbr;
pub mod certainty;
pub mod config;
pub mod error;
pub mod fact;
pub mod features;
pub mod gap_log;
pub mod learning;
pub mod meta;
pub mod questionnaire;
pub mod rbr;
pub mod rule_engine;
pub mod semantic;
pub mod session;

pub use case_store::{CaseRecord, CaseStatus, CaseStore};
pub use cbr::{run_cbr_analysis, CbrMatch, MatchQuality};
pub use certainty::{interpret_cf_level, interpret_user_confidence, CfLevel};
pub use config::{ColorMode, DiagConfig};
pub use error::{DiagError, Result};
pub use fact::{parse_fact, Fact, SlotValue};
pub use features::{FeatureSet, FeatureToken, FeatureWeights, Symptom, SymptomCategory};
pub use gap_log::{GapLog, RuleGap};
pub use learning::{
    check_and_promote_hybrid, meets_promotion_threshold, save_new_case, update_case_feedback,
    FeedbackOutcome, PromotionScore, SaveOutcome,
};
pub use meta::{resolve_conflict, Primary, Resolution};
pub use rbr::{Diagnosis, RbrAdapter, RbrOutcome};
pub use rule_engine::{ForwardChainer, RuleEngine};
pub use semantic::{BagOfWords, SemanticSimilarity};
pub use session::{DiagnosisReport, Diagnostician, SessionContext};

/// Crate version, shown by `rigdocctl --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
