//! Error types for rigdoc.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagError {
    #[error("Rule base could not be loaded: {0}")]
    RuleLoad(String),

    #[error("Fact syntax error at byte {pos}: {reason}")]
    FactSyntax { pos: usize, reason: String },

    #[error("Rule engine error: {0}")]
    RuleEngine(String),

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Invalid vote {0}: must be +1 or -1")]
    InvalidVote(i32),

    #[error("Already voted on case {0} in this session")]
    DuplicateVote(String),

    #[error("Unknown answer '{label}' for {category}")]
    InvalidAnswer { category: String, label: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DiagError {
    pub fn code(&self) -> i32 {
        match self {
            DiagError::RuleLoad(_) => -32010,
            DiagError::FactSyntax { .. } => -32011,
            DiagError::RuleEngine(_) => -32012,
            DiagError::CaseNotFound(_) => -32020,
            DiagError::InvalidVote(_) => -32021,
            DiagError::DuplicateVote(_) => -32022,
            DiagError::InvalidAnswer { .. } => -32023,
            DiagError::Config(_) => -32030,
            DiagError::Io(_) => -32006,
            DiagError::Json(_) => -32700,
        }
    }

    pub(crate) fn syntax(pos: usize, reason: impl Into<String>) -> Self {
        DiagError::FactSyntax {
            pos,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiagError>;
