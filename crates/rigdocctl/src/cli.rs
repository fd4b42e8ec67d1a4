//! Command-line surface for rigdocctl.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rigdocctl")]
#[command(about = "Rigdoc - hybrid hardware fault diagnosis", long_about = None)]
#[command(version = rigdoc_shared::VERSION)]
pub struct Cli {
    /// Config file (default: ~/.config/rigdoc/config.toml, or $RIGDOC_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the question bank and accepted answer labels
    Questions {
        #[arg(long)]
        json: bool,
    },

    /// Diagnose from questionnaire answers
    Diagnose {
        /// Answer as CATEGORY=LABEL (repeatable)
        #[arg(short, long = "answer", value_name = "CATEGORY=LABEL")]
        answers: Vec<String>,

        /// How sure you are about an answer, as CATEGORY=TEXT (repeatable)
        #[arg(short, long = "confidence", value_name = "CATEGORY=TEXT")]
        confidence: Vec<String>,

        /// Expert mode
        #[arg(long)]
        expert: bool,

        #[arg(long)]
        json: bool,
    },

    /// List the case library
    Cases {
        /// Include cases excluded from matching by downvotes
        #[arg(long)]
        all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Submit a solution for the given symptoms
    Submit {
        #[arg(short, long = "answer", value_name = "CATEGORY=LABEL")]
        answers: Vec<String>,

        /// What fixed the problem
        #[arg(long)]
        solution: String,

        /// Store as VERIFIED immediately
        #[arg(long)]
        expert: bool,
    },

    /// Vote on a case
    Vote {
        case_id: String,

        #[arg(value_enum)]
        direction: VoteDirection,

        /// Symptoms of the session the vote belongs to
        #[arg(short, long = "answer", value_name = "CATEGORY=LABEL")]
        answers: Vec<String>,
    },

    /// Interpret a free-text confidence statement
    Cf { text: String },

    /// Name the certainty level of a CF value
    CfLevel {
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Show configuration, or write the defaults with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_vote(&self) -> i32 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

/// Split `CATEGORY=VALUE`. The value may itself contain `=`.
pub fn parse_assignment(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim().to_lowercase(), value.trim().to_string()))
        }
        _ => anyhow::bail!("Expected CATEGORY=VALUE, got '{}'", raw),
    }
}
