//! Rule-gap log: symptom combinations the rule base had nothing to say about.
//!
//! One JSON object per line, appended. Rule authors read it to decide which
//! rules to write next.

use crate::features::{format_feature_list, Answers, FeatureSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGap {
    pub timestamp: DateTime<Utc>,
    /// Feature list in store syntax
    pub features: String,
    /// Category -> selected label
    pub answers: BTreeMap<String, String>,
}

impl RuleGap {
    pub fn new(features: &FeatureSet, answers: &Answers) -> Self {
        Self {
            timestamp: Utc::now(),
            features: format_feature_list(features),
            answers: answers
                .iter()
                .map(|(category, a)| (category.clone(), a.selection.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GapLog {
    path: PathBuf,
}

impl GapLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Write failures are logged and swallowed.
    pub fn record(&self, gap: &RuleGap) {
        if let Err(e) = self.try_record(gap) {
            warn!("Could not write rule gap to {}: {}", self.path.display(), e);
        }
    }

    fn try_record(&self, gap: &RuleGap) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let line = serde_json::to_string(gap)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// All readable entries, oldest first. Malformed lines are skipped.
    pub fn read_all(&self) -> Vec<RuleGap> {
        let Ok(file) = fs::File::open(&self.path) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .map_while(|l| l.ok())
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(&l).ok())
            .collect()
    }
}
