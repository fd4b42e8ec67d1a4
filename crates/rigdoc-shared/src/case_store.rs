//! Case library store.
//!
//! Flat text, one record per line, `|`-delimited:
//!
//! ```text
//! ID | STATUS | feature1 feature2 ... | solution text | feedback_score
//! ```
//!
//! The legacy 3-field form `ID | features | solution` is still accepted and
//! read as VERIFIED with feedback 0. Malformed lines are skipped, never fatal,
//! and bytes that are not UTF-8 are decoded lossily.
//!
//! Concurrency: single operator. `update` is last-writer-wins on the whole
//! file; it goes through a temp file + rename so a crash never truncates the
//! library. Lines other than the updated one are written back byte for byte,
//! including ones that do not parse.

use crate::error::{DiagError, Result};
use crate::features::{format_feature_list, parse_feature_list, FeatureSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const FIELD_SEPARATOR: char = '|';

/// ID space: millisecond timestamp modulo this, zero-padded.
const ID_MODULUS: u64 = 100_000;

/// Verification status of a case. Promotion is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Pending,
    Verified,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "PENDING",
            CaseStatus::Verified => "VERIFIED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(CaseStatus::Pending),
            "VERIFIED" => Some(CaseStatus::Verified),
            _ => None,
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A historical resolved case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub status: CaseStatus,
    pub features: FeatureSet,
    pub solution: String,
    #[serde(default)]
    pub feedback_score: i32,
}

impl CaseRecord {
    pub fn new(id: impl Into<String>, status: CaseStatus, features: FeatureSet, solution: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            features,
            solution: solution.into(),
            feedback_score: 0,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == CaseStatus::Verified
    }

    /// Serialize as one store line (no trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{} | {} | {} | {} | {}",
            self.id,
            self.status,
            format_feature_list(&self.features),
            sanitize_field(&self.solution),
            self.feedback_score
        )
    }

    /// Parse one store line, current or legacy format.
    pub fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
        let record = match fields.as_slice() {
            [id, status, features, solution, score] => {
                let status = CaseStatus::parse(status)
                    .ok_or_else(|| format!("unknown status {:?}", status))?;
                let feedback_score = score
                    .parse::<i32>()
                    .map_err(|e| format!("bad feedback score {:?}: {}", score, e))?;
                CaseRecord {
                    id: id.to_string(),
                    status,
                    features: parse_feature_list(features),
                    solution: solution.to_string(),
                    feedback_score,
                }
            }
            [id, features, solution] => CaseRecord::new(
                *id,
                CaseStatus::Verified,
                parse_feature_list(features),
                *solution,
            ),
            _ => return Err(format!("expected 5 or 3 fields, found {}", fields.len())),
        };

        if record.id.is_empty() {
            return Err("empty case id".to_string());
        }
        Ok(record)
    }
}

/// Keep free text on a single line and out of the field separator.
fn sanitize_field(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            '|' => '/',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// Fixed-width id from a millisecond timestamp, stepping past ids in `taken`.
pub fn generate_case_id(now_ms: u64, taken: &HashSet<String>) -> String {
    let base = now_ms % ID_MODULUS;
    (0..ID_MODULUS)
        .map(|step| format!("C{:05}", (base + step) % ID_MODULUS))
        .find(|id| !taken.contains(id))
        .unwrap_or_else(|| format!("C{:05}", base))
}

/// One physical line of the library: raw bytes plus the record, if any.
struct StoredLine {
    raw: Vec<u8>,
    record: Option<CaseRecord>,
}

/// Case library backed by a flat text file.
#[derive(Debug, Clone)]
pub struct CaseStore {
    path: PathBuf,
}

impl CaseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_DATA_HOME/rigdoc/cases.txt`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rigdoc")
            .join("cases.txt")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all parseable records in store order.
    pub fn read_all(&self) -> Result<Vec<CaseRecord>> {
        let records: Vec<CaseRecord> = self
            .load_lines()?
            .into_iter()
            .filter_map(|line| line.record)
            .collect();
        debug!("Loaded {} cases from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn load_lines(&self) -> Result<Vec<StoredLine>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut lines = Vec::new();

        for (idx, chunk) in reader.split(b'\n').enumerate() {
            let raw = chunk?;
            let text = String::from_utf8_lossy(&raw);
            if matches!(text, std::borrow::Cow::Owned(_)) {
                warn!(
                    "Case line {} in {} is not valid UTF-8; decoding lossily",
                    idx + 1,
                    self.path.display()
                );
            }

            let record = if text.trim().is_empty() {
                None
            } else {
                match CaseRecord::parse_line(text.trim_end_matches('\r')) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(
                            "Skipping malformed case line {} in {}: {}",
                            idx + 1,
                            self.path.display(),
                            e
                        );
                        None
                    }
                }
            };
            lines.push(StoredLine { raw, record });
        }

        Ok(lines)
    }

    /// Append one record.
    pub fn append(&self, record: &CaseRecord) -> Result<()> {
        self.ensure_parent()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{}", record.to_line())?;
        file.sync_all()?;
        Ok(())
    }

    fn write_lines(&self, lines: &[StoredLine]) -> Result<()> {
        self.ensure_parent()?;

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            for line in lines {
                file.write_all(&line.raw)?;
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Find a record by id.
    pub fn find(&self, id: &str) -> Result<Option<CaseRecord>> {
        Ok(self.read_all()?.into_iter().find(|r| r.id == id))
    }

    /// Mutate the first record with `id` and write the library back.
    /// Only that line changes. Returns the updated record.
    pub fn update<F>(&self, id: &str, mutate: F) -> Result<CaseRecord>
    where
        F: FnOnce(&mut CaseRecord),
    {
        let mut lines = self.load_lines()?;
        let line = lines
            .iter_mut()
            .find(|l| l.record.as_ref().is_some_and(|r| r.id == id))
            .ok_or_else(|| DiagError::CaseNotFound(id.to_string()))?;

        let mut updated = match line.record.take() {
            Some(record) => record,
            None => return Err(DiagError::CaseNotFound(id.to_string())),
        };
        mutate(&mut updated);
        line.raw = updated.to_line().into_bytes();
        line.record = Some(updated.clone());

        self.write_lines(&lines)?;
        Ok(updated)
    }

    /// Fresh id not present in the store.
    pub fn next_id(&self) -> Result<String> {
        let taken: HashSet<String> = self.read_all()?.into_iter().map(|r| r.id).collect();
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Ok(generate_case_id(now_ms, &taken))
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureToken;
    use tempfile::tempdir;

    fn features(tokens: &[&str]) -> FeatureSet {
        tokens.iter().filter_map(|t| FeatureToken::parse(t)).collect()
    }

    #[test]
    fn test_line_roundtrip() {
        let mut record = CaseRecord::new(
            "C00042",
            CaseStatus::Pending,
            features(&["screen-visuals:black", "power-state:on"]),
            "Reseat the GPU",
        );
        record.feedback_score = -1;
        let line = record.to_line();
        assert_eq!(
            line,
            "C00042 | PENDING | power-state:on screen-visuals:black | Reseat the GPU | -1"
        );
        assert_eq!(CaseRecord::parse_line(&line).unwrap(), record);
    }

    #[test]
    fn test_legacy_three_field_line() {
        let record = CaseRecord::parse_line("L1 | beep-codes:continuous | Reseat RAM").unwrap();
        assert_eq!(record.status, CaseStatus::Verified);
        assert_eq!(record.feedback_score, 0);
        assert_eq!(record.solution, "Reseat RAM");
    }

    #[test]
    fn test_malformed_lines_rejected() {
        assert!(CaseRecord::parse_line("just text").is_err());
        assert!(CaseRecord::parse_line("A | MAYBE | x:y | fix it | 0").is_err());
        assert!(CaseRecord::parse_line("A | PENDING | x:y | fix it | lots").is_err());
        assert!(CaseRecord::parse_line(" | x:y | fix").is_err());
    }

    #[test]
    fn test_solution_is_sanitized() {
        let record = CaseRecord::new("C1", CaseStatus::Verified, FeatureSet::new(), "a | b\nc");
        let parsed = CaseRecord::parse_line(&record.to_line()).unwrap();
        assert_eq!(parsed.solution, "a / b c");
    }

    #[test]
    fn test_read_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cases.txt");
        fs::write(
            &path,
            "C1 | VERIFIED | power-state:dead | Replace PSU | 2\n\
             garbage line\n\
             \n\
             C2 | legacy:yes | Old fix\n",
        )
        .unwrap();

        let store = CaseStore::new(&path);
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "C1");
        assert_eq!(records[1].id, "C2");
    }

    #[test]
    fn test_read_survives_non_utf8_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cases.txt");
        let mut bytes = b"C1 | VERIFIED | power-state:dead | Replace PSU | 2\n".to_vec();
        bytes.extend_from_slice(b"C2 | VERIFIED | cpu-temp:above-85 | Idles at 90\xb0C, repaste | 0\n");
        bytes.extend_from_slice(b"C3 | PENDING | fan-noise:grinding | Replace the fan | 0\n");
        fs::write(&path, &bytes).unwrap();

        let records = CaseStore::new(&path).read_all().unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C2", "C3"]);
        assert!(records[1].solution.contains('\u{fffd}'));
    }

    #[test]
    fn test_update_keeps_other_lines_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cases.txt");
        let untouched: &[u8] = b"C2 | VERIFIED | fan-noise:loud | Clean the fan | blades | 0\n\
            garbage line\n\
            C3 | VERIFIED | cpu-temp:above-85 | Idles at 90\xb0C | 1\n";
        let mut bytes = b"C1 | PENDING | power-state:dead | Replace the PSU | 0\n".to_vec();
        bytes.extend_from_slice(untouched);
        fs::write(&path, &bytes).unwrap();

        let store = CaseStore::new(&path);
        store.update("C1", |r| r.feedback_score += 1).unwrap();

        let after = fs::read(&path).unwrap();
        let mut expected = b"C1 | PENDING | power-state:dead | Replace the PSU | 1\n".to_vec();
        expected.extend_from_slice(untouched);
        assert_eq!(after, expected);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("nope/cases.txt"));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_then_update() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("lib/cases.txt"));

        let a = CaseRecord::new("C1", CaseStatus::Pending, features(&["cpu-temp:above-85"]), "Clean the heatsink");
        let b = CaseRecord::new("C2", CaseStatus::Verified, features(&["fan-noise:grinding"]), "Replace the fan");
        store.append(&a).unwrap();
        store.append(&b).unwrap();

        let updated = store
            .update("C1", |r| {
                r.feedback_score += 1;
                r.status = CaseStatus::Verified;
            })
            .unwrap();
        assert_eq!(updated.feedback_score, 1);

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, CaseStatus::Verified);
        assert_eq!(records[1], b);

        assert!(matches!(
            store.update("C9", |_| {}),
            Err(DiagError::CaseNotFound(_))
        ));
    }

    #[test]
    fn test_generate_case_id() {
        let mut taken = HashSet::new();
        assert_eq!(generate_case_id(1_234_567_890, &taken), "C67890");
        taken.insert("C67890".to_string());
        assert_eq!(generate_case_id(1_234_567_890, &taken), "C67891");
        taken.insert("C99999".to_string());
        assert_eq!(generate_case_id(99_999, &taken), "C00000");
    }
}
