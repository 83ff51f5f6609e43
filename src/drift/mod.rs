//! Plan-drift recording and comparison.
//!
//! Operators record `{queryHash, text, planDigest, version, timestamp}`
//! tuples per release into a JSON-file-backed store, then compare two named
//! versions: when the fraction of queries whose plan digest changed exceeds
//! a percentage threshold, the comparison flags drift. Query fingerprints
//! come from [`crate::query::fingerprint`], so records correlate across
//! versions no matter how the query tree was authored.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors produced by the drift store.
#[derive(Debug, Error)]
pub enum DriftError {
    /// The store file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The store file held invalid JSON for this schema.
    #[error("invalid drift store: {0}")]
    Format(#[from] serde_json::Error),
    /// A comparison named a version with no records.
    #[error("no records for version '{version}'")]
    UnknownVersion {
        /// Version label as requested.
        version: String,
    },
}

/// One recorded execution plan observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecord {
    /// Fingerprint of the query's canonical AST.
    pub query_hash: String,
    /// Compiled query text, kept for operator context.
    pub text: String,
    /// Digest of the execution plan the server produced.
    pub plan_digest: String,
    /// Software version the plan was observed under.
    pub version: String,
    /// Unix seconds at recording time.
    pub timestamp: i64,
}

/// One query whose plan digest changed between the compared versions.
#[derive(Clone, Debug, Serialize)]
pub struct DriftEntry {
    /// Fingerprint of the query.
    pub query_hash: String,
    /// Digest recorded under the baseline version.
    pub baseline_digest: String,
    /// Digest recorded under the candidate version.
    pub candidate_digest: String,
    /// Query text, from the candidate record.
    pub text: String,
}

/// Outcome of comparing two versions.
#[derive(Clone, Debug, Serialize)]
pub struct DriftReport {
    /// Baseline version label.
    pub baseline: String,
    /// Candidate version label.
    pub candidate: String,
    /// Queries present under both versions.
    pub compared: usize,
    /// Queries whose digest changed.
    pub changed: Vec<DriftEntry>,
    /// Query hashes only present under the candidate.
    pub added: Vec<String>,
    /// Query hashes only present under the baseline.
    pub removed: Vec<String>,
    /// Configured drift threshold, in percent.
    pub threshold_pct: f64,
}

impl DriftReport {
    /// Fraction of compared queries whose digest changed, in `0.0..=1.0`.
    pub fn change_fraction(&self) -> f64 {
        if self.compared == 0 {
            0.0
        } else {
            self.changed.len() as f64 / self.compared as f64
        }
    }

    /// Whether the changed fraction strictly exceeds the threshold.
    pub fn drifted(&self) -> bool {
        self.change_fraction() * 100.0 > self.threshold_pct
    }
}

/// JSON-file-backed store of plan records.
#[derive(Debug)]
pub struct DriftStore {
    path: PathBuf,
    records: Vec<PlanRecord>,
}

impl DriftStore {
    /// Opens a store, treating a missing file as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DriftError> {
        let path = path.into();
        let records = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            Vec::new()
        };
        Ok(Self { path, records })
    }

    /// Adds a record, replacing any earlier observation of the same query
    /// under the same version.
    pub fn record(&mut self, record: PlanRecord) {
        self.records.retain(|existing| {
            existing.version != record.version || existing.query_hash != record.query_hash
        });
        self.records.push(record);
    }

    /// Writes the store atomically: serialize to a sibling temp file, then
    /// rename over the target.
    pub fn save(&self) -> Result<(), DriftError> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(serde_json::to_string_pretty(&self.records)?.as_bytes())?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        info!(path = %self.path.display(), records = self.records.len(), "drift store saved");
        Ok(())
    }

    /// All version labels present in the store.
    pub fn versions(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .map(|record| record.version.as_str())
            .collect()
    }

    /// Records observed under one version.
    pub fn records_for<'a>(&'a self, version: &'a str) -> impl Iterator<Item = &'a PlanRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| record.version == version)
    }

    /// Number of records across all versions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compares plan digests between two versions.
    pub fn compare(
        &self,
        baseline: &str,
        candidate: &str,
        threshold_pct: f64,
    ) -> Result<DriftReport, DriftError> {
        let baseline_digests = self.digests_for(baseline)?;
        let candidate_digests = self.digests_for(candidate)?;

        let mut changed = Vec::new();
        let mut removed = Vec::new();
        let mut compared = 0usize;
        for (hash, (digest, _)) in &baseline_digests {
            match candidate_digests.get(hash) {
                Some((candidate_digest, text)) => {
                    compared += 1;
                    if candidate_digest != digest {
                        changed.push(DriftEntry {
                            query_hash: (*hash).to_owned(),
                            baseline_digest: (*digest).to_owned(),
                            candidate_digest: (*candidate_digest).to_owned(),
                            text: (*text).to_owned(),
                        });
                    }
                }
                None => removed.push((*hash).to_owned()),
            }
        }
        let added: Vec<String> = candidate_digests
            .keys()
            .filter(|hash| !baseline_digests.contains_key(*hash))
            .map(|hash| (*hash).to_owned())
            .collect();

        Ok(DriftReport {
            baseline: baseline.to_owned(),
            candidate: candidate.to_owned(),
            compared,
            changed,
            added,
            removed,
            threshold_pct,
        })
    }

    fn digests_for<'a>(&'a self, version: &'a str) -> Result<BTreeMap<&'a str, (&'a str, &'a str)>, DriftError> {
        let digests: BTreeMap<&str, (&str, &str)> = self
            .records_for(version)
            .map(|record| {
                (
                    record.query_hash.as_str(),
                    (record.plan_digest.as_str(), record.text.as_str()),
                )
            })
            .collect();
        if digests.is_empty() {
            return Err(DriftError::UnknownVersion {
                version: version.to_owned(),
            });
        }
        Ok(digests)
    }
}
