//! Record collection loading and gold/candidate matching

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{MatchingConfig, UnmatchedPolicy};

/// Error type for reading gold/candidate collections
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{path}: invalid JSON: {message}")]
    Parse { path: String, message: String },

    #[error("{path}: expected an array of record objects (or one record object per line)")]
    NotRecords { path: String },
}

/// Zero records could be matched between gold and candidate
#[derive(Debug, thiserror::Error)]
#[error("no records matched between gold ({gold} records) and candidate ({candidate} records)")]
pub struct NoMatchedRecords {
    pub gold: usize,
    pub candidate: usize,
}

/// Identity of a record: an explicit id value, or its position in the file.
///
/// Ids in extraction datasets are integers or strings; positional keys are the
/// 0-based index and serialize as plain numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Num(i64),
    Text(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Num(n) => write!(f, "{}", n),
            RecordKey::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A single structured-output record
#[derive(Debug, Clone)]
pub struct Record {
    /// Explicit id extracted from the configured id field, if present
    pub id: Option<RecordKey>,
    pub fields: Map<String, Value>,
}

/// An ordered collection of records read from one file
#[derive(Debug, Clone)]
pub struct Collection {
    /// Display path, used in errors and summaries
    pub path: String,
    pub records: Vec<Record>,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any record carries an explicit id
    pub fn has_ids(&self) -> bool {
        self.records.iter().any(|r| r.id.is_some())
    }
}

/// A gold record paired with its candidate counterpart.
///
/// `candidate` is `None` for unmatched gold records scored under the
/// `score-as-miss` policy.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub key: RecordKey,
    pub gold: Map<String, Value>,
    pub candidate: Option<Map<String, Value>>,
}

/// Result of aligning a candidate collection against gold
#[derive(Debug)]
pub struct MatchOutcome {
    pub pairs: Vec<MatchedPair>,
    /// Number of gold records with a candidate counterpart
    pub matched: usize,
    pub gold_total: usize,
    pub candidate_total: usize,
}

/// Load a collection from a JSON array file or an NDJSON file (one record
/// object per line). Extraction pipelines emit NDJSON; gold files are arrays.
pub fn load_collection(path: impl AsRef<Path>, id_field: &str) -> Result<Collection, InputError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|e| InputError::Io {
        path: path_str.clone(),
        source: e,
    })?;

    let values = if content.trim_start().starts_with('[') {
        parse_array(&content, &path_str)?
    } else {
        parse_lines(&content, &path_str)?
    };

    let mut records = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Object(fields) => {
                let id = extract_id(&fields, id_field);
                records.push(Record { id, fields });
            }
            _ => return Err(InputError::NotRecords { path: path_str }),
        }
    }

    tracing::debug!("loaded {} records from {}", records.len(), path_str);

    Ok(Collection {
        path: path_str,
        records,
    })
}

fn parse_array(content: &str, path: &str) -> Result<Vec<Value>, InputError> {
    let value: Value = serde_json::from_str(content).map_err(|e| InputError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(InputError::NotRecords {
            path: path.to_string(),
        }),
    }
}

fn parse_lines(content: &str, path: &str) -> Result<Vec<Value>, InputError> {
    let mut values = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| InputError::Parse {
            path: path.to_string(),
            message: format!("line {}: {}", lineno + 1, e),
        })?;
        values.push(value);
    }
    if values.is_empty() {
        return Err(InputError::NotRecords {
            path: path.to_string(),
        });
    }
    Ok(values)
}

/// Extract a record's explicit id through a dotted path (e.g.
/// `patient.record_id`). Integer and string ids are recognized.
fn extract_id(fields: &Map<String, Value>, id_field: &str) -> Option<RecordKey> {
    let mut current = fields;
    let mut segments = id_field.split('.').peekable();

    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return match value {
                Value::Number(n) => n.as_i64().map(RecordKey::Num),
                Value::String(s) => Some(RecordKey::Text(s.clone())),
                _ => None,
            };
        }
        current = value.as_object()?;
    }
    None
}

/// Copy aliased top-level keys into their canonical names, so candidates that
/// name a section differently (e.g. `policy` for `policy_details`) still score.
fn apply_aliases(fields: &mut Map<String, Value>, aliases: &HashMap<String, String>) {
    for (from, to) in aliases {
        if !fields.contains_key(to) {
            if let Some(value) = fields.get(from).cloned() {
                fields.insert(to.clone(), value);
            }
        }
    }
}

/// Align candidate records against gold.
///
/// When both collections carry explicit ids, matching is strictly by id;
/// disjoint id sets are an error, never silently repaired. When either side
/// has no ids at all, records are paired by position over the common prefix.
/// Unmatched gold records are dropped or paired with an empty candidate,
/// depending on the configured policy.
pub fn match_records(
    gold: &Collection,
    candidate: &Collection,
    config: &MatchingConfig,
) -> Result<MatchOutcome, NoMatchedRecords> {
    let by_id = gold.has_ids() && candidate.has_ids();

    let mut pairs = Vec::new();
    let mut matched = 0usize;

    if by_id {
        // Last occurrence wins for duplicate candidate ids.
        let mut lookup: HashMap<&RecordKey, &Record> = HashMap::new();
        for record in &candidate.records {
            if let Some(id) = &record.id {
                lookup.insert(id, record);
            }
        }

        for (index, record) in gold.records.iter().enumerate() {
            let key = record
                .id
                .clone()
                .unwrap_or(RecordKey::Num(index as i64));
            let found = record.id.as_ref().and_then(|id| lookup.get(id));
            match found {
                Some(cand) => {
                    let mut fields = cand.fields.clone();
                    apply_aliases(&mut fields, &config.field_aliases);
                    matched += 1;
                    pairs.push(MatchedPair {
                        key,
                        gold: record.fields.clone(),
                        candidate: Some(fields),
                    });
                }
                None => push_unmatched(&mut pairs, key, record, config.unmatched),
            }
        }
    } else {
        for (index, record) in gold.records.iter().enumerate() {
            let key = record
                .id
                .clone()
                .unwrap_or(RecordKey::Num(index as i64));
            match candidate.records.get(index) {
                Some(cand) => {
                    let mut fields = cand.fields.clone();
                    apply_aliases(&mut fields, &config.field_aliases);
                    matched += 1;
                    pairs.push(MatchedPair {
                        key,
                        gold: record.fields.clone(),
                        candidate: Some(fields),
                    });
                }
                None => push_unmatched(&mut pairs, key, record, config.unmatched),
            }
        }
    }

    if matched == 0 {
        return Err(NoMatchedRecords {
            gold: gold.len(),
            candidate: candidate.len(),
        });
    }

    tracing::info!(
        "matched {} of {} gold records against {}",
        matched,
        gold.len(),
        candidate.path
    );

    Ok(MatchOutcome {
        pairs,
        matched,
        gold_total: gold.len(),
        candidate_total: candidate.len(),
    })
}

fn push_unmatched(
    pairs: &mut Vec<MatchedPair>,
    key: RecordKey,
    record: &Record,
    policy: UnmatchedPolicy,
) {
    match policy {
        UnmatchedPolicy::Drop => {}
        UnmatchedPolicy::ScoreAsMiss => pairs.push(MatchedPair {
            key,
            gold: record.fields.clone(),
            candidate: None,
        }),
    }
}
