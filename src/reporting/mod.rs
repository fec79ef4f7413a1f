//! Report rendering and JSON summary export

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::{root_group, EvaluationReport, FieldScore};
use crate::records::RecordKey;

/// Render the evaluation report as text.
///
/// Fields are grouped by top-level entity in first-encountered order. Groups
/// with nested fields get a heading; flat top-level fields render on their
/// own. `mismatch_limit` caps the displayed mismatch ids per field; the
/// report data itself is never truncated.
pub fn render_report(report: &EvaluationReport, mismatch_limit: Option<usize>) -> String {
    let mut out = String::new();
    out.push_str("=== Field-Level Evaluation Results ===\n\n");

    let mut groups: indexmap::IndexMap<&str, Vec<(&String, &FieldScore)>> =
        indexmap::IndexMap::new();
    for (path, score) in &report.fields {
        groups
            .entry(root_group(path))
            .or_default()
            .push((path, score));
    }

    for (group, fields) in &groups {
        let flat = fields.len() == 1 && fields[0].0.as_str() == *group;
        if !flat {
            let _ = writeln!(out, "{}:", group);
        }
        for (path, score) in fields {
            let _ = write!(
                out,
                "  {} -> {}/{} ({:.1}%)",
                path,
                score.matches,
                score.total,
                score.accuracy_pct()
            );
            if !score.mismatches.is_empty() {
                let _ = write!(out, " [mismatches: {}]", format_keys(&score.mismatches, mismatch_limit));
            }
            out.push('\n');
        }
        if !flat {
            out.push('\n');
        }
    }

    if groups
        .last()
        .is_some_and(|(g, f)| f.len() == 1 && f[0].0.as_str() == *g)
    {
        out.push('\n');
    }

    out.push_str("=== Overall Statistics ===\n");
    let _ = writeln!(out, "Total Fields Evaluated: {}", report.total_fields);
    let _ = writeln!(out, "Total Matches: {}", report.total_matches);
    let _ = writeln!(out, "Overall Accuracy: {:.1}%", report.overall_accuracy_pct());

    out
}

fn format_keys(keys: &[RecordKey], limit: Option<usize>) -> String {
    let shown = match limit {
        Some(n) => &keys[..keys.len().min(n)],
        None => keys,
    };
    let mut parts: Vec<String> = shown.iter().map(|k| k.to_string()).collect();
    if shown.len() < keys.len() {
        parts.push("...".to_string());
    }
    format!("[{}]", parts.join(", "))
}

/// Machine-readable summary of one evaluation run, for downstream aggregation
/// across methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummary {
    pub run_id: String,
    pub timestamp: String,
    pub gold_file: String,
    pub candidate_file: String,
    pub matched_records: usize,
    pub total_fields: usize,
    pub total_matches: usize,
    pub overall_accuracy: f64,
    pub fields: Vec<FieldSummary>,
}

/// One field's scores in the JSON summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSummary {
    pub field: String,
    pub matches: usize,
    pub total: usize,
    pub accuracy: f64,
    pub mismatches: Vec<RecordKey>,
}

impl JsonSummary {
    pub fn from_report(
        run_id: impl Into<String>,
        gold_file: impl Into<String>,
        candidate_file: impl Into<String>,
        report: &EvaluationReport,
    ) -> Self {
        let fields = report
            .fields
            .iter()
            .map(|(path, score)| FieldSummary {
                field: path.clone(),
                matches: score.matches,
                total: score.total,
                accuracy: score.accuracy_pct(),
                mismatches: score.mismatches.clone(),
            })
            .collect();

        Self {
            run_id: run_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            gold_file: gold_file.into(),
            candidate_file: candidate_file.into(),
            matched_records: report.matched_records,
            total_fields: report.total_fields,
            total_matches: report.total_matches,
            overall_accuracy: report.overall_accuracy_pct(),
            fields,
        }
    }

    /// Write to a JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}
