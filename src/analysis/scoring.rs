//! Field score accumulation over matched record pairs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::compare::{compare_values, Normalizer, Outcome};
use super::flatten::{child_path, count_path, index_path, is_indexed_sequence};
use crate::records::{MatchedPair, RecordKey};

/// Per-field accumulator: matches, total comparisons, and the gold record
/// keys where the field mismatched. `total == matches + mismatches.len()`
/// holds for every field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldScore {
    pub matches: usize,
    pub total: usize,
    pub mismatches: Vec<RecordKey>,
}

impl FieldScore {
    pub fn accuracy_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matches as f64 / self.total as f64 * 100.0
        }
    }
}

/// Mutable accumulator threaded through the scoring walk.
///
/// Fields appear in first-encountered order; a field registered but never
/// counted (skipped on every record) still shows up in the report.
#[derive(Debug, Default)]
pub struct Scoreboard {
    fields: IndexMap<String, FieldScore>,
}

impl Scoreboard {
    /// Register a field path without counting anything
    pub fn ensure(&mut self, path: &str) {
        if !self.fields.contains_key(path) {
            self.fields.insert(path.to_string(), FieldScore::default());
        }
    }

    /// Record one comparison outcome for a field
    pub fn record(&mut self, path: &str, outcome: Outcome, key: &RecordKey) {
        let score = self.fields.entry(path.to_string()).or_default();
        match outcome {
            Outcome::Match => {
                score.matches += 1;
                score.total += 1;
            }
            Outcome::Mismatch => {
                score.total += 1;
                score.mismatches.push(key.clone());
            }
            Outcome::Skipped => {}
        }
    }

    pub fn into_report(self, matched_records: usize) -> EvaluationReport {
        let total_fields = self.fields.values().map(|f| f.total).sum();
        let total_matches = self.fields.values().map(|f| f.matches).sum();
        EvaluationReport {
            matched_records,
            fields: self.fields,
            total_fields,
            total_matches,
        }
    }
}

/// Final aggregate for one gold/candidate pair of collections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Gold records that had a candidate counterpart
    pub matched_records: usize,
    /// Per-field scores in first-encountered order
    pub fields: IndexMap<String, FieldScore>,
    /// Sum of per-field totals
    pub total_fields: usize,
    /// Sum of per-field matches
    pub total_matches: usize,
}

impl EvaluationReport {
    /// Summed accuracy across all fields, never a mean of per-field
    /// percentages.
    pub fn overall_accuracy_pct(&self) -> f64 {
        if self.total_fields == 0 {
            0.0
        } else {
            self.total_matches as f64 / self.total_fields as f64 * 100.0
        }
    }
}

/// Score every matched pair into a report
pub fn score_pairs(
    pairs: &[MatchedPair],
    matched_records: usize,
    id_field: &str,
    norm: &Normalizer,
) -> EvaluationReport {
    let mut board = Scoreboard::default();
    for pair in pairs {
        score_record(
            &mut board,
            &pair.key,
            &pair.gold,
            pair.candidate.as_ref(),
            id_field,
            norm,
        );
    }
    board.into_report(matched_records)
}

/// Walk one gold record against its candidate, recording per-field outcomes.
///
/// The walk mirrors `flatten` on the gold side so reported paths equal the
/// flattened gold paths. `live` turns false for sequence indices the candidate
/// doesn't have: those paths are registered but not counted, leaving the
/// `.count` mismatch to carry the length penalty.
pub fn score_record(
    board: &mut Scoreboard,
    key: &RecordKey,
    gold: &Map<String, Value>,
    candidate: Option<&Map<String, Value>>,
    id_field: &str,
    norm: &Normalizer,
) {
    walk_object(board, key, "", gold, candidate, id_field, norm, true);
}

#[allow(clippy::too_many_arguments)]
fn walk_object(
    board: &mut Scoreboard,
    key: &RecordKey,
    prefix: &str,
    gold: &Map<String, Value>,
    candidate: Option<&Map<String, Value>>,
    id_field: &str,
    norm: &Normalizer,
    live: bool,
) {
    for (name, gold_value) in gold {
        let path = child_path(prefix, name);
        if path == id_field {
            continue;
        }
        let cand_value = candidate.and_then(|c| c.get(name));
        walk_value(board, key, &path, gold_value, cand_value, id_field, norm, live);
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_value(
    board: &mut Scoreboard,
    key: &RecordKey,
    path: &str,
    gold: &Value,
    candidate: Option<&Value>,
    id_field: &str,
    norm: &Normalizer,
    live: bool,
) {
    match gold {
        Value::Object(gold_obj) => {
            let cand_obj = candidate.and_then(Value::as_object);
            walk_object(board, key, path, gold_obj, cand_obj, id_field, norm, live);
        }
        Value::Array(items) if is_indexed_sequence(items) => {
            let cand_items = candidate.and_then(Value::as_array);
            let cand_len = cand_items.map_or(0, Vec::len);

            for (index, item) in items.iter().enumerate() {
                if let Value::Object(gold_elem) = item {
                    let elem_path = index_path(path, index);
                    let cand_elem = cand_items
                        .and_then(|c| c.get(index))
                        .and_then(Value::as_object);
                    let elem_live = live && index < cand_len;
                    walk_object(
                        board, key, &elem_path, gold_elem, cand_elem, id_field, norm, elem_live,
                    );
                }
            }

            let cpath = count_path(path);
            if live {
                let outcome = match candidate {
                    Some(Value::Array(cand)) if cand.len() == items.len() => Outcome::Match,
                    _ => Outcome::Mismatch,
                };
                board.record(&cpath, outcome, key);
            } else {
                board.ensure(&cpath);
            }
        }
        leaf => {
            if live {
                board.record(path, compare_values(leaf, candidate, norm), key);
            } else {
                board.ensure(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair(gold: Value, candidate: Value, key: i64) -> MatchedPair {
        MatchedPair {
            key: RecordKey::Num(key),
            gold: gold.as_object().unwrap().clone(),
            candidate: Some(candidate.as_object().unwrap().clone()),
        }
    }

    fn score(pairs: &[MatchedPair]) -> EvaluationReport {
        score_pairs(pairs, pairs.len(), "record_id", &Normalizer::exact())
    }

    #[test]
    fn test_identical_records_score_perfectly() {
        let record = json!({
            "patient": {"gender": "female", "name": {"family": "Doe"}},
            "visits": [{"date": "2024-01-01"}]
        });
        let report = score(&[pair(record.clone(), record, 0)]);

        assert_eq!(report.overall_accuracy_pct(), 100.0);
        for (_, field) in &report.fields {
            assert!(field.mismatches.is_empty());
            assert_eq!(field.matches, field.total);
        }
    }

    #[test]
    fn test_nested_sequence_scoring() {
        // gold = [{"a": {"b": 1, "c": [{"x":1},{"x":2}]}}]
        // cand = [{"a": {"b": 1, "c": [{"x":1},{"x":9}]}}]
        let report = score(&[pair(
            json!({"a": {"b": 1, "c": [{"x": 1}, {"x": 2}]}}),
            json!({"a": {"b": 1, "c": [{"x": 1}, {"x": 9}]}}),
            0,
        )]);

        let paths: Vec<&str> = report.fields.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["a.b", "a.c[0].x", "a.c[1].x", "a.c.count"]);

        assert_eq!(report.fields["a.b"].matches, 1);
        assert_eq!(report.fields["a.c[0].x"].matches, 1);
        assert_eq!(report.fields["a.c[1].x"].matches, 0);
        assert_eq!(report.fields["a.c[1].x"].mismatches, vec![RecordKey::Num(0)]);
        assert_eq!(report.fields["a.c.count"].matches, 1);

        assert_eq!(report.total_fields, 4);
        assert_eq!(report.total_matches, 3);
        assert_eq!(report.overall_accuracy_pct(), 75.0);
    }

    #[test]
    fn test_truncated_sequence_scores_overlap_only() {
        let report = score(&[pair(
            json!({"c": [{"x": 1}, {"x": 2}]}),
            json!({"c": [{"x": 1}]}),
            0,
        )]);

        // Overlapping index scores on its own merits.
        assert_eq!(report.fields["c[0].x"].matches, 1);
        assert_eq!(report.fields["c[0].x"].total, 1);
        // Missing index is registered but not counted.
        assert_eq!(report.fields["c[1].x"].total, 0);
        assert!(report.fields["c[1].x"].mismatches.is_empty());
        // The length penalty lands on the count field.
        assert_eq!(report.fields["c.count"].matches, 0);
        assert_eq!(report.fields["c.count"].mismatches, vec![RecordKey::Num(0)]);

        assert_eq!(report.total_fields, 2);
        assert_eq!(report.total_matches, 1);
    }

    #[test]
    fn test_overall_accuracy_is_summed_not_averaged() {
        // One field at 1/1 plus another at 1/100 must not average to ~50%.
        let mut pairs = vec![pair(json!({"a": 1, "b": 1}), json!({"a": 1, "b": 1}), 0)];
        for i in 1..100 {
            pairs.push(pair(json!({"b": 1}), json!({"b": 0}), i));
        }
        let report = score(&pairs);

        assert_eq!(report.fields["a"].total, 1);
        assert_eq!(report.fields["b"].total, 100);
        assert_eq!(report.total_fields, 101);
        assert_eq!(report.total_matches, 2);
        let pct = report.overall_accuracy_pct();
        assert!(pct < 2.0, "expected summed accuracy, got {:.1}%", pct);
    }

    #[test]
    fn test_missing_section_marks_children_mismatched() {
        let report = score(&[pair(
            json!({"header": {"claim_id": "C1", "channel": "phone"}}),
            json!({}),
            0,
        )]);

        assert_eq!(report.fields["header.claim_id"].mismatches.len(), 1);
        assert_eq!(report.fields["header.channel"].mismatches.len(), 1);
        assert_eq!(report.total_matches, 0);
    }

    #[test]
    fn test_null_in_both_is_skipped_but_registered() {
        let report = score(&[pair(
            json!({"email": null, "phone": "555"}),
            json!({"email": null, "phone": "555"}),
            0,
        )]);

        // Registered with zero counts, so the path still appears.
        assert_eq!(report.fields["email"].total, 0);
        assert_eq!(report.fields["phone"].total, 1);
        assert_eq!(report.total_fields, 1);
    }

    #[test]
    fn test_candidate_extras_are_ignored() {
        let report = score(&[pair(
            json!({"a": 1}),
            json!({"a": 1, "invented": "extra"}),
            0,
        )]);

        assert!(!report.fields.contains_key("invented"));
        assert_eq!(report.total_fields, 1);
        assert_eq!(report.total_matches, 1);
    }

    #[test]
    fn test_id_field_excluded_from_scoring() {
        let report = score(&[pair(
            json!({"record_id": 1, "a": 1}),
            json!({"record_id": 1, "a": 1}),
            1,
        )]);

        assert!(!report.fields.contains_key("record_id"));
        assert_eq!(report.total_fields, 1);
    }

    #[test]
    fn test_score_as_miss_pair_counts_gold_values() {
        let pairs = vec![MatchedPair {
            key: RecordKey::Num(2),
            gold: json!({"a": 1, "b": null}).as_object().unwrap().clone(),
            candidate: None,
        }];
        let report = score_pairs(&pairs, 0, "record_id", &Normalizer::exact());

        assert_eq!(report.fields["a"].mismatches, vec![RecordKey::Num(2)]);
        // Gold null with no candidate stays skipped.
        assert_eq!(report.fields["b"].total, 0);
    }

    #[test]
    fn test_field_invariant_holds() {
        let report = score(&[
            pair(json!({"a": 1, "b": "x"}), json!({"a": 1, "b": "y"}), 0),
            pair(json!({"a": 2, "b": "x"}), json!({"a": 0, "b": "x"}), 1),
        ]);

        for (path, field) in &report.fields {
            assert_eq!(
                field.total,
                field.matches + field.mismatches.len(),
                "invariant broken for {}",
                path
            );
        }
        // Mismatch keys are in gold order.
        assert_eq!(report.fields["b"].mismatches, vec![RecordKey::Num(0)]);
        assert_eq!(report.fields["a"].mismatches, vec![RecordKey::Num(1)]);
    }
}
