//! Field-level comparison and scoring

pub mod compare;
pub mod flatten;
pub mod scoring;

pub use compare::{compare_values, Normalizer, Outcome};
pub use flatten::{flatten, root_group};
pub use scoring::{score_pairs, score_record, EvaluationReport, FieldScore, Scoreboard};

use crate::config::Config;
use crate::records::{match_records, Collection, NoMatchedRecords};

/// Evaluate a candidate collection against gold.
///
/// Pure function of its inputs: aligns records, walks every matched pair, and
/// aggregates per-field scores. Fails only when zero records match.
pub fn evaluate(
    gold: &Collection,
    candidate: &Collection,
    config: &Config,
) -> Result<EvaluationReport, NoMatchedRecords> {
    let outcome = match_records(gold, candidate, &config.matching)?;
    let norm = Normalizer::new(&config.normalize);
    Ok(score_pairs(
        &outcome.pairs,
        outcome.matched,
        &config.matching.id_field,
        &norm,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Record;
    use serde_json::{json, Value};

    fn collection(values: Vec<Value>) -> Collection {
        Collection {
            path: "<test>".to_string(),
            records: values
                .into_iter()
                .map(|v| match v {
                    Value::Object(fields) => {
                        let id = fields.get("record_id").and_then(Value::as_i64);
                        Record {
                            id: id.map(crate::records::RecordKey::Num),
                            fields,
                        }
                    }
                    _ => panic!("test records must be objects"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_evaluate_end_to_end() {
        let gold = collection(vec![
            json!({"record_id": 1, "a": {"b": 1}}),
            json!({"record_id": 2, "a": {"b": 2}}),
        ]);
        let candidate = collection(vec![
            json!({"record_id": 1, "a": {"b": 1}}),
            json!({"record_id": 2, "a": {"b": 9}}),
        ]);

        let report = evaluate(&gold, &candidate, &Config::default()).unwrap();
        assert_eq!(report.matched_records, 2);
        assert_eq!(report.total_fields, 2);
        assert_eq!(report.total_matches, 1);
        assert_eq!(report.overall_accuracy_pct(), 50.0);
    }

    #[test]
    fn test_evaluate_zero_overlap_fails() {
        let gold = collection(vec![json!({"record_id": 1, "a": 1})]);
        let candidate = collection(vec![json!({"record_id": 5, "a": 1})]);

        assert!(evaluate(&gold, &candidate, &Config::default()).is_err());
    }
}
