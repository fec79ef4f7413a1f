//! Leaf value comparison and text normalization

use regex::Regex;
use serde_json::{Number, Value};

use crate::config::NormalizeConfig;

/// Result of comparing one gold leaf against its candidate counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Match,
    Mismatch,
    /// Field absent (or null) on both sides, not counted
    Skipped,
}

/// Text normalizer built from the configured comparison policy.
///
/// With everything off (the default) string comparison is exact.
#[derive(Debug, Clone)]
pub struct Normalizer {
    fold_case: bool,
    trim: bool,
    strip: Option<Regex>,
}

impl Normalizer {
    pub fn new(config: &NormalizeConfig) -> Self {
        let strip = if config.strip_punctuation {
            Some(Regex::new(r"[^\w\s]").unwrap())
        } else {
            None
        };
        Self {
            fold_case: config.fold_case,
            trim: config.trim,
            strip,
        }
    }

    /// Exact-comparison normalizer
    pub fn exact() -> Self {
        Self::new(&NormalizeConfig::default())
    }

    pub fn text(&self, s: &str) -> String {
        let mut out = if self.trim {
            s.trim().to_string()
        } else {
            s.to_string()
        };
        if let Some(re) = &self.strip {
            out = re.replace_all(&out, "").into_owned();
        }
        if self.fold_case {
            out = out.to_lowercase();
        }
        out
    }
}

/// Compare a gold leaf value against the candidate value at the same path.
///
/// A gold value with a null/absent candidate is always a mismatch; null on
/// both sides is skipped; a candidate value where gold is null is a mismatch
/// (hallucinated content). Differing value types count as mismatches, never
/// errors.
pub fn compare_values(gold: &Value, candidate: Option<&Value>, norm: &Normalizer) -> Outcome {
    let candidate = match candidate {
        None | Some(Value::Null) => {
            return if gold.is_null() {
                Outcome::Skipped
            } else {
                Outcome::Mismatch
            };
        }
        Some(value) => value,
    };

    if gold.is_null() {
        return Outcome::Mismatch;
    }

    if value_eq(gold, candidate, norm) {
        Outcome::Match
    } else {
        Outcome::Mismatch
    }
}

fn value_eq(gold: &Value, candidate: &Value, norm: &Normalizer) -> bool {
    match (gold, candidate) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_eq(a, b),
        (Value::String(a), Value::String(b)) => norm.text(a) == norm.text(b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| value_eq(x, y, norm))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, x)| b.get(k).is_some_and(|y| value_eq(x, y, norm)))
        }
        _ => false,
    }
}

fn numbers_eq(a: &Number, b: &Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_f64() == b.as_f64(),
    }
}
