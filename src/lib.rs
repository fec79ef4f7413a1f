//! Structured-Output Extraction Benchmark
//!
//! This crate scores candidate structured-output collections (extracted JSON
//! produced by competing LLM-structuring methods) against a gold collection,
//! field by field, and aggregates per-field and overall accuracy with the
//! record ids of every mismatch.
//!
//! # Features
//!
//! - Gold/candidate record alignment by explicit id or position
//! - Recursive field comparison over arbitrarily nested records, including
//!   repeated sub-entities with independent length (`.count`) scoring
//! - Configurable matching policy and text normalization (TOML)
//! - Text reports and machine-readable JSON summaries
//!
//! # Example
//!
//! ```no_run
//! use extraction_benchmark::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default();
//!
//!     let gold = load_collection("gold.json", &config.matching.id_field)?;
//!     let candidate = load_collection("extracted.ndjson", &config.matching.id_field)?;
//!
//!     let report = evaluate(&gold, &candidate, &config)?;
//!     print!("{}", render_report(&report, config.report.display_limit()));
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod records;
pub mod reporting;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analysis::{
        compare_values, evaluate, flatten, EvaluationReport, FieldScore, Normalizer, Outcome,
        Scoreboard,
    };
    pub use crate::config::{Config, UnmatchedPolicy};
    pub use crate::records::{
        load_collection, match_records, Collection, InputError, MatchedPair, NoMatchedRecords,
        Record, RecordKey,
    };
    pub use crate::reporting::{render_report, FieldSummary, JsonSummary};
}
