//! Extraction Benchmark CLI

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use extraction_benchmark::{
    analysis::{evaluate, flatten, root_group, EvaluationReport},
    config::{Config, UnmatchedPolicy},
    records::load_collection,
    reporting::{render_report, JsonSummary},
};

/// Policy override for gold records without a candidate counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum UnmatchedArg {
    /// Score only the matched intersection (default)
    Drop,
    /// Count every field of an unmatched gold record as a mismatch
    ScoreAsMiss,
}

impl From<UnmatchedArg> for UnmatchedPolicy {
    fn from(arg: UnmatchedArg) -> Self {
        match arg {
            UnmatchedArg::Drop => UnmatchedPolicy::Drop,
            UnmatchedArg::ScoreAsMiss => UnmatchedPolicy::ScoreAsMiss,
        }
    }
}

#[derive(Parser)]
#[command(name = "extraction-benchmark")]
#[command(about = "Field-level accuracy benchmark for structured-output extraction methods")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one candidate collection against gold
    Evaluate {
        /// Path to the gold standard JSON (array of records)
        gold: PathBuf,

        /// Path to the extraction results (JSON array or NDJSON)
        candidate: PathBuf,

        /// Write a machine-readable summary to this path
        #[arg(long)]
        json_summary: Option<PathBuf>,

        /// Override the unmatched-record policy from the config
        #[arg(long, value_enum)]
        unmatched: Option<UnmatchedArg>,
    },

    /// Score several extraction methods against one gold and compare them
    Compare {
        /// Path to the gold standard JSON
        gold: PathBuf,

        /// Extraction result files, one per method
        #[arg(required = true)]
        candidates: Vec<PathBuf>,

        /// Comma-separated method labels (default: file stems)
        #[arg(short, long)]
        labels: Option<String>,
    },

    /// List the flattened field paths of a gold collection
    Fields {
        /// Path to the gold standard JSON
        gold: PathBuf,
    },

    /// Generate a sample configuration file
    InitConfig {
        /// Output path for the configuration file
        #[arg(short, long, default_value = "eval.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("extraction_benchmark=debug,info")
    } else {
        EnvFilter::new("extraction_benchmark=info,warn")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default(),
    };

    match cli.command {
        Commands::Evaluate {
            gold,
            candidate,
            json_summary,
            unmatched,
        } => {
            run_evaluate(gold, candidate, json_summary, unmatched, config)?;
        }

        Commands::Compare {
            gold,
            candidates,
            labels,
        } => {
            run_compare(gold, candidates, labels, config)?;
        }

        Commands::Fields { gold } => {
            list_fields(gold, &config)?;
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

fn run_evaluate(
    gold_path: PathBuf,
    candidate_path: PathBuf,
    json_summary: Option<PathBuf>,
    unmatched: Option<UnmatchedArg>,
    mut config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(policy) = unmatched {
        config.matching.unmatched = policy.into();
    }

    let gold = load_collection(&gold_path, &config.matching.id_field)?;
    let candidate = load_collection(&candidate_path, &config.matching.id_field)?;

    let report = evaluate(&gold, &candidate, &config)?;

    println!("Matched {} records for evaluation", report.matched_records);
    println!();
    print!("{}", render_report(&report, config.report.display_limit()));

    if let Some(path) = json_summary {
        let run_id = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        let summary = JsonSummary::from_report(&run_id, &gold.path, &candidate.path, &report);
        summary.write_to_file(&path)?;
        println!();
        println!("JSON summary written to: {}", path.display());
    }

    Ok(())
}

fn run_compare(
    gold_path: PathBuf,
    candidate_paths: Vec<PathBuf>,
    labels: Option<String>,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let gold = load_collection(&gold_path, &config.matching.id_field)?;

    let labels: Vec<Option<String>> = match labels {
        Some(csv) => csv.split(',').map(|s| Some(s.trim().to_string())).collect(),
        None => vec![None; candidate_paths.len()],
    };

    let mut results: Vec<(String, EvaluationReport)> = Vec::new();
    for (index, path) in candidate_paths.iter().enumerate() {
        let label = labels
            .get(index)
            .cloned()
            .flatten()
            .unwrap_or_else(|| method_label(path));

        let report = load_collection(path, &config.matching.id_field)
            .map_err(|e| e.to_string())
            .and_then(|candidate| {
                evaluate(&gold, &candidate, &config).map_err(|e| e.to_string())
            });

        match report {
            Ok(report) => results.push((label, report)),
            Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
        }
    }

    if results.is_empty() {
        return Err("no candidate collections could be evaluated".into());
    }

    // Overall table
    println!("=== Method Comparison ===");
    println!("Gold: {} ({} records)", gold.path, gold.len());
    println!();
    println!("{:-<64}", "");
    println!(
        "{:<16} {:>9} {:>10} {:>10} {:>10}",
        "Method", "Matched", "Fields", "Matches", "Accuracy"
    );
    println!("{:-<64}", "");
    for (label, report) in &results {
        println!(
            "{:<16} {:>9} {:>10} {:>10} {:>9.1}%",
            label,
            format!("{}/{}", report.matched_records, gold.len()),
            report.total_fields,
            report.total_matches,
            report.overall_accuracy_pct()
        );
    }
    println!("{:-<64}", "");

    // Per-group breakdown, groups in first-encountered order across methods
    let mut groups: Vec<String> = Vec::new();
    for (_, report) in &results {
        for path in report.fields.keys() {
            let group = root_group(path);
            if !groups.iter().any(|g| g.as_str() == group) {
                groups.push(group.to_string());
            }
        }
    }

    println!();
    println!("Accuracy by Field Group:");
    let width = 24 + 11 * results.len();
    println!("{:-<width$}", "");
    print!("{:<24}", "Group");
    for (label, _) in &results {
        print!(" {:>10}", label);
    }
    println!();
    println!("{:-<width$}", "");

    for group in &groups {
        print!("{:<24}", group);
        for (_, report) in &results {
            let (matches, total) = report
                .fields
                .iter()
                .filter(|(path, _)| root_group(path) == group.as_str())
                .fold((0usize, 0usize), |(m, t), (_, score)| {
                    (m + score.matches, t + score.total)
                });
            if total == 0 {
                print!(" {:>10}", "-");
            } else {
                print!(" {:>9.1}%", matches as f64 / total as f64 * 100.0);
            }
        }
        println!();
    }
    println!("{:-<width$}", "");

    Ok(())
}

fn method_label(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn list_fields(gold_path: PathBuf, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let gold = load_collection(&gold_path, &config.matching.id_field)?;

    let mut paths: Vec<String> = Vec::new();
    for record in &gold.records {
        for path in flatten(&record.fields).keys() {
            if path == &config.matching.id_field {
                continue;
            }
            if !paths.iter().any(|p| p == path) {
                paths.push(path.clone());
            }
        }
    }

    println!("Gold field paths ({}):", paths.len());
    println!("{:-<60}", "");
    for path in &paths {
        println!("  {}", path);
    }

    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_label_from_stem() {
        assert_eq!(
            method_label(&PathBuf::from("results/structured_output_dspy.json")),
            "structured_output_dspy"
        );
    }
}
