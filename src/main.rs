//! BMS Point-Name Benchmark CLI
//!
//! Benchmarks NLP models on interpreting building management system point
//! names (`AHU-03.SAT_AI`) into structured fields (equipment, subcomponent,
//! IO type, location).
//!
//! ## Quick Start
//!
//! ```bash
//! # Evaluate the rule-based baseline
//! ./bms-point-bench run --dataset ./points.jsonl --adapter rule
//!
//! # Evaluate a remote model behind an HTTP endpoint
//! ./bms-point-bench run \
//!     --dataset ./points.jsonl \
//!     --adapter http \
//!     --endpoint http://localhost:9000/predict
//!
//! # Inspect how one point name is tokenized and labelled
//! ./bms-point-bench label "AHU-03.SAT_AI"
//!
//! # Mine vocabularies from a dataset
//! ./bms-point-bench extract-vocab --dataset ./points.jsonl --output vocab.json
//! ```
//!
//! ## Configuration
//!
//! Defaults live in `bench.toml` (`[adapter]` and `[run]` sections); every
//! value can be overridden on the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use bms_point_bench::adapters::{build_adapter, AdapterKind};
use bms_point_bench::config::BenchConfig;
use bms_point_bench::dataset::{Dataset, LabelField};
use bms_point_bench::eval::{self, MetricsSet, RunOptions};
use bms_point_bench::report::Report;
use bms_point_bench::run_stats::RunMonitor;
use bms_point_bench::tokenize::normalize;
use bms_point_bench::vocab::{extract::extract_vocab, Vocab};

#[derive(Parser)]
#[command(name = "bms-point-bench")]
#[command(about = "Benchmark NLP models on BMS point-name interpretation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an adapter over a dataset and write a JSON report
    ///
    /// Per-record failures are marked FAILED and reported; they never abort
    /// the run.
    Run {
        /// Path to the dataset (JSONL)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Adapter to evaluate: rule, ngram or http
        #[arg(short, long, value_enum)]
        adapter: Option<AdapterKind>,

        /// Path to a vocabulary JSON file (defaults to the built-in seeds)
        #[arg(long)]
        vocab: Option<PathBuf>,

        /// Output file for the report (JSON)
        #[arg(short, long, default_value = "results/report.json")]
        output: PathBuf,

        /// Path to the config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum adapter calls in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-call deadline in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Endpoint URL for the http adapter
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Validate a dataset file without running anything
    Validate {
        /// Path to the dataset (JSONL)
        #[arg(short, long)]
        dataset: PathBuf,
    },

    /// Show how one point name is tokenized and labelled
    Label {
        /// The raw point name
        point_label: String,

        /// Path to a vocabulary JSON file (defaults to the built-in seeds)
        #[arg(long)]
        vocab: Option<PathBuf>,
    },

    /// Mine vocabularies from a dataset's point names
    ExtractVocab {
        /// Path to the dataset (JSONL)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Output file for the vocabulary (JSON)
        #[arg(short, long, default_value = "vocab.json")]
        output: PathBuf,
    },

    /// List available adapters
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            dataset,
            adapter,
            vocab,
            output,
            config,
            concurrency,
            timeout_secs,
            endpoint,
        } => {
            run_benchmark(
                &dataset,
                adapter,
                vocab.as_deref(),
                &output,
                config.as_deref(),
                concurrency,
                timeout_secs,
                endpoint,
            )
            .await?;
        }

        Commands::Validate { dataset } => {
            validate_dataset(&dataset)?;
        }

        Commands::Label { point_label, vocab } => {
            label_point(&point_label, vocab.as_deref())?;
        }

        Commands::ExtractVocab { dataset, output } => {
            extract_vocabularies(&dataset, &output)?;
        }

        Commands::List => {
            list_adapters();
        }
    }

    Ok(())
}

/// Run one adapter over the full dataset and persist the report.
#[allow(clippy::too_many_arguments)]
async fn run_benchmark(
    dataset_path: &Path,
    adapter_kind: Option<AdapterKind>,
    vocab_path: Option<&Path>,
    output: &Path,
    config_path: Option<&Path>,
    concurrency: Option<usize>,
    timeout_secs: Option<u64>,
    endpoint: Option<String>,
) -> Result<()> {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              BMS POINT-NAME BENCHMARK                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Config file first, CLI flags on top
    let config = match config_path {
        Some(path) => BenchConfig::load(path)?,
        None => BenchConfig::load_default()?,
    };
    let adapter_kind = adapter_kind.unwrap_or(config.adapter.kind);
    let endpoint = endpoint.or_else(|| config.adapter.endpoint.clone());
    let timeout = timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.call_timeout());
    let concurrency = concurrency.unwrap_or(config.run.concurrency);

    println!("Loading dataset from {:?}...", dataset_path);
    let dataset = Dataset::load(dataset_path)?;
    println!(
        "  Loaded {} records across {} buildings (fingerprint {})",
        dataset.len(),
        dataset.building_count(),
        &dataset.fingerprint()[..12]
    );

    let vocab = Vocab::load_or_seeds(vocab_path)?;
    println!("  Vocabulary: {} terms", vocab.term_count());

    let adapter = build_adapter(adapter_kind, &vocab, endpoint.as_deref(), timeout)?;
    println!(
        "  Adapter: {} (concurrency {}, timeout {:?})\n",
        adapter.name(),
        concurrency,
        timeout
    );

    let mut monitor = RunMonitor::new();
    monitor.snapshot_baseline();
    let sampling_handle = monitor.start_sampling();

    // Ctrl-C cancels the run; drained records are marked FAILED and the
    // partial report is still written.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupt received, cancelling run...");
            signal_cancel.cancel();
        }
    });

    let options = RunOptions {
        concurrency,
        timeout,
    };
    let run = eval::run(adapter.as_ref(), &dataset, options, cancel).await;

    drop(sampling_handle);
    let stats = monitor.finalize(run.duration, dataset.len());

    print_summary(&run.metrics.global, &run.metrics.by_building);

    println!("\n┌─ RESOURCE USAGE ─────────────────────────────────────────────┐");
    println!(
        "  {:.1}s elapsed, {:.1} records/s, peak RAM {:.0} MB",
        stats.elapsed_secs, stats.throughput_per_sec, stats.peak_memory_mb
    );

    let report = Report::build(&run, &dataset, dataset_path, stats);
    report.save(output)?;
    println!("\nReport saved to {:?}", output);

    // FAILED records are part of a completed run, not a process failure.
    if report.failures.is_empty() {
        Ok(())
    } else {
        println!(
            "  ⚠ {} of {} records FAILED (see report for details)",
            report.failures.len(),
            dataset.len()
        );
        Ok(())
    }
}

/// Print the per-field and per-building score tables.
fn print_summary(global: &MetricsSet, by_building: &std::collections::BTreeMap<String, MetricsSet>) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      RUN SUMMARY                             ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("┌─ PER FIELD (global) ─────────────────────────────────────────┐");
    println!(
        "{:12} {:>8} {:>10} {:>10} {:>10} {:>10}",
        "Field", "Scored", "Accuracy", "Macro-P", "Macro-R", "Macro-F1"
    );
    println!("{}", "─".repeat(64));
    for (field, metrics) in &global.fields {
        println!(
            "{:12} {:>8} {:>9.1}% {:>10.3} {:>10.3} {:>10.3}",
            field.name(),
            metrics.scored,
            metrics.accuracy * 100.0,
            metrics.macro_precision,
            metrics.macro_recall,
            metrics.macro_f1,
        );
    }

    println!("\n┌─ PER BUILDING ───────────────────────────────────────────────┐");
    println!(
        "{:20} {:>8} {:>8} {:>12}",
        "Building", "Records", "Failed", "Mean Acc"
    );
    println!("{}", "─".repeat(52));
    for (building, metrics) in by_building {
        let field_count = metrics.fields.len();
        let mean_accuracy = if field_count == 0 {
            0.0
        } else {
            metrics.fields.values().map(|f| f.accuracy).sum::<f64>() / field_count as f64
        };
        // Truncate on char boundaries; building ids are not always ASCII.
        let name: String = building.chars().take(20).collect();
        println!(
            "{:20} {:>8} {:>8} {:>11.1}%",
            name,
            metrics.record_count,
            metrics.failed_count,
            mean_accuracy * 100.0,
        );
    }

    if global.failed_count > 0 {
        println!(
            "\n  ⚠ {} records FAILED ({:.1}% of the run)",
            global.failed_count,
            global.failed_rate * 100.0
        );
    }
}

/// Validate a dataset file
fn validate_dataset(path: &Path) -> Result<()> {
    println!("Validating {:?}...", path);

    let dataset = Dataset::load(path)?;

    println!("✓ Valid dataset");
    println!("  Records: {}", dataset.len());
    println!("  Buildings: {}", dataset.building_count());
    println!("  Fingerprint: {}", dataset.fingerprint());

    println!("  Records per building:");
    for building in dataset.buildings() {
        println!(
            "    {:20} {}",
            building,
            dataset.by_building(building).count()
        );
    }

    // Label coverage per field
    println!("  Label coverage:");
    for field in LabelField::ALL {
        let labelled = dataset
            .records()
            .iter()
            .filter(|r| r.labels.contains_key(&field))
            .count();
        if labelled > 0 {
            println!("    {:12} {}", field.name(), labelled);
        }
    }

    Ok(())
}

/// Annotate one point name and print the result
fn label_point(point_label: &str, vocab_path: Option<&Path>) -> Result<()> {
    use bms_point_bench::adapters::RuleAdapter;

    let vocab = Vocab::load_or_seeds(vocab_path)?;
    let adapter = RuleAdapter::new(vocab);
    let annotation = adapter.annotate(&normalize(point_label));

    println!("Point label: {}", annotation.point_label);
    println!("\n{:12} {:12} {}", "Token", "Category", "BIO");
    println!("{}", "─".repeat(36));
    for ((token, category), bio) in annotation
        .tokens
        .iter()
        .zip(&annotation.token_labels)
        .zip(&annotation.bio_tags)
    {
        println!("{:12} {:12} {}", token, category.name(), bio);
    }

    println!("\nStructured interpretation:");
    for (field, value) in &annotation.structured.labels {
        println!("  {:12} {}", field.name(), value);
    }
    if annotation.structured.labels.is_empty() {
        println!("  (no fields recognized)");
    }

    Ok(())
}

/// Mine vocabularies from a dataset and write them to JSON
fn extract_vocabularies(dataset_path: &Path, output: &Path) -> Result<()> {
    println!("Loading dataset from {:?}...", dataset_path);
    let dataset = Dataset::load(dataset_path)?;
    println!(
        "  {} records across {} buildings",
        dataset.len(),
        dataset.building_count()
    );

    let extracted = extract_vocab(
        dataset
            .records()
            .iter()
            .map(|r| (r.building.as_str(), r.point_name.as_str())),
    );

    println!("\nExtracted vocabulary:");
    println!("  equip:      {}", extracted.equip_vocab.len());
    println!("  subcomp:    {}", extracted.subcomp_vocab.len());
    println!("  point_func: {}", extracted.point_func_vocab.len());
    println!("  io_type:    {}", extracted.io_type_vocab.len());
    println!("  vendor:     {}", extracted.vendor_vocab.len());

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, serde_json::to_string_pretty(&extracted)?)?;
    println!("\nVocabulary saved to {:?}", output);

    Ok(())
}

fn list_adapters() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   AVAILABLE ADAPTERS                         ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("  rule    Vocabulary and regex rules, deterministic baseline");
    println!("  ngram   Character-trigram similarity against the vocabulary");
    println!("  http    External model behind a JSON endpoint");

    println!("\nCONFIGURATION:");
    println!("─────────────────────────────────────────────────────────────────");
    println!("  Defaults are read from bench.toml. Example:");
    println!();
    println!("  [adapter]");
    println!("  kind = \"http\"");
    println!("  endpoint = \"http://localhost:9000/predict\"");
    println!("  timeout_secs = 10");
    println!();
    println!("  [run]");
    println!("  concurrency = 16");
}
