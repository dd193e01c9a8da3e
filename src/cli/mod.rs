//! Offense predictor CLI module
//!
//! Command-line interface for training, encoding and inspecting the sources.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use crate::pipeline::{OffensePipeline, PipelineConfig};
use crate::preprocessing::ScalerFit;
use crate::reporting::{file_reporter, HistoryReporter, LogReporter};
use crate::sources::{CategoryTotal, ColumnSummary, SchemaMode, SourceKind};
use crate::utils::{DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "offense")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Merge crime-record tables and train an offense-type classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge, encode and train; prints the held-out accuracy
    Train(TrainArgs),

    /// Merge and encode the sources, then write the encoded table
    Encode(EncodeArgs),

    /// Summary statistics of a numeric column in every source
    Describe(DescribeArgs),

    /// Rows, columns and dtypes of every source
    Info(SourceArgs),
}

/// Where the six sources live and how they are read
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory holding Offender.csv, Victim.csv, Location.csv, ...
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// JSON pipeline configuration; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Join-key column
    #[arg(short, long)]
    pub key: Option<String>,

    /// Warn about sources without the key instead of failing at load time
    #[arg(long)]
    pub lenient: bool,

    /// Field delimiter of the source files
    #[arg(long)]
    pub delimiter: Option<char>,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Number of epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Mini-batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Random seed for the split, initialization and shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Held-out fraction for the final accuracy
    #[arg(long)]
    pub test_fraction: Option<f64>,

    /// Fraction of the training partition used for validation
    #[arg(long)]
    pub validation_split: Option<f64>,

    /// Hidden layer widths, comma separated (e.g. 64,32)
    #[arg(long, value_delimiter = ',')]
    pub hidden_layers: Option<Vec<usize>>,

    /// Adam learning rate
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Fit the scaler on the whole table before splitting
    #[arg(long)]
    pub scale_full_table: bool,

    /// Write the fit history (.json or .csv)
    #[arg(long)]
    pub history_out: Option<PathBuf>,

    /// Write the fitted label encoders as JSON
    #[arg(long)]
    pub encoders_out: Option<PathBuf>,

    /// Write the trained scaler and network as JSON
    #[arg(long)]
    pub model_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Output CSV for the encoded table
    #[arg(short, long)]
    pub output: PathBuf,

    /// Write the fitted label encoders as JSON
    #[arg(long)]
    pub encoders_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Numeric column to summarize
    #[arg(long, default_value = "value")]
    pub column: String,

    /// Column to group totals by (defaults to the key column)
    #[arg(long)]
    pub by: Option<String>,
}

// ─── Configuration ─────────────────────────────────────────────────────────────

/// Build the pipeline configuration from an optional file plus flags
pub fn pipeline_config(args: &SourceArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(key) = &args.key {
        config = config.with_key_column(key.as_str());
    }
    if args.lenient {
        config = config.with_schema_mode(SchemaMode::Lenient);
    }
    if let Some(delimiter) = args.delimiter {
        config = config.with_delimiter(delimiter);
    }
    Ok(config)
}

fn apply_training_overrides(mut config: PipelineConfig, args: &TrainArgs) -> PipelineConfig {
    let mut training = config.training.clone();
    if let Some(epochs) = args.epochs {
        training = training.with_epochs(epochs);
    }
    if let Some(batch_size) = args.batch_size {
        training = training.with_batch_size(batch_size);
    }
    if let Some(seed) = args.seed {
        training = training.with_seed(seed);
    }
    if let Some(fraction) = args.test_fraction {
        training = training.with_test_fraction(fraction);
    }
    if let Some(split) = args.validation_split {
        training = training.with_validation_split(split);
    }
    if let Some(layers) = &args.hidden_layers {
        training = training.with_hidden_layers(layers.clone());
    }
    if let Some(lr) = args.learning_rate {
        training = training.with_learning_rate(lr);
    }
    if args.scale_full_table {
        training = training.with_scaler_fit(ScalerFit::FullTable);
    }
    config.training = training;
    config
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(args: &TrainArgs) -> anyhow::Result<()> {
    section("Train");

    let config = apply_training_overrides(pipeline_config(&args.sources)?, args);
    let epochs = config.training.epochs;
    let pipeline = OffensePipeline::new(config);

    step_run("Loading sources");
    let start = Instant::now();
    let tables = pipeline.load()?;
    step_done(&format!("{} sources in {:?}", SourceKind::ALL.len(), start.elapsed()));

    println!("  {} Training {}", accent("›"), format!("{} epochs", epochs).cyan());
    let report = pipeline.run_with_callback(tables, |m| {
        if m.epoch == 1 || m.epoch % 10 == 0 || m.epoch == epochs {
            let val = match (m.val_accuracy, m.val_loss) {
                (Some(acc), Some(loss)) => format!("val_acc {:.4}  val_loss {:.4}", acc, loss),
                _ => "no validation rows".to_string(),
            };
            println!(
                "    {} acc {:.4}  loss {:.4}  {}",
                dim(&format!("epoch {:>3}", m.epoch)),
                m.train_accuracy,
                m.train_loss,
                dim(&val)
            );
        }
    })?;
    step_ok("Training finished");

    if let Some(path) = &args.history_out {
        file_reporter(path)?.report(report.history(), report.accuracy())?;
        step_ok(&format!("History → {}", path.display()));
    } else {
        LogReporter.report(report.history(), report.accuracy())?;
    }
    if let Some(path) = &args.encoders_out {
        report.encoded.encoders().save(path)?;
        step_ok(&format!("Encoders → {}", path.display()));
    }
    if let Some(path) = &args.model_out {
        report.outcome.model.save(path)?;
        step_ok(&format!("Model → {}", path.display()));
    }

    let sizes = report.outcome.sizes;
    println!();
    line_box_top();
    line_box_center(&format!("{}", "Offense classifier".white().bold()));
    line_box_sep();
    line_box(&kv("Merged rows ", &report.merged_rows.to_string()));
    line_box(&kv("Train rows  ", &sizes.n_train.to_string()));
    line_box(&kv("Validation  ", &sizes.n_validation.to_string()));
    line_box(&kv("Test rows   ", &sizes.n_test.to_string()));
    line_box(&kv("Features    ", &sizes.n_features.to_string()));
    line_box_sep();
    line_box(&format!("{} {}", muted("Accuracy    "), format!("{:.4}", report.accuracy()).white().bold()));
    line_box(&kv("Time        ", &format!("{:.3}s", report.outcome.training_time_secs)));
    line_box_bottom();
    println!();

    Ok(())
}

pub fn cmd_encode(args: &EncodeArgs) -> anyhow::Result<()> {
    section("Encode");

    let pipeline = OffensePipeline::new(pipeline_config(&args.sources)?);

    step_run("Merging and encoding");
    let start = Instant::now();
    let encoded = pipeline.encode()?;
    step_done(&format!("{} rows in {:?}", encoded.height(), start.elapsed()));

    let (mut frame, encoders) = encoded.into_parts();

    step_run(&format!("Saving → {}", args.output.display()));
    DataSaver::save_csv(&mut frame, &args.output)?;
    step_done(&format!("{} rows × {} cols", frame.height(), frame.width()));

    if let Some(path) = &args.encoders_out {
        encoders.save(path)?;
        step_ok(&format!("Encoders → {}", path.display()));
    }

    println!();
    for column in encoders.columns() {
        let n = encoders.codec(column).map(|c| c.len()).unwrap_or(0);
        println!("  {:<20} {:>6} {}", column, n, muted("categories"));
    }
    println!();
    Ok(())
}

fn load_source(config: &PipelineConfig, kind: SourceKind) -> anyhow::Result<(PathBuf, polars::prelude::DataFrame)> {
    let path = config.sources.get(kind).to_path_buf();
    let frame = DataLoader::new()
        .with_delimiter(config.delimiter_byte()?)
        .load_auto(&path)?;
    Ok((path, frame))
}

pub fn cmd_describe(args: &DescribeArgs) -> anyhow::Result<()> {
    let config = pipeline_config(&args.sources)?;
    let by = args.by.clone().unwrap_or_else(|| config.key_column.clone());

    for kind in SourceKind::ALL {
        section(&format!("{} · {}", kind, args.column));
        let (path, frame) = load_source(&config, kind)?;
        println!("  {:<12} {}", muted("File"), path.display());

        let summary = match ColumnSummary::from_frame(&frame, &args.column) {
            Ok(summary) => summary,
            Err(e) => {
                println!("  {}", format!("skipped: {}", e).yellow());
                continue;
            }
        };
        print_summary(&summary);

        if let Ok(totals) = CategoryTotal::collect(&frame, &by, &args.column) {
            println!();
            println!("  {:<20} {:>12} {:>6}", muted(&by), muted("total"), muted("rows"));
            for total in totals {
                println!("  {:<20} {:>12.2} {:>6}", total.category, total.total, total.rows);
            }
        }
    }

    println!();
    Ok(())
}

fn print_summary(summary: &ColumnSummary) {
    let std = summary
        .std
        .map(|s| format!("{:.4}", s))
        .unwrap_or_else(|| "NaN".to_string());

    let rows: [(&str, String); 8] = [
        ("count", summary.count.to_string()),
        ("mean", format!("{:.4}", summary.mean)),
        ("std", std),
        ("min", format!("{:.4}", summary.min)),
        ("25%", format!("{:.4}", summary.q25)),
        ("50%", format!("{:.4}", summary.median)),
        ("75%", format!("{:.4}", summary.q75)),
        ("max", format!("{:.4}", summary.max)),
    ];
    for (name, value) in rows {
        println!("  {:<12} {}", muted(name), value.white());
    }
    if summary.null_count > 0 {
        println!("  {:<12} {}", muted("nulls"), summary.null_count);
    }
}

pub fn cmd_info(args: &SourceArgs) -> anyhow::Result<()> {
    let config = pipeline_config(args)?;

    for kind in SourceKind::ALL {
        section(&format!("{}", kind));
        let (path, df) = load_source(&config, kind)?;

        println!("  {:<12} {}", muted("File"), path.display());
        println!("  {:<12} {}", muted("Rows"), df.height());
        println!("  {:<12} {}", muted("Columns"), df.width());
        if df.column(&config.key_column).is_err() {
            println!("  {:<12} {}", muted("Key"), format!("missing '{}'", config.key_column).red());
        }
        println!();

        println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
        println!("  {}", dim(&"─".repeat(50)));

        for col in df.get_columns() {
            println!(
                "  {:<20} {:<12} {:>6} {:>8}",
                col.name(),
                format!("{:?}", col.dtype()).truecolor(140, 140, 140),
                col.null_count(),
                col.n_unique().unwrap_or(0)
            );
        }
    }

    println!();
    Ok(())
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Train(args) => cmd_train(&args),
        Commands::Encode(args) => cmd_encode(&args),
        Commands::Describe(args) => cmd_describe(&args),
        Commands::Info(args) => cmd_info(&args),
    }
}
