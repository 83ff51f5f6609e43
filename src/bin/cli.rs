//! Binary entry point for the Penumbra plan-drift CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nu_ansi_term::Color;
use penumbra::drift::{DriftReport, DriftStore, PlanRecord};
use penumbra::query::digest;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "penumbra",
    version,
    about = "Plan-drift tooling for the Penumbra client library",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "PENUMBRA_DRIFT_STORE",
        default_value = "plan-drift.json",
        help = "Path to the JSON drift store"
    )]
    store: PathBuf,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an observed execution plan for one query under a version.
    Record(RecordCmd),
    /// Compare plan digests between two recorded versions.
    Compare(CompareCmd),
    /// List the records stored for a version.
    Show(ShowCmd),
}

#[derive(Args, Debug)]
struct RecordCmd {
    #[arg(long, help = "Software version label, e.g. 1.4.2")]
    version: String,

    #[arg(long, value_name = "HEX", help = "Canonical-AST fingerprint of the query")]
    query_hash: String,

    #[arg(long, help = "Compiled query text")]
    text: String,

    #[arg(
        long,
        value_name = "HEX",
        conflicts_with = "plan_file",
        help = "Digest of the server's execution plan"
    )]
    plan_digest: Option<String>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Plan dump to digest instead of passing --plan-digest"
    )]
    plan_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompareCmd {
    #[arg(long, help = "Version to treat as the baseline")]
    baseline: String,

    #[arg(long, help = "Version to check for drift")]
    candidate: String,

    #[arg(
        long,
        value_name = "PCT",
        default_value_t = 10.0,
        help = "Changed-plan percentage above which the comparison fails"
    )]
    threshold: f64,
}

#[derive(Args, Debug)]
struct ShowCmd {
    #[arg(long, help = "Version whose records to list")]
    version: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err}", Color::Red.paint("error:"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    match cli.command {
        Command::Record(cmd) => {
            let plan_digest = match (cmd.plan_digest, cmd.plan_file) {
                (Some(digest), _) => digest,
                (None, Some(path)) => digest(&std::fs::read_to_string(path)?),
                (None, None) => {
                    return Err("either --plan-digest or --plan-file is required".into())
                }
            };
            let mut store = DriftStore::open(&cli.store)?;
            store.record(PlanRecord {
                query_hash: cmd.query_hash,
                text: cmd.text,
                plan_digest,
                version: cmd.version,
                timestamp: OffsetDateTime::now_utc().unix_timestamp(),
            });
            store.save()?;
            println!("recorded ({} records total)", store.len());
            Ok(ExitCode::SUCCESS)
        }
        Command::Compare(cmd) => {
            let store = DriftStore::open(&cli.store)?;
            let report = store.compare(&cmd.baseline, &cmd.candidate, cmd.threshold)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print_report(&report),
            }
            if report.drifted() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Show(cmd) => {
            let store = DriftStore::open(&cli.store)?;
            let records: Vec<&PlanRecord> = store.records_for(&cmd.version).collect();
            if records.is_empty() {
                return Err(format!("no records for version '{}'", cmd.version).into());
            }
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                OutputFormat::Text => {
                    for record in records {
                        let when = OffsetDateTime::from_unix_timestamp(record.timestamp)
                            .ok()
                            .and_then(|ts| ts.format(&Rfc3339).ok())
                            .unwrap_or_else(|| record.timestamp.to_string());
                        println!(
                            "{}  plan {}  {}  {}",
                            record.query_hash, record.plan_digest, when, record.text
                        );
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_report(report: &DriftReport) {
    println!(
        "compared {} queries between {} and {}",
        report.compared, report.baseline, report.candidate
    );
    for entry in &report.changed {
        println!(
            "  {} {} -> {}  {}",
            Color::Yellow.paint(&entry.query_hash),
            entry.baseline_digest,
            entry.candidate_digest,
            entry.text
        );
    }
    if !report.added.is_empty() {
        println!("  added: {}", report.added.join(", "));
    }
    if !report.removed.is_empty() {
        println!("  removed: {}", report.removed.join(", "));
    }
    let pct = report.change_fraction() * 100.0;
    if report.drifted() {
        println!(
            "{} {pct:.1}% of plans changed (threshold {:.1}%)",
            Color::Red.bold().paint("drift:"),
            report.threshold_pct
        );
    } else {
        println!(
            "{} {pct:.1}% of plans changed (threshold {:.1}%)",
            Color::Green.paint("ok:"),
            report.threshold_pct
        );
    }
}
