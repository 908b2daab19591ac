use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tagscan_engine::{NarrowReason, Outcome, RunReport, VersionScanner};
use tagscan_hashdb::{FilterOptions, FingerprintDb};
use tagscan_prober::HttpFingerprintProbe;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "tagscan")]
#[command(about = "Identify the deployed CMS version from static-asset fingerprints", long_about = None)]
#[command(version)]
struct Cli {
    /// Target origin, e.g. https://example.com
    #[arg(long)]
    target: String,

    /// CMS family to fingerprint, e.g. 'wordpress'; selects the
    /// database file and its filtering preset
    #[arg(long)]
    cms: String,

    /// Directory holding the fingerprint databases (<cms>.json)
    #[arg(long, default_value = "./hashes")]
    hashes_dir: PathBuf,

    /// Maximum deduction steps; 0 means unlimited
    #[arg(long, default_value_t = 15)]
    max_depth: usize,

    /// Pause between probes, in milliseconds
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// Whole-run budget, in seconds; 0 means no budget
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct ScanOutput {
    target: String,
    cms: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    iterations: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let db_path = cli.hashes_dir.join(format!("{}.json", cli.cms));
    let raw = tokio::fs::read(&db_path)
        .await
        .with_context(|| format!("failed to read fingerprint database {}", db_path.display()))?;

    let filters = FilterOptions::for_cms(&cli.cms);
    let db = Arc::new(FingerprintDb::from_json(&raw, &filters).with_context(|| {
        format!("failed to load fingerprint database {}", db_path.display())
    })?);

    let probe = Arc::new(
        HttpFingerprintProbe::new(db.clone()).context("failed to build the http client")?,
    );
    let scanner = VersionScanner::new(db, probe).context("failed to build the scanner")?;
    scanner.set_max_depth(cli.max_depth).await;
    scanner
        .set_request_delay(Duration::from_millis(cli.delay_ms))
        .await;

    let cancel = CancellationToken::new();
    if cli.timeout_secs > 0 {
        let deadline = cancel.clone();
        let budget = Duration::from_secs(cli.timeout_secs);
        tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            deadline.cancel();
        });
    }

    let report = scanner.analyze(&cancel, &cli.target).await;
    let resolved = matches!(report.outcome, Outcome::Resolved(_));

    let output = to_output(&cli, report);
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !resolved {
        std::process::exit(1);
    }

    Ok(())
}

fn to_output(cli: &Cli, report: RunReport) -> ScanOutput {
    let iterations = report.iterations;

    let (status, version, candidates, reason) = match report.outcome {
        Outcome::Resolved(tag) => ("resolved", Some(tag), Vec::new(), None),
        Outcome::Narrowed { candidates, reason } => (
            "narrowed",
            None,
            candidates,
            Some(
                match reason {
                    NarrowReason::DepthReached => "depth reached",
                    NarrowReason::NoMoreFiles => "no more files",
                }
                .to_string(),
            ),
        ),
        Outcome::Contradiction { previous, incoming } => (
            "contradiction",
            None,
            Vec::new(),
            Some(format!(
                "tags {incoming:?} do not intersect previous candidates {previous:?}"
            )),
        ),
        Outcome::TargetUnreachable(detail) => ("unreachable", None, Vec::new(), Some(detail)),
        Outcome::TooManyNon200 { candidates } => ("too-many-misses", None, candidates, None),
        Outcome::Cancelled { candidates } => ("cancelled", None, candidates, None),
    };

    ScanOutput {
        target: cli.target.clone(),
        cms: cli.cms.clone(),
        status,
        version,
        candidates,
        reason,
        iterations,
    }
}
