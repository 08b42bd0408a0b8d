use std::path::PathBuf;

use aegis_core::{EvaluatorBackend, ScanRequest, Sentinel, SentinelConfig};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, Level};

/// Aegis Sentinel - threat verdicts for browser navigations
///
/// With a URL, scans once and prints one JSON line. Without one, reads
/// newline-delimited JSON requests on stdin until EOF and answers each on
/// stdout, in order.
#[derive(Parser, Debug)]
#[command(name = "aegis-sentinel")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about, long_about)]
struct Cli {
    /// URL to scan once (omit to run as a daemon)
    url: Option<String>,

    /// Page content for a one-shot scan
    content: Option<String>,

    /// Append-only evidence log written in daemon mode
    #[arg(long, env = "AEGIS_EVIDENCE_LOG", default_value = aegis_core::config::DEFAULT_EVIDENCE_LOG)]
    evidence_log: PathBuf,

    /// Evidence snapshot written in one-shot mode
    #[arg(long, env = "AEGIS_SNAPSHOT", default_value = aegis_core::config::DEFAULT_SNAPSHOT)]
    snapshot: PathBuf,

    /// Also append an audit edge per verdict to this JSONL file
    #[arg(long, env = "AEGIS_AUDIT_LOG")]
    audit_log: Option<PathBuf>,

    /// Evaluator program: reads a change context on stdin, prints scores
    #[arg(long, env = "AEGIS_EVALUATOR_CMD", conflicts_with = "evaluator_url")]
    evaluator_cmd: Option<PathBuf>,

    /// Argument passed to the evaluator program (repeatable)
    #[arg(long = "evaluator-arg", allow_hyphen_values = true)]
    evaluator_args: Vec<String>,

    /// Evaluator HTTP endpoint: receives a change context, returns scores
    #[arg(long, env = "AEGIS_EVALUATOR_URL")]
    evaluator_url: Option<String>,

    /// Per-request evaluator time limit in milliseconds
    #[arg(long, env = "AEGIS_EVALUATOR_TIMEOUT_MS", default_value_t = aegis_core::config::DEFAULT_EVALUATOR_TIMEOUT_MS)]
    evaluator_timeout_ms: u64,

    /// Requests evaluated concurrently in daemon mode
    #[arg(long, env = "AEGIS_MAX_IN_FLIGHT", default_value_t = aegis_core::config::DEFAULT_MAX_IN_FLIGHT)]
    max_in_flight: usize,

    /// Emit logs as JSON (logs go to stderr)
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> SentinelConfig {
        let evaluator = match (&self.evaluator_cmd, &self.evaluator_url) {
            (Some(program), _) => EvaluatorBackend::Command {
                program: program.clone(),
                args: self.evaluator_args.clone(),
            },
            (None, Some(endpoint)) => EvaluatorBackend::Http {
                endpoint: endpoint.clone(),
            },
            (None, None) => EvaluatorBackend::None,
        };

        let mut config = SentinelConfig::default()
            .with_evidence_log(&self.evidence_log)
            .with_snapshot_path(&self.snapshot)
            .with_evaluator(evaluator)
            .with_evaluator_timeout_ms(self.evaluator_timeout_ms)
            .with_max_in_flight(self.max_in_flight);
        if let Some(path) = &self.audit_log {
            config = config.with_audit_log(path);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    aegis_core::init_tracing(cli.json, level);

    let config = cli.config();
    let sentinel = Sentinel::from_config(&config)
        .await
        .context("Failed to start sentinel")?;

    let mut stdout = tokio::io::stdout();

    if let Some(url) = cli.url {
        let request = ScanRequest::new(url, cli.content.unwrap_or_default());
        sentinel
            .run_once(request, &mut stdout)
            .await
            .context("Failed to write verdict")?;
        return Ok(());
    }

    let summary = sentinel
        .run(BufReader::new(tokio::io::stdin()), stdout)
        .await
        .context("Sentinel stream closed")?;

    info!(
        requests = summary.requests,
        responses = summary.responses(),
        evaluation_failures = summary.evaluation_failures,
        denials = summary.denials,
        evidence_failures = summary.evidence_failures,
        "sentinel stopped"
    );
    Ok(())
}
