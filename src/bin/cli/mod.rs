//! CLI argument parsing and command execution.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::error;

use agentready::core::config::ArsConfig;
use agentready::core::pipeline::Pipeline;
use agentready::core::progress::ProgressSink;
use agentready::io::reports;

/// Scan a repository and produce its Agent Readiness Score.
#[derive(Debug, Parser)]
#[command(name = "agentready", version, about)]
pub struct Cli {
    /// Repository root to scan.
    pub directory: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit the full report as JSON on stdout instead of the terminal
    /// summary.
    #[arg(long)]
    pub json: bool,

    /// Write an HTML report to the given path.
    #[arg(long, value_name = "PATH")]
    pub html: Option<PathBuf>,

    /// Print the shields.io badge URL after the summary.
    #[arg(long)]
    pub badge: bool,

    /// Exit with status 2 when the composite score is below this value.
    #[arg(long, value_name = "SCORE")]
    pub threshold: Option<f64>,

    /// Configuration file overriding the built-in weights and
    /// thresholds (YAML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable the optional live agent evaluation (C7).
    #[arg(long)]
    pub no_agent_eval: bool,
}

/// Execute the scan and return the process exit code.
pub async fn run(args: Cli) -> i32 {
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return 1;
        }
    };

    // No built-in evaluator ships; --no-agent-eval is the explicit off
    // switch for embedders that attach one.
    let pipeline = Pipeline::new(config);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let spinner = (!args.json).then(make_spinner);
    let progress: Option<ProgressSink> = spinner.clone().map(|bar| {
        let sink: ProgressSink = Arc::new(move |stage, detail: &str| {
            bar.set_message(format!("{stage}: {detail}"));
        });
        sink
    });

    let report = pipeline
        .run_with(&args.directory, progress, cancel)
        .await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let report = match report {
        Ok(report) => report,
        Err(err) => {
            error!("{err}");
            return 1;
        }
    };

    if args.json {
        match reports::render_json(&report) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                error!("{err}");
                return 1;
            }
        }
    } else {
        print!("{}", reports::render_terminal(&report));
    }

    if let Some(path) = &args.html {
        match reports::render_html(&report).and_then(|html| {
            std::fs::write(path, html)
                .map_err(|err| agentready::ArsError::io("failed to write HTML report", err))
        }) {
            Ok(()) => {}
            Err(err) => {
                error!("{err}");
                return 1;
            }
        }
    }

    if args.badge {
        println!("{}", reports::badge_url(&report));
    }

    if let Some(threshold) = args.threshold {
        if report.scored.composite < threshold {
            return 2;
        }
    }
    0
}

fn load_config(args: &Cli) -> agentready::Result<ArsConfig> {
    match &args.config {
        Some(path) => ArsConfig::from_yaml_file(path),
        None => Ok(ArsConfig::default()),
    }
}

fn make_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
