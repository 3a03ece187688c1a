//! Agent Readiness CLI - scan a repository and report how ready it is
//! for autonomous AI coding agents.

use clap::Parser;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    // Diagnostics go to stderr so structured stdout output stays
    // parseable.
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = cli::run(args).await;
    std::process::exit(exit_code);
}
