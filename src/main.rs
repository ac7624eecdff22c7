//! CLI entry point.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use indicatif::HumanBytes;
use rpip::downloader::OrchestratorBuilder;
use rpip::progress::{ProgressBarOpts, ProgressDisplay, StyleOptions};
use rpip::strategy::{DownloaderSelector, DownloaderStrategy};
use rpip::{DownloadOutcome, Result};
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    if let Err(e) = args.validate() {
        e.exit();
    }

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e.detailed_message());
            ExitCode::from(2)
        }
    }
}

/// Download every target; `Ok(false)` if any of them failed.
async fn run(args: &Args) -> Result<bool> {
    let targets = args.targets()?;

    // Settle on one strategy for the whole batch so the progress display
    // knows whether it has anything to draw.
    let strategy = args
        .downloader
        .unwrap_or_else(|| DownloaderSelector::default().select());

    let mut builder = OrchestratorBuilder::new()
        .retries(u32::from(args.retries))
        .read_timeout(args.read_timeout())
        .strategy(strategy);
    if let Some(timeout) = args.timeout() {
        builder = builder.timeout(timeout);
    }
    let orchestrator = builder.build();
    info!("Downloading {} file(s) with {}", targets.len(), strategy);

    let draw_bars = strategy == DownloaderStrategy::Native
        && !args.no_progress
        && !args.quiet
        && io::stderr().is_terminal();
    let style = if draw_bars {
        StyleOptions::default()
    } else {
        StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden())
    };
    let display = ProgressDisplay::new(style, targets.len());

    let mut failures = 0usize;
    for target in &targets {
        let pb = display.start_artifact(&target.file_name());
        let outcome = orchestrator
            .run_with_progress(target, Some(ProgressDisplay::callback(&pb)))
            .await;
        display.finish_artifact(pb);

        if !outcome.success() {
            failures += 1;
        }
        if !args.quiet || !outcome.success() {
            display.println(describe(&outcome));
        }
    }
    display.finish();

    if failures > 0 {
        error!("{} of {} download(s) failed", failures, targets.len());
    }
    Ok(failures == 0)
}

fn describe(outcome: &DownloadOutcome) -> String {
    let strategy = outcome
        .strategy_used()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".into());

    match outcome.error() {
        None => {
            let check = match outcome.verification() {
                Some(v) if v.is_verified() => format!("{} ok", v.algorithm),
                _ => "not verified".into(),
            };
            format!(
                "Saved {} ({}, {}, {})",
                outcome.final_path().display(),
                HumanBytes(outcome.bytes_transferred()),
                strategy,
                check
            )
        }
        Some(failure) => format!(
            "Failed {} after {} attempt(s) with {}: {}\n  {} bytes kept at {}. {}",
            outcome.url(),
            outcome.attempts(),
            strategy,
            failure,
            outcome.bytes_transferred(),
            outcome.final_path().display(),
            failure.hint()
        ),
    }
}
