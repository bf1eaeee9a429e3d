use anyhow::Result;
use clap::Parser;
use mimalloc::MiMalloc;
use mirtop_rs::cli::{Args, Command};
use mirtop_rs::pipeline;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (command, stats) = match &args.command {
        Command::Annotate(a) => ("annotate", pipeline::run_annotate(a)?),
        Command::Merge(a) => ("merge", pipeline::run_merge(a)?),
        Command::Stats(a) => ("stats", pipeline::run_stats(a)?),
        Command::Counts(a) => ("counts", pipeline::run_counts(a)?),
    };
    tracing::info!(
        command,
        files = stats.files,
        hits = stats.hits,
        skipped = stats.skipped,
        records = stats.records,
        "mirtop-rs: processing complete"
    );
    Ok(())
}
