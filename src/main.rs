//! HostProbe CLI - Host Capability Probe for CI Runners
//!
//! Resolves host facts, runs the benchmark battery and prints a report.

use anyhow::Context;
use clap::Parser;
use hostprobe::bench::{default_battery, BenchmarkRunner};
use hostprobe::config::{BenchmarkConfig, CliArgs, Commands, LogFormat, OutputFormat, ProbeConfig};
use hostprobe::profile::{FactCatalog, ProfileBuilder};
use hostprobe::progress::ProgressReporter;
use hostprobe::report::{render_json, Report, TextRenderer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    init_logging(args.verbose, args.log_format);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, format: LogFormat) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let command = args.command.unwrap_or(Commands::All);

    let config = ProbeConfig::from_cli(&args).map_err(anyhow::Error::msg)?;
    let bench_config = BenchmarkConfig::from_cli(&args);

    tracing::debug!(?command, ?config, "Starting run");

    let progress = Arc::new(ProgressReporter::for_terminal(args.quiet));

    let profile = if command.includes_profile() {
        let catalog = FactCatalog::new(&config);
        let builder = ProfileBuilder::from_config(&config).with_progress(Arc::clone(&progress));
        match builder.build(&catalog.declarations()) {
            Ok(profile) => Some(profile),
            Err(e) => {
                progress.finish_error("Fact resolution failed");
                return Err(e).context("resolving host facts");
            }
        }
    } else {
        None
    };

    let benchmarks = if command.includes_benchmarks() {
        BenchmarkRunner::new()
            .with_progress(Arc::clone(&progress))
            .run(&default_battery(&bench_config))
    } else {
        Vec::new()
    };

    progress.clear();
    tracing::info!(summary = %progress.summary().describe(), "Run finished");

    let report = Report::new(profile, benchmarks);
    let stdout = std::io::stdout();
    let out = stdout.lock();

    match args.format {
        OutputFormat::Text => TextRenderer::new()
            .with_sources(args.show_sources)
            .render(&report, out)
            .context("writing text report")?,
        OutputFormat::Json => render_json(&report, out).context("writing JSON report")?,
    }

    Ok(())
}
