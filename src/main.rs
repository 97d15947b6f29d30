//! Command line entry point of the LFV analysis

use clap::Parser;
use eyre::WrapErr;
use lfv_analysis::{
    analyzer::Analyzer,
    config::{Cli, Configuration},
    event::JsonLinesReader,
    histos::AnalysisHistograms,
    output, Result,
};
use tracing::info;

use std::{io, time::Instant};

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is kept for the per-event reports
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    // ### CONFIGURATION READOUT ###

    let cfg = Configuration::from_cli(&cli).wrap_err("Failed to load the configuration")?;
    let events = JsonLinesReader::open(&cfg.input).wrap_err("Failed to open the event input")?;
    info!("Analyzing input file {}", events.path().display());

    // ### ANALYSIS ###

    // NOTE: The clock starts after configuration I/O
    let saved_time = Instant::now();
    let analyzer = Analyzer::new(&cfg);
    let mut histos = AnalysisHistograms::new();
    let mut report = io::stdout().lock();
    let stats = analyzer
        .run(events, &mut histos, &mut report)
        .wrap_err("Failed to analyze the events")?;
    let elapsed_time = saved_time.elapsed();

    // ### RESULTS STORAGE ###

    output::dump_results(&cfg, &stats, &histos, elapsed_time)
        .wrap_err("Failed to output the results")?;
    Ok(())
}
