// Command-line entry point for TraceMatrix.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracematrix::application::AnalyzeUsecase;
use tracematrix::infrastructure::concurrency::init_thread_pool;
use tracematrix::infrastructure::logging::init_logging;
use tracematrix::infrastructure::JsonExporter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Call log written by a tracking session
    #[arg(short, long)]
    log: PathBuf,

    /// Output file path (JSON coverage matrix)
    #[arg(short, long)]
    output: PathBuf,

    /// Aggregation worker threads (default: half the cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    init_thread_pool(cli.threads)?;

    let usecase = AnalyzeUsecase {
        exporter: &JsonExporter,
    };
    let report = usecase.run(&cli.log, &cli.output)?;

    println!(
        "Analysis completed! {} methods x {} tests in {} sub-matrices ({} lines skipped). Output written to {}",
        report.methods,
        report.tests,
        report.partitions,
        report.skipped_lines,
        cli.output.display()
    );
    Ok(())
}
