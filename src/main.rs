// Benchmark runner entry point
// Runs one named suite, or every suite under the benchmarks root

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use console::style;
use runbench::{run_benchmarks, Cli, HarnessConfig, Reporter};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", style(err).for_stderr().red());
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "runbench=debug"
    } else {
        "runbench=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let config = HarnessConfig::load(&root, cli.config.as_deref())?;
    let options = cli.run_options(root, &config);

    let stdout = std::io::stdout();
    let colored = !cli.no_color && stdout.is_terminal();
    let mut reporter = Reporter::new(cli.format, colored);
    let mut out = stdout.lock();

    let summary = run_benchmarks(&config, &options, &mut reporter, &mut out)?;
    tracing::debug!(
        suites = summary.suites,
        files = summary.measured_files,
        "run complete"
    );
    Ok(())
}
