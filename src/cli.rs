// Command-line surface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::HarnessConfig;
use crate::orchestrator::RunOptions;
use crate::report::OutputFormat;
use crate::sampler::FailedRunPolicy;

/// runbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "runbench")]
#[command(version, about = "Run equivalent benchmark scripts across runtimes and compare latency")]
pub struct Cli {
    /// Name of benchmark to run (default: all)
    pub benchmark: Option<String>,

    /// Number of iterations (default: 100)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub iterations: Option<u32>,

    /// Warmup iterations (default: 5)
    #[arg(short, long)]
    pub warmup: Option<u32>,

    /// Project root holding benchmarks/ and the native sources (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Config file (default: <root>/runbench.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Treatment of runs that exit non-zero: record silently or flag in the report
    #[arg(long, value_enum)]
    pub failed_runs: Option<FailedRunPolicy>,

    /// Pin the harness and its children to this CPU core
    #[arg(long)]
    pub pin_core: Option<usize>,

    /// Never rebuild the native binary, even when stale
    #[arg(long)]
    pub no_build: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Layer CLI flags over the loaded config.
    pub fn run_options(&self, root: PathBuf, config: &HarnessConfig) -> RunOptions {
        let mut plan = config.sampling.plan();
        if let Some(n) = self.iterations {
            plan.iterations = n;
        }
        if let Some(w) = self.warmup {
            plan.warmup = w;
        }
        if let Some(policy) = self.failed_runs {
            plan.failed_runs = policy;
        }

        RunOptions {
            root,
            suite: self.benchmark.clone(),
            plan,
            skip_build: self.no_build,
            pin_core: self.pin_core.or(config.sampling.pin_core),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_come_from_config() {
        let cli = Cli::parse_from(["runbench"]);
        let options = cli.run_options(PathBuf::from("/p"), &HarnessConfig::default());
        assert_eq!(options.suite, None);
        assert_eq!(options.plan.iterations, 100);
        assert_eq!(options.plan.warmup, 5);
        assert_eq!(options.plan.failed_runs, FailedRunPolicy::Record);
        assert!(!options.skip_build);
        assert_eq!(cli.format, OutputFormat::Human);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "runbench", "greet", "-n", "50", "-w", "10", "--failed-runs", "flag", "--format",
            "csv", "--pin-core", "2",
        ]);
        let mut config = HarnessConfig::default();
        config.sampling.pin_core = Some(0);
        let options = cli.run_options(PathBuf::from("/p"), &config);

        assert_eq!(options.suite.as_deref(), Some("greet"));
        assert_eq!(options.plan.iterations, 50);
        assert_eq!(options.plan.warmup, 10);
        assert_eq!(options.plan.failed_runs, FailedRunPolicy::Flag);
        assert_eq!(options.pin_core, Some(2));
        assert_eq!(cli.format, OutputFormat::Csv);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(Cli::try_parse_from(["runbench", "-n", "0"]).is_err());
    }
}
