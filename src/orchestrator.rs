// Drives a whole run: build gate once, then every suite and file in order.
//
// Init -> build gate -> resolve suites -> per suite, per file -> done.
// Nothing is retried; unsupported files are skipped and the run moves on.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::affinity;
use crate::build_gate::BuildGate;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::registry::{Lookup, RunnerRegistry, RuntimeTag};
use crate::report::{FileResult, Reporter, SuiteReport};
use crate::sampler::{SampleCollector, SamplingPlan};
use crate::stats::summarize;

/// Per-invocation options, already layered over the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Project root; config paths are relative to it
    pub root: PathBuf,
    /// Run only this suite
    pub suite: Option<String>,
    pub plan: SamplingPlan,
    pub skip_build: bool,
    pub pin_core: Option<usize>,
}

/// Counts of what a run measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub suites: usize,
    pub measured_files: usize,
}

pub fn run_benchmarks(
    config: &HarnessConfig,
    options: &RunOptions,
    reporter: &mut Reporter,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let registry = RunnerRegistry::from_commands(&config.interpreter_commands());

    let gate = BuildGate::from_config(&config.native, &options.root);
    let staleness = gate.check();
    if staleness.is_stale() && !options.skip_build {
        reporter.build_started(out, &gate, staleness)?;
    }
    let (registry, outcome) = gate.apply(registry, staleness, options.skip_build);
    reporter.build_finished(out, &gate, &outcome)?;
    debug!(runtimes = ?registry.tags().map(RuntimeTag::as_str).collect::<Vec<_>>(), "runners resolved");

    let benchmarks_root = config.benchmarks_root(&options.root);
    let suites = resolve_suites(&benchmarks_root, options.suite.as_deref())?;
    if suites.is_empty() {
        reporter.no_suites(out, &benchmarks_root)?;
        return Ok(RunSummary::default());
    }

    if let Some(core) = options.pin_core {
        affinity::pin_to_core(core);
    }

    let collector = SampleCollector::new(options.plan);
    let mut summary = RunSummary::default();
    for suite_dir in &suites {
        let report = run_suite(suite_dir, &registry, &collector, reporter, out)?;
        summary.suites += 1;
        summary.measured_files += report.results.len();
        reporter.suite_finished(out, report)?;
    }
    reporter.finish(out)?;

    Ok(summary)
}

fn run_suite(
    suite_dir: &Path,
    registry: &RunnerRegistry,
    collector: &SampleCollector,
    reporter: &Reporter,
    out: &mut dyn Write,
) -> Result<SuiteReport> {
    let name = display_name(suite_dir);
    let plan = collector.plan();
    reporter.suite_started(out, &name, plan)?;

    let mut results = Vec::new();
    for file in suite_files(suite_dir)? {
        let Some(tag) = RuntimeTag::from_path(&file) else {
            debug!(file = %file.display(), reason = untagged_reason(&file), "skipping");
            continue;
        };
        let command = match registry.lookup(&tag) {
            Lookup::Available(command) => command,
            Lookup::Disabled(reason) => {
                debug!(file = %file.display(), %reason, "runtime disabled, skipping");
                continue;
            }
            Lookup::Unsupported => {
                debug!(file = %file.display(), "unsupported runtime, skipping");
                continue;
            }
        };

        let samples = collector.collect(command, &file);
        let result = FileResult {
            file: display_name(&file),
            summary: summarize(&tag, samples.as_slice()),
            tag,
            failed_runs: samples.failed_runs(),
        };
        reporter.file_result(out, &name, plan, &result)?;
        results.push(result);
    }

    Ok(SuiteReport {
        name,
        iterations: plan.iterations,
        warmup: plan.warmup,
        results,
    })
}

/// Suite directories to run, sorted by name.
///
/// A named suite must exist. Without a name every subdirectory of the
/// benchmarks root is a suite; a missing root simply has none.
pub fn resolve_suites(benchmarks_root: &Path, name: Option<&str>) -> Result<Vec<PathBuf>> {
    if let Some(name) = name {
        let dir = benchmarks_root.join(name);
        if !dir.is_dir() {
            return Err(HarnessError::SuiteNotFound {
                name: name.to_string(),
                root: benchmarks_root.to_path_buf(),
            });
        }
        return Ok(vec![dir]);
    }

    if !benchmarks_root.is_dir() {
        return Ok(Vec::new());
    }
    list_sorted(benchmarks_root, Path::is_dir)
}

/// Regular files of a suite, sorted by name.
pub fn suite_files(suite_dir: &Path) -> Result<Vec<PathBuf>> {
    list_sorted(suite_dir, Path::is_file)
}

fn list_sorted(dir: &Path, keep: fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| HarnessError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| keep(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn untagged_reason(path: &Path) -> &'static str {
    match path.extension() {
        Some(ext) if ext.to_str().is_none() => "extension is not valid UTF-8",
        _ => "no extension",
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
