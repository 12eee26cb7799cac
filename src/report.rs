// Output Formatting
//
// Renders benchmark results as they are produced:
// - `human`: one colored line per file under a header per suite
// - `csv`: one row per statistic, `bench,<suite>,ext=<tag>,N=..,W=..,<stat>,<value>,ms`
// - `json`: a single document written once every suite has finished
//
// Build-gate messages and the "no suites" warning are part of the human
// output only; the machine formats keep stdout parseable and leave those
// to the log.

use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use console::Style;
use serde::Serialize;
use tracing::warn;

use crate::build_gate::{BuildGate, BuildOutcome, Staleness};
use crate::error::Result;
use crate::registry::RuntimeTag;
use crate::sampler::SamplingPlan;
use crate::stats::StatsSummary;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Csv,
    Json,
}

/// Result for one measured benchmark file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: String,
    pub tag: RuntimeTag,
    #[serde(flatten)]
    pub summary: Option<StatsSummary>,
    /// Present only when failed runs are flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_runs: Option<usize>,
}

/// All results of one suite.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub iterations: u32,
    pub warmup: u32,
    pub results: Vec<FileResult>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    suites: &'a [SuiteReport],
}

pub struct Reporter {
    format: OutputFormat,
    colored: bool,
    finished: Vec<SuiteReport>,
}

impl Reporter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self {
            format,
            colored,
            finished: Vec::new(),
        }
    }

    fn paint(&self, style: Style, text: impl Display) -> String {
        style.force_styling(self.colored).apply_to(text).to_string()
    }

    fn human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn build_started(
        &self,
        out: &mut dyn Write,
        gate: &BuildGate,
        reason: Staleness,
    ) -> Result<()> {
        if self.human() {
            let msg = format!(
                "{} binary {}, building with {}…",
                gate.tag(),
                reason,
                gate.command_line()
            );
            writeln!(out, "{}", self.paint(Style::new().yellow(), msg))?;
        }
        Ok(())
    }

    pub fn build_finished(
        &self,
        out: &mut dyn Write,
        gate: &BuildGate,
        outcome: &BuildOutcome,
    ) -> Result<()> {
        if !self.human() {
            return Ok(());
        }
        match outcome {
            BuildOutcome::UpToDate | BuildOutcome::Rebuilt { .. } => {}
            BuildOutcome::Skipped { reason } => {
                let next = match reason {
                    Staleness::Missing => format!(".{} benchmarks will be skipped", gate.tag()),
                    _ => "using the existing binary".to_string(),
                };
                let msg = format!("{} binary {}, build skipped; {}.", gate.tag(), reason, next);
                writeln!(out, "{}", self.paint(Style::new().yellow(), msg))?;
            }
            BuildOutcome::Failed { error, .. } => {
                let msg = format!(
                    "{} failed, .{} benchmarks will be skipped.",
                    gate.command_line(),
                    gate.tag()
                );
                writeln!(out, "{}", self.paint(Style::new().red(), msg))?;
                let detail = error
                    .diagnostics()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                writeln!(out, "{}", self.paint(Style::new().dim(), detail))?;
            }
        }
        Ok(())
    }

    /// Ends a run that found no suites. JSON still gets its (empty) document.
    pub fn no_suites(&mut self, out: &mut dyn Write, benchmarks_root: &Path) -> Result<()> {
        let msg = format!("No benchmarks found in {}", benchmarks_root.display());
        match self.format {
            OutputFormat::Human => writeln!(out, "{}", self.paint(Style::new().yellow(), msg))?,
            OutputFormat::Csv => warn!("{msg}"),
            OutputFormat::Json => {
                warn!("{msg}");
                self.finish(out)?;
            }
        }
        Ok(())
    }

    pub fn suite_header(&self, name: &str, plan: &SamplingPlan) -> String {
        format!(
            "{}  {}",
            self.paint(Style::new().bold(), format!("▶ {name}")),
            self.paint(
                Style::new().dim(),
                format!("({} iters, {} warmup)", plan.iterations, plan.warmup)
            )
        )
    }

    pub fn result_line(&self, result: &FileResult) -> String {
        let label = self.paint(Style::new().dim(), format!(".{:<5}", result.tag));
        let Some(stats) = &result.summary else {
            return format!("  {label}  {}", self.paint(Style::new().dim(), "no data"));
        };

        let mut line = format!(
            "  {label}  min={}  med={}  avg={}  max={}  σ={}",
            self.paint(Style::new().green(), fmt_ms(stats.min)),
            self.paint(Style::new().cyan(), fmt_ms(stats.median)),
            self.paint(Style::new().cyan(), fmt_ms(stats.mean)),
            self.paint(Style::new().yellow(), fmt_ms(stats.max)),
            self.paint(Style::new().dim(), fmt_ms(stats.stdev)),
        );
        if let Some(failed) = result.failed_runs.filter(|&n| n > 0) {
            let marker = format!("failed={}/{}", failed, stats.samples);
            line.push_str(&format!("  {}", self.paint(Style::new().red(), marker)));
        }
        line
    }

    pub fn csv_rows(&self, suite: &str, plan: &SamplingPlan, result: &FileResult) -> Vec<String> {
        let prefix = format!(
            "bench,{},ext={},N={},W={}",
            suite, result.tag, plan.iterations, plan.warmup
        );
        let mut rows = Vec::new();
        if let Some(stats) = &result.summary {
            for (name, value) in [
                ("min", stats.min),
                ("median", stats.median),
                ("mean", stats.mean),
                ("max", stats.max),
                ("stdev", stats.stdev),
            ] {
                rows.push(format!("{prefix},{name},{value:.6},ms"));
            }
        }
        if let Some(failed) = result.failed_runs {
            rows.push(format!("{prefix},failed,{failed},runs"));
        }
        rows
    }

    pub fn suite_started(&self, out: &mut dyn Write, name: &str, plan: &SamplingPlan) -> Result<()> {
        if self.human() {
            writeln!(out)?;
            writeln!(out, "{}", self.suite_header(name, plan))?;
        }
        Ok(())
    }

    pub fn file_result(
        &self,
        out: &mut dyn Write,
        suite: &str,
        plan: &SamplingPlan,
        result: &FileResult,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Human => writeln!(out, "{}", self.result_line(result))?,
            OutputFormat::Csv => {
                for row in self.csv_rows(suite, plan, result) {
                    writeln!(out, "{row}")?;
                }
            }
            OutputFormat::Json => {}
        }
        Ok(())
    }

    pub fn suite_finished(&mut self, out: &mut dyn Write, suite: SuiteReport) -> Result<()> {
        if self.human() && suite.results.is_empty() {
            let notice = self.paint(Style::new().red(), "No supported scripts found.");
            writeln!(out, "  {notice}")?;
        }
        if self.format == OutputFormat::Json {
            self.finished.push(suite);
        }
        Ok(())
    }

    pub fn finish(&mut self, out: &mut dyn Write) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                writeln!(out)?;
                writeln!(out, "{}", self.paint(Style::new().bold(), "Done."))?;
                writeln!(out)?;
            }
            OutputFormat::Csv => {}
            OutputFormat::Json => {
                let report = JsonReport {
                    suites: &self.finished,
                };
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
                self.finished.clear();
            }
        }
        out.flush()?;
        Ok(())
    }
}

fn fmt_ms(ms: f64) -> String {
    format!("{ms:.2}ms")
}
