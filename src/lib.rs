//! runbench: cross-runtime micro-benchmark harness
//!
//! Runs equivalent benchmark scripts written for different runtimes, one
//! suite directory at a time, and reports wall-clock latency statistics per
//! file so the implementations can be compared.
//!
//! ```text
//! benchmarks/
//!   greet/
//!     hello.lua  hello.py  hello.rxt  hello.sh
//! ```
//!
//! Each file is dispatched by extension through a [`RunnerRegistry`]. The
//! `rxt` runtime is a native binary that the [`BuildGate`] rebuilds when it
//! is missing or older than its sources.

pub mod affinity;
pub mod build_gate;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod sampler;
pub mod stats;

pub use build_gate::{BuildGate, BuildOutcome, Staleness};
pub use cli::Cli;
pub use config::HarnessConfig;
pub use error::{BuildError, HarnessError};
pub use orchestrator::{run_benchmarks, RunOptions, RunSummary};
pub use registry::{Lookup, RunnerRegistry, RunnerSpec, RuntimeTag};
pub use report::{FileResult, OutputFormat, Reporter, SuiteReport};
pub use sampler::{FailedRunPolicy, SampleCollector, SampleSet, SamplingPlan};
pub use stats::{summarize, StatsSummary};
