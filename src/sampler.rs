// Sample collection: warmup runs, then timed runs of one benchmark file.
//
// One child process at a time, always waited on before the next spawn.
// There is no timeout; a script that never exits stalls the whole run.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Treatment of invocations that exit non-zero or cannot be spawned.
///
/// Both variants keep every sample: the measured quantity is the time to run
/// the command, whether or not the script itself succeeded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FailedRunPolicy {
    /// Record the duration and ignore the outcome
    #[default]
    Record,
    /// Record the duration and count the failure for the report
    Flag,
}

/// Iteration counts and failure policy for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    pub iterations: u32,
    pub warmup: u32,
    pub failed_runs: FailedRunPolicy,
}

/// Wall-clock durations of the measured runs, in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSet {
    samples_ns: Vec<u64>,
    failed_runs: Option<usize>,
}

impl SampleSet {
    pub fn as_slice(&self) -> &[u64] {
        &self.samples_ns
    }

    pub fn len(&self) -> usize {
        self.samples_ns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_ns.is_empty()
    }

    /// Failed invocations among the samples; `None` unless the plan flags them.
    pub fn failed_runs(&self) -> Option<usize> {
        self.failed_runs
    }
}

/// Runs one benchmark file according to a plan.
#[derive(Debug, Clone, Copy)]
pub struct SampleCollector {
    plan: SamplingPlan,
}

impl SampleCollector {
    pub fn new(plan: SamplingPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &SamplingPlan {
        &self.plan
    }

    /// Run `command + file` `warmup` times untimed, then `iterations` times
    /// timed. Returns exactly `iterations` samples.
    pub fn collect(&self, command: &[String], file: &Path) -> SampleSet {
        for _ in 0..self.plan.warmup {
            invoke(command, file);
        }

        let mut samples_ns = Vec::with_capacity(self.plan.iterations as usize);
        let mut failed = 0usize;
        for _ in 0..self.plan.iterations {
            let start = Instant::now();
            let succeeded = invoke(command, file);
            let elapsed = start.elapsed();
            samples_ns.push(elapsed.as_nanos() as u64);
            if !succeeded {
                failed += 1;
            }
        }

        if failed > 0 {
            debug!(file = %file.display(), failed, "invocations did not succeed");
        }

        SampleSet {
            samples_ns,
            failed_runs: match self.plan.failed_runs {
                FailedRunPolicy::Record => None,
                FailedRunPolicy::Flag => Some(failed),
            },
        }
    }
}

/// Spawn one invocation and wait for it; output is captured and dropped.
/// Returns whether the child ran and exited successfully.
fn invoke(command: &[String], file: &Path) -> bool {
    let Some((program, args)) = command.split_first() else {
        return false;
    };
    match Command::new(program)
        .args(args)
        .arg(file)
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) => output.status.success(),
        Err(err) => {
            debug!(program = %program, error = %err, "spawn failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> Vec<String> {
        vec!["sh".to_string()]
    }

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_collects_exact_iteration_count() {
        let dir = tempfile::tempdir().unwrap();
        let file = script(dir.path(), "ok.sh", "exit 0\n");
        let collector = SampleCollector::new(SamplingPlan {
            iterations: 7,
            warmup: 2,
            failed_runs: FailedRunPolicy::Record,
        });

        let samples = collector.collect(&sh(), &file);
        assert_eq!(samples.len(), 7);
        assert_eq!(samples.failed_runs(), None);
        assert!(samples.as_slice().iter().all(|&ns| ns > 0));
    }

    #[test]
    fn test_nonzero_exit_is_still_sampled() {
        let dir = tempfile::tempdir().unwrap();
        let file = script(dir.path(), "fail.sh", "exit 3\n");
        let collector = SampleCollector::new(SamplingPlan {
            iterations: 5,
            warmup: 1,
            failed_runs: FailedRunPolicy::Flag,
        });

        let samples = collector.collect(&sh(), &file);
        assert_eq!(samples.len(), 5);
        assert_eq!(samples.failed_runs(), Some(5));
    }

    #[test]
    fn test_nonzero_exit_is_recorded_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = script(dir.path(), "fail.sh", "exit 3\n");
        let collector = SampleCollector::new(SamplingPlan {
            iterations: 6,
            warmup: 2,
            failed_runs: FailedRunPolicy::default(),
        });

        let samples = collector.collect(&sh(), &file);
        assert_eq!(samples.len(), 6);
        assert_eq!(samples.failed_runs(), None);
    }

    #[test]
    fn test_missing_program_is_still_sampled() {
        let dir = tempfile::tempdir().unwrap();
        let file = script(dir.path(), "x.nope", "");
        let command = vec!["runbench-no-such-interpreter".to_string()];
        let collector = SampleCollector::new(SamplingPlan {
            iterations: 3,
            warmup: 0,
            failed_runs: FailedRunPolicy::Flag,
        });

        let samples = collector.collect(&command, &file);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples.failed_runs(), Some(3));
    }

    #[test]
    fn test_zero_iterations_gives_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let file = script(dir.path(), "ok.sh", "exit 0\n");
        let collector = SampleCollector::new(SamplingPlan {
            iterations: 0,
            warmup: 0,
            failed_runs: FailedRunPolicy::Record,
        });

        assert!(collector.collect(&sh(), &file).is_empty());
    }

    #[test]
    fn test_warmup_runs_precede_measured_runs() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let file = script(
            dir.path(),
            "count.sh",
            &format!("echo run >> '{}'\n", log.display()),
        );
        let collector = SampleCollector::new(SamplingPlan {
            iterations: 4,
            warmup: 3,
            failed_runs: FailedRunPolicy::Record,
        });

        let samples = collector.collect(&sh(), &file);
        let calls = std::fs::read_to_string(&log).unwrap().lines().count();
        assert_eq!(samples.len(), 4);
        assert_eq!(calls, 7);
    }
}
