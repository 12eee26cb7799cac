// Summary Statistics
//
// Reduces a sample set to min, max, mean, median and standard deviation,
// all in milliseconds. Every sample participates; nothing is trimmed.

use serde::Serialize;

use crate::registry::RuntimeTag;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Latency summary of one benchmark file (milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    #[serde(skip_serializing)]
    pub tag: RuntimeTag,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample (n - 1) standard deviation; zero for a single sample
    pub stdev: f64,
    pub samples: usize,
}

/// Summarize nanosecond samples. Returns `None` when there is no data.
pub fn summarize(tag: &RuntimeTag, samples_ns: &[u64]) -> Option<StatsSummary> {
    if samples_ns.is_empty() {
        return None;
    }

    let mut ms: Vec<f64> = samples_ns
        .iter()
        .map(|&ns| ns as f64 / NANOS_PER_MILLI)
        .collect();
    ms.sort_by(|a, b| a.total_cmp(b));

    let n = ms.len();
    let mean = ms.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (ms[n / 2 - 1] + ms[n / 2]) / 2.0
    } else {
        ms[n / 2]
    };
    let stdev = if n < 2 {
        0.0
    } else {
        let variance = ms.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };

    Some(StatsSummary {
        tag: tag.clone(),
        min: ms[0],
        max: ms[n - 1],
        mean,
        median,
        stdev,
        samples: n,
    })
}
