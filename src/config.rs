// Configuration loading from runbench.toml
//
// The harness works without any configuration file: the defaults describe
// the usual project layout (`benchmarks/` suites, a zig-built `rxt` binary
// and the common script interpreters). A `runbench.toml` in the project
// root, or a file passed with `--config`, overrides any part of it.
//
// ```toml
// benchmarks_dir = "benchmarks"
//
// [native]
// tag = "rxt"
// binary = "zig-out/bin/rxt"
// source_roots = ["rxt/src", "rx/src"]
// source_extension = "zig"
// build_command = ["zig", "build", "-Doptimize=ReleaseFast"]
//
// [runners]
// exs = ["elixir"]
// rb = []            # disable ruby benchmarks
//
// [sampling]
// iterations = 100
// warmup = 5
// failed_runs = "record"
// ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::sampler::{FailedRunPolicy, SamplingPlan};

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "runbench.toml";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Directory holding one subdirectory per suite, relative to the root
    #[serde(default = "default_benchmarks_dir")]
    pub benchmarks_dir: PathBuf,
    /// The runtime whose binary is built from source before use
    #[serde(default)]
    pub native: NativeConfig,
    /// Extra or overriding interpreter commands, keyed by extension
    #[serde(default)]
    pub runners: BTreeMap<String, Vec<String>>,
    /// Sampling defaults
    #[serde(default)]
    pub sampling: SamplingConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            benchmarks_dir: default_benchmarks_dir(),
            native: NativeConfig::default(),
            runners: BTreeMap::new(),
            sampling: SamplingConfig::default(),
        }
    }
}

/// Native runtime built by the harness itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
    #[serde(default = "default_native_tag")]
    pub tag: String,
    /// Built binary, relative to the root
    #[serde(default = "default_native_binary")]
    pub binary: PathBuf,
    /// Directories scanned for sources newer than the binary
    #[serde(default = "default_source_roots")]
    pub source_roots: Vec<PathBuf>,
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    /// Run from the root when the binary is missing or stale
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            tag: default_native_tag(),
            binary: default_native_binary(),
            source_roots: default_source_roots(),
            source_extension: default_source_extension(),
            build_command: default_build_command(),
        }
    }
}

/// Sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Measured runs per file
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Discarded runs per file before measuring
    #[serde(default = "default_warmup")]
    pub warmup: u32,
    /// What to do with runs that exit non-zero or fail to start
    #[serde(default)]
    pub failed_runs: FailedRunPolicy,
    /// Pin the harness (and therefore its children) to this core
    #[serde(default)]
    pub pin_core: Option<usize>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            warmup: default_warmup(),
            failed_runs: FailedRunPolicy::default(),
            pin_core: None,
        }
    }
}

impl SamplingConfig {
    pub fn plan(&self) -> SamplingPlan {
        SamplingPlan {
            iterations: self.iterations,
            warmup: self.warmup,
            failed_runs: self.failed_runs,
        }
    }
}

fn default_benchmarks_dir() -> PathBuf {
    PathBuf::from("benchmarks")
}
fn default_native_tag() -> String {
    "rxt".to_string()
}
fn default_native_binary() -> PathBuf {
    PathBuf::from("zig-out/bin/rxt")
}
fn default_source_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("rxt/src"), PathBuf::from("rx/src")]
}
fn default_source_extension() -> String {
    "zig".to_string()
}
fn default_build_command() -> Vec<String> {
    ["zig", "build", "-Doptimize=ReleaseFast"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_iterations() -> u32 {
    100
}
fn default_warmup() -> u32 {
    5
}

/// Interpreters known without any configuration.
const DEFAULT_INTERPRETERS: &[(&str, &str)] = &[
    ("lua", "lua"),
    ("py", "python3"),
    ("js", "node"),
    ("rb", "ruby"),
    ("sh", "bash"),
];

impl HarnessConfig {
    /// Load configuration for a project root.
    ///
    /// An explicit path must exist. Without one, `runbench.toml` in the root
    /// is used when present and the defaults otherwise.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !path.is_file() => {
                return Err(HarnessError::ConfigMissing {
                    path: path.to_path_buf(),
                });
            }
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE);
                if !candidate.is_file() {
                    debug!(root = %root.display(), "no {CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(&path).map_err(|source| HarnessError::Io {
            path: path.clone(),
            source,
        })?;
        let config: HarnessConfig =
            toml::from_str(&text).map_err(|source| HarnessError::ConfigParse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampling.iterations == 0 {
            return Err(HarnessError::InvalidConfig(
                "sampling.iterations must be at least 1".to_string(),
            ));
        }
        if self.native.tag.trim_start_matches('.').is_empty() {
            return Err(HarnessError::InvalidConfig(
                "native.tag must not be empty".to_string(),
            ));
        }
        if self.native.build_command.is_empty() {
            return Err(HarnessError::InvalidConfig(
                "native.build_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Suite directory root for a project root.
    pub fn benchmarks_root(&self, root: &Path) -> PathBuf {
        root.join(&self.benchmarks_dir)
    }

    /// Default interpreters with the `[runners]` table layered on top.
    pub fn interpreter_commands(&self) -> BTreeMap<String, Vec<String>> {
        let mut commands: BTreeMap<String, Vec<String>> = DEFAULT_INTERPRETERS
            .iter()
            .map(|(ext, cmd)| (ext.to_string(), vec![cmd.to_string()]))
            .collect();
        for (ext, cmd) in &self.runners {
            commands.insert(ext.trim_start_matches('.').to_string(), cmd.clone());
        }
        commands
    }
}
