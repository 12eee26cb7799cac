// Runner registry: which command runs a benchmark file, keyed by extension.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Execution environment of a benchmark file, taken from its extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RuntimeTag(String);

impl RuntimeTag {
    /// Build a tag from an extension, with or without the leading dot.
    pub fn new(ext: impl AsRef<str>) -> Self {
        RuntimeTag(ext.as_ref().trim_start_matches('.').to_string())
    }

    /// Tag of a benchmark file. Files without an extension have none.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(RuntimeTag::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuntimeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// How files of one runtime are invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerSpec {
    /// Command prefix; the benchmark path is appended as the last argument.
    Available(Vec<String>),
    /// Known runtime that cannot be used in this run.
    Unavailable(String),
}

/// Result of looking a tag up in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Available(&'a [String]),
    Disabled(&'a str),
    Unsupported,
}

/// Immutable mapping from runtime tag to runner.
///
/// Built once from configuration, then handed to the build gate which
/// returns a new registry with its own tag resolved. Nothing mutates it
/// after measurement starts.
#[derive(Debug, Clone, Default)]
pub struct RunnerRegistry {
    runners: BTreeMap<RuntimeTag, RunnerSpec>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry from a table of interpreter commands.
    /// An empty command marks the tag as explicitly disabled.
    pub fn from_commands<'a, I>(commands: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<String>)>,
    {
        let runners = commands
            .into_iter()
            .map(|(ext, cmd)| {
                let spec = if cmd.is_empty() {
                    RunnerSpec::Unavailable("disabled in config".to_string())
                } else {
                    RunnerSpec::Available(cmd.clone())
                };
                (RuntimeTag::new(ext), spec)
            })
            .collect();
        RunnerRegistry { runners }
    }

    /// Return a registry with `tag` bound to `spec`, replacing any prior entry.
    pub fn with_runner(mut self, tag: RuntimeTag, spec: RunnerSpec) -> Self {
        self.runners.insert(tag, spec);
        self
    }

    pub fn get(&self, tag: &RuntimeTag) -> Option<&RunnerSpec> {
        self.runners.get(tag)
    }

    pub fn lookup(&self, tag: &RuntimeTag) -> Lookup<'_> {
        match self.runners.get(tag) {
            Some(RunnerSpec::Available(cmd)) => Lookup::Available(cmd),
            Some(RunnerSpec::Unavailable(reason)) => Lookup::Disabled(reason),
            None => Lookup::Unsupported,
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &RuntimeTag> {
        self.runners.keys()
    }
}
