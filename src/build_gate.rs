// Build gate for the native runtime.
// The binary is rebuilt when missing or older than any of its sources. A
// failed build disables only that runtime; the rest of the run goes on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::NativeConfig;
use crate::error::BuildError;
use crate::registry::{RunnerRegistry, RunnerSpec, RuntimeTag};

/// Whether the native binary can be used as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    Missing,
    SourcesChanged,
}

impl Staleness {
    pub fn is_stale(self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Staleness::Fresh => "up to date",
            Staleness::Missing => "not found",
            Staleness::SourcesChanged => "sources changed",
        })
    }
}

/// What the gate did, for reporting.
#[derive(Debug)]
pub enum BuildOutcome {
    UpToDate,
    Rebuilt { reason: Staleness },
    Skipped { reason: Staleness },
    Failed { reason: Staleness, error: BuildError },
}

#[derive(Debug, Clone)]
pub struct BuildGate {
    tag: RuntimeTag,
    binary: PathBuf,
    source_roots: Vec<PathBuf>,
    source_extension: String,
    command: Vec<String>,
    workdir: PathBuf,
}

impl BuildGate {
    /// Gate for the configured native runtime, paths resolved against `root`.
    pub fn from_config(native: &NativeConfig, root: &Path) -> Self {
        Self {
            tag: RuntimeTag::new(&native.tag),
            binary: root.join(&native.binary),
            source_roots: native.source_roots.iter().map(|p| root.join(p)).collect(),
            source_extension: native.source_extension.trim_start_matches('.').to_string(),
            command: native.build_command.clone(),
            workdir: root.to_path_buf(),
        }
    }

    pub fn tag(&self) -> &RuntimeTag {
        &self.tag
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Compare the binary's mtime with every matching source file.
    /// A source counts only when strictly newer than the binary.
    pub fn check(&self) -> Staleness {
        let Ok(built_at) = self.binary.metadata().and_then(|m| m.modified()) else {
            return Staleness::Missing;
        };
        match self.first_source_after(built_at) {
            Some(source) => {
                debug!(source = %source.display(), "source newer than binary");
                Staleness::SourcesChanged
            }
            None => Staleness::Fresh,
        }
    }

    fn first_source_after(&self, built_at: SystemTime) -> Option<PathBuf> {
        self.source_roots
            .iter()
            .flat_map(|root| WalkDir::new(root).into_iter().flatten())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|e| e.to_str())
                    == Some(self.source_extension.as_str())
            })
            .find(|entry| {
                entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .is_some_and(|mtime| mtime > built_at)
            })
            .map(|entry| entry.into_path())
    }

    /// Resolve the native runtime's registry entry, rebuilding if needed.
    pub fn apply(
        &self,
        registry: RunnerRegistry,
        staleness: Staleness,
        skip_build: bool,
    ) -> (RunnerRegistry, BuildOutcome) {
        let available = || self.runner_spec();

        if !staleness.is_stale() {
            debug!(binary = %self.binary.display(), "native binary is up to date");
            return (
                registry.with_runner(self.tag.clone(), available()),
                BuildOutcome::UpToDate,
            );
        }

        if skip_build {
            let spec = match staleness {
                Staleness::Missing => RunnerSpec::Unavailable("build skipped".to_string()),
                _ => available(),
            };
            return (
                registry.with_runner(self.tag.clone(), spec),
                BuildOutcome::Skipped { reason: staleness },
            );
        }

        info!(tag = %self.tag, reason = %staleness, command = %self.command_line(), "building");
        match self.build() {
            Ok(()) => (
                registry.with_runner(self.tag.clone(), available()),
                BuildOutcome::Rebuilt { reason: staleness },
            ),
            Err(error) => {
                warn!(tag = %self.tag, error = %error, "build failed, runtime disabled");
                (
                    registry.with_runner(
                        self.tag.clone(),
                        RunnerSpec::Unavailable(error.to_string()),
                    ),
                    BuildOutcome::Failed {
                        reason: staleness,
                        error,
                    },
                )
            }
        }
    }

    /// Runner for the built binary. Commands are strings, so a binary path
    /// that is not valid UTF-8 cannot be registered.
    fn runner_spec(&self) -> RunnerSpec {
        match self.binary.to_str() {
            Some(path) => RunnerSpec::Available(vec![path.to_string()]),
            None => {
                warn!(binary = %self.binary.display(), "binary path is not valid UTF-8");
                RunnerSpec::Unavailable("binary path is not valid UTF-8".to_string())
            }
        }
    }

    /// Run the build command synchronously with captured output.
    fn build(&self) -> Result<(), BuildError> {
        let (program, args) = self.command.split_first().ok_or(BuildError::EmptyCommand)?;
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| BuildError::Spawn {
                command: self.command_line(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuildError::Failed {
                command: self.command_line(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !self.binary.is_file() {
            return Err(BuildError::MissingArtifact {
                path: self.binary.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn gate(root: &Path, command: &[&str]) -> BuildGate {
        let native = NativeConfig {
            tag: "rxt".to_string(),
            binary: PathBuf::from("out/rxt"),
            source_roots: vec![PathBuf::from("src"), PathBuf::from("absent")],
            source_extension: "zig".to_string(),
            build_command: command.iter().map(|s| s.to_string()).collect(),
        };
        BuildGate::from_config(&native, root)
    }

    fn touch(path: &Path, mtime: SystemTime) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = File::create(path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_binary_path_is_unavailable() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        use crate::registry::Lookup;

        let dir = tempfile::tempdir().unwrap();
        let native = NativeConfig {
            tag: "rxt".to_string(),
            binary: PathBuf::from(OsStr::from_bytes(b"rx\xfft")),
            source_roots: Vec::new(),
            source_extension: "zig".to_string(),
            build_command: vec!["true".to_string()],
        };
        let gate = BuildGate::from_config(&native, dir.path());
        File::create(gate.binary()).unwrap();

        let (registry, outcome) = gate.apply(RunnerRegistry::new(), gate.check(), false);
        assert!(matches!(outcome, BuildOutcome::UpToDate));
        assert!(matches!(
            registry.lookup(gate.tag()),
            Lookup::Disabled("binary path is not valid UTF-8")
        ));
    }

    #[test]
    fn test_missing_binary_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(gate(dir.path(), &["true"]).check(), Staleness::Missing);
    }

    #[test]
    fn test_newer_source_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        touch(&dir.path().join("out/rxt"), now - Duration::from_secs(60));
        touch(&dir.path().join("src/deep/main.zig"), now);

        assert_eq!(gate(dir.path(), &["true"]).check(), Staleness::SourcesChanged);
    }

    #[test]
    fn test_older_sources_and_other_extensions_are_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        touch(&dir.path().join("out/rxt"), now);
        touch(&dir.path().join("src/main.zig"), now - Duration::from_secs(60));
        touch(&dir.path().join("src/notes.md"), now + Duration::from_secs(60));

        assert_eq!(gate(dir.path(), &["true"]).check(), Staleness::Fresh);
    }

    #[test]
    fn test_equal_mtime_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        touch(&dir.path().join("out/rxt"), now);
        touch(&dir.path().join("src/main.zig"), now);

        assert_eq!(gate(dir.path(), &["true"]).check(), Staleness::Fresh);
    }

    #[test]
    fn test_fresh_binary_is_registered() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("out/rxt"), SystemTime::now());
        let gate = gate(dir.path(), &["false"]);

        let (registry, outcome) = gate.apply(RunnerRegistry::new(), gate.check(), false);
        assert!(matches!(outcome, BuildOutcome::UpToDate));
        assert_eq!(
            registry.get(gate.tag()),
            Some(&RunnerSpec::Available(vec![gate.binary().display().to_string()]))
        );
    }

    #[test]
    fn test_successful_build_registers_binary() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), &["sh", "-c", "mkdir -p out && touch out/rxt"]);

        let (registry, outcome) = gate.apply(RunnerRegistry::new(), gate.check(), false);
        assert!(matches!(
            outcome,
            BuildOutcome::Rebuilt {
                reason: Staleness::Missing
            }
        ));
        assert!(matches!(
            registry.get(gate.tag()),
            Some(RunnerSpec::Available(_))
        ));
    }

    #[test]
    fn test_failed_build_disables_only_native_tag() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), &["sh", "-c", "echo 'boom' >&2; exit 1"]);
        let before = RunnerRegistry::new()
            .with_runner(RuntimeTag::new("sh"), RunnerSpec::Available(vec!["bash".into()]));

        let (registry, outcome) = gate.apply(before, gate.check(), false);
        match outcome {
            BuildOutcome::Failed { error, .. } => assert_eq!(error.diagnostics(), Some("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(matches!(
            registry.get(gate.tag()),
            Some(RunnerSpec::Unavailable(_))
        ));
        assert_eq!(
            registry.get(&RuntimeTag::new("sh")),
            Some(&RunnerSpec::Available(vec!["bash".into()]))
        );
    }

    #[test]
    fn test_unlaunchable_build_command_disables_tag() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), &["runbench-no-such-compiler"]);

        let (registry, outcome) = gate.apply(RunnerRegistry::new(), gate.check(), false);
        assert!(matches!(
            outcome,
            BuildOutcome::Failed {
                error: BuildError::Spawn { .. },
                ..
            }
        ));
        assert!(matches!(
            registry.get(gate.tag()),
            Some(RunnerSpec::Unavailable(_))
        ));
    }

    #[test]
    fn test_build_without_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), &["true"]);

        let (_, outcome) = gate.apply(RunnerRegistry::new(), gate.check(), false);
        assert!(matches!(
            outcome,
            BuildOutcome::Failed {
                error: BuildError::MissingArtifact { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_skip_build_keeps_existing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        touch(&dir.path().join("out/rxt"), now - Duration::from_secs(60));
        touch(&dir.path().join("src/main.zig"), now);
        let gate = gate(dir.path(), &["false"]);

        let (registry, outcome) = gate.apply(RunnerRegistry::new(), gate.check(), true);
        assert!(matches!(
            outcome,
            BuildOutcome::Skipped {
                reason: Staleness::SourcesChanged
            }
        ));
        assert!(matches!(
            registry.get(gate.tag()),
            Some(RunnerSpec::Available(_))
        ));
    }

    #[test]
    fn test_skip_build_without_binary_disables_tag() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), &["false"]);

        let (registry, _) = gate.apply(RunnerRegistry::new(), gate.check(), true);
        assert!(matches!(
            registry.get(gate.tag()),
            Some(RunnerSpec::Unavailable(_))
        ));
    }
}
