// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The preparer and the trainer only talk to the tracking service
// through `ExperimentTracker`. The shipped implementation is
// `infra::tracking::LocalTracker`, a directory-backed store; a
// hosted service client would implement the same trait.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf};

use crate::domain::artifact::{Artifact, ArtifactRef, ArtifactType, ArtifactVersion};
use crate::domain::media::ExampleImage;

// ─── LogEntry ─────────────────────────────────────────────────────────────────
/// Everything logged in one tracker step: scalars plus image panels.
#[derive(Debug, Clone, Default)]
pub struct LogEntry {
    pub scalars: BTreeMap<String, f64>,
    pub images:  BTreeMap<String, Vec<ExampleImage>>,
}

impl LogEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, key: impl Into<String>, value: f64) -> Self {
        self.scalars.insert(key.into(), value);
        self
    }

    pub fn images(mut self, key: impl Into<String>, images: Vec<ExampleImage>) -> Self {
        self.images.insert(key.into(), images);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.images.is_empty()
    }
}

// ─── RunStatus ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

// ─── ExperimentTracker ────────────────────────────────────────────────────────
/// One run against an experiment-tracking service.
///
/// Implementations:
///   - LocalTracker → runs and artifacts stored under a directory
pub trait ExperimentTracker {
    /// Identifier of the current run.
    fn run_id(&self) -> &str;

    /// Merge configuration values into the run's config.
    fn update_config(&mut self, config: &serde_json::Value) -> Result<()>;

    /// Record one step of metrics and media.
    fn log(&mut self, entry: LogEntry) -> Result<()>;

    /// Resolve an artifact reference to a local directory holding its files,
    /// downloading it only if it is not cached yet.
    fn use_artifact(&mut self, reference: &ArtifactRef, kind: ArtifactType) -> Result<PathBuf>;

    /// Publish an artifact. `latest` is always added to `aliases`.
    fn log_artifact(&mut self, artifact: &Artifact, aliases: &[&str]) -> Result<ArtifactVersion>;

    /// Close the run with its final status.
    fn finish(&mut self, status: RunStatus) -> Result<()>;
}
