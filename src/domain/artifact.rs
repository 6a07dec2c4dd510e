// ============================================================
// Layer 3 — Artifact Domain Types
// ============================================================
// An artifact is an immutable, named, versioned bundle of files
// tracked by the experiment-tracking service.
//
//   Artifact        — what a run wants to publish (files + metadata)
//   ArtifactRef     — how a run asks for one: "entity/project/name:alias"
//   ArtifactVersion — what the store hands back after publishing
//
// Reference: Rust Book §5 (Structs), §6 (Enums)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

/// Alias every newly published version receives.
pub const LATEST_ALIAS: &str = "latest";

/// The kind of content an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Dataset,
    Model,
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactType::Dataset => f.write_str("dataset"),
            ArtifactType::Model   => f.write_str("model"),
        }
    }
}

/// One file inside an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// Path inside the artifact, always '/'-separated
    pub logical_path: String,
    /// Where the file currently lives on disk
    pub local_path: PathBuf,
}

/// An artifact being assembled by a run, before it is published.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name:     String,
    pub kind:     ArtifactType,
    pub entries:  Vec<ArtifactEntry>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, kind: ArtifactType) -> Self {
        Self {
            name:     name.into(),
            kind,
            entries:  Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Add a single file under `logical_path`.
    pub fn add_file(&mut self, local_path: impl Into<PathBuf>, logical_path: impl Into<String>) {
        self.entries.push(ArtifactEntry {
            logical_path: logical_path.into().replace('\\', "/"),
            local_path:   local_path.into(),
        });
    }

    /// Attach a metadata field, replacing any previous value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }
}

/// Reference to a stored artifact: `[entity/][project/]name[:alias]`.
///
/// A missing alias means `latest`. Versions are addressed with the
/// `vN` alias form, e.g. `mnist:v3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub entity:  Option<String>,
    pub project: Option<String>,
    pub name:    String,
    pub alias:   String,
}

impl ArtifactRef {
    /// Returns the version number if the alias has the `vN` form.
    pub fn version(&self) -> Option<u32> {
        self.alias.strip_prefix('v')?.parse().ok()
    }
}

impl FromStr for ArtifactRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (path, alias) = match s.rsplit_once(':') {
            Some((path, alias)) => (path, alias),
            None                => (s, LATEST_ALIAS),
        };
        if alias.is_empty() {
            bail!("Artifact reference '{s}' has an empty alias");
        }

        let parts: Vec<&str> = path.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            bail!("Artifact reference '{s}' has an empty path segment");
        }

        let (entity, project, name) = match parts.as_slice() {
            [name]                   => (None, None, *name),
            [project, name]          => (None, Some(*project), *name),
            [entity, project, name]  => (Some(*entity), Some(*project), *name),
            _ => bail!("Artifact reference '{s}' has too many path segments"),
        };

        Ok(Self {
            entity:  entity.map(str::to_string),
            project: project.map(str::to_string),
            name:    name.to_string(),
            alias:   alias.to_string(),
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(entity) = &self.entity {
            write!(f, "{entity}/")?;
        }
        if let Some(project) = &self.project {
            write!(f, "{project}/")?;
        }
        write!(f, "{}:{}", self.name, self.alias)
    }
}

/// A published artifact version as recorded by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub name:    String,
    pub kind:    ArtifactType,
    pub version: u32,
    pub digest:  String,
    pub aliases: Vec<String>,
}

impl ArtifactVersion {
    /// `name:vN`, the form runs record for lineage.
    pub fn qualified_name(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }
}
