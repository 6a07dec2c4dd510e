// ============================================================
// Layer 6 — Local Experiment Tracker
// ============================================================
// Directory-backed implementation of `ExperimentTracker`.
//
// Layout:
//   <root>/<entity>/<project>/
//     runs/<run-id>/run.json         status, timestamps, lineage
//     runs/<run-id>/config.json      merged run configuration
//     runs/<run-id>/history.jsonl    one JSON object per step
//     runs/<run-id>/summary.json     last value of every key
//     runs/<run-id>/media/images/    logged example images (PNG)
//     artifacts/<name>/aliases.json  alias → version number
//     artifacts/<name>/v<N>/manifest.json
//     artifacts/<name>/v<N>/files/…
//   <root>/cache/<entity>/<project>/<name>-v<N>/
//                                    downloaded artifact copies
//
// Artifact versions are content-addressed: publishing files whose
// digest equals the newest version only moves aliases.
//
// Reference: serde_json, sha2 and walkdir crate documentation

use anyhow::{bail, ensure, Context, Result};
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

use crate::data::download::sha256_hex;
use crate::domain::artifact::{
    Artifact, ArtifactEntry, ArtifactRef, ArtifactType, ArtifactVersion, LATEST_ALIAS,
};
use crate::domain::media::ExampleImage;
use crate::domain::traits::{ExperimentTracker, LogEntry, RunStatus};

const MANIFEST_FILE: &str = "manifest.json";
const ALIASES_FILE:  &str = "aliases.json";
const CACHE_MARKER:  &str = ".artifact-digest";

/// One file of a published artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path:   String,
    pub digest: String,
    pub size:   u64,
}

/// Everything recorded about a published artifact version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name:       String,
    pub kind:       ArtifactType,
    pub version:    u32,
    pub digest:     String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub metadata:   serde_json::Map<String, serde_json::Value>,
    pub entries:    Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunRecord {
    id:               String,
    entity:           String,
    project:          String,
    job_type:         String,
    status:           RunStatus,
    started_at:       DateTime<Utc>,
    finished_at:      Option<DateTime<Utc>>,
    used_artifacts:   Vec<String>,
    logged_artifacts: Vec<String>,
}

pub struct LocalTracker {
    root:    PathBuf,
    run_dir: PathBuf,
    record:  RunRecord,
    config:  serde_json::Map<String, serde_json::Value>,
    summary: serde_json::Map<String, serde_json::Value>,
    step:    u64,
}

impl LocalTracker {
    /// Start a new run under `<root>/<entity>/<project>/runs/`.
    pub fn init(root: impl Into<PathBuf>, entity: &str, project: &str, job_type: &str) -> Result<Self> {
        let root = root.into();
        let id   = new_run_id();
        let run_dir = root.join(entity).join(project).join("runs").join(&id);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;

        let record = RunRecord {
            id:               id.clone(),
            entity:           entity.to_string(),
            project:          project.to_string(),
            job_type:         job_type.to_string(),
            status:           RunStatus::Running,
            started_at:       Utc::now(),
            finished_at:      None,
            used_artifacts:   Vec::new(),
            logged_artifacts: Vec::new(),
        };

        let tracker = Self {
            root,
            run_dir,
            record,
            config:  serde_json::Map::new(),
            summary: serde_json::Map::new(),
            step:    0,
        };
        tracker.write_record()?;

        tracing::info!(
            "Tracking run '{}' ({}) in '{}'",
            id,
            job_type,
            tracker.run_dir.display()
        );
        Ok(tracker)
    }

    #[cfg(test)]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Artifact directory for `name`, in the reference's entity/project
    /// when it names one, otherwise in this run's.
    fn artifact_dir(&self, entity: Option<&str>, project: Option<&str>, name: &str) -> PathBuf {
        self.root
            .join(entity.unwrap_or(&self.record.entity))
            .join(project.unwrap_or(&self.record.project))
            .join("artifacts")
            .join(name)
    }

    fn write_record(&self) -> Result<()> {
        write_json(&self.run_dir.join("run.json"), &self.record)
    }

    fn save_image(&self, key: &str, index: usize, example: &ExampleImage) -> Result<String> {
        let media_dir = self.run_dir.join("media").join("images");
        fs::create_dir_all(&media_dir)?;

        let file_name = format!("{}_{}_{}.png", sanitize(key), self.step, index);
        let path      = media_dir.join(&file_name);

        image::GrayImage::from_raw(example.width, example.height, example.pixels.clone())
            .with_context(|| {
                format!("Image '{}' has {} bytes, expected {}x{}",
                    example.caption, example.pixels.len(), example.width, example.height)
            })?
            .save(&path)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        Ok(format!("media/images/{file_name}"))
    }
}

impl ExperimentTracker for LocalTracker {
    fn run_id(&self) -> &str {
        &self.record.id
    }

    fn update_config(&mut self, config: &serde_json::Value) -> Result<()> {
        let serde_json::Value::Object(values) = config else {
            bail!("Run config must be a JSON object, got {config}");
        };
        for (key, value) in values {
            self.config.insert(key.clone(), value.clone());
        }
        write_json(&self.run_dir.join("config.json"), &self.config)
    }

    fn log(&mut self, entry: LogEntry) -> Result<()> {
        if entry.is_empty() {
            return Ok(());
        }

        let mut row = serde_json::Map::new();
        row.insert("_step".into(), self.step.into());
        row.insert("_timestamp".into(), Utc::now().timestamp_millis().into());

        for (key, value) in &entry.scalars {
            row.insert(key.clone(), serde_json::json!(value));
        }

        for (key, images) in &entry.images {
            let mut filenames = Vec::with_capacity(images.len());
            for (i, image) in images.iter().enumerate() {
                filenames.push(self.save_image(key, i, image)?);
            }
            let captions: Vec<&str> = images.iter().map(|img| img.caption.as_str()).collect();
            row.insert(key.clone(), serde_json::json!({
                "_type":     "images",
                "count":     images.len(),
                "captions":  captions,
                "filenames": filenames,
            }));
        }

        let history = self.run_dir.join("history.jsonl");
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&history)
            .with_context(|| format!("Cannot open '{}'", history.display()))?;
        writeln!(f, "{}", serde_json::Value::Object(row.clone()))?;

        for (key, value) in row {
            self.summary.insert(key, value);
        }
        write_json(&self.run_dir.join("summary.json"), &self.summary)?;

        self.step += 1;
        Ok(())
    }

    fn use_artifact(&mut self, reference: &ArtifactRef, kind: ArtifactType) -> Result<PathBuf> {
        let dir = self.artifact_dir(
            reference.entity.as_deref(),
            reference.project.as_deref(),
            &reference.name,
        );
        ensure!(dir.is_dir(), "Artifact '{reference}' does not exist");

        let version = match reference.version() {
            Some(v) => v,
            None => *load_aliases(&dir)?
                .get(&reference.alias)
                .with_context(|| format!("Artifact '{reference}' has no alias '{}'", reference.alias))?,
        };

        let version_dir = dir.join(format!("v{version}"));
        let manifest: Manifest = read_json(&version_dir.join(MANIFEST_FILE))
            .with_context(|| format!("Artifact '{reference}' has no version v{version}"))?;
        ensure!(
            manifest.kind == kind,
            "Artifact '{reference}' is a {} artifact, expected {kind}",
            manifest.kind
        );

        let cache = self
            .root
            .join("cache")
            .join(reference.entity.as_deref().unwrap_or(&self.record.entity))
            .join(reference.project.as_deref().unwrap_or(&self.record.project))
            .join(format!("{}-v{}", manifest.name, version));
        let cached_digest = fs::read_to_string(cache.join(CACHE_MARKER)).ok();

        if cached_digest.as_deref() == Some(manifest.digest.as_str()) {
            tracing::debug!("Artifact '{}:v{}' already cached", manifest.name, version);
        } else {
            tracing::info!("Downloading artifact '{}:v{}' to '{}'", manifest.name, version, cache.display());
            if cache.exists() {
                fs::remove_dir_all(&cache)?;
            }
            fs::create_dir_all(&cache)
                .with_context(|| format!("Cannot create '{}'", cache.display()))?;
            let files = version_dir.join("files");
            for entry in &manifest.entries {
                copy_file(&files.join(&entry.path), &cache.join(&entry.path))?;
            }
            fs::write(cache.join(CACHE_MARKER), &manifest.digest)?;
        }

        self.record.used_artifacts.push(format!("{}:v{}", manifest.name, version));
        self.write_record()?;
        Ok(cache)
    }

    fn log_artifact(&mut self, artifact: &Artifact, aliases: &[&str]) -> Result<ArtifactVersion> {
        let dir = self.artifact_dir(None, None, &artifact.name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let entries = hash_entries(artifact)?;
        let digest  = artifact_digest(&entries);

        let newest = newest_version(&dir)?;
        let existing: Option<Manifest> = match newest {
            Some(v) => Some(read_json(&dir.join(format!("v{v}")).join(MANIFEST_FILE))?),
            None    => None,
        };

        let version = match existing {
            Some(m) if m.digest == digest => {
                ensure!(
                    m.kind == artifact.kind,
                    "Artifact '{}' already exists as a {} artifact",
                    artifact.name,
                    m.kind
                );
                tracing::info!("Artifact '{}' unchanged, reusing v{}", artifact.name, m.version);
                m.version
            }
            other => {
                if let Some(m) = &other {
                    ensure!(
                        m.kind == artifact.kind,
                        "Artifact '{}' already exists as a {} artifact",
                        artifact.name,
                        m.kind
                    );
                }
                let version     = newest.map_or(0, |v| v + 1);
                let version_dir = dir.join(format!("v{version}"));
                let files       = version_dir.join("files");

                for (entry, source) in entries.iter().zip(sorted_sources(artifact)) {
                    copy_file(&source, &files.join(&entry.path))?;
                }

                let manifest = Manifest {
                    name:       artifact.name.clone(),
                    kind:       artifact.kind,
                    version,
                    digest:     digest.clone(),
                    created_by: self.record.id.clone(),
                    created_at: Utc::now(),
                    metadata:   artifact.metadata.clone(),
                    entries,
                };
                write_json(&version_dir.join(MANIFEST_FILE), &manifest)?;
                tracing::info!(
                    "Published artifact '{}:v{}' ({} files)",
                    artifact.name,
                    version,
                    manifest.entries.len()
                );
                version
            }
        };

        let mut alias_map = load_aliases(&dir)?;
        for alias in aliases.iter().copied().chain([LATEST_ALIAS]) {
            alias_map.insert(alias.to_string(), version);
        }
        write_json(&dir.join(ALIASES_FILE), &alias_map)?;

        let published = ArtifactVersion {
            name:    artifact.name.clone(),
            kind:    artifact.kind,
            version,
            digest,
            aliases: alias_map
                .iter()
                .filter(|(_, v)| **v == version)
                .map(|(alias, _)| alias.clone())
                .collect(),
        };

        self.record.logged_artifacts.push(published.qualified_name());
        self.write_record()?;
        Ok(published)
    }

    fn finish(&mut self, status: RunStatus) -> Result<()> {
        self.record.status      = status;
        self.record.finished_at = Some(Utc::now());
        self.write_record()?;
        tracing::info!("Run '{}' finished with status {:?}", self.record.id, status);
        Ok(())
    }
}

/// Add every file below `dir` to `artifact`, with paths relative to `dir`.
pub fn add_dir(artifact: &mut Artifact, dir: &Path) -> Result<usize> {
    let mut added = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Cannot walk '{}'", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir)?;
        let logical  = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        artifact.add_file(entry.path(), logical);
        added += 1;
    }
    tracing::debug!("Added {} files from '{}' to '{}'", added, dir.display(), artifact.name);
    Ok(added)
}

/// Load the manifest of a published version.
#[cfg(test)]
pub(crate) fn read_manifest(root: &Path, entity: &str, project: &str, name: &str, version: u32) -> Result<Manifest> {
    read_json(
        &root.join(entity).join(project).join("artifacts").join(name)
            .join(format!("v{version}")).join(MANIFEST_FILE),
    )
}

fn new_run_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Entries sorted by logical path, each with its SHA-256 and size.
fn hash_entries(artifact: &Artifact) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::with_capacity(artifact.entries.len());
    for entry in sorted_entries(artifact) {
        let file = File::open(&entry.local_path)
            .with_context(|| format!("Cannot open '{}'", entry.local_path.display()))?;
        let size = file.metadata()?.len();
        entries.push(ManifestEntry {
            path:   entry.logical_path.clone(),
            digest: sha256_hex(file)?,
            size,
        });
    }

    for pair in entries.windows(2) {
        ensure!(
            pair[0].path != pair[1].path,
            "Artifact '{}' contains '{}' twice",
            artifact.name,
            pair[0].path
        );
    }
    Ok(entries)
}

fn sorted_entries(artifact: &Artifact) -> Vec<&ArtifactEntry> {
    let mut entries: Vec<_> = artifact.entries.iter().collect();
    entries.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));
    entries
}

fn sorted_sources(artifact: &Artifact) -> Vec<PathBuf> {
    sorted_entries(artifact)
        .into_iter()
        .map(|e| e.local_path.clone())
        .collect()
}

fn artifact_digest(entries: &[ManifestEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.path.as_bytes());
        hasher.update(b":");
        hasher.update(entry.digest.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Highest `v<N>` directory below an artifact directory.
fn newest_version(dir: &Path) -> Result<Option<u32>> {
    let mut newest = None;
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot read '{}'", dir.display()))? {
        let entry = entry?;
        let name  = entry.file_name();
        let Some(v) = name.to_str().and_then(|n| n.strip_prefix('v')).and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        if entry.path().join(MANIFEST_FILE).is_file() {
            newest = newest.max(Some(v));
        }
    }
    Ok(newest)
}

fn load_aliases(dir: &Path) -> Result<BTreeMap<String, u32>> {
    let path = dir.join(ALIASES_FILE);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    read_json(&path)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    fs::copy(from, to)
        .with_context(|| format!("Cannot copy '{}' to '{}'", from.display(), to.display()))?;
    Ok(())
}

/// Write JSON through a temporary file so readers never see half a file.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Cannot move '{}' into place", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Cannot parse '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn mnist_latest() -> ArtifactRef {
        "mnist".parse().unwrap()
    }

    fn tracker(root: &Path, job_type: &str) -> LocalTracker {
        LocalTracker::init(root, "gigl", "mnist_wandb", job_type).unwrap()
    }

    fn dataset_dir(root: &Path, contents: &str) -> PathBuf {
        let dir = root.join("dataset");
        fs::create_dir_all(dir.join("MNIST").join("raw")).unwrap();
        fs::write(dir.join("MNIST").join("raw").join("labels"), contents).unwrap();
        fs::write(dir.join("README"), "mnist").unwrap();
        dir
    }

    fn dataset_artifact(dir: &Path) -> Artifact {
        let mut a = Artifact::new("mnist", ArtifactType::Dataset);
        assert_eq!(add_dir(&mut a, dir).unwrap(), 2);
        a
    }

    #[test]
    fn test_publish_then_use_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = dataset_dir(tmp.path(), "v0 labels");

        let mut prep = tracker(&tmp.path().join("wandb"), "prepare_dataset");
        let published = prep.log_artifact(&dataset_artifact(&dir), &[]).unwrap();
        assert_eq!(published.version, 0);
        assert_eq!(published.aliases, vec!["latest".to_string()]);

        let mut train = tracker(&tmp.path().join("wandb"), "training");
        let reference: ArtifactRef = "gigl/mnist_wandb/mnist:latest".parse().unwrap();
        let local = train.use_artifact(&reference, ArtifactType::Dataset).unwrap();

        assert_eq!(fs::read_to_string(local.join("MNIST/raw/labels")).unwrap(), "v0 labels");
        assert_eq!(fs::read_to_string(local.join("README")).unwrap(), "mnist");
    }

    #[test]
    fn test_identical_content_does_not_create_a_new_version() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = dataset_dir(tmp.path(), "same");
        let root = tmp.path().join("wandb");

        let first  = tracker(&root, "prepare_dataset").log_artifact(&dataset_artifact(&dir), &[]).unwrap();
        let second = tracker(&root, "prepare_dataset").log_artifact(&dataset_artifact(&dir), &[]).unwrap();
        assert_eq!(first.version, 0);
        assert_eq!(second.version, 0);
        assert_eq!(first.digest, second.digest);

        fs::write(dir.join("README"), "changed").unwrap();
        let third = tracker(&root, "prepare_dataset").log_artifact(&dataset_artifact(&dir), &[]).unwrap();
        assert_eq!(third.version, 1);
        assert_ne!(third.digest, first.digest);
    }

    #[test]
    fn test_aliases_move_to_new_versions() {
        let tmp  = tempfile::tempdir().unwrap();
        let root = tmp.path().join("wandb");
        let ckpt = tmp.path().join("model.ckpt");
        let mut run = tracker(&root, "training");

        for (i, bytes) in ["epoch 1", "epoch 2"].iter().enumerate() {
            fs::write(&ckpt, bytes).unwrap();
            let mut a = Artifact::new("fully_connected_nn", ArtifactType::Model);
            a.add_file(&ckpt, "model.ckpt");
            a.set_metadata("test_loss", 0.5 / (i + 1) as f64);
            let v = run.log_artifact(&a, &["best"]).unwrap();
            assert_eq!(v.version, i as u32);
            assert_eq!(v.aliases, vec!["best".to_string(), "latest".to_string()]);
        }

        let v0 = read_manifest(&root, "gigl", "mnist_wandb", "fully_connected_nn", 0).unwrap();
        assert_eq!(v0.metadata["test_loss"], serde_json::json!(0.5));

        let best = run.use_artifact(&"fully_connected_nn:best".parse().unwrap(), ArtifactType::Model).unwrap();
        assert_eq!(fs::read_to_string(best.join("model.ckpt")).unwrap(), "epoch 2");

        let old = run.use_artifact(&"fully_connected_nn:v0".parse().unwrap(), ArtifactType::Model).unwrap();
        assert_eq!(fs::read_to_string(old.join("model.ckpt")).unwrap(), "epoch 1");
    }

    #[test]
    fn test_use_artifact_errors() {
        let tmp  = tempfile::tempdir().unwrap();
        let root = tmp.path().join("wandb");
        let dir  = dataset_dir(tmp.path(), "x");
        let mut run = tracker(&root, "training");

        assert!(run.use_artifact(&mnist_latest(), ArtifactType::Dataset).is_err());

        run.log_artifact(&dataset_artifact(&dir), &[]).unwrap();
        assert!(run.use_artifact(&"mnist:best".parse().unwrap(), ArtifactType::Dataset).is_err());
        assert!(run.use_artifact(&"mnist:v7".parse().unwrap(), ArtifactType::Dataset).is_err());
        assert!(run.use_artifact(&mnist_latest(), ArtifactType::Model).is_err());
    }

    #[test]
    fn test_cached_download_is_reused() {
        let tmp  = tempfile::tempdir().unwrap();
        let root = tmp.path().join("wandb");
        let dir  = dataset_dir(tmp.path(), "x");
        let mut run = tracker(&root, "training");
        run.log_artifact(&dataset_artifact(&dir), &[]).unwrap();

        let first = run.use_artifact(&mnist_latest(), ArtifactType::Dataset).unwrap();
        fs::write(first.join("scratch"), "kept").unwrap();
        let second = run.use_artifact(&mnist_latest(), ArtifactType::Dataset).unwrap();

        assert_eq!(first, second);
        assert!(second.join("scratch").exists());
    }

    #[test]
    fn test_cache_is_separate_per_project() {
        let tmp  = tempfile::tempdir().unwrap();
        let root = tmp.path().join("wandb");

        let first_dir = dataset_dir(&tmp.path().join("a"), "first");
        let mut first = LocalTracker::init(&root, "gigl", "mnist_wandb", "prepare_dataset").unwrap();
        first.log_artifact(&dataset_artifact(&first_dir), &[]).unwrap();

        let other_dir = dataset_dir(&tmp.path().join("b"), "other");
        let mut other = LocalTracker::init(&root, "gigl", "other_project", "prepare_dataset").unwrap();
        other.log_artifact(&dataset_artifact(&other_dir), &[]).unwrap();

        // Both projects hold mnist:v0 with different content
        let mut run = tracker(&root, "training");
        let mine:   ArtifactRef = "gigl/mnist_wandb/mnist:v0".parse().unwrap();
        let theirs: ArtifactRef = "gigl/other_project/mnist:v0".parse().unwrap();

        let mine_path   = run.use_artifact(&mine, ArtifactType::Dataset).unwrap();
        let theirs_path = run.use_artifact(&theirs, ArtifactType::Dataset).unwrap();
        assert_ne!(mine_path, theirs_path);

        fs::write(mine_path.join("scratch"), "kept").unwrap();
        let again = run.use_artifact(&mine, ArtifactType::Dataset).unwrap();
        assert!(again.join("scratch").exists());

        let labels = |p: &Path| fs::read_to_string(p.join("MNIST/raw/labels")).unwrap();
        assert_eq!(labels(&again), "first");
        assert_eq!(labels(&theirs_path), "other");
    }

    #[test]
    fn test_duplicate_logical_paths_are_rejected() {
        let tmp  = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f");
        fs::write(&file, "x").unwrap();

        let mut a = Artifact::new("dup", ArtifactType::Model);
        a.add_file(&file, "same");
        a.add_file(&file, "same");
        assert!(tracker(&tmp.path().join("wandb"), "training").log_artifact(&a, &[]).is_err());
    }

    #[test]
    fn test_log_writes_history_summary_and_images() {
        let tmp = tempfile::tempdir().unwrap();
        let mut run = tracker(tmp.path(), "training");
        run.update_config(&serde_json::json!({ "lr": 0.01, "epochs": 5 })).unwrap();

        let image = ExampleImage::new(2, 2, vec![0, 64, 128, 255], "Pred: 1 Truth: 1");
        run.log(LogEntry::new()
            .scalar("Test Loss", 0.25)
            .images("Examples", vec![image]))
            .unwrap();
        run.log(LogEntry::new().scalar("Test Loss", 0.125)).unwrap();
        run.finish(RunStatus::Finished).unwrap();

        let history = fs::read_to_string(run.run_dir().join("history.jsonl")).unwrap();
        let rows: Vec<serde_json::Value> = history.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["_step"], 0);
        assert_eq!(rows[0]["Examples"]["captions"][0], "Pred: 1 Truth: 1");
        assert!(run.run_dir().join("media/images/Examples_0_0.png").is_file());

        let summary: serde_json::Value = read_json(&run.run_dir().join("summary.json")).unwrap();
        assert_eq!(summary["Test Loss"], 0.125);

        let config: serde_json::Value = read_json(&run.run_dir().join("config.json")).unwrap();
        assert_eq!(config["epochs"], 5);

        let record: RunRecord = read_json(&run.run_dir().join("run.json")).unwrap();
        assert_eq!(record.status, RunStatus::Finished);
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn test_update_config_rejects_non_objects() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(tracker(tmp.path(), "training").update_config(&serde_json::json!(3)).is_err());
    }
}
