// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// One-shot dataset preparation:
//
//   Step 1: Create the dataset directory           (Layer 4 - data)
//   Step 2: Download MNIST.tar.gz                  (Layer 4 - data)
//   Step 3: Extract it in place                    (Layer 4 - data)
//   Step 4: Publish the directory as `mnist`       (Layer 6 - infra)
//
// Steps 2 and 3 are skipped when the IDX files are already
// present, unless `force` is set. Publishing identical content
// again returns the existing version.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::{DATASET_ARTIFACT, DATASET_URL, DEFAULT_ENTITY, DEFAULT_PROJECT};
use crate::data::{download::{extract_tar_gz, ArchiveFetcher}, idx};
use crate::domain::{
    artifact::{Artifact, ArtifactType, ArtifactVersion},
    traits::{ExperimentTracker, RunStatus},
};
use crate::infra::tracking::{add_dir, LocalTracker};

const ARCHIVE_NAME: &str = "MNIST.tar.gz";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub dataset_dir:  String,
    pub tracking_dir: String,
    pub entity:       String,
    pub project:      String,
    pub url:          String,
    pub force:        bool,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            dataset_dir:  "dataset".to_string(),
            tracking_dir: "wandb".to_string(),
            entity:       DEFAULT_ENTITY.to_string(),
            project:      DEFAULT_PROJECT.to_string(),
            url:          DATASET_URL.to_string(),
            force:        false,
        }
    }
}

pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ArtifactVersion> {
        let cfg = &self.config;
        let mut tracker = LocalTracker::init(&cfg.tracking_dir, &cfg.entity, &cfg.project, "prepare_dataset")?;

        match self.prepare(&mut tracker) {
            Ok(version) => {
                tracker.finish(RunStatus::Finished)?;
                Ok(version)
            }
            Err(e) => {
                if let Err(finish_err) = tracker.finish(RunStatus::Failed) {
                    tracing::warn!("Cannot mark run as failed: {finish_err:#}");
                }
                Err(e)
            }
        }
    }

    fn prepare(&self, tracker: &mut dyn ExperimentTracker) -> Result<ArtifactVersion> {
        let cfg         = &self.config;
        let dataset_dir = PathBuf::from(&cfg.dataset_dir);

        // ── Step 1: Dataset directory ────────────────────────────────────────
        fs::create_dir_all(&dataset_dir)
            .with_context(|| format!("Cannot create '{}'", dataset_dir.display()))?;

        // ── Steps 2-3: Download and extract ──────────────────────────────────
        if idx::is_complete(&dataset_dir) && !cfg.force {
            tracing::info!(
                "MNIST already extracted in '{}', skipping download (use --force to refetch)",
                dataset_dir.display()
            );
        } else {
            let archive = dataset_dir.join(ARCHIVE_NAME);
            ArchiveFetcher::new()?.fetch(&cfg.url, &archive)?;
            extract_tar_gz(&archive, &dataset_dir)?;
        }

        // ── Step 4: Publish ──────────────────────────────────────────────────
        let mut artifact = Artifact::new(DATASET_ARTIFACT, ArtifactType::Dataset);
        let files = add_dir(&mut artifact, &dataset_dir)?;
        tracing::info!("Publishing {} files from '{}'", files, dataset_dir.display());

        let version = tracker.log_artifact(&artifact, &[])?;
        println!("Published dataset artifact {}", version.qualified_name());
        Ok(version)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::idx::{encode_images, encode_labels};

    fn extracted_dataset(dir: &std::path::Path) {
        let raw = dir.join("MNIST").join("raw");
        fs::create_dir_all(&raw).unwrap();
        fs::write(raw.join("train-images-idx3-ubyte"), encode_images(2, 28, 28, &[0; 2 * 784])).unwrap();
        fs::write(raw.join("train-labels-idx1-ubyte"), encode_labels(&[3, 4])).unwrap();
        fs::write(raw.join("t10k-images-idx3-ubyte"), encode_images(1, 28, 28, &[9; 784])).unwrap();
        fs::write(raw.join("t10k-labels-idx1-ubyte"), encode_labels(&[7])).unwrap();
    }

    fn config(root: &std::path::Path) -> PrepareConfig {
        PrepareConfig {
            dataset_dir:  root.join("dataset").to_string_lossy().into_owned(),
            tracking_dir: root.join("wandb").to_string_lossy().into_owned(),
            // Unreachable: the download must be skipped
            url:          "http://127.0.0.1:9/MNIST.tar.gz".to_string(),
            ..PrepareConfig::default()
        }
    }

    #[test]
    fn test_existing_dataset_is_published_without_download() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        extracted_dataset(&PathBuf::from(&cfg.dataset_dir));

        let version = PrepareUseCase::new(cfg).execute().unwrap();
        assert_eq!(version.name, DATASET_ARTIFACT);
        assert_eq!(version.version, 0);
        assert!(version.aliases.iter().any(|a| a == "latest"));
    }

    #[test]
    fn test_preparing_twice_reuses_the_version() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        extracted_dataset(&PathBuf::from(&cfg.dataset_dir));

        let first  = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        let second = PrepareUseCase::new(cfg).execute().unwrap();
        assert_eq!(first.version, second.version);
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn test_force_downloads_even_when_extracted() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = PrepareConfig { force: true, ..config(tmp.path()) };
        extracted_dataset(&PathBuf::from(&cfg.dataset_dir));

        // The unreachable URL is only hit on the download path
        assert!(PrepareUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_download_failure_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        assert!(PrepareUseCase::new(cfg).execute().is_err());
    }
}
