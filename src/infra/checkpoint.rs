// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Keeps exactly one checkpoint on disk: the best epoch so far.
//
// What gets saved:
//   epoch, test loss, test accuracy,
//   model weights    (Burn BinBytesRecorder, full precision)
//   optimizer state  (Burn BinBytesRecorder, full precision)
//
// The envelope is MessagePack, gzip-compressed, the same
// encoding Burn's CompactRecorder uses for model files.
//
// File layout:
//   checkpoints/
//     model.ckpt     ← overwritten on every improvement
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, Context, Result};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::AutodiffBackend,
};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
};

use crate::ml::model::Net;

pub const CHECKPOINT_FILE: &str = "model.ckpt";

type BytesRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Snapshot of one epoch, sufficient to resume training or deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch:     usize,
    pub test_loss: f64,
    pub accuracy:  f64,
    model:         Vec<u8>,
    optimizer:     Vec<u8>,
}

impl Checkpoint {
    /// Encode the current model and optimizer state.
    pub fn capture<B, O>(
        epoch:     usize,
        test_loss: f64,
        accuracy:  f64,
        model:     &Net<B>,
        optim:     &O,
    ) -> Result<Self>
    where
        B: AutodiffBackend,
        O: Optimizer<Net<B>, B>,
        Net<B>: AutodiffModule<B>,
    {
        let recorder = BytesRecorder::default();

        let model_bytes = <BytesRecorder as Recorder<B>>::record(&recorder, model.clone().into_record(), ())
            .map_err(|e| anyhow!("Cannot encode model weights: {e:?}"))?;
        let optim_bytes = <BytesRecorder as Recorder<B>>::record(&recorder, optim.to_record(), ())
            .map_err(|e| anyhow!("Cannot encode optimizer state: {e:?}"))?;

        Ok(Self {
            epoch,
            test_loss,
            accuracy,
            model:     model_bytes,
            optimizer: optim_bytes,
        })
    }

    /// Load the stored weights into `model` (any backend).
    pub fn restore_model<B: Backend>(&self, model: Net<B>, device: &B::Device) -> Result<Net<B>> {
        let record = <BytesRecorder as Recorder<B>>::load(&BytesRecorder::default(), self.model.clone(), device)
            .map_err(|e| anyhow!("Cannot decode model weights from epoch {}: {e:?}", self.epoch))?;
        Ok(model.load_record(record))
    }

    /// Load the stored optimizer state into `optim`.
    pub fn restore_optimizer<B, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<Net<B>, B>,
        Net<B>: AutodiffModule<B>,
    {
        let record = <BytesRecorder as Recorder<B>>::load(&BytesRecorder::default(), self.optimizer.clone(), device)
            .map_err(|e| anyhow!("Cannot decode optimizer state from epoch {}: {e:?}", self.epoch))?;
        Ok(optim.load_record(record))
    }
}

/// Saves and restores the single best checkpoint in a directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Overwrite the checkpoint file. The rename of the temporary file is
    /// the commit point.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf> {
        let path = self.path();
        let tmp  = path.with_extension("ckpt.tmp");

        {
            let file = File::create(&tmp)
                .with_context(|| format!("Cannot create '{}'", tmp.display()))?;
            let mut gz = GzEncoder::new(BufWriter::new(file), Compression::default());
            rmp_serde::encode::write_named(&mut gz, checkpoint)
                .with_context(|| format!("Cannot encode checkpoint '{}'", tmp.display()))?;
            gz.finish()
                .and_then(|mut writer| writer.flush())
                .with_context(|| format!("Cannot finish '{}'", tmp.display()))?;
        }

        fs::rename(&tmp, &path)
            .with_context(|| format!("Cannot move checkpoint into '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {} to '{}'", checkpoint.epoch, path.display());
        Ok(path)
    }

    /// Read the checkpoint file back.
    pub fn load(&self) -> Result<Checkpoint> {
        let path = self.path();
        let file = File::open(&path)
            .with_context(|| {
                format!("Cannot open checkpoint '{}'. Have you run 'train' first?", path.display())
            })?;

        rmp_serde::from_read(GzDecoder::new(BufReader::new(file)))
            .with_context(|| format!("Cannot decode checkpoint '{}'", path.display()))
    }
}
