// ============================================================
// Layer 4 — IDX File Reader
// ============================================================
// MNIST ships as four IDX files. Each starts with a big-endian
// header:
//
//   images: magic 0x00000803, count, rows, cols, then pixels
//   labels: magic 0x00000801, count, then one byte per label
//
// Files may be stored plain or gzip-compressed (".gz").
//
// Reference: flate2 crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, ensure, Context, Result};
use flate2::read::GzDecoder;
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

pub const IMAGES_MAGIC: u32 = 0x0000_0803;
pub const LABELS_MAGIC: u32 = 0x0000_0801;

/// Decoded image block of an IDX3 file.
#[derive(Debug, Clone)]
pub struct IdxImages {
    pub count:  usize,
    pub rows:   usize,
    pub cols:   usize,
    /// `count * rows * cols` grey levels, image after image
    pub pixels: Vec<u8>,
}

/// Which half of MNIST to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn file_stems(self) -> (&'static str, &'static str) {
        match self {
            Split::Train => ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
            Split::Test  => ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
        }
    }
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32> {
    let chunk = bytes
        .get(offset..offset + 4)
        .with_context(|| format!("IDX header truncated at byte {offset}"))?;
    Ok(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Parse an IDX3 image file held in memory.
pub fn parse_images(bytes: &[u8]) -> Result<IdxImages> {
    let magic = read_u32_be(bytes, 0)?;
    ensure!(
        magic == IMAGES_MAGIC,
        "Not an IDX image file: magic {magic:#010x}, expected {IMAGES_MAGIC:#010x}"
    );

    let count = read_u32_be(bytes, 4)? as usize;
    let rows  = read_u32_be(bytes, 8)? as usize;
    let cols  = read_u32_be(bytes, 12)? as usize;

    let body     = &bytes[16..];
    let Some(expected) = count.checked_mul(rows).and_then(|n| n.checked_mul(cols)) else {
        bail!("IDX image header declares {count}x{rows}x{cols} pixels, which overflows");
    };
    if body.len() != expected {
        bail!(
            "IDX image file holds {} pixel bytes, header declares {count}x{rows}x{cols} = {expected}",
            body.len()
        );
    }

    Ok(IdxImages { count, rows, cols, pixels: body.to_vec() })
}

/// Parse an IDX1 label file held in memory.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let magic = read_u32_be(bytes, 0)?;
    ensure!(
        magic == LABELS_MAGIC,
        "Not an IDX label file: magic {magic:#010x}, expected {LABELS_MAGIC:#010x}"
    );

    let count = read_u32_be(bytes, 4)? as usize;
    let body  = &bytes[8..];
    ensure!(
        body.len() == count,
        "IDX label file holds {} labels, header declares {count}",
        body.len()
    );

    Ok(body.to_vec())
}

/// Read a file, transparently un-gzipping it when it ends in ".gz".
pub fn read_maybe_gz(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut bytes = Vec::new();
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        GzDecoder::new(file)
            .read_to_end(&mut bytes)
            .with_context(|| format!("Cannot decompress '{}'", path.display()))?;
    } else {
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
    }
    Ok(bytes)
}

/// Find the (images, labels) files for `split` somewhere under `root`.
///
/// Looked up in `MNIST/raw/`, `raw/` and `root` itself, plain first,
/// then gzip-compressed.
pub fn locate(root: &Path, split: Split) -> Result<(PathBuf, PathBuf)> {
    let (images, labels) = split.file_stems();
    Ok((find_one(root, images)?, find_one(root, labels)?))
}

fn find_one(root: &Path, stem: &str) -> Result<PathBuf> {
    let dirs = [root.join("MNIST").join("raw"), root.join("raw"), root.to_path_buf()];

    for dir in &dirs {
        for name in [stem.to_string(), format!("{stem}.gz")] {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    bail!("Cannot find '{stem}' under '{}'", root.display())
}

/// True when both splits can be located under `root`.
pub fn is_complete(root: &Path) -> bool {
    locate(root, Split::Train).is_ok() && locate(root, Split::Test).is_ok()
}

// ─── Test Fixtures ────────────────────────────────────────────────────────────
/// Encode images/labels back into IDX bytes. Used to build fixtures.
#[cfg(test)]
pub(crate) fn encode_images(count: usize, rows: usize, cols: usize, pixels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + pixels.len());
    out.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
    for dim in [count, rows, cols] {
        out.extend_from_slice(&(dim as u32).to_be_bytes());
    }
    out.extend_from_slice(pixels);
    out
}

#[cfg(test)]
pub(crate) fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + labels.len());
    out.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}
