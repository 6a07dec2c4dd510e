use anyhow::{bail, ensure, Result};
use burn::data::dataset::Dataset;
use std::path::Path;

use crate::data::idx::{self, Split};

pub const WIDTH:  usize = 28;
pub const HEIGHT: usize = 28;

/// Digits 0 to 9.
pub const NUM_CLASSES: usize = 10;

/// One raw MNIST digit: grey levels 0..=255 plus its class label.
#[derive(Debug, Clone)]
pub struct MnistItem {
    pub image: [[u8; WIDTH]; HEIGHT],
    pub label: u8,
}

#[derive(Debug)]
pub struct MnistDataset {
    pixels: Vec<u8>,
    labels: Vec<u8>,
}

impl MnistDataset {
    /// Read one split from an extracted MNIST directory.
    pub fn load(root: &Path, split: Split) -> Result<Self> {
        let (images_path, labels_path) = idx::locate(root, split)?;
        tracing::debug!(
            "Reading {:?} split from '{}' and '{}'",
            split,
            images_path.display(),
            labels_path.display()
        );

        let images = idx::parse_images(&idx::read_maybe_gz(&images_path)?)?;
        ensure!(
            images.rows == HEIGHT && images.cols == WIDTH,
            "Expected {HEIGHT}x{WIDTH} images in '{}', found {}x{}",
            images_path.display(),
            images.rows,
            images.cols
        );
        let labels = idx::parse_labels(&idx::read_maybe_gz(&labels_path)?)?;
        ensure!(
            images.count == labels.len(),
            "'{}' holds {} images but '{}' holds {} labels",
            images_path.display(),
            images.count,
            labels_path.display(),
            labels.len()
        );

        Self::from_raw(images.pixels, labels)
    }

    /// Build a dataset from flat pixel bytes (`len * 28 * 28`) and labels.
    pub fn from_raw(pixels: Vec<u8>, labels: Vec<u8>) -> Result<Self> {
        ensure!(
            pixels.len() == labels.len() * WIDTH * HEIGHT,
            "{} pixel bytes do not match {} labels of {HEIGHT}x{WIDTH} images",
            pixels.len(),
            labels.len()
        );
        if let Some((index, label)) = labels.iter().enumerate().find(|(_, &l)| l as usize >= NUM_CLASSES) {
            bail!("Label {label} at index {index} is not a digit class (0..{NUM_CLASSES})");
        }
        Ok(Self { pixels, labels })
    }

    pub fn sample_count(&self) -> usize { self.labels.len() }
}

impl Dataset<MnistItem> for MnistDataset {
    fn get(&self, index: usize) -> Option<MnistItem> {
        let label  = *self.labels.get(index)?;
        let offset = index * WIDTH * HEIGHT;

        let mut image = [[0u8; WIDTH]; HEIGHT];
        for (row, chunk) in image
            .iter_mut()
            .zip(self.pixels[offset..offset + WIDTH * HEIGHT].chunks_exact(WIDTH))
        {
            row.copy_from_slice(chunk);
        }

        Some(MnistItem { image, label })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

// ─── Test Fixtures ────────────────────────────────────────────────────────────
/// Small synthetic digits: class `k` lights up column band `k`,
/// so a few epochs are enough for the CNN to separate them.
#[cfg(test)]
pub(crate) fn synthetic(count: usize) -> (Vec<u8>, Vec<u8>) {
    let mut pixels = Vec::with_capacity(count * WIDTH * HEIGHT);
    let mut labels = Vec::with_capacity(count);

    for i in 0..count {
        let label = (i % 10) as u8;
        let band  = 2 + label as usize * 2;
        for _row in 0..HEIGHT {
            for col in 0..WIDTH {
                let lit = col == band || col == band + 1;
                pixels.push(if lit { 255 } else { (i % 7) as u8 });
            }
        }
        labels.push(label);
    }

    (pixels, labels)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::idx::{encode_images, encode_labels};

    #[test]
    fn test_get_returns_rows_in_order() {
        let (pixels, labels) = synthetic(3);
        let ds   = MnistDataset::from_raw(pixels.clone(), labels).unwrap();
        let item = ds.get(1).unwrap();

        assert_eq!(item.label, 1);
        assert_eq!(item.image[0].to_vec(), pixels[WIDTH * HEIGHT..WIDTH * HEIGHT + WIDTH].to_vec());
        assert!(ds.get(3).is_none());
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_from_raw_rejects_mismatched_lengths() {
        assert!(MnistDataset::from_raw(vec![0; WIDTH * HEIGHT], vec![1, 2]).is_err());
    }

    #[test]
    fn test_from_raw_rejects_out_of_range_labels() {
        let err = MnistDataset::from_raw(vec![0; 2 * WIDTH * HEIGHT], vec![3, 200]).unwrap_err();
        assert!(err.to_string().contains("Label 200 at index 1"));
        assert!(MnistDataset::from_raw(vec![0; WIDTH * HEIGHT], vec![10]).is_err());
        assert!(MnistDataset::from_raw(vec![0; WIDTH * HEIGHT], vec![9]).is_ok());
    }

    #[test]
    fn test_load_rejects_out_of_range_labels() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("t10k-images-idx3-ubyte"),
            encode_images(2, HEIGHT, WIDTH, &[0; 2 * WIDTH * HEIGHT]),
        ).unwrap();
        std::fs::write(tmp.path().join("t10k-labels-idx1-ubyte"), encode_labels(&[3, 200])).unwrap();

        assert!(MnistDataset::load(tmp.path(), Split::Test).is_err());
    }

    #[test]
    fn test_load_rejects_image_label_count_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("t10k-images-idx3-ubyte"),
            encode_images(2, HEIGHT, WIDTH, &[0; 2 * WIDTH * HEIGHT]),
        ).unwrap();
        std::fs::write(tmp.path().join("t10k-labels-idx1-ubyte"), encode_labels(&[3])).unwrap();

        assert!(MnistDataset::load(tmp.path(), Split::Test).is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let (pixels, labels) = synthetic(4);
        std::fs::write(
            tmp.path().join("train-images-idx3-ubyte"),
            encode_images(4, HEIGHT, WIDTH, &pixels),
        ).unwrap();
        std::fs::write(tmp.path().join("train-labels-idx1-ubyte"), encode_labels(&labels)).unwrap();

        let ds = MnistDataset::load(tmp.path(), Split::Train).unwrap();
        assert_eq!(ds.sample_count(), 4);
        assert_eq!(ds.get(3).unwrap().label, 3);
    }

    #[test]
    fn test_load_rejects_wrong_image_size() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("t10k-images-idx3-ubyte"), encode_images(1, 2, 2, &[0; 4])).unwrap();
        std::fs::write(tmp.path().join("t10k-labels-idx1-ubyte"), encode_labels(&[0])).unwrap();
        assert!(MnistDataset::load(tmp.path(), Split::Test).is_err());
    }
}
