// ============================================================
// Layer 4 — MNIST Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<MnistItem>
// into model-ready tensors. This is where the fixed transform
// is applied:
//
//   pixel ∈ [0, 255]  →  x = (pixel / 255 − 0.1307) / 0.3081
//
// Input:  Vec of N MnistItems, each 28×28 grey levels
// Output: MnistBatch with images [N, 1, 28, 28] and targets [N]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{MnistItem, HEIGHT, WIDTH};

/// Mean of MNIST training pixels after scaling to [0, 1].
pub const MNIST_MEAN: f32 = 0.1307;
/// Standard deviation of MNIST training pixels after scaling to [0, 1].
pub const MNIST_STD: f32 = 0.3081;

/// Scale one grey level to [0, 1] and standardise it.
pub fn normalize_pixel(pixel: u8) -> f32 {
    (pixel as f32 / 255.0 - MNIST_MEAN) / MNIST_STD
}

/// Inverse of `normalize_pixel`, clamped back into a grey level.
pub fn denormalize_pixel(value: f32) -> u8 {
    ((value * MNIST_STD + MNIST_MEAN) * 255.0).round().clamp(0.0, 255.0) as u8
}

// ─── MnistBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct MnistBatch<B: Backend> {
    /// Normalised images, shape [batch_size, 1, 28, 28]
    pub images: Tensor<B, 4>,

    /// Class labels, shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── MnistBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct MnistBatcher<B: Backend> {
    /// The device to create tensors on
    pub device: B::Device,
}

impl<B: Backend> MnistBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<MnistItem, MnistBatch<B>> for MnistBatcher<B> {
    fn batch(&self, items: Vec<MnistItem>) -> MnistBatch<B> {
        let batch_size = items.len();

        // ── Flatten + normalise pixels ────────────────────────────────────────
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().flatten().map(|&p| normalize_pixel(p)))
            .collect();

        let targets: Vec<i64> = items
            .iter()
            .map(|item| item.label as i64)
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, 1, HEIGHT, WIDTH]);

        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        MnistBatch { images, targets }
    }
}
