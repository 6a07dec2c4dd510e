use serde::{Deserialize, Serialize};

/// A single-channel 8-bit image logged next to the test metrics,
/// e.g. one digit per test batch with its predicted and true label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleImage {
    pub width:   u32,
    pub height:  u32,
    /// Row-major grey levels, `width * height` bytes
    pub pixels:  Vec<u8>,
    pub caption: String,
}

impl ExampleImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, caption: impl Into<String>) -> Self {
        Self { width, height, pixels, caption: caption.into() }
    }

    /// Caption format used for digit predictions.
    pub fn prediction_caption(predicted: i64, truth: i64) -> String {
        format!("Pred: {predicted} Truth: {truth}")
    }
}
