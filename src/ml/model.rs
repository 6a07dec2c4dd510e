use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{
        activation::{log_softmax, relu},
        backend::AutodiffBackend,
        Distribution,
    },
};

use crate::data::batcher::MnistBatch;

/// Flattened size after conv2 + pooling: 20 channels × 4 × 4.
const FLAT_FEATURES: usize = 320;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct NetConfig {
    #[config(default = 10)]
    pub num_classes:  usize,
    #[config(default = 0.5)]
    pub conv_dropout: f64,
    #[config(default = 0.5)]
    pub dropout:      f64,
}

impl NetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Net<B> {
        Net {
            conv1:      Conv2dConfig::new([1, 10], [5, 5]).init(device),
            conv2:      Conv2dConfig::new([10, 20], [5, 5]).init(device),
            conv2_drop: ChannelDropout { prob: self.conv_dropout },
            pool:       MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1:        LinearConfig::new(FLAT_FEATURES, 50).init(device),
            fc2:        LinearConfig::new(50, self.num_classes).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Zeroes whole feature maps with probability `prob` and rescales the
/// survivors. Like Burn's `Dropout`, it is only active on autodiff backends.
#[derive(Module, Clone, Debug)]
pub struct ChannelDropout {
    pub prob: f64,
}

impl ChannelDropout {
    pub fn forward<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        if !B::ad_enabled() || self.prob == 0.0 {
            return input;
        }

        let [batch_size, channels, height, width] = input.dims();
        let keep = 1.0 - self.prob;
        let mask = Tensor::<B, 4>::random(
            [batch_size, channels, 1, 1],
            Distribution::Bernoulli(keep),
            &input.device(),
        )
        .expand([batch_size, channels, height, width]);

        (input * mask).div_scalar(keep)
    }
}

#[derive(Module, Debug)]
pub struct Net<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub conv2:      Conv2d<B>,
    pub conv2_drop: ChannelDropout,
    pub pool:       MaxPool2d,
    pub fc1:        Linear<B>,
    pub fc2:        Linear<B>,
    pub dropout:    Dropout,
}

impl<B: Backend> Net<B> {
    /// images: [batch, 1, 28, 28] → log-probabilities: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.pool.forward(self.conv1.forward(images)));
        let x = relu(self.pool.forward(self.conv2_drop.forward(self.conv2.forward(x))));

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = relu(self.fc1.forward(x));
        let x = self.dropout.forward(x);
        let x = self.fc2.forward(x);

        log_softmax(x, 1)
    }

    /// Mean NLL loss of a batch, plus the log-probabilities it came from.
    pub fn forward_loss(&self, batch: MnistBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>)
    where
        B: AutodiffBackend,
    {
        let output = self.forward(batch.images);
        let loss   = nll_loss(output.clone(), batch.targets);
        (loss, output)
    }

    /// L2 norm of every weight and bias, keyed `layer.param`.
    pub fn parameter_norms(&self) -> Vec<(String, f64)> {
        let mut norms = Vec::new();

        for (name, conv) in [("conv1", &self.conv1), ("conv2", &self.conv2)] {
            norms.push((format!("{name}.weight"), l2_norm(conv.weight.val())));
            if let Some(bias) = &conv.bias {
                norms.push((format!("{name}.bias"), l2_norm(bias.val())));
            }
        }
        for (name, linear) in [("fc1", &self.fc1), ("fc2", &self.fc2)] {
            norms.push((format!("{name}.weight"), l2_norm(linear.weight.val())));
            if let Some(bias) = &linear.bias {
                norms.push((format!("{name}.bias"), l2_norm(bias.val())));
            }
        }

        norms
    }
}

fn l2_norm<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> f64 {
    tensor.powf_scalar(2.0).sum().sqrt().into_scalar().elem::<f64>()
}

/// Mean negative log-likelihood of `targets` under row-wise log-probabilities.
///
/// Cross-entropy re-applies log-softmax, which leaves log-probabilities
/// unchanged, so on `Net::forward` output this is exactly the NLL loss.
pub fn nll_loss<B: Backend>(log_probs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    CrossEntropyLossConfig::new()
        .init(&log_probs.device())
        .forward(log_probs, targets)
}
