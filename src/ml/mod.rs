// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The model, the training loop and backend selection.
//
// What's in this layer:
//
//   model.rs   — The digit classifier
//                • two 5x5 convolutions with max pooling
//                • channel dropout after conv2
//                • two fully connected layers
//                • log-softmax output, NLL loss
//
//   trainer.rs — The training loop
//                Handles forward pass, loss computation,
//                backward pass, optimiser step, evaluation,
//                best-checkpoint saving and model publication
//
//   device.rs  — CPU / GPU selection
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            LeCun et al. (1998) Gradient-Based Learning

/// CNN architecture and NLL loss
pub mod model;

/// Full training loop with evaluation and checkpointing
pub mod trainer;

/// Compute device selection
pub mod device;
