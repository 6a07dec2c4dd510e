// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the use cases and the trainer:
//
//   checkpoint.rs — the single best checkpoint on disk
//                   (Burn records inside a MessagePack envelope)
//
//   metrics.rs    — epoch metrics CSV and best-accuracy tracking
//
//   tracking.rs   — directory-backed experiment tracker:
//                   runs, logged metrics/media, and versioned
//                   dataset/model artifacts
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Best-checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger and best-accuracy fold
pub mod metrics;

/// Local experiment tracker and artifact store
pub mod tracking;
