// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the remote archive to tensor batches:
//
//   MNIST.tar.gz (remote)
//       │
//       ▼
//   ArchiveFetcher    → downloads and unpacks the archive
//       │
//       ▼
//   idx               → locates and decodes the IDX files
//       │
//       ▼
//   MnistDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   MnistBatcher      → normalises and stacks tensor batches
//       │
//       ▼
//   DataLoader        → Burn's shuffling batch producer
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Downloads and extracts the dataset archive
pub mod download;

/// Reads MNIST's IDX image/label files
pub mod idx;

/// Implements Burn's Dataset trait for MNIST digits
pub mod dataset;

/// Implements Burn's Batcher trait with the fixed normalisation
pub mod batcher;
