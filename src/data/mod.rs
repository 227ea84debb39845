// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from the raw dataset archive to tensor batches.
//
//   dataset.zip
//       │
//       ▼
//   archive           → idempotent zip extraction
//       │
//       ▼
//   DatasetIngestor   → per-class file listing + decode
//       │                 (through ImageCodec)
//       ▼
//   LabeledDataset    → X: u8 images, y: one-hot rows
//       │
//       ▼
//   splitter          → seeded train / validation split
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → rescales and stacks into tensors
//
// ImageCodec is also used on its own by the inference path;
// it is the one preprocessing routine both sides share.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Idempotent extraction of the dataset zip archive
pub mod archive;

/// Canonical decode / resize / rescale shared with serving
pub mod codec;

/// Lists class directories and decodes images into a LabeledDataset
pub mod ingestor;

/// LabeledDataset and the Burn Dataset implementation
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
