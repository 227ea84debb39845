// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Handles everything that touches the filesystem or the
// network on behalf of the other layers:
//
//   artifact_store.rs - Versioned model artifacts
//                       <root>/<version>/{lung_cnn.bin,
//                       classes.json, metadata.json}, each
//                       written atomically (temp file + rename)
//
//   acquirer.rs       - Local-first resolution of the serving
//                       artifacts, fetching missing files from
//                       a model hub over HTTP
//
//   metrics.rs        - Per-epoch training history as CSV
//
//   reports.rs        - Classification report and confusion
//                       matrix written by `evaluate`
//
// Why is this a separate layer?
//   Training, evaluation and serving all read or write the
//   same artifacts. Keeping the layout in one place means the
//   naming contract cannot drift between them.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §12 (I/O and File Handling)

/// Versioned weights / classes / metadata on disk
pub mod artifact_store;

/// Ensure serving artifacts exist locally, fetching if needed
pub mod acquirer;

/// Training history CSV logger
pub mod metrics;

/// Evaluation report writers
pub mod reports;
