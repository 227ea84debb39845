// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one user-facing goal per use case.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing or printing here (that's Layer 1)
//   - No direct file formats (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Errors from the lower layers (PipelineError) are wrapped in
// anyhow::Error with context describing which step failed.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Ingest → split → train → persist
pub mod train_use_case;

// Single-image prediction from the command line
pub mod predict_use_case;

// Classification report + confusion matrix for a saved version
pub mod evaluate_use_case;

// Local-first artifact resolution
pub mod fetch_use_case;

// Predictor startup + HTTP server
pub mod serve_use_case;
