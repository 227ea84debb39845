// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define the core
// concepts of the classifier pipeline.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Everything else in the crate speaks in these types: the data
// layer produces ImageTensors, the ml layer consumes them, the
// infra layer persists LabelSets and RunMetadata.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Error taxonomy shared by every core layer
pub mod error;

/// Ordered class names (the canonical label ordering)
pub mod labels;

/// Audit record written after each training run
pub mod metadata;

/// Result of classifying one image
pub mod prediction;

/// NHWC float tensor independent of any ML framework
pub mod tensor;

/// Classifier, trainer and artifact-source abstractions
pub mod traits;
