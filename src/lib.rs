//! Harmonic Pipeline: event-timing signal classification
//!
//! Turns a stream of event timestamps into a group id plus a renderable
//! 2-D field, and keeps an ordered log of every outcome.
//!
//! ## Architecture
//!
//! - **Decoder**: interval spectrum via FFT, cosine-matched against reference fingerprints
//! - **Reconstruction**: spectrum rendered into a normalised, Gaussian-smoothed field
//! - **Classifier**: first-fit nearest-centroid grouping of flattened fields
//! - **Pipeline**: sequential orchestration and the append-only history log

pub mod config;
pub mod processing;
pub mod decoder;
pub mod reconstruction;
pub mod classifier;
pub mod pipeline;

// Re-export configuration
pub use config::{ConfigError, PipelineConfig};

// Re-export stage types
pub use decoder::{FingerprintDecoder, FingerprintLibrary, FingerprintMatch};
pub use processing::ProcessingError;
pub use reconstruction::{
    AsciiRenderer, FieldReconstructor, FieldRenderer, LogRenderer, ReconstructedField,
    ReconstructionError,
};
pub use classifier::{ClassifierError, GroupClassifier};

// Re-export orchestration
pub use pipeline::{
    AnalysisHistory, AnalysisPipeline, HistoryEntry, HistoryStats, PipelineError, PipelineStats,
    RetentionPolicy,
};
