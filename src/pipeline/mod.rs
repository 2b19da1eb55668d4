//! Pipeline orchestration
//!
//! Wires the decoder, reconstructor and classifier into one sequential run
//! per event stream and keeps the outcome log.

mod coordinator;
pub mod history;

pub use coordinator::{AnalysisPipeline, PipelineError, PipelineStats};
pub use history::{AnalysisHistory, HistoryEntry, HistoryStats, RetentionPolicy};
