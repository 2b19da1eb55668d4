//! Analysis Pipeline - decode, reconstruct, classify, record
//!
//! ```text
//! STAGE 1: Decode      event timestamps -> interval spectrum (+ fingerprint tag)
//! STAGE 2: Reconstruct spectrum -> smoothed 2-D field
//! STAGE 3: Classify    flattened field -> group id
//! STAGE 4: Record      (group id, field) appended to the history log
//! ```
//!
//! GUARANTEE: stage 4 only runs when stages 1-3 all completed. A run that
//! stops early leaves the history log and the cluster model untouched.
//!
//! Stage 2 consumes the decoder's spectrum, not its tag: the tag is a label
//! and cannot be rendered. A "no match" decode therefore still yields a
//! field and a group id.

use thiserror::Error;
use tracing::{info, warn};

use super::history::{AnalysisHistory, RetentionPolicy};
use crate::classifier::{ClassifierError, GroupClassifier};
use crate::config::{ConfigError, PipelineConfig};
use crate::decoder::{FingerprintDecoder, FingerprintLibrary};
use crate::reconstruction::{FieldReconstructor, FieldRenderer, LogRenderer};

/// Fatal pipeline errors. Recoverable stage failures are reported as
/// `Ok(None)` from [`AnalysisPipeline::analyze`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub runs: u64,
    pub classified: u64,
    pub insufficient_data: u64,
    pub empty_feature: u64,
    pub fingerprint_matches: u64,
}

/// Single-caller orchestrator owning all pipeline state.
///
/// Not internally synchronised: share between threads behind a `Mutex`.
pub struct AnalysisPipeline {
    decoder: FingerprintDecoder,
    reconstructor: FieldReconstructor,
    classifier: GroupClassifier,
    history: AnalysisHistory,
    renderer: Box<dyn FieldRenderer + Send>,
    stats: PipelineStats,
}

impl AnalysisPipeline {
    /// Pipeline with default decoder and smoothing settings.
    pub fn new(
        library: FingerprintLibrary,
        resolution: (usize, usize),
        cluster_count: usize,
    ) -> Result<Self, ConfigError> {
        let mut config = PipelineConfig::default();
        config.reconstruction.rows = resolution.0;
        config.reconstruction.cols = resolution.1;
        config.classifier.cluster_count = cluster_count;
        Self::with_library(&config, library)
    }

    /// Pipeline using the config's own `[fingerprints]` table.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Self::with_library(config, config.fingerprint_library())
    }

    /// Pipeline with an externally supplied fingerprint library.
    ///
    /// The config is validated first; nothing is built from a config that
    /// [`PipelineConfig::validate`] rejects.
    pub fn with_library(
        config: &PipelineConfig,
        library: FingerprintLibrary,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let reconstructor = FieldReconstructor::with_config(&config.reconstruction)
            .map_err(|e| ConfigError::Validation(vec![e.to_string()]))?;
        let classifier =
            GroupClassifier::with_config(&config.classifier, reconstructor.cell_count());

        info!(
            fingerprints = library.len(),
            rows = config.reconstruction.rows,
            cols = config.reconstruction.cols,
            clusters = classifier.cluster_count(),
            "Initializing analysis pipeline"
        );

        Ok(Self {
            decoder: FingerprintDecoder::with_config(library, &config.decoder),
            reconstructor,
            classifier,
            history: AnalysisHistory::new(config.history.retention()),
            renderer: Box::new(LogRenderer),
            stats: PipelineStats::default(),
        })
    }

    /// Replace the display collaborator used by [`visualize_last`](Self::visualize_last).
    pub fn with_renderer(mut self, renderer: Box<dyn FieldRenderer + Send>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the history retention policy, evicting if the log is now over it.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.history.set_retention(retention);
        self
    }

    /// Run all stages on one event stream.
    ///
    /// Returns `Ok(Some(group_id))` on success, `Ok(None)` when the stream
    /// was too short to decode or produced an empty feature vector.
    pub fn analyze(&mut self, timestamps: &[f64]) -> Result<Option<usize>, PipelineError> {
        self.stats.runs += 1;

        // STAGE 1: Decode
        let matched = match self.decoder.decode(timestamps) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "Failed to decode event stream");
                self.stats.insufficient_data += 1;
                return Ok(None);
            }
        };
        if matched.is_some() {
            self.stats.fingerprint_matches += 1;
        }

        let spectrum = self
            .decoder
            .last_spectrum()
            .map(<[f64]>::to_vec)
            .unwrap_or_default();
        self.classify_spectrum(&spectrum, matched.map(|m| m.tag))
    }

    /// Stages 2-4 for one decoded spectrum.
    fn classify_spectrum(
        &mut self,
        spectrum: &[f64],
        tag: Option<String>,
    ) -> Result<Option<usize>, PipelineError> {
        // STAGE 2: Reconstruct from the retained spectrum.
        // A successful decode yields at least `min_deltas` (>= 1) bins, so
        // EmptyFeature only trips if that invariant is broken.
        let field = match self.reconstructor.generate_image(spectrum) {
            Ok(field) => field.flatten(),
            Err(e) => {
                warn!(error = %e, "Failed to generate harmonic field");
                self.stats.empty_feature += 1;
                return Ok(None);
            }
        };

        // STAGE 3: Classify
        let group_id = self.classifier.classify(&field)?;

        // STAGE 4: Record
        let sequence = self.history.append(group_id, field, tag.clone()).sequence;
        info!(
            group_id,
            tag = tag.as_deref().unwrap_or("none"),
            sequence,
            history_len = self.history.len(),
            "Signal clustered into group"
        );

        self.stats.classified += 1;
        Ok(Some(group_id))
    }

    /// Re-display the latest reconstructed field through the renderer.
    pub fn visualize_last(&mut self) {
        self.reconstructor.display_last(self.renderer.as_mut());
    }

    /// Full outcome log, oldest first.
    pub fn get_history(&self) -> &AnalysisHistory {
        &self.history
    }

    pub fn decoder(&self) -> &FingerprintDecoder {
        &self.decoder
    }

    pub fn reconstructor(&self) -> &FieldReconstructor {
        &self.reconstructor
    }

    pub fn classifier(&self) -> &GroupClassifier {
        &self.classifier
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("decoder", &self.decoder)
            .field("reconstructor", &self.reconstructor)
            .field("classifier", &self.classifier)
            .field("history_len", &self.history.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
