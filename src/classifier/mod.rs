//! First-fit nearest-centroid group classification of reconstructed fields.
//!
//! The model has no training phase. The very first observation it is asked
//! to classify becomes the fit: one occupied centroid equal to that
//! observation, the remaining `cluster_count - 1` slots left degenerate.
//! Every later observation goes to the nearest occupied centroid by
//! Euclidean distance, lowest index on ties. Centroids are never refit.
//!
//! Consequence: all group assignments depend permanently on whichever field
//! happened to arrive first. With a single occupied centroid every
//! observation lands in group 0.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ClassifierConfig;

/// Errors in group classification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    /// The observation does not have the model's dimensionality.
    /// Programmer error at the call site; never truncated or padded.
    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// Nearest-centroid classifier fitted from its first observation.
#[derive(Debug, Clone)]
pub struct GroupClassifier {
    cluster_count: usize,
    dimension: usize,
    /// Occupied centroids only; index == group id
    centroids: Vec<Vec<f64>>,
    fitted: bool,
    latest_group_id: Option<usize>,
}

impl GroupClassifier {
    /// Unfitted classifier for `dimension`-long observations.
    pub fn new(cluster_count: usize, dimension: usize) -> Self {
        Self {
            cluster_count: cluster_count.max(1),
            dimension,
            centroids: Vec::with_capacity(cluster_count),
            fitted: false,
            latest_group_id: None,
        }
    }

    pub fn with_config(config: &ClassifierConfig, dimension: usize) -> Self {
        Self::new(config.cluster_count, dimension)
    }

    /// Assign an observation to a group, fitting the model on first use.
    pub fn classify(&mut self, observation: &[f64]) -> Result<usize, ClassifierError> {
        self.check_shape(observation)?;

        if !self.fitted {
            self.fit(observation);
        }

        let group_id = self.nearest(observation);
        debug!(group_id, occupied = self.centroids.len(), "Observation classified");
        self.latest_group_id = Some(group_id);
        Ok(group_id)
    }

    /// Group the fitted model would assign, without touching any state.
    ///
    /// `None` until the model has been fitted.
    pub fn predict(&self, observation: &[f64]) -> Result<Option<usize>, ClassifierError> {
        self.check_shape(observation)?;
        Ok(self.fitted.then(|| self.nearest(observation)))
    }

    fn check_shape(&self, observation: &[f64]) -> Result<(), ClassifierError> {
        if observation.len() == self.dimension {
            Ok(())
        } else {
            Err(ClassifierError::ShapeMismatch {
                expected: self.dimension,
                actual: observation.len(),
            })
        }
    }

    /// Single-sample fit: the sample is the only occupied centroid.
    fn fit(&mut self, sample: &[f64]) {
        self.centroids.clear();
        self.centroids.push(sample.to_vec());
        self.fitted = true;
        info!(
            clusters = self.cluster_count,
            occupied = self.centroids.len(),
            dimension = self.dimension,
            "Cluster model initialised from first observation"
        );
    }

    fn nearest(&self, point: &[f64]) -> usize {
        let mut best_k = 0usize;
        let mut best_dist = f64::MAX;
        for (i, centroid) in self.centroids.iter().enumerate() {
            let dist = sq_dist(point, centroid);
            if dist < best_dist {
                best_dist = dist;
                best_k = i;
            }
        }
        best_k
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Occupied centroids, indexed by group id.
    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    pub fn occupied_clusters(&self) -> usize {
        self.centroids.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn latest_group_id(&self) -> Option<usize> {
        self.latest_group_id
    }
}

/// Squared Euclidean distance.
fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
