use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;
use truetone_common::Label;

use crate::features::FeatureVector;
use crate::gbdt::{GbdtModel, ScoreModel};

/// Wraps the trained binary model. Loaded once at startup and shared by
/// handle; the load is the expensive part, prediction is cheap.
#[derive(Clone)]
pub struct VideoLabeler {
    model: Arc<dyn ScoreModel>,
}

impl VideoLabeler {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            model: Arc::new(GbdtModel::from_file(path)?),
        })
    }

    /// Test seam: wrap any scorer.
    pub fn from_model(model: Arc<dyn ScoreModel>) -> Self {
        Self { model }
    }

    /// Score a feature vector and label it against a caller-supplied
    /// threshold. Different callers use different thresholds; none is
    /// baked in here.
    pub fn predict(&self, features: &FeatureVector, threshold: f64) -> (f64, Label) {
        let score = self.model.score(&features.to_row());
        debug!(score, threshold, "Model prediction");
        if score >= threshold {
            (score, Label::Human)
        } else {
            (score, Label::Ai)
        }
    }
}
