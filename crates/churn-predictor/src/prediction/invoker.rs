use crate::features::AlignedFeatureVector;
use crate::prediction::classifier::Classifier;
use crate::prediction::error::ScoringError;
use crate::prediction::remote::RemoteScorer;
use crate::prediction::verdict::Verdict;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Where aligned vectors are scored.
#[derive(Clone)]
pub enum ScoringBackend {
    Local(Arc<dyn Classifier>),
    Remote(RemoteScorer),
}

impl ScoringBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringBackend::Local(_) => "local",
            ScoringBackend::Remote(_) => "remote",
        }
    }
}

impl fmt::Debug for ScoringBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringBackend::Local(classifier) => f
                .debug_struct("Local")
                .field("feature_count", &classifier.feature_count())
                .finish(),
            ScoringBackend::Remote(scorer) => f
                .debug_struct("Remote")
                .field("endpoint", &scorer.endpoint())
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictionInvoker {
    backend: ScoringBackend,
}

impl PredictionInvoker {
    pub fn new(backend: ScoringBackend) -> Self {
        Self { backend }
    }

    pub fn local(classifier: Arc<dyn Classifier>) -> Self {
        Self::new(ScoringBackend::Local(classifier))
    }

    pub fn remote(scorer: RemoteScorer) -> Self {
        Self::new(ScoringBackend::Remote(scorer))
    }

    pub async fn predict(&self, vector: &AlignedFeatureVector) -> Result<Verdict, ScoringError> {
        let output = match &self.backend {
            ScoringBackend::Local(classifier) => classifier.classify(&vector.to_f64())?,
            ScoringBackend::Remote(scorer) => scorer.score(vector.values()).await?,
        };

        debug!(
            backend = self.backend.kind(),
            label = output.label,
            probability = ?output.churn_probability,
            "vector scored"
        );
        Ok(Verdict::from(output))
    }
}
