use crate::config::{FeaturesConfig, ScoringConfig};
use crate::error::AppError;
use crate::features::{AlignedFeatureVector, FeatureAligner, FeatureSchema, RawRecord};
use crate::prediction::{
    Classifier, PredictionInvoker, RandomForest, RemoteScorer, ScoringBackend, Verdict,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Validating, aligning and scoring, built once at start-up and shared
/// read-only across requests.
#[derive(Debug, Clone)]
pub struct ChurnService {
    aligner: FeatureAligner,
    invoker: PredictionInvoker,
}

impl ChurnService {
    pub fn new(aligner: FeatureAligner, invoker: PredictionInvoker) -> Self {
        Self { aligner, invoker }
    }

    /// A missing or unusable schema degrades alignment instead of failing;
    /// a missing local model is fatal.
    pub fn from_config(features: &FeaturesConfig, scoring: &ScoringConfig) -> Result<Self, AppError> {
        let aligner = match FeatureSchema::load(&features.schema_path) {
            Ok(schema) => FeatureAligner::new(Arc::new(schema), features.mode),
            Err(err) => {
                warn!(
                    error = %err,
                    "feature schema unavailable, vectors will not be reindexed"
                );
                FeatureAligner::degraded(features.mode)
            }
        };

        let backend = match scoring {
            ScoringConfig::Local { model_path } => {
                let forest = RandomForest::load(model_path)?;
                if let (Some(expected), Some(schema)) = (forest.feature_count(), aligner.schema()) {
                    if expected != schema.len() {
                        warn!(
                            model_features = expected,
                            schema_columns = schema.len(),
                            "model and feature schema disagree on row width"
                        );
                    }
                }
                ScoringBackend::Local(Arc::new(forest))
            }
            ScoringConfig::Remote {
                endpoint,
                timeout,
                retry,
            } => {
                let scorer = RemoteScorer::new(endpoint.clone(), *timeout, retry.clone())?;
                info!(
                    endpoint = scorer.endpoint(),
                    timeout_ms = timeout.as_millis() as u64,
                    max_attempts = scorer.retry_policy().attempts(),
                    "remote scorer configured"
                );
                ScoringBackend::Remote(scorer)
            }
        };

        info!(
            backend = backend.kind(),
            mode = %features.mode,
            degraded = aligner.is_degraded(),
            "churn service initialised"
        );

        Ok(Self::new(aligner, PredictionInvoker::new(backend)))
    }

    pub fn is_degraded(&self) -> bool {
        self.aligner.is_degraded()
    }

    /// Validation runs before any feature is computed.
    pub fn align_json(&self, body: &Value) -> Result<AlignedFeatureVector, AppError> {
        let record = RawRecord::from_json(body)?;
        Ok(self.aligner.align(&record))
    }

    pub async fn predict_record(&self, record: &RawRecord) -> Result<Verdict, AppError> {
        let vector = self.aligner.align(record);
        Ok(self.invoker.predict(&vector).await?)
    }

    pub async fn predict_json(&self, body: &Value) -> Result<Verdict, AppError> {
        let record = RawRecord::from_json(body)?;
        self.predict_record(&record).await
    }
}
