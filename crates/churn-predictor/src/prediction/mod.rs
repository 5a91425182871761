//! Aligned vector to user-facing verdict.

pub mod classifier;
pub mod error;
pub mod invoker;
pub mod remote;
pub mod retry;
pub mod verdict;

pub use classifier::{Classifier, RandomForest};
pub use error::{ModelError, ScoringError};
pub use invoker::{PredictionInvoker, ScoringBackend};
pub use remote::RemoteScorer;
pub use retry::RetryPolicy;
pub use verdict::{ClassOutput, Confidence, Outcome, Verdict};
