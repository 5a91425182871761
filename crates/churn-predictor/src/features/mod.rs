//! Raw request record to model-ready feature vector.

pub mod aligner;
pub mod record;
pub mod schema;
pub mod tenure;

pub use aligner::{AlignedFeatureVector, AlignmentMode, FeatureAligner, FeatureValue};
pub use record::{CategoricalField, FieldIssue, IssueKind, RawRecord, ValidationError};
pub use schema::{ColumnError, FeatureSchema, SchemaUnavailableError};
pub use tenure::TenureGroup;
