//! Turns one validated record into the vector the trained model expects.
//!
//! The record is first expanded into sparse `<field>_<value>` indicators,
//! then reindexed against the training-time [`FeatureSchema`]. Indicators the
//! schema does not know are dropped and schema columns the record did not
//! activate stay at zero.

use crate::features::record::{CategoricalField, RawRecord};
use crate::features::schema::FeatureSchema;
use crate::features::tenure::TenureGroup;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SENIOR_CITIZEN: &str = "SeniorCitizen";
pub const MONTHLY_CHARGES: &str = "MonthlyCharges";
pub const TOTAL_CHARGES: &str = "TotalCharges";

/// How the three numeric inputs reach the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentMode {
    /// Only the expansion output is reindexed.
    #[default]
    OneHot,
    /// After reindexing, `SeniorCitizen`, `MonthlyCharges` and
    /// `TotalCharges` are overwritten with the raw record values.
    NumericOverwrite,
}

impl AlignmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentMode::OneHot => "one-hot",
            AlignmentMode::NumericOverwrite => "numeric-overwrite",
        }
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignmentMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "one-hot" | "onehot" | "one_hot" => Ok(Self::OneHot),
            "numeric-overwrite" | "numeric_overwrite" | "numeric" => Ok(Self::NumericOverwrite),
            other => Err(format!(
                "unknown alignment mode '{other}' (expected one-hot or numeric-overwrite)"
            )),
        }
    }
}

/// A single model input. Never boolean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Real(f64),
}

impl FeatureValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            FeatureValue::Int(value) => value as f64,
            FeatureValue::Real(value) => value,
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            FeatureValue::Int(value) => serializer.serialize_i64(value),
            FeatureValue::Real(value) => serializer.serialize_f64(value),
        }
    }
}

/// Model input for exactly one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedFeatureVector {
    columns: Arc<[String]>,
    values: Vec<FeatureValue>,
    degraded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dropped: Vec<String>,
}

impl AlignedFeatureVector {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<FeatureValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|index| self.values[index])
    }

    /// True when no schema was available and the columns are whatever the
    /// record generated.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Generated indicator columns the schema did not contain.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.values.iter().map(FeatureValue::as_f64).collect()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureAligner {
    schema: Option<Arc<FeatureSchema>>,
    schema_columns: Option<Arc<[String]>>,
    mode: AlignmentMode,
}

impl FeatureAligner {
    pub fn new(schema: Arc<FeatureSchema>, mode: AlignmentMode) -> Self {
        let schema_columns = Arc::from(schema.columns());
        Self {
            schema: Some(schema),
            schema_columns: Some(schema_columns),
            mode,
        }
    }

    /// Aligner for when the schema artifact could not be loaded. Vectors
    /// carry only the columns the record generates.
    pub fn degraded(mode: AlignmentMode) -> Self {
        Self {
            schema: None,
            schema_columns: None,
            mode,
        }
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.schema.is_none()
    }

    pub fn align(&self, record: &RawRecord) -> AlignedFeatureVector {
        let sparse = expand(record);
        match (&self.schema, &self.schema_columns) {
            (Some(schema), Some(columns)) => self.reindex(record, sparse, schema, columns),
            _ => self.best_effort(record, sparse),
        }
    }

    fn reindex(
        &self,
        record: &RawRecord,
        sparse: Vec<Generated>,
        schema: &FeatureSchema,
        columns: &Arc<[String]>,
    ) -> AlignedFeatureVector {
        let mut values = vec![FeatureValue::Int(0); schema.len()];
        let mut dropped = Vec::new();

        for generated in sparse {
            if let Some((field, category)) = &generated.category {
                if !schema.knows_category(*field, category) {
                    dropped.push(generated.column);
                    continue;
                }
            }
            // The numeric passthrough and its indicator form are both
            // generated; a schema uses at most one of them.
            if let Some(index) = schema.position(&generated.column) {
                values[index] = generated.value;
            }
        }

        if self.mode == AlignmentMode::NumericOverwrite {
            for (column, value) in numeric_inputs(record) {
                if let Some(index) = schema.position(column) {
                    values[index] = value;
                }
            }
        }

        if !dropped.is_empty() {
            debug!(?dropped, "record categories absent from feature schema");
        }

        AlignedFeatureVector {
            columns: Arc::clone(columns),
            values,
            degraded: false,
            dropped,
        }
    }

    fn best_effort(
        &self,
        record: &RawRecord,
        sparse: Vec<Generated>,
    ) -> AlignedFeatureVector {
        let (mut columns, mut values): (Vec<String>, Vec<FeatureValue>) = sparse
            .into_iter()
            .filter(|generated| !is_senior_indicator(&generated.column))
            .map(|generated| (generated.column, generated.value))
            .unzip();

        if self.mode == AlignmentMode::NumericOverwrite {
            for (column, value) in numeric_inputs(record) {
                match columns.iter().position(|name| name == column) {
                    Some(index) => values[index] = value,
                    None => {
                        columns.push(column.to_string());
                        values.push(value);
                    }
                }
            }
        }

        warn!(
            columns = columns.len(),
            "feature schema unavailable, scoring with unaligned columns"
        );

        AlignedFeatureVector {
            columns: Arc::from(columns),
            values,
            degraded: true,
            dropped: Vec::new(),
        }
    }
}

/// One sparse entry. Categorical indicators remember which field and value
/// produced them.
#[derive(Debug, Clone, PartialEq)]
struct Generated {
    column: String,
    category: Option<(CategoricalField, String)>,
    value: FeatureValue,
}

impl Generated {
    fn numeric(column: String, value: i64) -> Self {
        Self {
            column,
            category: None,
            value: FeatureValue::Int(value),
        }
    }

    fn indicator(field: CategoricalField, category: &str) -> Self {
        Self {
            column: field.column_for(category),
            category: Some((field, category.to_string())),
            value: FeatureValue::Int(1),
        }
    }
}

/// Sparse expansion of one record, first occurrence of a name kept.
fn expand(record: &RawRecord) -> Vec<Generated> {
    let tenure_group = TenureGroup::from_tenure(record.tenure).map(|group| group.label());

    let mut generated = Vec::with_capacity(20);
    generated.push(Generated::numeric(
        SENIOR_CITIZEN.to_string(),
        record.senior_citizen,
    ));
    generated.push(Generated::numeric(
        format!("{SENIOR_CITIZEN}_{}", record.senior_citizen),
        1,
    ));
    for (field, value) in record.categories() {
        generated.push(Generated::indicator(field, value));
    }
    if let Some(label) = tenure_group {
        generated.push(Generated::indicator(CategoricalField::TenureGroup, &label));
    }

    let mut seen = HashSet::with_capacity(generated.len());
    generated.retain(|entry| seen.insert(entry.column.clone()));
    generated
}

fn numeric_inputs(record: &RawRecord) -> [(&'static str, FeatureValue); 3] {
    [
        (SENIOR_CITIZEN, FeatureValue::Int(record.senior_citizen)),
        (MONTHLY_CHARGES, FeatureValue::Real(record.monthly_charges)),
        (TOTAL_CHARGES, FeatureValue::Real(record.total_charges)),
    ]
}

fn is_senior_indicator(column: &str) -> bool {
    column
        .strip_prefix(SENIOR_CITIZEN)
        .is_some_and(|rest| rest.starts_with('_'))
}
