use crate::features::record::CategoricalField;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// The persisted column list is missing or unusable. Callers fall back to
/// degraded alignment instead of aborting.
#[derive(Debug, Error)]
pub enum SchemaUnavailableError {
    #[error("feature schema {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("feature schema {path} is not a JSON array of column names: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("feature schema {path} is empty")]
    Empty { path: PathBuf },
    #[error("feature schema {path} lists column '{column}' more than once")]
    DuplicateColumn { path: PathBuf, column: String },
}

/// Training-time column order. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    categories: BTreeMap<CategoricalField, BTreeSet<String>>,
}

impl FeatureSchema {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaUnavailableError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SchemaUnavailableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let columns: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| SchemaUnavailableError::Decode {
                path: path.to_path_buf(),
                source,
            })?;

        let schema = Self::from_columns(columns).map_err(|err| match err {
            ColumnError::Empty => SchemaUnavailableError::Empty {
                path: path.to_path_buf(),
            },
            ColumnError::Duplicate(column) => SchemaUnavailableError::DuplicateColumn {
                path: path.to_path_buf(),
                column,
            },
        })?;

        info!(
            path = %path.display(),
            columns = schema.len(),
            "feature schema loaded"
        );
        Ok(schema)
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Self, ColumnError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(ColumnError::Empty);
        }

        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if index.insert(column.clone(), position).is_some() {
                return Err(ColumnError::Duplicate(column.clone()));
            }
        }

        let categories = derive_categories(&columns);
        Ok(Self {
            columns,
            index,
            categories,
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Values of `field` the model saw during training.
    pub fn categories(&self, field: CategoricalField) -> Option<&BTreeSet<String>> {
        self.categories.get(&field)
    }

    pub fn knows_category(&self, field: CategoricalField, value: &str) -> bool {
        self.categories(field)
            .is_some_and(|values| values.contains(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    #[error("schema has no columns")]
    Empty,
    #[error("column '{0}' appears more than once")]
    Duplicate(String),
}

fn derive_categories(columns: &[String]) -> BTreeMap<CategoricalField, BTreeSet<String>> {
    let prefixes: Vec<(CategoricalField, String)> = CategoricalField::ALL
        .iter()
        .map(|field| (*field, field.column_prefix()))
        .collect();

    let mut categories: BTreeMap<CategoricalField, BTreeSet<String>> = BTreeMap::new();
    for column in columns {
        // The longest matching prefix wins so `tenure_group_` is never
        // attributed to a shorter field name.
        let owner = prefixes
            .iter()
            .filter(|(_, prefix)| column.starts_with(prefix.as_str()))
            .max_by_key(|(_, prefix)| prefix.len());
        if let Some((field, prefix)) = owner {
            categories
                .entry(*field)
                .or_default()
                .insert(column[prefix.len()..].to_string());
        }
    }
    categories
}
