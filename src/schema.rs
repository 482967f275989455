//! Dataset column metadata
//!
//! Describes which columns of a tabular dataset are categorical (and what
//! their known category values are) and which are continuous. The model
//! never sees raw data through this type; category lists exist only so the
//! embedding sizing step can read per-column cardinalities.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DeeptabError, Result};

/// One categorical input column: its name and the ordered list of distinct
/// category values, including any reserved unknown value the upstream
/// encoding added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    /// Column name
    pub name: String,
    /// Distinct category values
    pub classes: Vec<String>,
}

impl CategoricalColumn {
    /// Create a new categorical column descriptor
    pub fn new(name: impl Into<String>, classes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            classes,
        }
    }

    /// Number of distinct categories (the embedding row count)
    pub fn cardinality(&self) -> usize {
        self.classes.len()
    }
}

/// Column metadata for a tabular dataset.
///
/// Categorical columns are kept in a fixed, stable order; the categorical
/// feature tensor fed to the model later must use the same column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularSchema {
    categorical: Vec<CategoricalColumn>,
    continuous: Vec<String>,
}

impl TabularSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a categorical column
    pub fn with_categorical(mut self, name: impl Into<String>, classes: Vec<String>) -> Self {
        self.categorical.push(CategoricalColumn::new(name, classes));
        self
    }

    /// Append a continuous column
    pub fn with_continuous(mut self, name: impl Into<String>) -> Self {
        self.continuous.push(name.into());
        self
    }

    /// Categorical columns, in declaration order
    pub fn categorical(&self) -> &[CategoricalColumn] {
        &self.categorical
    }

    /// Continuous column names, in declaration order
    pub fn continuous(&self) -> &[String] {
        &self.continuous
    }

    /// Number of categorical columns
    pub fn n_cat_columns(&self) -> usize {
        self.categorical.len()
    }

    /// Number of continuous columns
    pub fn n_cont(&self) -> usize {
        self.continuous.len()
    }

    /// Build a schema from a DataFrame by collecting the distinct values of
    /// each named categorical column.
    ///
    /// Non-string categorical columns are read through their string
    /// representation; null entries are not counted as categories (missing
    /// values are an imputation concern, handled upstream).
    pub fn from_dataframe(df: &DataFrame, cat_cols: &[&str], cont_cols: &[&str]) -> Result<Self> {
        let mut schema = Self::new();

        for col_name in cat_cols {
            let column = df
                .column(col_name)
                .map_err(|_| DeeptabError::FeatureNotFound(col_name.to_string()))?;
            let series = column.as_materialized_series();

            let casted = series.cast(&DataType::String)?;
            let ca = casted.str().map_err(|e| DeeptabError::DataError(e.to_string()))?;
            let classes: Vec<String> = ca
                .unique()
                .map_err(|e| DeeptabError::DataError(e.to_string()))?
                .into_iter()
                .filter_map(|v| v.map(str::to_string))
                .collect();

            schema.categorical.push(CategoricalColumn::new(*col_name, classes));
        }

        for col_name in cont_cols {
            df.column(col_name)
                .map_err(|_| DeeptabError::FeatureNotFound(col_name.to_string()))?;
            schema.continuous.push(col_name.to_string());
        }

        Ok(schema)
    }
}
