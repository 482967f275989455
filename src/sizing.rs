//! Embedding sizing heuristic
//!
//! Maps the cardinality of a categorical column to a recommended embedding
//! width, and resolves one (cardinality, width) pair per column of a
//! [`TabularSchema`], honoring explicit per-column overrides.
//!
//! [`TabularSchema`]: crate::schema::TabularSchema

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schema::{CategoricalColumn, TabularSchema};

/// Recommended embedding width for a categorical cardinality:
/// `min(600, round(1.6 * n_cat^0.56))`.
///
/// Widths grow sub-linearly with vocabulary size and are capped at 600 to
/// bound parameter growth for very large vocabularies. Cardinalities of 0
/// or 1 yield a degenerate width (0 or 2); columns with fewer than two
/// categories should not be embedded in the first place.
pub fn emb_sz_rule(n_cat: usize) -> usize {
    let suggested = (1.6 * (n_cat as f64).powf(0.56)).round() as usize;
    suggested.min(600)
}

/// A (cardinality, width) pair configuring one embedding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSize {
    /// Number of distinct categories (embedding rows)
    pub cardinality: usize,
    /// Embedding vector width (embedding columns)
    pub dim: usize,
}

impl EmbeddingSize {
    /// Create a new embedding size pair
    pub fn new(cardinality: usize, dim: usize) -> Self {
        Self { cardinality, dim }
    }
}

/// Resolved embedding size for a single column.
///
/// An override entry under the column's name wins verbatim; otherwise the
/// width comes from [`emb_sz_rule`] applied to the column's cardinality.
pub fn emb_sz_for_column(
    col: &CategoricalColumn,
    overrides: Option<&HashMap<String, usize>>,
) -> EmbeddingSize {
    let n_cat = col.cardinality();
    let dim = overrides
        .and_then(|m| m.get(col.name.as_str()).copied())
        .unwrap_or_else(|| emb_sz_rule(n_cat));
    EmbeddingSize::new(n_cat, dim)
}

/// Resolved embedding sizes for every categorical column of a schema, in
/// the schema's declared column order.
///
/// The categorical feature tensor fed to the model later must use the same
/// column order; the model has no way to verify or correct a mismatch, so
/// that alignment is the caller's responsibility.
pub fn get_emb_szs(
    schema: &TabularSchema,
    overrides: Option<&HashMap<String, usize>>,
) -> Vec<EmbeddingSize> {
    schema
        .categorical()
        .iter()
        .map(|col| emb_sz_for_column(col, overrides))
        .collect()
}
