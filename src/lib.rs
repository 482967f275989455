//! Deeptab - Feed-forward neural network architectures for tabular data
//!
//! This crate provides the model-definition layer for tabular deep learning:
//! - Embedding width heuristics for categorical columns
//! - Layer primitives on ndarray: embeddings, linear, batch norm, dropout
//! - A configurable feed-forward model over mixed categorical and
//!   continuous inputs, with optional bounded outputs
//!
//! Weights live in plain ndarray storage for an external training loop to
//! update; the crate owns architecture assembly and the forward computation.
//!
//! # Modules
//!
//! - [`sizing`] - Embedding width heuristic and per-schema resolution
//! - [`schema`] - Dataset column descriptors and a polars bridge
//! - [`layers`] - Layer primitives
//! - [`config`] - Model configuration and dropout schedules
//! - [`model`] - The tabular model container and forward pass

// Core error handling
pub mod error;

// Model definition
pub mod config;
pub mod layers;
pub mod model;
pub mod schema;
pub mod sizing;

pub use error::{DeeptabError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{DeeptabError, Result};

    // Configuration
    pub use crate::config::{DropoutSchedule, TabularModelConfig};

    // Layers
    pub use crate::layers::Activation;

    // Model
    pub use crate::model::TabularModel;

    // Schema
    pub use crate::schema::{CategoricalColumn, TabularSchema};

    // Embedding sizing
    pub use crate::sizing::{emb_sz_rule, get_emb_szs, EmbeddingSize};
}
