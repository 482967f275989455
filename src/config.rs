//! Model configuration
//!
//! Explicit construction-time options for [`TabularModel`], with defaults
//! matching common tabular practice, plus the dropout schedule that assigns
//! one probability to each hidden block.
//!
//! [`TabularModel`]: crate::model::TabularModel

use serde::{Deserialize, Serialize};

use crate::error::{DeeptabError, Result};
use crate::layers::Activation;

/// Dropout probabilities for the hidden block stack
///
/// Either one probability shared by every hidden block or an explicit
/// per-block list. Normalized by [`resolve`](DropoutSchedule::resolve) at
/// model construction; the final output block never receives dropout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DropoutSchedule {
    /// The same probability for every hidden block
    Uniform(f64),
    /// One probability per hidden block, in stack order
    PerLayer(Vec<f64>),
}

impl Default for DropoutSchedule {
    fn default() -> Self {
        DropoutSchedule::Uniform(0.0)
    }
}

impl DropoutSchedule {
    /// Normalize to one probability per hidden block.
    ///
    /// A `PerLayer` schedule whose length does not match the hidden block
    /// count is a configuration mismatch and fails construction.
    pub fn resolve(&self, n_hidden: usize) -> Result<Vec<f64>> {
        match self {
            DropoutSchedule::Uniform(p) => Ok(vec![*p; n_hidden]),
            DropoutSchedule::PerLayer(ps) => {
                if ps.len() != n_hidden {
                    return Err(DeeptabError::ConfigError(format!(
                        "dropout schedule has {} entries for {} hidden layers",
                        ps.len(),
                        n_hidden
                    )));
                }
                Ok(ps.clone())
            }
        }
    }
}

/// Configuration for a tabular model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularModelConfig {
    /// Hidden layer widths
    pub layers: Vec<usize>,
    /// Dropout schedule for the hidden blocks
    pub ps: DropoutSchedule,
    /// Dropout probability applied to concatenated embedding outputs
    pub embed_p: f64,
    /// Optional (low, high) output range transform
    pub y_range: Option<(f64, f64)>,
    /// Whether hidden blocks use batch normalization
    pub use_bn: bool,
    /// Whether the final output block uses batch normalization
    pub bn_final: bool,
    /// Whether raw continuous inputs are batch normalized
    pub bn_cont: bool,
    /// Activation between linear transforms
    pub act: Activation,
    /// Whether blocks run linear -> act -> norm -> dropout instead of
    /// norm -> dropout -> linear -> act
    pub lin_first: bool,
    /// Seed for weight initialization and dropout masks
    pub random_state: Option<u64>,
}

impl Default for TabularModelConfig {
    fn default() -> Self {
        Self {
            layers: vec![200, 100],
            ps: DropoutSchedule::default(),
            embed_p: 0.0,
            y_range: None,
            use_bn: true,
            bn_final: false,
            bn_cont: true,
            act: Activation::ReLU,
            lin_first: true,
            random_state: Some(42),
        }
    }
}

impl TabularModelConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hidden layer widths
    pub fn with_layers(mut self, layers: Vec<usize>) -> Self {
        self.layers = layers;
        self
    }

    /// Set the hidden-block dropout schedule
    pub fn with_ps(mut self, ps: DropoutSchedule) -> Self {
        self.ps = ps;
        self
    }

    /// Set the embedding dropout probability
    pub fn with_embed_p(mut self, embed_p: f64) -> Self {
        self.embed_p = embed_p;
        self
    }

    /// Bound the output to (low, high)
    pub fn with_y_range(mut self, low: f64, high: f64) -> Self {
        self.y_range = Some((low, high));
        self
    }

    /// Enable or disable hidden-block batch normalization
    pub fn with_use_bn(mut self, use_bn: bool) -> Self {
        self.use_bn = use_bn;
        self
    }

    /// Enable or disable batch normalization on the final block
    pub fn with_bn_final(mut self, bn_final: bool) -> Self {
        self.bn_final = bn_final;
        self
    }

    /// Enable or disable batch normalization of raw continuous inputs
    pub fn with_bn_cont(mut self, bn_cont: bool) -> Self {
        self.bn_cont = bn_cont;
        self
    }

    /// Set the activation
    pub fn with_act(mut self, act: Activation) -> Self {
        self.act = act;
        self
    }

    /// Set the block ordering
    pub fn with_lin_first(mut self, lin_first: bool) -> Self {
        self.lin_first = lin_first;
        self
    }

    /// Fix the initialization and dropout seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TabularModelConfig::default();
        assert_eq!(config.layers, vec![200, 100]);
        assert_eq!(config.ps, DropoutSchedule::Uniform(0.0));
        assert_eq!(config.embed_p, 0.0);
        assert_eq!(config.y_range, None);
        assert!(config.use_bn);
        assert!(!config.bn_final);
        assert!(config.bn_cont);
        assert_eq!(config.act, Activation::ReLU);
        assert!(config.lin_first);
        assert_eq!(config.random_state, Some(42));
    }

    #[test]
    fn test_builder_chain() {
        let config = TabularModelConfig::new()
            .with_layers(vec![64, 32])
            .with_ps(DropoutSchedule::PerLayer(vec![0.1, 0.2]))
            .with_embed_p(0.05)
            .with_y_range(0.0, 1.0)
            .with_use_bn(false)
            .with_act(Activation::GELU)
            .with_lin_first(false)
            .with_seed(7);

        assert_eq!(config.layers, vec![64, 32]);
        assert_eq!(config.ps, DropoutSchedule::PerLayer(vec![0.1, 0.2]));
        assert_eq!(config.embed_p, 0.05);
        assert_eq!(config.y_range, Some((0.0, 1.0)));
        assert!(!config.use_bn);
        assert_eq!(config.act, Activation::GELU);
        assert!(!config.lin_first);
        assert_eq!(config.random_state, Some(7));
    }

    #[test]
    fn test_resolve_uniform() {
        let ps = DropoutSchedule::Uniform(0.25).resolve(3).unwrap();
        assert_eq!(ps, vec![0.25, 0.25, 0.25]);

        let empty = DropoutSchedule::Uniform(0.5).resolve(0).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_resolve_per_layer() {
        let ps = DropoutSchedule::PerLayer(vec![0.1, 0.2]).resolve(2).unwrap();
        assert_eq!(ps, vec![0.1, 0.2]);
    }

    #[test]
    fn test_resolve_length_mismatch() {
        let result = DropoutSchedule::PerLayer(vec![0.1, 0.2, 0.3]).resolve(2);
        assert!(matches!(result, Err(DeeptabError::ConfigError(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = TabularModelConfig::new()
            .with_layers(vec![50])
            .with_ps(DropoutSchedule::PerLayer(vec![0.3]))
            .with_y_range(-1.0, 1.0);

        let json = serde_json::to_string(&config).unwrap();
        let back: TabularModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
