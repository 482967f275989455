//! Neural network layer primitives for tabular models
//!
//! Batch-major `Array2<f64>` in, batch-major `Array2<f64>` out. Learnable
//! state is plain ndarray storage, mutated here only at initialization.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Elementwise activation applied after a linear transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified Linear Unit
    ReLU,
    /// Gaussian Error Linear Unit (tanh approximation)
    GELU,
    /// Logistic sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Identity
    Linear,
}

impl Default for Activation {
    fn default() -> Self {
        Activation::ReLU
    }
}

impl Activation {
    /// Apply the activation elementwise
    pub fn apply(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| v.max(0.0)),
            Activation::GELU => z.mapv(gelu),
            Activation::Sigmoid => z.mapv(sigmoid),
            Activation::Tanh => z.mapv(|v| v.tanh()),
            Activation::Linear => z.clone(),
        }
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn gelu(v: f64) -> f64 {
    let inner = (2.0 / std::f64::consts::PI).sqrt() * (v + 0.044715 * v.powi(3));
    0.5 * v * (1.0 + inner.tanh())
}

/// Fully connected linear transform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linear {
    /// Weight matrix (n_in x n_out)
    weight: Array2<f64>,
    /// Per-output bias, absent when a following batch norm supplies the shift
    bias: Option<Array1<f64>>,
}

impl Linear {
    /// Create a new linear layer with Xavier-uniform weights
    pub fn new(n_in: usize, n_out: usize, bias: bool, rng: &mut impl Rng) -> Self {
        let scale = (2.0 / (n_in + n_out) as f64).sqrt();

        let weights: Vec<f64> = (0..n_in * n_out)
            .map(|_| rng.gen::<f64>() * 2.0 * scale - scale)
            .collect();

        Self {
            weight: Array2::from_shape_vec((n_in, n_out), weights).unwrap(),
            bias: bias.then(|| Array1::zeros(n_out)),
        }
    }

    /// Input width
    pub fn n_in(&self) -> usize {
        self.weight.nrows()
    }

    /// Output width
    pub fn n_out(&self) -> usize {
        self.weight.ncols()
    }

    /// Number of learnable parameters
    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.as_ref().map_or(0, |b| b.len())
    }

    /// Forward pass: `x . W (+ b)`
    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        match &self.bias {
            Some(b) => x.dot(&self.weight) + b,
            None => x.dot(&self.weight),
        }
    }
}

/// Batch normalization over the feature axis
///
/// Training mode normalizes by batch statistics and updates the running
/// mean/variance; evaluation mode normalizes by the running statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm1d {
    /// Number of features
    num_features: usize,
    /// Momentum for running stats
    momentum: f64,
    /// Epsilon for numerical stability
    eps: f64,
    /// Running mean
    running_mean: Array1<f64>,
    /// Running variance
    running_var: Array1<f64>,
    /// Learnable scale (gamma)
    gamma: Array1<f64>,
    /// Learnable shift (beta)
    beta: Array1<f64>,
    /// Whether in training mode
    training: bool,
}

impl BatchNorm1d {
    /// Create new BatchNorm1d with momentum 0.1 and eps 1e-5
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            momentum: 0.1,
            eps: 1e-5,
            running_mean: Array1::zeros(num_features),
            running_var: Array1::ones(num_features),
            gamma: Array1::ones(num_features),
            beta: Array1::zeros(num_features),
            training: true,
        }
    }

    /// Set training mode
    pub fn train(&mut self) {
        self.training = true;
    }

    /// Set evaluation mode
    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Number of features
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Number of learnable parameters
    pub fn num_parameters(&self) -> usize {
        self.gamma.len() + self.beta.len()
    }

    /// Forward pass
    pub fn forward(&mut self, x: &Array2<f64>) -> Array2<f64> {
        if self.training {
            let mean = x.mean_axis(Axis(0)).unwrap();
            let var = x.var_axis(Axis(0), 0.0);

            // Update running stats
            self.running_mean = &self.running_mean * (1.0 - self.momentum) + &mean * self.momentum;
            self.running_var = &self.running_var * (1.0 - self.momentum) + &var * self.momentum;

            let std = var.mapv(|v| (v + self.eps).sqrt());
            let normalized = (x - &mean) / &std;
            &normalized * &self.gamma + &self.beta
        } else {
            let std = self.running_var.mapv(|v| (v + self.eps).sqrt());
            let normalized = (x - &self.running_mean) / &std;
            &normalized * &self.gamma + &self.beta
        }
    }
}

/// Inverted dropout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    /// Zeroing probability
    p: f64,
    /// Whether in training mode
    training: bool,
}

impl Dropout {
    /// Create new dropout with the given zeroing probability
    pub fn new(p: f64) -> Self {
        Self { p, training: true }
    }

    /// Set training mode
    pub fn train(&mut self) {
        self.training = true;
    }

    /// Set evaluation mode
    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Zeroing probability
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Forward pass
    ///
    /// Training mode zeroes each element with probability `p` and scales
    /// survivors by `1 / (1 - p)`; evaluation mode and `p == 0` pass the
    /// input through unchanged.
    pub fn forward(&self, x: &Array2<f64>, rng: &mut impl Rng) -> Array2<f64> {
        if !self.training || self.p == 0.0 {
            return x.clone();
        }

        let keep = 1.0 - self.p;
        x.mapv(|v| if rng.gen::<f64>() < self.p { 0.0 } else { v / keep })
    }
}

/// Learned lookup table mapping category indices to dense vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// Weight matrix (cardinality x dim)
    weight: Array2<f64>,
}

impl Embedding {
    /// Create a new embedding table with small uniform init in (-0.01, 0.01)
    pub fn new(cardinality: usize, dim: usize, rng: &mut impl Rng) -> Self {
        let weights: Vec<f64> = (0..cardinality * dim)
            .map(|_| rng.gen::<f64>() * 0.02 - 0.01)
            .collect();

        Self {
            weight: Array2::from_shape_vec((cardinality, dim), weights).unwrap(),
        }
    }

    /// Number of categories (rows)
    pub fn cardinality(&self) -> usize {
        self.weight.nrows()
    }

    /// Embedding width (columns)
    pub fn dim(&self) -> usize {
        self.weight.ncols()
    }

    /// Number of learnable parameters
    pub fn num_parameters(&self) -> usize {
        self.weight.len()
    }

    /// Look up one embedding row per index, producing `(batch, dim)`.
    ///
    /// Panics if an index is out of range for the table.
    pub fn forward(&self, indices: ArrayView1<'_, usize>) -> Array2<f64> {
        let mut result = Array2::zeros((indices.len(), self.dim()));
        for (i, &idx) in indices.iter().enumerate() {
            assert!(
                idx < self.weight.nrows(),
                "category index {} out of range for embedding with {} rows",
                idx,
                self.weight.nrows()
            );
            result.row_mut(i).assign(&self.weight.row(idx));
        }
        result
    }
}

/// Bounded output transform: `sigmoid(x) * (high - low) + low`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmoidRange {
    /// Lower output bound
    pub low: f64,
    /// Upper output bound
    pub high: f64,
}

impl SigmoidRange {
    /// Create a new range transform
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Forward pass
    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.mapv(|v| sigmoid(v) * (self.high - self.low) + self.low)
    }
}
