//! Feed-forward model for tabular data
//!
//! [`TabularModel`] combines one embedding table per categorical column with
//! batch-normalized continuous inputs and runs the concatenated features
//! through a configurable stack of linear blocks. Construction validates the
//! configuration and fails fast; the forward pass validates input shapes on
//! every call.

use std::collections::HashMap;

use ndarray::{concatenate, Array2, Axis};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TabularModelConfig;
use crate::error::{DeeptabError, Result};
use crate::layers::{Activation, BatchNorm1d, Dropout, Embedding, Linear, SigmoidRange};
use crate::schema::TabularSchema;
use crate::sizing::{get_emb_szs, EmbeddingSize};

/// One block of the stack: a linear transform with optional batch norm,
/// dropout, and activation, ordered by `lin_first`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseBlock {
    lin: Linear,
    bn: Option<BatchNorm1d>,
    drop: Dropout,
    act: Option<Activation>,
    lin_first: bool,
}

impl DenseBlock {
    fn new(
        n_in: usize,
        n_out: usize,
        use_bn: bool,
        p: f64,
        act: Option<Activation>,
        lin_first: bool,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Self {
        // The norm sits after the linear when lin_first, before it otherwise
        let bn = use_bn.then(|| BatchNorm1d::new(if lin_first { n_out } else { n_in }));
        // The norm's shift makes a linear bias redundant
        let lin = Linear::new(n_in, n_out, bn.is_none(), rng);

        Self {
            lin,
            bn,
            drop: Dropout::new(p),
            act,
            lin_first,
        }
    }

    fn forward(&mut self, x: &Array2<f64>, rng: &mut Xoshiro256PlusPlus) -> Array2<f64> {
        if self.lin_first {
            let mut h = self.lin.forward(x);
            if let Some(act) = &self.act {
                h = act.apply(&h);
            }
            if let Some(bn) = &mut self.bn {
                h = bn.forward(&h);
            }
            self.drop.forward(&h, rng)
        } else {
            let mut h = match &mut self.bn {
                Some(bn) => bn.forward(x),
                None => x.clone(),
            };
            h = self.drop.forward(&h, rng);
            h = self.lin.forward(&h);
            match &self.act {
                Some(act) => act.apply(&h),
                None => h,
            }
        }
    }

    fn input_dim(&self) -> usize {
        self.lin.n_in()
    }

    fn set_training(&mut self, training: bool) {
        if let Some(bn) = &mut self.bn {
            if training {
                bn.train();
            } else {
                bn.eval();
            }
        }
        if training {
            self.drop.train();
        } else {
            self.drop.eval();
        }
    }

    fn num_parameters(&self) -> usize {
        self.lin.num_parameters() + self.bn.as_ref().map_or(0, |bn| bn.num_parameters())
    }
}

fn default_rng() -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(42)
}

/// Feed-forward neural network for tabular data with learned categorical
/// embeddings
///
/// Built from resolved [`EmbeddingSize`] pairs (one per categorical column),
/// a continuous feature count, an output width, and a
/// [`TabularModelConfig`]. Weights are plain ndarray storage for an external
/// optimizer to update; this type owns the architecture and the forward
/// computation only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularModel {
    /// One embedding table per categorical column
    embeds: Vec<Embedding>,
    /// Dropout over the concatenated embedding outputs
    emb_drop: Dropout,
    /// Optional batch norm over raw continuous inputs
    bn_cont: Option<BatchNorm1d>,
    /// The linear block stack
    blocks: Vec<DenseBlock>,
    /// Optional bounded output transform
    output_range: Option<SigmoidRange>,
    /// Total width of the concatenated embedding outputs
    n_emb: usize,
    /// Number of continuous features
    n_cont: usize,
    /// Output width
    out_sz: usize,
    /// Whether in training mode
    training: bool,
    /// Dropout mask source, reseeded on deserialization
    #[serde(skip, default = "default_rng")]
    rng: Xoshiro256PlusPlus,
}

impl TabularModel {
    /// Build a model from resolved embedding sizes.
    ///
    /// Fails on a dropout schedule whose length does not match the hidden
    /// layer count, and on out-of-range parameters: a zero `out_sz` or
    /// hidden width, probabilities outside `[0, 1)`, or a `y_range` whose
    /// low bound is not below its high bound.
    pub fn new(
        emb_szs: Vec<EmbeddingSize>,
        n_cont: usize,
        out_sz: usize,
        config: TabularModelConfig,
    ) -> Result<Self> {
        if out_sz == 0 {
            return Err(DeeptabError::InvalidParameter {
                name: "out_sz".to_string(),
                value: "0".to_string(),
                reason: "model must produce at least one output".to_string(),
            });
        }
        if let Some(&width) = config.layers.iter().find(|&&w| w == 0) {
            return Err(DeeptabError::InvalidParameter {
                name: "layers".to_string(),
                value: width.to_string(),
                reason: "hidden layer widths must be positive".to_string(),
            });
        }

        let ps = config.ps.resolve(config.layers.len())?;
        for &p in ps.iter().chain(std::iter::once(&config.embed_p)) {
            if !(0.0..1.0).contains(&p) {
                return Err(DeeptabError::InvalidParameter {
                    name: "dropout".to_string(),
                    value: p.to_string(),
                    reason: "probabilities must lie in [0, 1)".to_string(),
                });
            }
        }
        if let Some((low, high)) = config.y_range {
            if low >= high {
                return Err(DeeptabError::InvalidParameter {
                    name: "y_range".to_string(),
                    value: format!("({}, {})", low, high),
                    reason: "low bound must be below high bound".to_string(),
                });
            }
        }

        let mut rng = match config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let embeds: Vec<Embedding> = emb_szs
            .iter()
            .map(|sz| Embedding::new(sz.cardinality, sz.dim, &mut rng))
            .collect();
        let n_emb: usize = emb_szs.iter().map(|sz| sz.dim).sum();

        let bn_cont = (config.bn_cont && n_cont > 0).then(|| BatchNorm1d::new(n_cont));

        let mut sizes = vec![n_emb + n_cont];
        sizes.extend(&config.layers);
        sizes.push(out_sz);

        let n_blocks = sizes.len() - 1;
        let mut blocks = Vec::with_capacity(n_blocks);
        for i in 0..n_blocks {
            let last = i == n_blocks - 1;
            let use_bn = config.use_bn && (!last || config.bn_final);
            let p = if last { 0.0 } else { ps[i] };
            let act = (!last).then_some(config.act);
            blocks.push(DenseBlock::new(
                sizes[i],
                sizes[i + 1],
                use_bn,
                p,
                act,
                config.lin_first,
                &mut rng,
            ));
        }

        debug!(
            n_emb,
            n_cont,
            out_sz,
            blocks = blocks.len(),
            "assembled tabular model"
        );

        Ok(Self {
            embeds,
            emb_drop: Dropout::new(config.embed_p),
            bn_cont,
            blocks,
            output_range: config.y_range.map(|(low, high)| SigmoidRange::new(low, high)),
            n_emb,
            n_cont,
            out_sz,
            training: true,
            rng,
        })
    }

    /// Resolve embedding sizes from a schema and construct in one step.
    ///
    /// The categorical tensor passed to [`forward`](TabularModel::forward)
    /// later must use the schema's categorical column order.
    pub fn from_schema(
        schema: &TabularSchema,
        overrides: Option<&HashMap<String, usize>>,
        out_sz: usize,
        config: TabularModelConfig,
    ) -> Result<Self> {
        let emb_szs = get_emb_szs(schema, overrides);
        Self::new(emb_szs, schema.n_cont(), out_sz, config)
    }

    /// Run the forward computation for one batch.
    ///
    /// `x_cat` carries one column of category indices per embedding table,
    /// `x_cont` one column per continuous feature; a side the model was
    /// built without may be omitted. Row counts must agree. Output shape is
    /// `(batch, out_sz)`.
    pub fn forward(
        &mut self,
        x_cat: Option<&Array2<usize>>,
        x_cont: Option<&Array2<f64>>,
    ) -> Result<Array2<f64>> {
        let batch = self.check_inputs(x_cat, x_cont)?;

        let Self {
            embeds,
            emb_drop,
            bn_cont,
            blocks,
            output_range,
            rng,
            ..
        } = self;

        let emb_out = match x_cat {
            Some(cats) if !embeds.is_empty() => {
                let pieces: Vec<Array2<f64>> = embeds
                    .iter()
                    .zip(cats.columns())
                    .map(|(emb, col)| emb.forward(col))
                    .collect();
                let views: Vec<_> = pieces.iter().map(|a| a.view()).collect();
                let cat = concatenate(Axis(1), &views).unwrap();
                Some(emb_drop.forward(&cat, rng))
            }
            _ => None,
        };

        let cont_out = match x_cont {
            Some(conts) if conts.ncols() > 0 => Some(match bn_cont {
                Some(bn) => bn.forward(conts),
                None => conts.clone(),
            }),
            _ => None,
        };

        let mut h = match (emb_out, cont_out) {
            (Some(e), Some(c)) => concatenate(Axis(1), &[e.view(), c.view()]).unwrap(),
            (Some(e), None) => e,
            (None, Some(c)) => c,
            (None, None) => Array2::zeros((batch, 0)),
        };

        for block in blocks.iter_mut() {
            h = block.forward(&h, rng);
        }

        if let Some(range) = output_range {
            h = range.forward(&h);
        }

        Ok(h)
    }

    fn check_inputs(
        &self,
        x_cat: Option<&Array2<usize>>,
        x_cont: Option<&Array2<f64>>,
    ) -> Result<usize> {
        let n_cat_cols = self.embeds.len();

        match x_cat {
            Some(cats) if cats.ncols() != n_cat_cols => {
                return Err(DeeptabError::ShapeError {
                    expected: format!("{} categorical columns", n_cat_cols),
                    actual: format!("{} categorical columns", cats.ncols()),
                });
            }
            None if n_cat_cols > 0 => {
                return Err(DeeptabError::ShapeError {
                    expected: format!("{} categorical columns", n_cat_cols),
                    actual: "no categorical input".to_string(),
                });
            }
            _ => {}
        }

        match x_cont {
            Some(conts) if conts.ncols() != self.n_cont => {
                return Err(DeeptabError::ShapeError {
                    expected: format!("{} continuous columns", self.n_cont),
                    actual: format!("{} continuous columns", conts.ncols()),
                });
            }
            None if self.n_cont > 0 => {
                return Err(DeeptabError::ShapeError {
                    expected: format!("{} continuous columns", self.n_cont),
                    actual: "no continuous input".to_string(),
                });
            }
            _ => {}
        }

        let batch = match (x_cat, x_cont) {
            (Some(cats), Some(conts)) if cats.nrows() != conts.nrows() => {
                return Err(DeeptabError::ShapeError {
                    expected: format!("{} rows in both inputs", cats.nrows()),
                    actual: format!("{} rows", conts.nrows()),
                });
            }
            (Some(cats), _) => cats.nrows(),
            (_, Some(conts)) => conts.nrows(),
            (None, None) => {
                return Err(DeeptabError::ShapeError {
                    expected: "at least one input tensor".to_string(),
                    actual: "none".to_string(),
                });
            }
        };

        // Batch norm statistics are undefined over zero rows
        if batch == 0 {
            return Err(DeeptabError::ShapeError {
                expected: "a non-empty batch".to_string(),
                actual: "0 rows".to_string(),
            });
        }

        Ok(batch)
    }

    /// Switch to training mode: dropout active, batch norm uses and updates
    /// batch statistics.
    pub fn train(&mut self) {
        self.training = true;
        self.apply_mode();
    }

    /// Switch to evaluation mode: dropout off, batch norm uses running
    /// statistics.
    pub fn eval(&mut self) {
        self.training = false;
        self.apply_mode();
    }

    /// Whether in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }

    fn apply_mode(&mut self) {
        let training = self.training;
        if training {
            self.emb_drop.train();
        } else {
            self.emb_drop.eval();
        }
        if let Some(bn) = &mut self.bn_cont {
            if training {
                bn.train();
            } else {
                bn.eval();
            }
        }
        for block in &mut self.blocks {
            block.set_training(training);
        }
    }

    /// Number of embedding tables
    pub fn n_embeds(&self) -> usize {
        self.embeds.len()
    }

    /// Total width of the concatenated embedding outputs
    pub fn n_emb(&self) -> usize {
        self.n_emb
    }

    /// Number of continuous features
    pub fn n_cont(&self) -> usize {
        self.n_cont
    }

    /// Output width
    pub fn out_sz(&self) -> usize {
        self.out_sz
    }

    /// Input width of the first block, `n_emb + n_cont`
    pub fn input_width(&self) -> usize {
        self.blocks.first().map_or(0, |b| b.input_dim())
    }

    /// Number of linear blocks in the stack
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Total learnable parameter count
    pub fn num_parameters(&self) -> usize {
        let emb: usize = self.embeds.iter().map(|e| e.num_parameters()).sum();
        let bn = self.bn_cont.as_ref().map_or(0, |b| b.num_parameters());
        let blocks: usize = self.blocks.iter().map(|b| b.num_parameters()).sum();
        emb + bn + blocks
    }
}
