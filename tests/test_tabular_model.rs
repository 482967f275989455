//! Integration test: tabular model end-to-end

use std::collections::HashMap;

use deeptab::config::{DropoutSchedule, TabularModelConfig};
use deeptab::model::TabularModel;
use deeptab::schema::TabularSchema;
use deeptab::sizing::EmbeddingSize;
use deeptab::DeeptabError;
use ndarray::{arr2, Array2};
use polars::prelude::*;

fn small_mixed_model(config: TabularModelConfig) -> TabularModel {
    let emb_szs = vec![EmbeddingSize::new(4, 2), EmbeddingSize::new(17, 8)];
    TabularModel::new(emb_szs, 2, 2, config).unwrap()
}

#[test]
fn test_mixed_input_forward() {
    let mut model = small_mixed_model(TabularModelConfig::default());
    assert_eq!(model.n_emb(), 10);
    assert_eq!(model.input_width(), 12);
    assert_eq!(model.num_blocks(), 3);

    let x_cat = arr2(&[[2_usize, 12]]);
    let x_cont = arr2(&[[0.7633, -0.1887]]);

    let out = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    assert_eq!(out.shape(), &[1, 2]);
    assert!(out.iter().all(|v| v.is_finite()));

    model.eval();
    let out = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    assert_eq!(out.shape(), &[1, 2]);
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn test_one_embedding_per_size_pair() {
    let model = small_mixed_model(TabularModelConfig::default());
    assert_eq!(model.n_embeds(), 2);
    assert_eq!(model.n_cont(), 2);
    assert_eq!(model.out_sz(), 2);
}

#[test]
fn test_input_width_tracks_emb_and_cont() {
    for (emb_szs, n_cont) in [
        (vec![EmbeddingSize::new(10, 6)], 0),
        (vec![], 4),
        (vec![EmbeddingSize::new(3, 2), EmbeddingSize::new(100, 21)], 7),
    ] {
        let n_emb: usize = emb_szs.iter().map(|sz| sz.dim).sum();
        let model =
            TabularModel::new(emb_szs, n_cont, 1, TabularModelConfig::default()).unwrap();
        assert_eq!(model.input_width(), n_emb + n_cont);
    }
}

#[test]
fn test_mismatched_dropout_schedule_fails() {
    let config = TabularModelConfig::default()
        .with_layers(vec![200, 100])
        .with_ps(DropoutSchedule::PerLayer(vec![0.1]));

    let result = TabularModel::new(vec![EmbeddingSize::new(4, 2)], 0, 1, config);
    assert!(matches!(result, Err(DeeptabError::ConfigError(_))));
}

#[test]
fn test_empty_layers_direct_projection() {
    let config = TabularModelConfig::default().with_layers(vec![]);
    let mut model = TabularModel::new(vec![EmbeddingSize::new(4, 3)], 1, 2, config).unwrap();
    assert_eq!(model.num_blocks(), 1);

    let x_cat = arr2(&[[0_usize], [3]]);
    let x_cont = arr2(&[[1.0], [-1.0]]);
    let out = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    assert_eq!(out.shape(), &[2, 2]);
}

#[test]
fn test_categorical_only_model() {
    let config = TabularModelConfig::default().with_layers(vec![16]);
    let mut model = TabularModel::new(vec![EmbeddingSize::new(5, 3)], 0, 1, config).unwrap();

    let x_cat = arr2(&[[0_usize], [4], [2]]);
    let out = model.forward(Some(&x_cat), None).unwrap();
    assert_eq!(out.shape(), &[3, 1]);
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn test_continuous_only_model() {
    let config = TabularModelConfig::default().with_layers(vec![16]);
    let mut model = TabularModel::new(vec![], 3, 1, config).unwrap();
    assert_eq!(model.n_emb(), 0);

    let x_cont = arr2(&[
        [0.1, 0.2, 0.3],
        [1.0, -1.0, 0.5],
        [2.0, 0.0, -0.5],
        [0.4, 0.6, 0.8],
    ]);
    let out = model.forward(None, Some(&x_cont)).unwrap();
    assert_eq!(out.shape(), &[4, 1]);
}

#[test]
fn test_y_range_bounds_output() {
    let config = TabularModelConfig::default()
        .with_layers(vec![8])
        .with_y_range(0.0, 5.0);
    let mut model = TabularModel::new(vec![EmbeddingSize::new(6, 4)], 1, 1, config).unwrap();
    model.eval();

    let x_cat = arr2(&[[0_usize], [5], [3], [1]]);
    let x_cont = arr2(&[[1.5], [-1.5], [0.0], [0.75]]);
    let out = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    for &v in out.iter() {
        assert!(v > 0.0 && v < 5.0, "output {} escaped the range", v);
    }
}

#[test]
fn test_shape_mismatch_is_reported() {
    let mut model = small_mixed_model(TabularModelConfig::default());

    // wrong categorical width
    let r = model.forward(Some(&arr2(&[[1_usize]])), Some(&arr2(&[[0.0, 0.0]])));
    assert!(matches!(r, Err(DeeptabError::ShapeError { .. })));

    // wrong continuous width
    let r = model.forward(Some(&arr2(&[[1_usize, 2]])), Some(&arr2(&[[0.0]])));
    assert!(matches!(r, Err(DeeptabError::ShapeError { .. })));

    // missing continuous side
    let r = model.forward(Some(&arr2(&[[1_usize, 2]])), None);
    assert!(matches!(r, Err(DeeptabError::ShapeError { .. })));

    // disagreeing row counts
    let cats = arr2(&[[1_usize, 2], [0, 0]]);
    let conts = arr2(&[[0.0, 0.0]]);
    let r = model.forward(Some(&cats), Some(&conts));
    assert!(matches!(r, Err(DeeptabError::ShapeError { .. })));

    // empty batch
    let cats = Array2::<usize>::zeros((0, 2));
    let conts = Array2::<f64>::zeros((0, 2));
    let r = model.forward(Some(&cats), Some(&conts));
    assert!(matches!(r, Err(DeeptabError::ShapeError { .. })));
}

#[test]
fn test_seeded_construction_is_deterministic() {
    let config = TabularModelConfig::default()
        .with_ps(DropoutSchedule::Uniform(0.3))
        .with_seed(7);
    let mut a = small_mixed_model(config.clone());
    let mut b = small_mixed_model(config);

    let x_cat = arr2(&[[2_usize, 12], [1, 5], [3, 16]]);
    let x_cont = arr2(&[[0.5, -0.5], [1.0, 0.0], [-1.0, 2.0]]);

    let out_a = a.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    let out_b = b.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    assert_eq!(out_a, out_b);
}

#[test]
fn test_train_mode_dropout_varies_eval_does_not() {
    let config = TabularModelConfig::default()
        .with_layers(vec![64])
        .with_ps(DropoutSchedule::Uniform(0.5))
        .with_use_bn(false)
        .with_bn_cont(false);
    let mut model = TabularModel::new(vec![EmbeddingSize::new(4, 2)], 1, 1, config).unwrap();

    let x_cat = arr2(&[[0_usize], [1], [2], [3]]);
    let x_cont = arr2(&[[0.25], [0.5], [0.75], [1.0]]);

    let first = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    let second = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    assert_ne!(first, second, "dropout masks should differ between calls");

    model.eval();
    let third = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    let fourth = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    assert_eq!(third, fourth, "eval mode must be deterministic");
}

#[test]
fn test_from_schema_with_overrides() {
    let schema = TabularSchema::new()
        .with_categorical("workclass", (0..4).map(|i| format!("w{}", i)).collect())
        .with_categorical("education", (0..17).map(|i| format!("e{}", i)).collect())
        .with_continuous("age")
        .with_continuous("hours_per_week");
    let overrides: HashMap<String, usize> = [("workclass".to_string(), 2)].into();

    let mut model =
        TabularModel::from_schema(&schema, Some(&overrides), 2, TabularModelConfig::default())
            .unwrap();
    // workclass overridden to 2 wide, education resolved to 8 by the rule
    assert_eq!(model.n_emb(), 10);
    assert_eq!(model.n_cont(), 2);
    assert_eq!(model.input_width(), 12);

    let x_cat = arr2(&[[2_usize, 12], [0, 16]]);
    let x_cont = arr2(&[[39.0, 40.0], [50.0, 13.0]]);
    let out = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    assert_eq!(out.shape(), &[2, 2]);
}

#[test]
fn test_dataframe_to_model_pipeline() {
    let df = df!(
        "color" => &["red", "green", "blue", "red", "green"],
        "size" => &["s", "m", "l", "s", "m"],
        "weight" => &[1.2, 3.4, 5.6, 1.1, 3.3],
        "price" => &[10.0, 20.0, 30.0, 12.0, 21.0]
    )
    .unwrap();

    let schema = TabularSchema::from_dataframe(&df, &["color", "size"], &["weight"]).unwrap();
    let mut model =
        TabularModel::from_schema(&schema, None, 1, TabularModelConfig::default()).unwrap();
    assert_eq!(model.n_cont(), 1);
    // both columns have three categories and resolve to three wide
    assert_eq!(model.n_emb(), 6);

    let x_cat = arr2(&[[0_usize, 1], [2, 0], [1, 2]]);
    let x_cont = arr2(&[[1.2], [5.6], [3.4]]);
    let out = model.forward(Some(&x_cat), Some(&x_cont)).unwrap();
    assert_eq!(out.shape(), &[3, 1]);
    assert!(out.iter().all(|v| v.is_finite()));
}
