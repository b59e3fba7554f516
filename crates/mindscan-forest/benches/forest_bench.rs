//! Criterion benchmarks for mindscan-forest: training, prediction, search.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use mindscan_forest::{
    CrossValidation, DecisionTreeConfig, ModelSpec, ParamGrid, RandomForestConfig,
    RandomizedSearch,
};

fn make_classification(
    n_samples: usize,
    n_features: usize,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % 2;
        labels.push(class);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 3 { class as f64 * 1.5 } else { 0.0 };
                base + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    let names: Vec<String> = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, labels, names)
}

fn bench_tree_fit(c: &mut Criterion) {
    let (features, labels, _) = make_classification(1000, 20, 42);
    let cfg = DecisionTreeConfig::new();

    c.bench_function("tree_fit_1000x20", |b| {
        b.iter(|| cfg.fit(&features, &labels).unwrap());
    });
}

fn bench_forest_train(c: &mut Criterion) {
    let (features, labels, names) = make_classification(500, 20, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);

    c.bench_function("forest_train_500x20_50trees", |b| {
        b.iter(|| cfg.fit(&features, &labels, &names).unwrap());
    });
}

fn bench_forest_predict_batch(c: &mut Criterion) {
    let (features, labels, names) = make_classification(500, 20, 42);
    let forest = RandomForestConfig::new(50)
        .unwrap()
        .fit(&features, &labels, &names)
        .unwrap()
        .into_forest();

    c.bench_function("forest_predict_batch_500x20_50trees", |b| {
        b.iter(|| forest.predict_batch(&features).unwrap());
    });
}

fn bench_tree_search(c: &mut Criterion) {
    let (features, labels, names) = make_classification(300, 10, 42);
    let grid = ParamGrid::new()
        .with("max_depth", [Some(3usize), Some(7), None])
        .with("min_samples_leaf", [1usize, 5])
        .with("criterion", ["gini", "entropy"]);
    let search = RandomizedSearch::new(8)
        .unwrap()
        .with_cv(CrossValidation::new(3).unwrap());
    let template = ModelSpec::DecisionTree(DecisionTreeConfig::new());

    c.bench_function("tree_search_300x10_8x3", |b| {
        b.iter(|| {
            search
                .fit(&template, &grid, &features, &labels, &names)
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_tree_fit,
    bench_forest_train,
    bench_forest_predict_batch,
    bench_tree_search
);
criterion_main!(benches);
