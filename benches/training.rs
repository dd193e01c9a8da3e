use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use offense_predictor::preprocessing::Dataset;
use offense_predictor::training::{MLPClassifier, MLPConfig, Trainer, TrainingConfig};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Five label-encoded features and a target drawn from a handful of codes
fn create_encoded_data(n_rows: usize, n_classes: usize) -> Dataset {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);

    let features = Array2::from_shape_fn((n_rows, 5), |_| rng.gen_range(0..12) as f64);
    let target: Array1<usize> = features
        .rows()
        .into_iter()
        .map(|row| (row[0] as usize + row[3] as usize) % n_classes)
        .collect();
    let names = (0..5).map(|i| format!("feature_{}", i)).collect();

    Dataset::new(features, target, names, "Offense").unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [500, 2000, 5000].iter() {
        let dataset = create_encoded_data(*n_rows, 4);

        group.bench_with_input(BenchmarkId::new("train", n_rows), &dataset, |b, dataset| {
            b.iter(|| {
                let trainer = Trainer::new(TrainingConfig::new().with_epochs(10));
                trainer.train(black_box(dataset)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let train = create_encoded_data(2000, 4);
    let mut model = MLPClassifier::new(MLPConfig {
        max_epochs: 10,
        ..Default::default()
    });
    model.fit(&train.features, &train.target).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let test = create_encoded_data(*n_rows, 4);

        group.bench_with_input(BenchmarkId::new("predict", n_rows), &test.features, |b, x| {
            b.iter(|| model.predict(black_box(x)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
