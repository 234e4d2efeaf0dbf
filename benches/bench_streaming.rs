use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use driftga::{
    ensemble::{
        Ddm, EnsembleConfig, EnsembleController, Example, Learner, MajorityClass, NaiveBayes,
        OptimizationMode, Perceptron, Schema,
    },
    rng::RandomNumberGenerator,
};

// The class boundary flips halfway through the stream.
fn drifting_stream(len: usize, seed: u64) -> Vec<Example> {
    let mut rng = RandomNumberGenerator::from_seed(seed);
    (0..len)
        .map(|i| {
            let x = rng.next_f64();
            let y = rng.next_f64();
            let above = x + y > 1.0;
            let class = if i < len / 2 { above } else { !above };
            Example::new(vec![x, y], usize::from(class))
        })
        .collect()
}

fn templates() -> Vec<Box<dyn Learner>> {
    vec![
        Box::new(NaiveBayes::new()),
        Box::new(Perceptron::default()),
        Box::new(MajorityClass::new()),
    ]
}

fn controller(config: EnsembleConfig) -> EnsembleController {
    EnsembleController::new(
        config,
        templates(),
        Box::new(Ddm::default()),
        Schema::new(2, 2).unwrap(),
    )
    .unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    let stream = drifting_stream(2000, 5);

    for size in [5, 20].iter() {
        let config = EnsembleConfig::builder()
            .initial_size(*size)
            .hidden_size(*size)
            .max_size(*size * 2)
            .optimization_enabled(false)
            .build();

        group.bench_with_input(BenchmarkId::new("no_optimization", size), &config, |b, config| {
            b.iter_batched(
                || controller(config.clone()),
                |mut controller| {
                    for example in &stream {
                        controller.train(black_box(example)).unwrap();
                    }
                    controller
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_drift_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("drift_recovery");
    group.sample_size(10);
    let stream = drifting_stream(2000, 9);

    for mode in [OptimizationMode::Inline, OptimizationMode::Detached].iter() {
        let config = EnsembleConfig::builder()
            .initial_size(5)
            .hidden_size(5)
            .max_size(15)
            .epochs(20)
            .max_evaluations(300)
            .buffer_capacity(300)
            .mode(*mode)
            .build();

        group.bench_with_input(BenchmarkId::from_parameter(format!("{:?}", mode)), &config, |b, config| {
            b.iter_batched(
                || controller(config.clone()),
                |mut controller| {
                    for example in &stream {
                        controller.train(black_box(example)).unwrap();
                    }
                    controller.wait_for_optimization().unwrap();
                    controller
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_drift_recovery);
criterion_main!(benches);
