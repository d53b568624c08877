//! Latency benchmarks for the scoring pipeline
//!
//! Single-text scoring is on the request path of every HTTP call, so it
//! should stay well under a millisecond for typical comment lengths.
//!
//! Run with: cargo bench -p toxiscan-classifiers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use toxiscan_classifiers::{
    CalibrationStrategy, DocFrequency, ModelArtifact, Normalizer, RangeStretch, TextNormalizer,
    ToxicityPredictor, VectorizerConfig,
};

const TRAINING_CORPUS: &[&str] = &[
    "you are a stupid idiot",
    "what a great video thanks",
    "this channel is garbage and so are you",
    "loved the music in this one",
    "nobody cares about your stupid opinion",
    "amazing editing great job",
    "worst video ever made idiot",
    "thanks for sharing this great tutorial",
];

const TEST_CASES: &[(&str, &str)] = &[
    ("short_clean", "Nice video!"),
    ("short_toxic", "You're an idiot"),
    (
        "medium_clean",
        "I really enjoyed the editing in this one, the music choice at 3:15 was perfect. Keep it up!",
    ),
    (
        "medium_toxic",
        "This is the stupidest garbage I've ever seen, you should be ashamed https://spam.example",
    ),
];

fn build_predictor() -> ToxicityPredictor {
    let normalizer = Arc::new(TextNormalizer::lemmatizing().unwrap());
    let corpus: Vec<String> = TRAINING_CORPUS
        .iter()
        .map(|t| normalizer.normalize(t))
        .collect();

    let vectorizer = VectorizerConfig {
        min_df: DocFrequency::Count(1),
        ..Default::default()
    }
    .fit(&corpus)
    .unwrap();

    let mut coefficients = vec![0.0; vectorizer.vocabulary_size()];
    for term in ["stupid", "idiot", "garbage", "worst"] {
        if let Some(index) = vectorizer.term_index(term) {
            coefficients[index] = 4.0;
        }
    }
    let model = ModelArtifact::LogisticRegression {
        coefficients,
        intercept: -0.2,
    }
    .into_classifier()
    .unwrap();

    ToxicityPredictor::new(
        normalizer,
        Arc::new(vectorizer),
        Arc::new(model),
        Arc::new(RangeStretch::default()),
    )
    .unwrap()
}

/// Benchmark text normalization
fn benchmark_normalizer(c: &mut Criterion) {
    let normalizer = TextNormalizer::lemmatizing().expect("Failed to create normalizer");

    let mut group = c.benchmark_group("Normalizer");
    group.sample_size(100);

    for &(name, text) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("normalize", name), &text, |b, text| {
            b.iter(|| normalizer.normalize(black_box(text)))
        });
    }

    group.finish();
}

/// Benchmark the calibration layer alone
fn benchmark_calibration(c: &mut Criterion) {
    let strategy = RangeStretch::default();

    c.bench_function("RangeStretch/decide", |b| {
        b.iter(|| strategy.decide(black_box(0.463)).unwrap())
    });
}

/// Benchmark end-to-end single and batch scoring
fn benchmark_predictor(c: &mut Criterion) {
    let predictor = build_predictor();

    let mut group = c.benchmark_group("Predictor");
    group.significance_level(0.05);
    group.sample_size(100);

    for &(name, text) in TEST_CASES {
        group.bench_with_input(BenchmarkId::new("predict_one", name), &text, |b, text| {
            b.iter(|| predictor.predict_one(black_box(text)).unwrap())
        });
    }

    let batch: Vec<&str> = TEST_CASES.iter().map(|(_, t)| *t).cycle().take(100).collect();
    group.bench_function("predict_batch_100", |b| {
        b.iter(|| predictor.predict_batch(black_box(&batch), 100).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_normalizer,
    benchmark_calibration,
    benchmark_predictor
);
criterion_main!(benches);
