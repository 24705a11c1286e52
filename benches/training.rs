use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use sbpe::{BpeTokenizer, Trainer, TrainerConfig};

const WORDS: &[&str] = &[
    "lower", "lowest", "newer", "newest", "wider", "widest", "token", "tokens", "tokenizer",
    "merge", "merges", "merged", "pair", "pairs", "vocabulary", "frequency", "the", "and",
];

fn build_corpus(words: usize) -> String {
    let mut text = String::with_capacity(words * 8);
    for idx in 0..words {
        if idx > 0 {
            text.push(' ');
        }
        // Skewed repetition so some words are far more frequent than others.
        text.push_str(WORDS[(idx * idx + idx / 3) % WORDS.len()]);
    }
    text
}

fn config() -> TrainerConfig {
    TrainerConfig::builder()
        .vocab_size(400)
        .max_merges(300)
        .min_frequency(2)
        .show_progress(false)
        .build()
        .expect("configuration")
}

fn bench_training(c: &mut Criterion) {
    let corpus = build_corpus(20_000);
    let cfg = config();

    let mut group = c.benchmark_group("train_text_corpus");
    group.throughput(Throughput::Bytes(corpus.len() as u64));
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);
    group.bench_function(BenchmarkId::from_parameter("words_20k"), |b| {
        b.iter(|| {
            let trainer = Trainer::new(cfg.clone());
            let artifacts = trainer.train(&corpus).expect("training");
            let _ = black_box(artifacts);
        });
    });
    group.finish();
}

fn bench_tokenize(c: &mut Criterion) {
    let corpus = build_corpus(20_000);
    let mut tokenizer = BpeTokenizer::new(config());
    tokenizer.train(&corpus).expect("training");
    let sample = build_corpus(2_000);

    let mut group = c.benchmark_group("tokenize_text");
    group.throughput(Throughput::Bytes(sample.len() as u64));
    group.bench_function(BenchmarkId::from_parameter("words_2k"), |b| {
        b.iter(|| {
            let ids = tokenizer.tokenize(black_box(&sample)).expect("tokenize");
            black_box(ids)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_training, bench_tokenize);
criterion_main!(benches);
