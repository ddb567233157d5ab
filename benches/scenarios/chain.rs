//! Benchmarks for the full processing chain.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use soundstage::{
    equalizer::EqualizerEngine,
    graph::{
        analyser::AnalysisConfig,
        builder::{GraphBuilder, GraphConfig},
        compressor::CompressionState,
        panner::Position,
        source::{BufferSource, MediaSource, SourceCommand, StereoBuffer},
        ProcessingChain,
    },
};

use crate::{test_signal, BLOCK_SIZES, SAMPLE_RATE};

fn playing_chain(config: GraphConfig) -> ProcessingChain {
    let signal = test_signal(SAMPLE_RATE as usize);
    let buffer = StereoBuffer::new(signal.clone(), signal, SAMPLE_RATE);
    let mut source = BufferSource::new(buffer).looping(true);
    source.apply(SourceCommand::Play);

    let (mut chain, control) = ProcessingChain::new(Box::new(source), SAMPLE_RATE, 0.8, 0.01, 256);
    GraphBuilder::new(config)
        .install(&mut chain, &control)
        .expect("bench chain builds");
    chain
}

pub fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chain");

    let mut equalizer = EqualizerEngine::new();
    equalizer.apply_preset("Rock").expect("catalog preset");

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        // === BARE: source and master gain only ===
        let mut bare = playing_chain(GraphConfig::default());
        group.bench_with_input(BenchmarkId::new("bare", size), &size, |b, _| {
            b.iter(|| bare.process_block(black_box(&mut left), black_box(&mut right)))
        });

        // === EQUALIZER: ten bands ===
        let mut eq_only = playing_chain(GraphConfig {
            equalizer: Some(equalizer.band_specs()),
            ..GraphConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("equalizer", size), &size, |b, _| {
            b.iter(|| eq_only.process_block(black_box(&mut left), black_box(&mut right)))
        });

        // === FULL: compression, equalizer, spatial and analysis ===
        let mut full = playing_chain(GraphConfig {
            equalizer: Some(equalizer.band_specs()),
            compression: Some(CompressionState::default()),
            spatial: Some(Position::new(-3.0, 0.0, -2.0)),
            analysis: Some(AnalysisConfig::default()),
            ..GraphConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("full", size), &size, |b, _| {
            b.iter(|| full.process_block(black_box(&mut left), black_box(&mut right)))
        });
    }

    group.finish();
}
