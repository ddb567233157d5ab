//! Benchmarks for the stereo-linked compressor.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use soundstage::dsp::compressor::Compressor;

use crate::{test_signal, BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_compressor(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/compressor");

    for &size in BLOCK_SIZES {
        let signal = test_signal(size);
        let mut left = signal.clone();
        let mut right = signal.clone();
        let mut compressor = Compressor::new();
        compressor.prepare(SAMPLE_RATE);

        group.bench_with_input(BenchmarkId::new("process", size), &size, |b, _| {
            b.iter(|| {
                left.copy_from_slice(&signal);
                right.copy_from_slice(&signal);
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    compressor.process_frame(l, r, black_box(-24.0), black_box(4.0));
                }
            })
        });
    }

    group.finish();
}
