//! Benchmarks for the visualizer's spectrum analysis.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use soundstage::dsp::spectrum::SpectrumAnalyzer;

use crate::test_signal;

const FFT_SIZES: &[usize] = &[512, 1024, 2048];

pub fn bench_spectrum(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/spectrum");

    for &size in FFT_SIZES {
        let signal = test_signal(size);
        let mut analyzer = SpectrumAnalyzer::new(size, -100.0, -30.0, 0.8);

        group.bench_with_input(BenchmarkId::new("update", size), &size, |b, _| {
            b.iter(|| {
                analyzer.update(black_box(&signal));
                black_box(analyzer.data());
            })
        });
    }

    group.finish();
}
