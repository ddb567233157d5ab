//! Benchmarks for the equalizer's biquad sections.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use soundstage::dsp::biquad::{BiquadCoeffs, BiquadState};
use soundstage::dsp::FilterShape;

use crate::{test_signal, BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_biquad(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/biquad");

    for &size in BLOCK_SIZES {
        let signal = test_signal(size);
        let mut buffer = signal.clone();

        let peaking = BiquadCoeffs::design(FilterShape::Peaking, 1_000.0, 6.0, 1.0, SAMPLE_RATE);
        let mut state = BiquadState::default();
        group.bench_with_input(BenchmarkId::new("peaking", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&signal);
                state.render(black_box(&mut buffer), black_box(&peaking));
            })
        });

        // ten sections in series, like the full equalizer
        let bank: Vec<BiquadCoeffs> = (0..10)
            .map(|i| {
                let freq = 32.0 * 2f32.powi(i);
                let shape = match i {
                    0 => FilterShape::LowShelf,
                    9 => FilterShape::HighShelf,
                    _ => FilterShape::Peaking,
                };
                BiquadCoeffs::design(shape, freq, 3.0, 1.0, SAMPLE_RATE)
            })
            .collect();
        let mut states = vec![BiquadState::default(); bank.len()];
        group.bench_with_input(BenchmarkId::new("ten_band", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&signal);
                for (state, coeffs) in states.iter_mut().zip(bank.iter()) {
                    state.render(black_box(&mut buffer), coeffs);
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("design", size), &size, |b, _| {
            b.iter(|| {
                BiquadCoeffs::design(
                    black_box(FilterShape::Peaking),
                    black_box(1_000.0),
                    black_box(6.0),
                    1.0,
                    SAMPLE_RATE,
                )
            })
        });
    }

    group.finish();
}
