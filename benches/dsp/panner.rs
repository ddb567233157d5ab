//! Benchmarks for 3D positioning gains and the head-shadow filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use soundstage::dsp::panner::{OnePole, SpatialGains, SHADOW_CUTOFF_HZ};

use crate::{test_signal, BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_panner(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/panner");

    group.bench_function("gains_from_position", |b| {
        b.iter(|| SpatialGains::from_position(black_box(-3.0), black_box(0.0), black_box(-2.0)))
    });

    for &size in BLOCK_SIZES {
        let signal = test_signal(size);
        let mut left = signal.clone();
        let mut right = signal.clone();
        let gains = SpatialGains::from_position(-3.0, 0.0, -2.0);
        let coeff = OnePole::coefficient(SHADOW_CUTOFF_HZ, SAMPLE_RATE);
        let (mut shadow_l, mut shadow_r) = (OnePole::default(), OnePole::default());

        group.bench_with_input(BenchmarkId::new("position_and_shadow", size), &size, |b, _| {
            b.iter(|| {
                let (mix_l, mix_r) = gains.shadow_mix();
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let (pl, pr) = gains.apply(*l, *r);
                    *l = pl + mix_l * (shadow_l.process(pl, coeff) - pl);
                    *r = pr + mix_r * (shadow_r.process(pr, coeff) - pr);
                }
                black_box(&mut left);
            })
        });
    }

    group.finish();
}
