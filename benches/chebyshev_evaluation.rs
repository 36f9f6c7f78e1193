use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use nalgebra::Vector3;
use orrery::{
    chebyshev::{chebyshev_basis, ChebyshevRecord},
    kernel::{
        spk_type::SpkDataType,
        writer::{SegmentSpec, SpkWriter},
    },
    Kernel,
};

const DAY: f64 = 86_400.0;

/// A DE-like record: 13 coefficients per component over 16 days.
fn record(components: usize) -> ChebyshevRecord {
    let mut words = vec![0.0, 8.0 * DAY];
    for c in 0..components {
        words.extend((0..13).map(|k| (c as f64 + 1.0) * 1.0e5 / (1.0 + k as f64).powi(3)));
    }
    ChebyshevRecord::from_words(&words, components).expect("well-formed record")
}

fn bench_record(c: &mut Criterion) {
    let position_only = record(3);
    let with_velocity = record(6);

    c.bench_function("chebyshev/basis_13", |b| {
        b.iter(|| chebyshev_basis(black_box(0.37), black_box(13)))
    });

    c.bench_function("chebyshev/type2_record", |b| {
        b.iter(|| position_only.evaluate(black_box(1.5 * DAY)).unwrap())
    });

    c.bench_function("chebyshev/type3_record", |b| {
        b.iter(|| with_velocity.evaluate(black_box(-3.25 * DAY)).unwrap())
    });
}

fn bench_kernel_lookup(c: &mut Criterion) {
    let series = (0..2_000)
        .map(|i| {
            let x = i as f64;
            vec![x, 0.5, 0.01, x, 0.25, 0.0, x, 0.1, 0.0]
        })
        .collect();
    let spec = SegmentSpec::uniform(
        301,
        3,
        -1_000.0 * 4.0 * DAY,
        4.0 * DAY,
        series,
        SpkDataType::ChebyshevPositionOnly,
    )
    .unwrap();
    let kernel = Kernel::from_bytes("bench.bsp", SpkWriter::new("BENCH").segment(spec).to_bytes())
        .unwrap();

    c.bench_function("kernel/evaluate_link_random_epochs", |b| {
        let mut k = 0u64;
        b.iter_batched(
            || {
                k = k.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (k >> 11) as f64 / (1u64 << 53) as f64 * 7_999.0 * DAY - 4_000.0 * DAY
            },
            |et| {
                let (p, v): (Vector3<f64>, Vector3<f64>) = kernel.evaluate_link(3, 301, et).unwrap();
                black_box((p, v))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_record, bench_kernel_lookup);
criterion_main!(benches);
