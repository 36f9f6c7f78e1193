use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nalgebra::Vector3;
use orrery::{
    constants::J2000,
    kernel::{
        spk_type::SpkDataType,
        writer::{SegmentSpec, SpkWriter},
    },
    Body, Frame, Instant, Kernel, Orrery, TimeScale, TimeScales, Topos,
};

const DAY: f64 = 86_400.0;

fn linear(target: i32, center: i32, origin: Vector3<f64>, rate: Vector3<f64>) -> SegmentSpec {
    let series = (0..400)
        .map(|i| {
            let mid = origin + rate * ((i as f64 + 0.5) * DAY);
            let half = rate * (0.5 * DAY);
            vec![mid.x, half.x, mid.y, half.y, mid.z, half.z]
        })
        .collect();
    SegmentSpec::uniform(
        target,
        center,
        -200.0 * DAY,
        DAY,
        series,
        SpkDataType::ChebyshevPositionOnly,
    )
    .unwrap()
}

fn orrery(cache_capacity: usize) -> Orrery {
    let bytes = SpkWriter::new("BENCH SYSTEM")
        .segment(linear(10, 0, Vector3::new(-700.0, 0.0, 0.0), Vector3::zeros()))
        .segment(linear(3, 0, Vector3::new(1.496e8, 0.0, 0.0), Vector3::new(0.0, 29.78, 0.0)))
        .segment(linear(399, 3, Vector3::new(-4_670.0, 0.0, 0.0), Vector3::zeros()))
        .segment(linear(301, 3, Vector3::new(379_730.0, 0.0, 0.0), Vector3::new(0.0, 1.02, 0.0)))
        .to_bytes();
    let kernel = Kernel::from_bytes("bench.bsp", bytes).unwrap();
    Orrery::new(vec![kernel], TimeScales::default(), cache_capacity)
}

fn bench_queries(c: &mut Criterion) {
    let uncached = orrery(0);
    let cached = orrery(1024);
    let t = Instant::from_jd(J2000 + 12.3, TimeScale::Tt);
    let site = Topos::new(-70.7380, -29.2563, 2_200.0).unwrap();

    c.bench_function("query/geometric_icrf", |b| {
        b.iter(|| uncached.state(Body::MOON, Body::Sun, black_box(t), Frame::Icrf).unwrap())
    });

    c.bench_function("query/geometric_icrf_cached", |b| {
        b.iter(|| cached.state(Body::MOON, Body::Sun, black_box(t), Frame::Icrf).unwrap())
    });

    c.bench_function("query/astrometric_true_of_date", |b| {
        b.iter(|| {
            uncached
                .astrometric(Body::Sun, Body::EARTH, black_box(t), Frame::TrueOfDate)
                .unwrap()
        })
    });

    c.bench_function("query/topocentric_horizon", |b| {
        b.iter(|| {
            uncached
                .state(Body::MOON, site, black_box(t), Frame::Horizon(site))
                .unwrap()
                .altaz()
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
