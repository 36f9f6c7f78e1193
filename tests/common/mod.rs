#![allow(dead_code)]

use approx::assert_relative_eq;
use nalgebra::Vector3;
use orrery::{
    constants::{NaifId, SECONDS_PER_DAY},
    kernel::{
        spk_type::SpkDataType,
        writer::{SegmentSpec, SpkWriter},
    },
    Kernel, Orrery, TimeScales,
};

pub const DAY: f64 = SECONDS_PER_DAY;

/// Degree-1 records moving `target` linearly: `origin + rate * (et - start)`.
pub fn linear_segment(
    target: NaifId,
    center: NaifId,
    start_day: f64,
    days: usize,
    origin: Vector3<f64>,
    rate: Vector3<f64>,
) -> SegmentSpec {
    let series = (0..days)
        .map(|i| {
            let mid = origin + rate * ((i as f64 + 0.5) * DAY);
            let half = rate * (0.5 * DAY);
            vec![mid.x, half.x, mid.y, half.y, mid.z, half.z]
        })
        .collect();
    SegmentSpec::uniform(
        target,
        center,
        start_day * DAY,
        DAY,
        series,
        SpkDataType::ChebyshevPositionOnly,
    )
    .unwrap()
}

/// A body at rest at `position` relative to its center.
pub fn fixed_segment(
    target: NaifId,
    center: NaifId,
    start_day: f64,
    days: usize,
    position: Vector3<f64>,
) -> SegmentSpec {
    linear_segment(target, center, start_day, days, position, Vector3::zeros())
}

/// Sun, Earth-Moon barycenter, Earth and Moon over `[-10, 10)` days from J2000.
pub fn small_system() -> SpkWriter {
    SpkWriter::new("SMALL SYSTEM")
        .comment("synthetic kernel for tests")
        .segment(fixed_segment(10, 0, -10.0, 20, Vector3::new(-700.0, 0.0, 0.0)))
        .segment(linear_segment(
            3,
            0,
            -10.0,
            20,
            Vector3::new(1.496e8, -8.0e6, 0.0),
            Vector3::new(0.0, 29.78, 0.0),
        ))
        .segment(fixed_segment(399, 3, -10.0, 20, Vector3::new(-4_670.0, 0.0, 0.0)))
        .segment(linear_segment(
            301,
            3,
            -10.0,
            20,
            Vector3::new(379_730.0, -1.0e4, 0.0),
            Vector3::new(0.0, 1.02, 0.0),
        ))
}

pub fn small_system_kernel() -> Kernel {
    Kernel::from_bytes("small.bsp", small_system().to_bytes()).unwrap()
}

pub fn small_orrery() -> Orrery {
    Orrery::new(vec![small_system_kernel()], TimeScales::default(), 64)
}

pub fn assert_vector_close(actual: &Vector3<f64>, expected: &Vector3<f64>, epsilon: f64) {
    assert_relative_eq!(actual.x, expected.x, epsilon = epsilon);
    assert_relative_eq!(actual.y, expected.y, epsilon = epsilon);
    assert_relative_eq!(actual.z, expected.z, epsilon = epsilon);
}
