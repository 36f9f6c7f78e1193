mod common;

use camino::Utf8PathBuf;
use common::{fixed_segment, linear_segment, small_system, DAY};
use nalgebra::Vector3;
use nom::number::Endianness;
use orrery::{
    kernel::{segment::SegmentId, with_kernel, writer::SpkWriter},
    Kernel, OrreryError,
};

fn write_temp(bytes: &[u8]) -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::try_from(dir.path().join("test.bsp")).unwrap();
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}

#[test]
fn open_mapped_kernel() {
    let (_dir, path) = write_temp(&small_system().to_bytes());
    let kernel = Kernel::open(&path).unwrap();

    assert_eq!(kernel.path(), path.as_str());
    assert_eq!(kernel.segments().len(), 4);
    assert_eq!(kernel.bodies(), vec![0, 3, 10, 301, 399]);
    assert_eq!(
        kernel.links().collect::<Vec<_>>(),
        vec![(0, 3), (0, 10), (3, 301), (3, 399)]
    );
    assert!(kernel.comments().contains("synthetic kernel for tests"));
    assert_eq!(kernel.header().internal_filename.trim(), "SMALL SYSTEM");

    let (p, v) = kernel.evaluate_link(3, 399, 0.0).unwrap();
    assert_eq!(p, Vector3::new(-4_670.0, 0.0, 0.0));
    assert_eq!(v, Vector3::zeros());
    kernel.close();
}

#[test]
fn big_endian_kernel_reads_the_same() {
    let little = Kernel::from_bytes("le.bsp", small_system().to_bytes()).unwrap();
    let big = Kernel::from_bytes("be.bsp", small_system().big_endian().to_bytes()).unwrap();
    assert_eq!(little.endianness(), Endianness::Little);
    assert_eq!(big.endianness(), Endianness::Big);

    for et in [-9.5 * DAY, -0.25 * DAY, 3.7 * DAY] {
        assert_eq!(
            little.evaluate_link(3, 301, et).unwrap(),
            big.evaluate_link(3, 301, et).unwrap()
        );
    }
}

#[test]
fn with_kernel_releases_on_error() {
    let (_dir, path) = write_temp(&small_system().to_bytes());
    let err = with_kernel(&path, |k| k.evaluate_link(3, 301, 50.0 * DAY)).unwrap_err();
    assert!(matches!(err, OrreryError::OutOfRange { center: 3, target: 301, .. }));

    let n = with_kernel(&path, |k| Ok(k.segments().len())).unwrap();
    assert_eq!(n, 4);
}

#[test]
fn rejects_files_that_are_not_kernels() {
    let (_dir, path) = write_temp(&[0u8; 2048]);
    assert!(matches!(Kernel::open(&path), Err(OrreryError::Format { .. })));

    let mut truncated = small_system().to_bytes();
    truncated.truncate(1500);
    assert!(matches!(
        Kernel::from_bytes("cut.bsp", truncated),
        Err(OrreryError::Format { .. })
    ));

    let missing = Utf8PathBuf::from("/nonexistent/kernel.bsp");
    assert!(matches!(Kernel::open(&missing), Err(OrreryError::IoError { .. })));
}

#[test]
fn corrupted_directory_footer_is_a_format_error() {
    let writer = SpkWriter::new("FOOTER").segment(fixed_segment(
        301,
        399,
        0.0,
        4,
        Vector3::new(384_000.0, 0.0, 0.0),
    ));
    let bytes = writer.to_bytes();
    let last_word = Kernel::from_bytes("ok.bsp", bytes.clone()).unwrap().segments()[0]
        .summary
        .final_addr as usize;

    let patch = |rsize: f64, n_records: f64| {
        let mut patched = bytes.clone();
        let rsize_at = (last_word - 2) * 8;
        patched[rsize_at..rsize_at + 8].copy_from_slice(&rsize.to_le_bytes());
        patched[rsize_at + 8..rsize_at + 16].copy_from_slice(&n_records.to_le_bytes());
        Kernel::from_bytes("patched.bsp", patched)
    };

    let huge = patch(3.0 * 2f64.powi(40) + 2.0, 2f64.powi(62) + 2.0);
    assert!(matches!(huge, Err(OrreryError::Format { .. })), "{huge:?}");
    assert!(matches!(patch(8.5, 4.0), Err(OrreryError::Format { .. })));
    assert!(matches!(patch(8.0, -4.0), Err(OrreryError::Format { .. })));
}

#[test]
fn handover_between_adjacent_segments() {
    // Earth -> Moon valid [0, 10) and [10, 20) days.
    let bytes = SpkWriter::new("HANDOVER")
        .segment(fixed_segment(301, 399, 0.0, 10, Vector3::new(1.0, 0.0, 0.0)))
        .segment(fixed_segment(301, 399, 10.0, 10, Vector3::new(2.0, 0.0, 0.0)))
        .to_bytes();
    let kernel = Kernel::from_bytes("handover.bsp", bytes).unwrap();

    let segments = kernel.segments_for(399, 301);
    assert_eq!(segments.len(), 2);
    assert!(segments[0].start() < segments[1].start());

    assert_eq!(kernel.segment_at(399, 301, 10.0 * DAY).unwrap(), SegmentId(1));
    assert_eq!(kernel.segment_at(399, 301, 9.999 * DAY).unwrap(), SegmentId(0));
    assert_eq!(kernel.evaluate_link(399, 301, 10.0 * DAY).unwrap().0.x, 2.0);

    match kernel.segment_at(399, 301, 20.0 * DAY) {
        Err(OrreryError::OutOfRange { coverage, .. }) => {
            assert_eq!(coverage, Some((0.0, 20.0 * DAY)));
        }
        other => panic!("expected OutOfRange, got {other:?}"),
    }
    assert!(kernel.segments_for(301, 399).is_empty());
}

#[test]
fn overlapping_segments_prefer_the_latest_start() {
    let bytes = SpkWriter::new("OVERLAP")
        .segment(fixed_segment(5, 0, 0.0, 20, Vector3::new(1.0, 0.0, 0.0)))
        .segment(fixed_segment(5, 0, 5.0, 5, Vector3::new(2.0, 0.0, 0.0)))
        .to_bytes();
    let kernel = Kernel::from_bytes("overlap.bsp", bytes).unwrap();

    assert_eq!(kernel.evaluate_link(0, 5, 4.0 * DAY).unwrap().0.x, 1.0);
    assert_eq!(kernel.evaluate_link(0, 5, 7.0 * DAY).unwrap().0.x, 2.0);
    // Back to the long segment once the short one ends.
    assert_eq!(kernel.evaluate_link(0, 5, 12.0 * DAY).unwrap().0.x, 1.0);
}

#[test]
fn linear_motion_is_reproduced() {
    let rate = Vector3::new(1.5, -0.5, 0.25);
    let origin = Vector3::new(100.0, 200.0, 300.0);
    let bytes = SpkWriter::new("LINEAR")
        .segment(linear_segment(7, 0, -3.0, 6, origin, rate))
        .to_bytes();
    let kernel = Kernel::from_bytes("linear.bsp", bytes).unwrap();

    for k in 0..12 {
        let dt = k as f64 * 0.5 * DAY;
        let (p, v) = kernel.evaluate_link(0, 7, -3.0 * DAY + dt).unwrap();
        common::assert_vector_close(&p, &(origin + rate * dt), 1e-6);
        common::assert_vector_close(&v, &rate, 1e-12);
    }
}
