//! # NAIF SPK kernel reader
//!
//! This module opens binary SPK kernels (NAIF DAF containers) and indexes their
//! segments. Opening a kernel performs the whole structural validation up
//! front:
//!
//! 1. the **file record** (identification word, summary layout, byte order, FTP string),
//! 2. the linked list of **summary records**, with cycle detection,
//! 3. each **segment descriptor** (coverage, addresses, type 2/3 directory).
//!
//! Any violation is an [`OrreryError::Format`] raised by [`Kernel::open`]; once a
//! [`Kernel`] exists, evaluation can only fail with range or data-type errors.
//!
//! ## Storage
//!
//! The file is memory-mapped read-only with `memmap2`, so a [`Kernel`] can be
//! shared across threads without locking. [`Kernel::from_bytes`] builds the same
//! index over an owned buffer. The mapping is released when the kernel is
//! dropped or explicitly with [`Kernel::close`].
//!
//! ## Segment lookup
//!
//! Segments are stored in an arena (`Vec<Segment>`) and grouped per
//! `(center, target)` link, sorted by start time. [`Kernel::segment_at`] binary
//! searches the start times and returns the unique segment whose right-open
//! interval `[start, end)` holds the epoch. When segments overlap, the one that
//! starts last wins.

pub mod daf_header;
pub mod directory;
pub mod jpl_header;
pub mod segment;
pub mod spk_type;
pub mod summary_record;
pub mod writer;

use std::{collections::BTreeMap, fmt, fs::File, ops::Deref};

use camino::Utf8Path;
use itertools::Itertools;
use memmap2::Mmap;
use nalgebra::Vector3;
use nom::number::{complete::f64 as daf_f64, Endianness};
use tracing::{debug, instrument, warn};

use crate::{
    constants::{NaifId, TdbSeconds, DAF_RECORD_BYTES},
    orrery_errors::{OrreryError, Result},
};

use daf_header::DafHeader;
use jpl_header::JplHeader;
use segment::{Segment, SegmentId};
use summary_record::Summary;

/// Backing storage of an opened kernel.
#[derive(Debug)]
enum KernelBytes {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Deref for KernelBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            KernelBytes::Mapped(map) => map,
            KernelBytes::Buffered(buf) => buf,
        }
    }
}

/// An opened, indexed SPK kernel.
#[derive(Debug)]
pub struct Kernel {
    path: String,
    header: DafHeader,
    endian: Endianness,
    bytes: KernelBytes,
    segments: Vec<Segment>,
    links: BTreeMap<(NaifId, NaifId), Vec<SegmentId>>,
}

impl Kernel {
    /// Memory-map and index an SPK file.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: Location of the `.bsp` kernel.
    ///
    /// Return
    /// ----------
    /// * The indexed kernel, [`OrreryError::IoError`] if the file cannot be
    ///   mapped, or [`OrreryError::Format`] if its structure is not a valid SPK.
    ///
    /// See also
    /// ------------
    /// * [`Kernel::from_bytes`] – Same index over an in-memory buffer.
    /// * [`with_kernel`] – Scoped open/close.
    #[instrument(skip_all, fields(path = %path.as_ref()))]
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| OrreryError::io(path.as_str(), e))?;
        // SAFETY: the mapping is read-only and kernels are not modified while open.
        let map = unsafe { Mmap::map(&file) }.map_err(|e| OrreryError::io(path.as_str(), e))?;
        Self::index(path.to_string(), KernelBytes::Mapped(map))
    }

    /// Index a kernel held in memory.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self> {
        Self::index(name.to_string(), KernelBytes::Buffered(bytes))
    }

    fn index(path: String, bytes: KernelBytes) -> Result<Self> {
        let (header, endian) = DafHeader::read(&bytes, &path)?;
        let segments = read_segments(&bytes, &header, endian, &path)?;

        let mut links: BTreeMap<(NaifId, NaifId), Vec<SegmentId>> = BTreeMap::new();
        for (i, segment) in segments.iter().enumerate() {
            if !segment.is_evaluable() {
                warn!(
                    kernel = %path,
                    center = segment.center(),
                    target = segment.target(),
                    data_type = segment.summary.data_type,
                    "skipping segment of a data type that cannot be evaluated"
                );
                continue;
            }
            links
                .entry((segment.center(), segment.target()))
                .or_default()
                .push(SegmentId(i));
        }
        for ids in links.values_mut() {
            // Stable sort: equal starts keep file order, so later segments win.
            ids.sort_by(|a, b| segments[a.0].start().total_cmp(&segments[b.0].start()));
        }

        debug!(
            kernel = %path,
            segments = segments.len(),
            links = links.len(),
            "indexed SPK kernel"
        );

        Ok(Kernel {
            path,
            header,
            endian,
            bytes,
            segments,
            links,
        })
    }

    /// Release the file mapping.
    ///
    /// Dropping the kernel has the same effect; this method makes the end of
    /// the kernel lifetime explicit at call sites.
    pub fn close(self) {
        debug!(kernel = %self.path, "closing SPK kernel");
        drop(self);
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn header(&self) -> &DafHeader {
        &self.header
    }

    pub fn endianness(&self) -> Endianness {
        self.endian
    }

    /// Every segment of the kernel, in file order, including the ones that
    /// cannot be evaluated.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.0]
    }

    /// Evaluable `(center, target)` links present in the kernel.
    pub fn links(&self) -> impl Iterator<Item = (NaifId, NaifId)> + '_ {
        self.links.keys().copied()
    }

    /// Body ids appearing as center or target of an evaluable segment, sorted.
    pub fn bodies(&self) -> Vec<NaifId> {
        self.links
            .keys()
            .flat_map(|&(c, t)| [c, t])
            .sorted()
            .dedup()
            .collect()
    }

    /// Segments of the direct link `center -> target`, sorted by start time.
    ///
    /// Return
    /// ----------
    /// * An empty vector when the kernel has no direct segment for the pair.
    pub fn segments_for(&self, center: NaifId, target: NaifId) -> Vec<&Segment> {
        self.segment_ids_for(center, target)
            .iter()
            .map(|id| &self.segments[id.0])
            .collect()
    }

    pub(crate) fn segment_ids_for(&self, center: NaifId, target: NaifId) -> &[SegmentId] {
        self.links
            .get(&(center, target))
            .map_or(&[], |ids| ids.as_slice())
    }

    /// Find the segment of `center -> target` whose `[start, end)` holds `et`.
    ///
    /// Return
    /// ----------
    /// * The segment id, or [`OrreryError::OutOfRange`] carrying the overall
    ///   coverage of the link (or `None` if the link does not exist).
    pub fn segment_at(&self, center: NaifId, target: NaifId, et: TdbSeconds) -> Result<SegmentId> {
        let ids = self.segment_ids_for(center, target);
        locate(ids, et, |id| &self.segments[id.0]).ok_or_else(|| OrreryError::OutOfRange {
            center,
            target,
            tdb_seconds: et,
            coverage: coverage(ids.iter().map(|id| &self.segments[id.0])),
        })
    }

    /// Evaluate one segment at `et`: position (km) and velocity (km/s) of its
    /// target relative to its center, in the segment frame.
    pub fn evaluate(&self, id: SegmentId, et: TdbSeconds) -> Result<(Vector3<f64>, Vector3<f64>)> {
        self.segments[id.0].evaluate(&self.bytes, self.endian, et)
    }

    /// Evaluate the direct link `center -> target` at `et`.
    pub fn evaluate_link(
        &self,
        center: NaifId,
        target: NaifId,
        et: TdbSeconds,
    ) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let id = self.segment_at(center, target, et)?;
        self.evaluate(id, et)
    }

    /// Text of the comment area, one line per NUL-terminated entry.
    pub fn comments(&self) -> String {
        let first = DAF_RECORD_BYTES;
        let last = (self.header.fward as usize - 1) * DAF_RECORD_BYTES;
        let mut text = String::new();
        for record in self.bytes[first..last].chunks(DAF_RECORD_BYTES) {
            let used = &record[..record.len().min(1000)];
            let end = used.iter().position(|b| *b == 4).unwrap_or(used.len());
            text.push_str(&String::from_utf8_lossy(&used[..end]).replace('\0', "\n"));
            if end < used.len() {
                break;
            }
        }
        text
    }

    /// JPL header embedded in the comments of DE kernels, when present.
    pub fn jpl_header(&self) -> Option<JplHeader> {
        JplHeader::parse(&self.comments()).ok().map(|(_, h)| h)
    }

    /// Bordered table listing every segment.
    pub fn summary_table(&self) -> String {
        self.segments.iter().map(|s| s.summary.to_string()).join("")
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        for segment in &self.segments {
            writeln!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Open a kernel, run `f` on it and close it on every exit path.
pub fn with_kernel<T>(path: impl AsRef<Utf8Path>, f: impl FnOnce(&Kernel) -> Result<T>) -> Result<T> {
    let kernel = Kernel::open(path)?;
    let result = f(&kernel);
    kernel.close();
    result
}

/// Binary search over the sorted segment starts.
///
/// Overlaps are resolved in favour of the latest start, so the scan walks back
/// from the last segment starting at or before `et`.
pub(crate) fn locate<'a, I: Copy>(
    ids: &[I],
    et: TdbSeconds,
    segment: impl Fn(I) -> &'a Segment,
) -> Option<I> {
    let upper = ids.partition_point(|&id| segment(id).start() <= et);
    ids[..upper]
        .iter()
        .rev()
        .copied()
        .find(|&id| segment(id).covers(et))
}

/// Smallest start and largest end of a set of segments.
pub(crate) fn coverage<'a>(
    segments: impl Iterator<Item = &'a Segment>,
) -> Option<(TdbSeconds, TdbSeconds)> {
    segments.fold(None, |acc, s| match acc {
        None => Some((s.start(), s.end())),
        Some((lo, hi)) => Some((lo.min(s.start()), hi.max(s.end()))),
    })
}

/// Walk the summary record list and index every segment.
fn read_segments(
    bytes: &[u8],
    header: &DafHeader,
    endian: Endianness,
    path: &str,
) -> Result<Vec<Segment>> {
    let read_f64 = daf_f64::<&[u8], nom::error::Error<&[u8]>>(endian);
    let summary_bytes = header.summary_words() * 8;
    let max_summaries = (DAF_RECORD_BYTES - 24) / summary_bytes;
    let n_records = bytes.len() / DAF_RECORD_BYTES;

    let mut segments = Vec::new();
    let mut visited = Vec::new();
    let mut record_number = header.fward as usize;

    while record_number != 0 {
        if visited.contains(&record_number) {
            return Err(OrreryError::format(
                path,
                format!("summary record list loops back to record {record_number}"),
            ));
        }
        // The name record follows the summary record.
        if record_number < 2 || record_number + 1 > n_records {
            return Err(OrreryError::format(
                path,
                format!("summary record {record_number} lies outside the file"),
            ));
        }
        visited.push(record_number);

        let offset = (record_number - 1) * DAF_RECORD_BYTES;
        let record = &bytes[offset..offset + DAF_RECORD_BYTES];
        let names = &bytes[offset + DAF_RECORD_BYTES..offset + 2 * DAF_RECORD_BYTES];

        let (input, next) = read_f64(record)?;
        let (input, _prev) = read_f64(input)?;
        let (_, nsum) = read_f64(input)?;

        if !(0.0..=max_summaries as f64).contains(&nsum) || nsum.fract() != 0.0 {
            return Err(OrreryError::format(
                path,
                format!("summary record {record_number} announces {nsum} summaries"),
            ));
        }

        for i in 0..nsum as usize {
            let start = 24 + i * summary_bytes;
            let (_, summary) = Summary::parse(&record[start..start + summary_bytes], endian)
                .map_err(|e| OrreryError::format(path, format!("unreadable summary: {e:?}")))?;
            let name = String::from_utf8_lossy(&names[i * summary_bytes..(i + 1) * summary_bytes])
                .trim()
                .to_string();
            segments.push(Segment::from_summary(bytes, endian, name, summary, path)?);
        }

        if !(next >= 0.0 && next.fract() == 0.0) {
            return Err(OrreryError::format(
                path,
                format!("summary record {record_number} has invalid next pointer {next}"),
            ));
        }
        record_number = next as usize;
    }

    Ok(segments)
}

#[cfg(test)]
mod test_kernel {
    use super::*;
    use crate::kernel::{
        spk_type::SpkDataType,
        writer::{SegmentSpec, SpkWriter},
    };
    use approx::assert_relative_eq;

    const DAY: f64 = 86400.0;

    /// Linear motion x = x0 + v t over `[start, start + days)`, one record per day.
    fn linear_segment(target: i32, center: i32, start: f64, days: usize, x0: f64) -> SegmentSpec {
        let series = (0..days)
            .map(|i| {
                let mid_value = x0 + (i as f64 + 0.5);
                // value at mid, slope of 1 km/day over a half-day radius
                vec![mid_value, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
            })
            .collect();
        SegmentSpec::uniform(
            target,
            center,
            start,
            DAY,
            series,
            SpkDataType::ChebyshevPositionOnly,
        )
        .unwrap()
    }

    fn two_segment_kernel() -> Kernel {
        let bytes = SpkWriter::new("TWO SEGMENTS")
            .comment("JPL planetary and lunar ephemeris SYNTH")
            .segment(linear_segment(301, 3, 0.0, 10, 0.0))
            .segment(linear_segment(301, 3, 10.0 * DAY, 10, 100.0))
            .to_bytes();
        Kernel::from_bytes("two.bsp", bytes).unwrap()
    }

    #[test]
    fn test_segments_for_sorted_by_start() {
        let kernel = two_segment_kernel();
        let segments = kernel.segments_for(3, 301);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start(), 0.0);
        assert_eq!(segments[1].start(), 10.0 * DAY);
        assert_eq!(segments[0].degree(), Some(2));
        assert!(kernel.segments_for(301, 3).is_empty());
        assert_eq!(kernel.bodies(), vec![3, 301]);
    }

    #[test]
    fn test_shared_boundary_picks_later_segment() {
        let kernel = two_segment_kernel();
        let id = kernel.segment_at(3, 301, 10.0 * DAY).unwrap();
        assert_eq!(id, SegmentId(1));

        let (p1, _) = kernel.evaluate_link(3, 301, 10.0 * DAY).unwrap();
        let (p2, _) = kernel.evaluate_link(3, 301, 10.0 * DAY).unwrap();
        assert_eq!(p1, p2);
        assert_relative_eq!(p1.x, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_start_and_end_minus_epsilon() {
        let kernel = two_segment_kernel();
        for segment in kernel.segments() {
            for et in [segment.start(), segment.end() - 1e-3] {
                assert!(segment.covers(et));
                let (p, v) = segment.evaluate(&kernel.bytes, kernel.endian, et).unwrap();
                assert!(p.iter().chain(v.iter()).all(|x| x.is_finite()));
            }
        }
        let (_, v) = kernel.evaluate_link(3, 301, 3.3 * DAY).unwrap();
        assert_relative_eq!(v.x, 1.0 / DAY, epsilon = 1e-15);
    }

    #[test]
    fn test_out_of_range_never_clamps() {
        let kernel = two_segment_kernel();
        let err = kernel.evaluate_link(3, 301, 20.0 * DAY).unwrap_err();
        assert_eq!(
            err,
            OrreryError::OutOfRange {
                center: 3,
                target: 301,
                tdb_seconds: 20.0 * DAY,
                coverage: Some((0.0, 20.0 * DAY)),
            }
        );
        assert!(kernel.evaluate_link(3, 301, -1.0).is_err());
        assert!(matches!(
            kernel.segment_at(0, 10, 0.0),
            Err(OrreryError::OutOfRange { coverage: None, .. })
        ));
    }

    #[test]
    fn test_overlap_prefers_latest_start() {
        let bytes = SpkWriter::new("OVERLAP")
            .segment(linear_segment(10, 0, 0.0, 10, 0.0))
            .segment(linear_segment(10, 0, 2.0 * DAY, 2, 500.0))
            .to_bytes();
        let kernel = Kernel::from_bytes("overlap.bsp", bytes).unwrap();
        assert_eq!(kernel.segment_at(0, 10, 1.0 * DAY).unwrap(), SegmentId(0));
        assert_eq!(kernel.segment_at(0, 10, 3.0 * DAY).unwrap(), SegmentId(1));
        // After the short segment ends the long one covers again
        assert_eq!(kernel.segment_at(0, 10, 5.0 * DAY).unwrap(), SegmentId(0));
    }

    #[test]
    fn test_big_endian_kernel() {
        let bytes = SpkWriter::new("BIG")
            .big_endian()
            .segment(linear_segment(399, 3, 0.0, 3, 7.0))
            .to_bytes();
        let kernel = Kernel::from_bytes("big.bsp", bytes).unwrap();
        assert_eq!(kernel.endianness(), Endianness::Big);
        let (p, _) = kernel.evaluate_link(3, 399, 0.5 * DAY).unwrap();
        assert_relative_eq!(p.x, 7.5, epsilon = 1e-12);
    }

    #[test]
    fn test_many_segments_span_several_summary_records() {
        let mut writer = SpkWriter::new("MANY");
        for target in 1000..1030 {
            writer = writer.segment(linear_segment(target, 0, 0.0, 1, target as f64));
        }
        let kernel = Kernel::from_bytes("many.bsp", writer.to_bytes()).unwrap();
        assert_eq!(kernel.segments().len(), 30);
        let (p, _) = kernel.evaluate_link(0, 1029, 0.5 * DAY).unwrap();
        assert_relative_eq!(p.x, 1029.5, epsilon = 1e-9);
    }

    #[test]
    fn test_comments_and_names() {
        let kernel = two_segment_kernel();
        assert!(kernel
            .comments()
            .starts_with("JPL planetary and lunar ephemeris SYNTH\n"));
        assert_eq!(kernel.segments()[0].name, "3 -> 301");
        assert_eq!(kernel.header().internal_filename, "TWO SEGMENTS");
    }

    #[test]
    fn test_truncated_kernel_is_a_format_error() {
        let mut bytes = two_segment_kernel_bytes();
        bytes.truncate(bytes.len() - 2048);
        let err = Kernel::from_bytes("cut.bsp", bytes).unwrap_err();
        assert!(matches!(err, OrreryError::Format { .. }));
    }

    #[test]
    fn test_unsupported_type_is_indexed_but_not_linked() {
        let spec = linear_segment(-77, 399, 0.0, 1, 0.0);
        let mut bytes = SpkWriter::new("T13").segment(spec).to_bytes();
        // Patch the data type of the only summary to 13 (Hermite)
        let summary_offset = DAF_RECORD_BYTES + 24 + 16 + 12;
        bytes[summary_offset..summary_offset + 4].copy_from_slice(&13i32.to_le_bytes());

        let kernel = Kernel::from_bytes("t13.bsp", bytes).unwrap();
        assert_eq!(kernel.segments().len(), 1);
        assert!(!kernel.segments()[0].is_evaluable());
        assert!(kernel.segments_for(399, -77).is_empty());
        assert_eq!(
            kernel.evaluate(SegmentId(0), 10.0).unwrap_err(),
            OrreryError::UnsupportedDataType(13)
        );
    }

    fn two_segment_kernel_bytes() -> Vec<u8> {
        SpkWriter::new("TWO SEGMENTS")
            .segment(linear_segment(301, 3, 0.0, 10, 0.0))
            .segment(linear_segment(301, 3, 10.0 * DAY, 10, 100.0))
            .to_bytes()
    }
}
