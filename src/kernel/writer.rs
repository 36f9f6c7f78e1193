//! Writer for small SPK kernels made of Chebyshev segments.
//!
//! [`SpkWriter`] lays out a complete DAF/SPK file in memory: the file record,
//! an optional comment area, the linked list of summary/name record pairs and
//! the segment data arrays. It is used to excerpt a time window of a larger
//! kernel or to synthesise kernels with known coefficients.
//!
//! Only the fixed-interval Chebyshev types (2 and 3) are produced, with the
//! record layout described in [`super::directory`].

use std::io::Write;

use camino::Utf8Path;
use nom::number::Endianness;
use tracing::debug;

use crate::{
    chebyshev::ChebyshevRecord,
    constants::{NaifId, TdbSeconds, DAF_RECORD_BYTES, DAF_RECORD_WORDS, FTP_VALIDATION},
    orrery_errors::{OrreryError, Result},
};

use super::spk_type::SpkDataType;

/// Words taken by one SPK summary (ND = 2, NI = 6).
const SUMMARY_WORDS: usize = 5;
/// Summaries fitting in one summary record after its three control words.
const SUMMARIES_PER_RECORD: usize = (DAF_RECORD_WORDS - 3) / SUMMARY_WORDS;
/// Characters of one segment name in a name record.
const NAME_BYTES: usize = SUMMARY_WORDS * 8;

/// A segment waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpec {
    pub name: String,
    pub target: NaifId,
    pub center: NaifId,
    pub frame_id: i32,
    pub data_type: SpkDataType,
    pub start: TdbSeconds,
    pub end: TdbSeconds,
    /// Start epoch of the first record.
    pub init: TdbSeconds,
    /// Length of each record interval, in seconds.
    pub intlen: f64,
    pub records: Vec<ChebyshevRecord>,
}

impl SegmentSpec {
    /// Segment whose records tile `[start, start + n * intlen)` evenly.
    ///
    /// Arguments
    /// -----------------
    /// * `target`, `center`: NAIF ids of the link.
    /// * `start`: Start of the first record interval.
    /// * `intlen`: Length of each record interval.
    /// * `series`: For each record, the coefficients of every component,
    ///   component-major (3 series for type 2, 6 for type 3).
    /// * `data_type`: [`SpkDataType::ChebyshevPositionOnly`] or
    ///   [`SpkDataType::ChebyshevPositionVelocity`].
    pub fn uniform(
        target: NaifId,
        center: NaifId,
        start: TdbSeconds,
        intlen: f64,
        series: Vec<Vec<f64>>,
        data_type: SpkDataType,
    ) -> Result<Self> {
        let components = data_type
            .chebyshev_components()
            .ok_or(OrreryError::UnsupportedDataType(data_type.to_i32()))?;
        let radius = intlen / 2.0;
        let records = series
            .into_iter()
            .enumerate()
            .map(|(i, coefficients)| {
                let mid = start + (i as f64 + 0.5) * intlen;
                let mut words = vec![mid, radius];
                words.extend(coefficients);
                ChebyshevRecord::from_words(&words, components).ok_or_else(|| {
                    OrreryError::Config(format!(
                        "record {i} of {center} -> {target} does not hold {components} series"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SegmentSpec {
            name: format!("{center} -> {target}"),
            target,
            center,
            frame_id: 1,
            data_type,
            start,
            end: start + records.len() as f64 * intlen,
            init: start,
            intlen,
            records,
        })
    }

    fn words(&self) -> Vec<f64> {
        let mut words = Vec::new();
        for record in &self.records {
            words.push(record.mid);
            words.push(record.radius);
            words.extend_from_slice(&record.coefficients);
        }
        let rsize = self.records.first().map_or(0, |r| 2 + r.coefficients.len());
        words.extend([self.init, self.intlen, rsize as f64, self.records.len() as f64]);
        words
    }
}

/// In-memory builder of a DAF/SPK kernel.
#[derive(Debug, Clone)]
pub struct SpkWriter {
    internal_name: String,
    endian: Endianness,
    comments: Vec<String>,
    segments: Vec<SegmentSpec>,
}

impl SpkWriter {
    pub fn new(internal_name: &str) -> Self {
        SpkWriter {
            internal_name: internal_name.to_string(),
            endian: Endianness::Little,
            comments: Vec::new(),
            segments: Vec::new(),
        }
    }

    /// Write numbers in big-endian order (`BIG-IEEE`).
    pub fn big_endian(mut self) -> Self {
        self.endian = Endianness::Big;
        self
    }

    pub fn comment(mut self, line: &str) -> Self {
        self.comments.push(line.to_string());
        self
    }

    pub fn segment(mut self, segment: SegmentSpec) -> Self {
        self.segments.push(segment);
        self
    }

    /// Lay out the kernel.
    ///
    /// Return
    /// ----------
    /// * The kernel bytes, a whole number of 1024-byte records.
    pub fn to_bytes(&self) -> Vec<u8> {
        let comment_area = self.comment_area();
        let comment_records = comment_area.len() / DAF_RECORD_BYTES;

        let chunks: Vec<&[SegmentSpec]> = self.segments.chunks(SUMMARIES_PER_RECORD).collect();
        let n_summary_records = chunks.len().max(1);
        let fward = 2 + comment_records;
        let first_data_record = fward + 2 * n_summary_records;

        let mut data = Vec::new();
        let mut next_addr = (first_data_record - 1) * DAF_RECORD_WORDS + 1;
        let mut descriptors = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let words = segment.words();
            let begin = next_addr;
            let end = begin + words.len() - 1;
            for w in words {
                self.push_f64(&mut data, w);
            }
            descriptors.push((begin as i32, end as i32));
            next_addr = end + 1;
        }

        let bward = fward + 2 * (n_summary_records - 1);
        let mut bytes = file_record(
            &self.internal_name,
            fward as i32,
            bward as i32,
            next_addr as i32,
            self.endian,
        );
        bytes.extend_from_slice(&comment_area);

        let mut descriptor_iter = descriptors.into_iter();
        for record_index in 0..n_summary_records {
            let here = fward + 2 * record_index;
            let next = if record_index + 1 < n_summary_records {
                here + 2
            } else {
                0
            };
            let prev = if record_index == 0 { 0 } else { here - 2 };
            let chunk = chunks.get(record_index).copied().unwrap_or(&[]);

            let mut summary = Vec::with_capacity(DAF_RECORD_BYTES);
            self.push_f64(&mut summary, next as f64);
            self.push_f64(&mut summary, prev as f64);
            self.push_f64(&mut summary, chunk.len() as f64);
            let mut names = Vec::with_capacity(DAF_RECORD_BYTES);
            for segment in chunk {
                let (begin, end) = descriptor_iter.next().unwrap_or((0, 0));
                self.push_f64(&mut summary, segment.start);
                self.push_f64(&mut summary, segment.end);
                for v in [
                    segment.target,
                    segment.center,
                    segment.frame_id,
                    segment.data_type.to_i32(),
                    begin,
                    end,
                ] {
                    self.push_i32(&mut summary, v);
                }
                let mut name = segment.name.clone().into_bytes();
                name.resize(NAME_BYTES, b' ');
                names.extend_from_slice(&name);
            }
            summary.resize(DAF_RECORD_BYTES, 0);
            names.resize(DAF_RECORD_BYTES, b' ');
            bytes.extend_from_slice(&summary);
            bytes.extend_from_slice(&names);
        }

        bytes.extend_from_slice(&data);
        bytes.resize(bytes.len().div_ceil(DAF_RECORD_BYTES) * DAF_RECORD_BYTES, 0);
        debug!(
            segments = self.segments.len(),
            bytes = bytes.len(),
            "laid out SPK kernel"
        );
        bytes
    }

    /// Write the kernel to `path`.
    pub fn write_to(&self, path: &Utf8Path) -> Result<()> {
        let mut file =
            std::fs::File::create(path).map_err(|e| OrreryError::io(path.as_str(), e))?;
        file.write_all(&self.to_bytes())
            .map_err(|e| OrreryError::io(path.as_str(), e))
    }

    /// Comment records: lines end with NUL, the area ends with EOT.
    fn comment_area(&self) -> Vec<u8> {
        if self.comments.is_empty() {
            return Vec::new();
        }
        let mut area = Vec::new();
        for line in &self.comments {
            area.extend_from_slice(line.as_bytes());
            area.push(0);
        }
        area.push(4);
        // Each comment record holds 1000 characters.
        let mut records = Vec::new();
        for chunk in area.chunks(1000) {
            let mut record = chunk.to_vec();
            record.resize(DAF_RECORD_BYTES, 0);
            records.extend_from_slice(&record);
        }
        records
    }

    fn push_f64(&self, out: &mut Vec<u8>, v: f64) {
        match self.endian {
            Endianness::Big => out.extend_from_slice(&v.to_be_bytes()),
            _ => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn push_i32(&self, out: &mut Vec<u8>, v: i32) {
        match self.endian {
            Endianness::Big => out.extend_from_slice(&v.to_be_bytes()),
            _ => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

/// Build a 1024-byte SPK file record.
pub(crate) fn file_record(
    internal_name: &str,
    fward: i32,
    bward: i32,
    free: i32,
    endian: Endianness,
) -> Vec<u8> {
    let to_bytes = |v: i32| match endian {
        Endianness::Big => v.to_be_bytes(),
        _ => v.to_le_bytes(),
    };

    let mut record = Vec::with_capacity(DAF_RECORD_BYTES);
    record.extend_from_slice(b"DAF/SPK ");
    record.extend_from_slice(&to_bytes(2));
    record.extend_from_slice(&to_bytes(6));
    let mut name = internal_name.as_bytes().to_vec();
    name.resize(60, b' ');
    record.extend_from_slice(&name[..60]);
    record.extend_from_slice(&to_bytes(fward));
    record.extend_from_slice(&to_bytes(bward));
    record.extend_from_slice(&to_bytes(free));
    match endian {
        Endianness::Big => record.extend_from_slice(b"BIG-IEEE"),
        _ => record.extend_from_slice(b"LTL-IEEE"),
    }
    record.resize(699, 0);
    record.extend_from_slice(FTP_VALIDATION);
    record.resize(DAF_RECORD_BYTES, 0);
    record
}
