//! Indexed SPK segments.
//!
//! A [`Segment`] is built once, at kernel open time, from a DAF summary. For
//! evaluable data types it also keeps the validated record layout, so that a
//! query only needs to compute a record index and decode `rsize` words from
//! the kernel bytes.

use std::fmt;

use nalgebra::Vector3;
use nom::{
    multi::count,
    number::{complete::f64 as daf_f64, Endianness},
    Parser,
};

use crate::{
    chebyshev::ChebyshevRecord,
    constants::{NaifId, TdbSeconds},
    orrery_errors::{OrreryError, Result},
};

use super::{
    directory::{DirectoryData, DIRECTORY_WORDS},
    spk_type::SpkDataType,
    summary_record::Summary,
};

/// Index of a segment inside the arena of its kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub usize);

/// Record layout of a type 2/3 segment.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ChebyshevLayout {
    directory: DirectoryData,
    components: usize,
    n_coeffs: usize,
    /// Byte offset of the first record.
    data_offset: usize,
}

/// One SPK segment: a (center, target) link valid over `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub summary: Summary,
    pub data_type: Option<SpkDataType>,
    layout: Option<ChebyshevLayout>,
}

impl Segment {
    /// Validate a summary against the kernel bytes and index its records.
    ///
    /// Arguments
    /// -----------------
    /// * `bytes`: Whole kernel content.
    /// * `endian`: Byte order of the kernel.
    /// * `name`: Segment name from the DAF name record.
    /// * `summary`: Decoded segment descriptor.
    /// * `path`: Kernel name used in error messages.
    ///
    /// Return
    /// ----------
    /// * The indexed segment. Structural problems (empty or reversed coverage,
    ///   addresses outside the file, inconsistent type 2/3 footer) are reported
    ///   as [`OrreryError::Format`].
    pub fn from_summary(
        bytes: &[u8],
        endian: Endianness,
        name: String,
        summary: Summary,
        path: &str,
    ) -> Result<Self> {
        let link = format!("segment {} -> {}", summary.center, summary.target);

        if !(summary.start_epoch.is_finite()
            && summary.end_epoch.is_finite()
            && summary.start_epoch < summary.end_epoch)
        {
            return Err(OrreryError::format(
                path,
                format!(
                    "{link}: start {} is not before end {}",
                    summary.start_epoch, summary.end_epoch
                ),
            ));
        }

        let n_words = bytes.len() / 8;
        if summary.initial_addr < 1
            || summary.final_addr < summary.initial_addr
            || summary.final_addr as usize > n_words
        {
            return Err(OrreryError::format(
                path,
                format!(
                    "{link}: addresses [{}, {}] lie outside the {n_words} words of the file",
                    summary.initial_addr, summary.final_addr
                ),
            ));
        }

        let data_type = SpkDataType::from_i32(summary.data_type).ok();
        let layout = match data_type.and_then(SpkDataType::chebyshev_components) {
            Some(components) => {
                if summary.n_words() < DIRECTORY_WORDS {
                    return Err(OrreryError::format(
                        path,
                        format!("{link}: segment too short to hold its directory"),
                    ));
                }
                let footer = (summary.final_addr as usize - DIRECTORY_WORDS) * 8;
                let (_, directory) = DirectoryData::parse(&bytes[footer..footer + 32], endian)
                    .map_err(|e| {
                        OrreryError::format(path, format!("{link}: unreadable directory: {e:?}"))
                    })?;
                let n_coeffs = directory.coefficients_per_component(&summary, components, path)?;
                Some(ChebyshevLayout {
                    directory,
                    components,
                    n_coeffs,
                    data_offset: (summary.initial_addr as usize - 1) * 8,
                })
            }
            None => None,
        };

        Ok(Segment {
            name,
            summary,
            data_type,
            layout,
        })
    }

    pub fn center(&self) -> NaifId {
        self.summary.center
    }

    pub fn target(&self) -> NaifId {
        self.summary.target
    }

    pub fn frame_id(&self) -> i32 {
        self.summary.frame_id
    }

    pub fn start(&self) -> TdbSeconds {
        self.summary.start_epoch
    }

    pub fn end(&self) -> TdbSeconds {
        self.summary.end_epoch
    }

    /// Right-open coverage test.
    pub fn covers(&self, et: TdbSeconds) -> bool {
        self.summary.covers(et)
    }

    /// Whether the segment data type can be evaluated.
    pub fn is_evaluable(&self) -> bool {
        self.layout.is_some()
    }

    /// Polynomial degree of the Chebyshev series, for evaluable segments.
    pub fn degree(&self) -> Option<usize> {
        self.layout.map(|l| l.n_coeffs - 1)
    }

    /// Number of records in the segment, for evaluable segments.
    pub fn n_records(&self) -> Option<usize> {
        self.layout.map(|l| l.directory.n_records)
    }

    fn out_of_range(&self, et: TdbSeconds) -> OrreryError {
        OrreryError::OutOfRange {
            center: self.center(),
            target: self.target(),
            tdb_seconds: et,
            coverage: Some((self.start(), self.end())),
        }
    }

    /// Decode the record covering `et`.
    ///
    /// Arguments
    /// -----------------
    /// * `bytes`: Kernel content the segment was indexed from.
    /// * `endian`: Byte order of the kernel.
    /// * `et`: Epoch in TDB seconds past J2000.
    ///
    /// Return
    /// ----------
    /// * The record whose interval holds `et`; [`OrreryError::OutOfRange`] when
    ///   `et` is outside `[start, end)`; [`OrreryError::UnsupportedDataType`] for
    ///   non-Chebyshev segments.
    pub fn record_at(
        &self,
        bytes: &[u8],
        endian: Endianness,
        et: TdbSeconds,
    ) -> Result<ChebyshevRecord> {
        let layout = self
            .layout
            .ok_or(OrreryError::UnsupportedDataType(self.summary.data_type))?;
        if !self.covers(et) {
            return Err(self.out_of_range(et));
        }

        let DirectoryData {
            init,
            intlen,
            rsize,
            n_records,
        } = layout.directory;

        // `et` is inside the segment, so only rounding can push the index past
        // the last record.
        let index = (((et - init) / intlen).floor().max(0.0) as usize).min(n_records - 1);

        let start = layout.data_offset + index * rsize * 8;
        let (_, words) = count(daf_f64::<&[u8], nom::error::Error<&[u8]>>(endian), rsize)
            .parse(&bytes[start..start + rsize * 8])
            .map_err(|_| self.out_of_range(et))?;

        ChebyshevRecord::from_words(&words, layout.components)
            .filter(|r| r.n_coeffs == layout.n_coeffs)
            .ok_or(OrreryError::UnsupportedDataType(self.summary.data_type))
    }

    /// Evaluate the segment at `et`, returning position (km) and velocity (km/s)
    /// of the target relative to the center, in the segment frame.
    pub fn evaluate(
        &self,
        bytes: &[u8],
        endian: Endianness,
        et: TdbSeconds,
    ) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let record = self.record_at(bytes, endian, et)?;
        record.evaluate(et).map_err(|_| self.out_of_range(et))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data_type = match self.data_type {
            Some(t) => t.to_string(),
            None => format!("type {}", self.summary.data_type),
        };
        write!(
            f,
            "{:<24} {:>8} -> {:<8} frame {:<4} [{:.1}, {:.1}) {}",
            self.name,
            self.center(),
            self.target(),
            self.frame_id(),
            self.start(),
            self.end(),
            data_type
        )
    }
}
