//! Directory footer of fixed-interval Chebyshev SPK segments (types 2 and 3).
//!
//! The last four words of such a segment are:
//!
//! * `init`: start epoch of the first record (TDB seconds past J2000),
//! * `intlen`: length of the interval covered by each record (seconds),
//! * `rsize`: **record size in double-precision words**, not bytes,
//! * `n_records`: number of records in the segment.
//!
//! Each record is `rsize` words long: the interval midpoint, its half-length
//! (`radius`), then `components` series of `(rsize - 2) / components`
//! coefficients each.
//!
//! # See also
//! ------------
//! * [`super::segment::Segment`] – Uses the directory to locate a record.
//! * NAIF SPK Required Reading – Type 2 and type 3 segment layout.

use nom::{
    number::{complete::f64 as daf_f64, Endianness},
    IResult,
};

use crate::orrery_errors::{OrreryError, Result};

use super::summary_record::Summary;

/// Number of words taken by the directory footer.
pub const DIRECTORY_WORDS: usize = 4;

/// Directory footer of a type 2/3 SPK segment.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct DirectoryData {
    pub init: f64,
    pub intlen: f64,
    pub rsize: usize,
    pub n_records: usize,
}

impl DirectoryData {
    /// Decode the four footer words.
    pub fn parse(input: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let read_f64 = daf_f64::<&[u8], nom::error::Error<&[u8]>>(endian);

        let (input, init) = read_f64(input)?;
        let (input, intlen) = read_f64(input)?;
        let (rest, rsize) = read_f64(input)?;
        let (rest, n_records) = read_f64(rest)?;

        let (Some(rsize), Some(n_records)) = (word_count(rsize), word_count(n_records)) else {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Verify,
            )));
        };

        Ok((
            rest,
            DirectoryData {
                init,
                intlen,
                rsize,
                n_records,
            },
        ))
    }

    /// Check that the footer agrees with the segment descriptor and return the
    /// number of coefficients of each Chebyshev series.
    ///
    /// Arguments
    /// -----------------
    /// * `summary`: Descriptor of the segment the footer belongs to.
    /// * `components`: 3 for type 2, 6 for type 3.
    /// * `path`: Kernel name used in error messages.
    ///
    /// Return
    /// ----------
    /// * The coefficient count per component (polynomial degree + 1), or an
    ///   [`OrreryError::Format`] when the block length does not match.
    pub fn coefficients_per_component(
        &self,
        summary: &Summary,
        components: usize,
        path: &str,
    ) -> Result<usize> {
        let bad = |reason: String| {
            Err(OrreryError::format(
                path,
                format!(
                    "segment {} -> {}: {reason}",
                    summary.center, summary.target
                ),
            ))
        };

        if !(self.intlen.is_finite() && self.intlen > 0.0) {
            return bad(format!("record interval length {} is not positive", self.intlen));
        }
        if self.rsize <= 2 || (self.rsize - 2) % components != 0 {
            return bad(format!(
                "record size {} does not hold {components} coefficient series",
                self.rsize
            ));
        }
        if self.n_records == 0 {
            return bad("segment holds no record".to_string());
        }
        let Some(expected) = self
            .n_records
            .checked_mul(self.rsize)
            .and_then(|words| words.checked_add(DIRECTORY_WORDS))
        else {
            return bad(format!(
                "{} records of {} words overflow the address space",
                self.n_records, self.rsize
            ));
        };
        if expected != summary.n_words() {
            return bad(format!(
                "{} records of {} words need {expected} words, the segment spans {}",
                self.n_records,
                self.rsize,
                summary.n_words()
            ));
        }

        Ok((self.rsize - 2) / components)
    }
}

/// A footer count stored as a double: finite, whole and exactly representable.
fn word_count(value: f64) -> Option<usize> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= MAX_EXACT)
        .then_some(value as usize)
}

impl std::fmt::Display for DirectoryData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "+-----------+----------------------+")?;
        writeln!(f, "| init      | {:>20.3} |", self.init)?;
        writeln!(f, "| intlen    | {:>20.3} |", self.intlen)?;
        writeln!(f, "| rsize     | {:>20} |", self.rsize)?;
        writeln!(f, "| n_records | {:>20} |", self.n_records)?;
        writeln!(f, "+-----------+----------------------+")
    }
}
