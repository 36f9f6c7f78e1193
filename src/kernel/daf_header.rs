//! DAF (Double Precision Array File) file record parsing.
//!
//! The first 1024-byte record of every DAF container describes the binary
//! layout of the rest of the file. This module decodes it into a [`DafHeader`]
//! and checks that the file is an SPK kernel this crate can read.
//!
//! # What the file record contains
//!
//! * **`idword`**: Format identifier (`"DAF/SPK "`), eight ASCII bytes.
//! * **`nd`** / **`ni`**: Number of double-precision / integer components
//!   in each array summary. SPK kernels always use `nd = 2`, `ni = 6`.
//! * **`fward`** / **`bward`**: Record numbers (1-based) of the first and last
//!   summary record of the doubly-linked summary list.
//! * **`free`**: First free address (1-based, in double-precision words).
//! * **`internal_filename`**: Human-readable kernel name (60 bytes, padded).
//! * **`locfmt`**: Binary format tag (`"BIG-IEEE"` or `"LTL-IEEE"`) giving the
//!   byte order of every number stored in the file.
//! * **`ftpstr`**: NAIF FTP validation string, damaged when a kernel is sent
//!   through an ASCII-mode transfer.
//!
//! # Endianness
//!
//! The byte order is read from `locfmt` (bytes 88..96) before any integer is
//! decoded, so both little- and big-endian kernels are supported on any host.
//!
//! # See also
//! ------------
//! * [`DafHeader::read`] – Parse and validate the file record.
//! * NAIF DAF Required Reading – Layout of the file record.

use std::fmt;

use nom::{
    bytes::complete::take,
    number::{complete::i32 as daf_i32, Endianness},
    IResult,
};

use crate::{
    constants::{DAF_RECORD_BYTES, FTP_VALIDATION},
    orrery_errors::{OrreryError, Result},
};

const LOCFMT_OFFSET: usize = 88;

/// In-memory representation of the DAF/SPK file record.
///
/// String fields are trimmed of their trailing padding.
#[derive(Debug, PartialEq, Clone)]
pub struct DafHeader {
    /// 8-byte identifier, `"DAF/SPK"` for SPK kernels.
    pub idword: String,
    /// 60-byte, padded internal kernel name.
    pub internal_filename: String,
    /// Number of double-precision components in each summary (ND).
    pub nd: i32,
    /// Number of integer components in each summary (NI).
    pub ni: i32,
    /// Record index of the first summary record (forward pointer).
    pub fward: i32,
    /// Record index of the last summary record (backward pointer).
    pub bward: i32,
    /// First free address (in double-precision words, 1-based).
    pub free: i32,
    /// Binary format tag (`"LTL-IEEE"` or `"BIG-IEEE"`).
    pub locfmt: String,
    /// Raw bytes of the NAIF FTP validation string.
    pub ftpstr: Vec<u8>,
}

impl DafHeader {
    /// Parse the first 1024-byte DAF record into a [`DafHeader`].
    ///
    /// Arguments
    /// -----------------
    /// * `input`: A byte slice starting at the beginning of the file.
    /// * `endian`: Byte order of the integers, taken from `locfmt`.
    ///
    /// Return
    /// ----------
    /// * An [`IResult`] with the remaining input and the decoded header.
    pub fn parse(input: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let read_i32 = daf_i32::<&[u8], nom::error::Error<&[u8]>>(endian);

        let (input, id_word) = take(8usize)(input)?;
        let (input, nd) = read_i32(input)?;
        let (input, ni) = read_i32(input)?;
        let (input, ifname) = take(60usize)(input)?;
        let (input, fward) = read_i32(input)?;
        let (input, bward) = read_i32(input)?;
        let (input, free) = read_i32(input)?;
        let (input, locfmt) = take(8usize)(input)?;
        let (input, _) = take(603usize)(input)?; // PRENUL
        let (input, ftpstr) = take(28usize)(input)?;
        let (input, _) = take(297usize)(input)?; // PSTNUL
        Ok((
            input,
            DafHeader {
                idword: String::from_utf8_lossy(id_word).trim().to_string(),
                internal_filename: String::from_utf8_lossy(ifname).trim().to_string(),
                nd,
                ni,
                fward,
                bward,
                free,
                locfmt: String::from_utf8_lossy(locfmt).trim().to_string(),
                ftpstr: ftpstr.to_vec(),
            },
        ))
    }

    /// Read the byte order announced by the `locfmt` field.
    ///
    /// Return
    /// ----------
    /// * `Some(Endianness)` for `LTL-IEEE` / `BIG-IEEE`, `None` for any other tag
    ///   (including the legacy VAX formats) or a truncated record.
    pub fn detect_endianness(input: &[u8]) -> Option<Endianness> {
        match input.get(LOCFMT_OFFSET..LOCFMT_OFFSET + 8)? {
            b"LTL-IEEE" => Some(Endianness::Little),
            b"BIG-IEEE" => Some(Endianness::Big),
            _ => None,
        }
    }

    /// Parse the file record and reject anything that is not a readable SPK kernel.
    ///
    /// Arguments
    /// -----------------
    /// * `bytes`: Whole kernel content.
    /// * `path`: Kernel name used in error messages.
    ///
    /// Return
    /// ----------
    /// * The validated header and the byte order of the file, or
    ///   [`OrreryError::Format`] describing the first violated rule.
    pub fn read(bytes: &[u8], path: &str) -> Result<(Self, Endianness)> {
        if bytes.len() < DAF_RECORD_BYTES {
            return Err(OrreryError::format(
                path,
                format!("file is {} bytes, shorter than one DAF record", bytes.len()),
            ));
        }

        let idword = String::from_utf8_lossy(&bytes[..8]).trim().to_string();
        if idword != "DAF/SPK" {
            return Err(OrreryError::format(
                path,
                format!("unrecognized identification word {idword:?}, expected \"DAF/SPK\""),
            ));
        }

        let endian = Self::detect_endianness(bytes).ok_or_else(|| {
            let tag = String::from_utf8_lossy(&bytes[LOCFMT_OFFSET..LOCFMT_OFFSET + 8]);
            OrreryError::format(path, format!("unsupported binary format {tag:?}"))
        })?;

        let (_, header) = Self::parse(&bytes[..DAF_RECORD_BYTES], endian)
            .map_err(|e| OrreryError::format(path, format!("unreadable file record: {e:?}")))?;

        if header.nd != 2 || header.ni != 6 {
            return Err(OrreryError::format(
                path,
                format!(
                    "summary layout ND={} NI={} does not describe SPK segments",
                    header.nd, header.ni
                ),
            ));
        }

        if !header.ftp_string_is_intact() {
            return Err(OrreryError::format(
                path,
                "FTP validation string is damaged (ASCII-mode transfer?)",
            ));
        }

        let n_records = bytes.len().div_ceil(DAF_RECORD_BYTES);
        if header.fward < 2 || header.fward as usize > n_records {
            return Err(OrreryError::format(
                path,
                format!(
                    "first summary record {} lies outside the {n_records} records of the file",
                    header.fward
                ),
            ));
        }

        Ok((header, endian))
    }

    /// Old toolkits left the FTP field blank, which is accepted.
    fn ftp_string_is_intact(&self) -> bool {
        self.ftpstr.iter().all(|b| *b == 0 || *b == b' ') || self.ftpstr == FTP_VALIDATION
    }

    /// Number of double-precision words taken by one segment summary.
    pub fn summary_words(&self) -> usize {
        self.nd as usize + (self.ni as usize).div_ceil(2)
    }
}

impl fmt::Display for DafHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LABEL_WIDTH: usize = 18;
        const VALUE_WIDTH: usize = 50;

        let border = format!(
            "+{:-<label$}+{:-<value$}+",
            "",
            "",
            label = LABEL_WIDTH + 1,
            value = VALUE_WIDTH + 1
        );

        let rows = [
            ("ID Word", format!("{} (Format ID)", self.idword)),
            ("Internal Name", self.internal_filename.clone()),
            ("Summary Layout", format!("ND = {}, NI = {}", self.nd, self.ni)),
            ("Forward Ptr", format!("Record # of first summary: {}", self.fward)),
            ("Backward Ptr", format!("Record # of last summary: {}", self.bward)),
            ("Free Addr", format!("Next free address: {}", self.free)),
            ("Binary Format", self.locfmt.clone()),
        ];

        writeln!(f, "{border}")?;
        writeln!(
            f,
            "| {:<label$}| {:<value$}|",
            "DAF File Record",
            "",
            label = LABEL_WIDTH,
            value = VALUE_WIDTH
        )?;
        writeln!(f, "{border}")?;
        for (label, value) in rows {
            writeln!(
                f,
                "| {:<label$}| {:<value$}|",
                label,
                value,
                label = LABEL_WIDTH,
                value = VALUE_WIDTH
            )?;
        }
        writeln!(f, "{border}")
    }
}

#[cfg(test)]
mod test_daf_header {
    use super::*;
    use crate::kernel::writer::file_record;

    #[test]
    fn test_read_little_endian_record() {
        let record = file_record("SYNTHETIC", 4, 4, 1000, Endianness::Little);
        let (header, endian) = DafHeader::read(&record_file(record), "mem").unwrap();

        assert_eq!(endian, Endianness::Little);
        assert_eq!(header.idword, "DAF/SPK");
        assert_eq!(header.internal_filename, "SYNTHETIC");
        assert_eq!((header.nd, header.ni), (2, 6));
        assert_eq!((header.fward, header.bward, header.free), (4, 4, 1000));
        assert_eq!(header.summary_words(), 5);
    }

    #[test]
    fn test_read_big_endian_record() {
        let record = file_record("BIG", 2, 2, 300, Endianness::Big);
        let (header, endian) = DafHeader::read(&record_file(record), "mem").unwrap();
        assert_eq!(endian, Endianness::Big);
        assert_eq!(header.fward, 2);
        assert_eq!(header.free, 300);
    }

    #[test]
    fn test_reject_wrong_idword() {
        let mut record = file_record("X", 2, 2, 300, Endianness::Little);
        record[..8].copy_from_slice(b"DAF/PCK ");
        let err = DafHeader::read(&record_file(record), "mem").unwrap_err();
        assert!(matches!(err, OrreryError::Format { .. }));
        assert!(err.to_string().contains("DAF/PCK"));
    }

    #[test]
    fn test_reject_vax_format() {
        let mut record = file_record("X", 2, 2, 300, Endianness::Little);
        record[88..96].copy_from_slice(b"VAX-GFLT");
        let err = DafHeader::read(&record_file(record), "mem").unwrap_err();
        assert!(err.to_string().contains("VAX-GFLT"));
    }

    #[test]
    fn test_reject_damaged_ftp_string() {
        let mut record = file_record("X", 2, 2, 300, Endianness::Little);
        // An ASCII transfer turns "\r\n" into "\n"
        record[699 + 9] = b'\n';
        record[699 + 10] = b'\n';
        let err = DafHeader::read(&record_file(record), "mem").unwrap_err();
        assert!(err.to_string().contains("FTP"));
    }

    #[test]
    fn test_reject_truncated_file() {
        let err = DafHeader::read(&[0u8; 100], "short.bsp").unwrap_err();
        assert_eq!(
            err,
            OrreryError::format("short.bsp", "file is 100 bytes, shorter than one DAF record")
        );
    }

    /// Pad a file record with empty records so the forward pointer stays in range.
    fn record_file(record: Vec<u8>) -> Vec<u8> {
        let mut bytes = record;
        bytes.resize(DAF_RECORD_BYTES * 4, 0);
        bytes
    }
}
