use nom::{
    number::{
        complete::{f64 as daf_f64, i32 as daf_i32},
        Endianness,
    },
    IResult,
};
use std::fmt;

use hifitime::Epoch;

use crate::{bodies::Body, constants::TdbSeconds};

use super::spk_type::SpkDataType;

/// Descriptor of one SPK segment, as stored in a DAF summary record.
///
/// Epochs are TDB seconds past J2000, addresses are 1-based double-precision
/// word indices into the file.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Summary {
    pub start_epoch: TdbSeconds,
    pub end_epoch: TdbSeconds,
    pub target: i32,
    pub center: i32,
    pub frame_id: i32,
    pub data_type: i32,
    pub initial_addr: i32,
    pub final_addr: i32,
}

impl Summary {
    /// Decode an SPK summary (ND = 2, NI = 6) from `input`.
    pub fn parse(input: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let read_f64 = daf_f64::<&[u8], nom::error::Error<&[u8]>>(endian);
        let read_i32 = daf_i32::<&[u8], nom::error::Error<&[u8]>>(endian);

        let (input, start_epoch) = read_f64(input)?;
        let (input, end_epoch) = read_f64(input)?;
        let (input, target) = read_i32(input)?;
        let (input, center) = read_i32(input)?;
        let (input, frame_id) = read_i32(input)?;
        let (input, data_type) = read_i32(input)?;
        let (input, initial_addr) = read_i32(input)?;
        let (input, final_addr) = read_i32(input)?;

        Ok((
            input,
            Summary {
                start_epoch,
                end_epoch,
                target,
                center,
                frame_id,
                data_type,
                initial_addr,
                final_addr,
            },
        ))
    }

    /// Number of double-precision words covered by the segment data.
    pub fn n_words(&self) -> usize {
        (self.final_addr - self.initial_addr + 1).max(0) as usize
    }

    /// Half-open coverage test, `[start, end)`.
    pub fn covers(&self, et: TdbSeconds) -> bool {
        self.start_epoch <= et && et < self.end_epoch
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = Epoch::from_et_seconds(self.start_epoch);
        let end = Epoch::from_et_seconds(self.end_epoch);

        let data_type = match SpkDataType::from_i32(self.data_type) {
            Ok(naif_type) => naif_type.to_string(),
            Err(_) => format!("Unknown ({})", self.data_type),
        };

        let fields = vec![
            ("start_epoch", format!("{start}")),
            ("end_epoch", format!("{end}")),
            ("target", Body::from_id(self.target).to_string()),
            ("center", Body::from_id(self.center).to_string()),
            ("frame_id", self.frame_id.to_string()),
            ("data_type", data_type),
            ("initial_addr", self.initial_addr.to_string()),
            ("final_addr", self.final_addr.to_string()),
        ];

        let label_width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(10);
        let value_width = fields.iter().map(|(_, v)| v.len()).max().unwrap_or(10);

        let border = format!(
            "+{:-<label$}+{:-<value$}+",
            "",
            "",
            label = label_width + 2,
            value = value_width + 2
        );

        writeln!(f, "{border}")?;
        writeln!(
            f,
            "| {:<label_width$} | {:<value_width$} |",
            "Field", "Value",
        )?;
        writeln!(f, "{border}")?;

        for (label, value) in fields {
            writeln!(f, "| {label:<label_width$} | {value:<value_width$} |")?;
        }

        writeln!(f, "{border}")
    }
}

#[cfg(test)]
mod test_summary {
    use super::*;

    fn de440_emb() -> Summary {
        Summary {
            start_epoch: -14200747200.0,
            end_epoch: 20514081600.0,
            target: 3,
            center: 0,
            frame_id: 1,
            data_type: 2,
            initial_addr: 3021513,
            final_addr: 4051108,
        }
    }

    #[test]
    fn test_parse_big_endian() {
        let summary = de440_emb();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&summary.start_epoch.to_be_bytes());
        bytes.extend_from_slice(&summary.end_epoch.to_be_bytes());
        for v in [3, 0, 1, 2, 3021513, 4051108i32] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }

        let (rest, parsed) = Summary::parse(&bytes, Endianness::Big).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, summary);
        assert_eq!(parsed.n_words(), 1029596);
    }

    #[test]
    fn test_covers_is_right_open() {
        let summary = de440_emb();
        assert!(summary.covers(summary.start_epoch));
        assert!(summary.covers(0.0));
        assert!(!summary.covers(summary.end_epoch));
        assert!(!summary.covers(summary.start_epoch - 1.0));
    }

    #[test]
    fn test_summary_display() {
        let expected = r#"+--------------+-------------------------+
| Field        | Value                   |
+--------------+-------------------------+
| start_epoch  | 1549-12-31T00:00:00 ET  |
| end_epoch    | 2650-01-25T00:00:00 ET  |
| target       | Earth-Moon Barycenter   |
| center       | Solar System Barycenter |
| frame_id     | 1                       |
| data_type    | Chebyshev Position Only |
| initial_addr | 3021513                 |
| final_addr   | 4051108                 |
+--------------+-------------------------+
"#;

        let output = format!("{}", de440_emb());
        assert_eq!(output, expected);
    }
}
