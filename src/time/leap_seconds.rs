//! Leap-second tables (TAI − UTC).
//!
//! A [`LeapSecondTable`] is an ordered list of `(UTC Julian date, TAI − UTC)`
//! pairs: each offset applies from 00:00:00 UTC of its date until the next
//! entry. Before the first entry the first offset is held.
//!
//! The table is valid up to a **valid-through** date (the expiry announced by
//! IERS). Past that date nothing is known about future leap seconds, so the
//! offset is extrapolated according to an [`ExtrapolationPolicy`] and every
//! result carries an [`ExtrapolatedLeapSecondWarning`].
//!
//! Two text formats are understood:
//!
//! * IERS `Leap_Second.dat`: `MJD day month year offset` rows, plus a
//!   `File expires on 28 June 2026` comment giving the valid-through date;
//! * USNO `leapsec.dat`: `1972 JAN  1 =JD 2441317.5  TAI-UTC=  10.0 ...` rows,
//!   valid through their last entry.

use std::fmt;

use camino::Utf8Path;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::{
    constants::{JDTOMJD, SECONDS_PER_DAY},
    orrery_errors::{OrreryError, Result},
};

use super::calendar::julian_day_number;

/// Leap seconds announced by IERS Bulletin C, 1972-2017.
const BUILTIN_ENTRIES: [(f64, f64); 28] = [
    (2_441_317.5, 10.0), // 1972-01-01
    (2_441_499.5, 11.0), // 1972-07-01
    (2_441_683.5, 12.0), // 1973-01-01
    (2_442_048.5, 13.0), // 1974-01-01
    (2_442_413.5, 14.0), // 1975-01-01
    (2_442_778.5, 15.0), // 1976-01-01
    (2_443_144.5, 16.0), // 1977-01-01
    (2_443_509.5, 17.0), // 1978-01-01
    (2_443_874.5, 18.0), // 1979-01-01
    (2_444_239.5, 19.0), // 1980-01-01
    (2_444_786.5, 20.0), // 1981-07-01
    (2_445_151.5, 21.0), // 1982-07-01
    (2_445_516.5, 22.0), // 1983-07-01
    (2_446_247.5, 23.0), // 1985-07-01
    (2_447_161.5, 24.0), // 1988-01-01
    (2_447_892.5, 25.0), // 1990-01-01
    (2_448_257.5, 26.0), // 1991-01-01
    (2_448_804.5, 27.0), // 1992-07-01
    (2_449_169.5, 28.0), // 1993-07-01
    (2_449_534.5, 29.0), // 1994-07-01
    (2_450_083.5, 30.0), // 1996-01-01
    (2_450_630.5, 31.0), // 1997-07-01
    (2_451_179.5, 32.0), // 1999-01-01
    (2_453_736.5, 33.0), // 2006-01-01
    (2_454_832.5, 34.0), // 2009-01-01
    (2_456_109.5, 35.0), // 2012-07-01
    (2_457_204.5, 36.0), // 2015-07-01
    (2_457_754.5, 37.0), // 2017-01-01
];

/// 2026-06-28, expiry of IERS Bulletin C 71.
const BUILTIN_VALID_THROUGH: f64 = 2_461_219.5;

/// Built-in table, shared by every [`super::TimeScales`] that does not load a file.
pub static BUILTIN_LEAP_SECONDS: Lazy<LeapSecondTable> = Lazy::new(|| LeapSecondTable {
    entries: BUILTIN_ENTRIES
        .iter()
        .map(|&(jd_utc, offset)| LeapSecond { jd_utc, offset })
        .collect(),
    valid_through: BUILTIN_VALID_THROUGH,
    policy: ExtrapolationPolicy::LastRate,
});

/// What to do with dates past the valid-through date of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrapolationPolicy {
    /// Continue with the mean rate between the last two entries.
    #[default]
    LastRate,
    /// Keep the last published offset.
    Hold,
}

/// Text layout of a leap-second file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeapSecondFormat {
    /// IERS `Leap_Second.dat`.
    Iers,
    /// USNO `leapsec.dat`.
    Usno,
}

/// Raised, never thrown: a time past the valid-through date of the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrapolatedLeapSecondWarning {
    /// Valid-through date of the table (UTC Julian date).
    pub valid_through: f64,
    /// Date the offset was requested for (UTC Julian date).
    pub jd_utc: f64,
    /// Extrapolated TAI − UTC, in seconds.
    pub offset: f64,
}

impl fmt::Display for ExtrapolatedLeapSecondWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JD {:.5} UTC is past the leap-second table (valid through JD {:.1}), TAI-UTC extrapolated to {:.3} s",
            self.jd_utc, self.valid_through, self.offset
        )
    }
}

/// One entry: `offset` seconds of TAI − UTC from `jd_utc` on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeapSecond {
    pub jd_utc: f64,
    pub offset: f64,
}

/// Result of reading UTC off a TAI date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtcSplit {
    pub whole: f64,
    pub fraction: f64,
    /// Seconds elapsed in an inserted leap second, and the UTC date (midnight)
    /// the leap second precedes.
    pub leap_second: Option<(f64, f64)>,
    pub warning: Option<ExtrapolatedLeapSecondWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeapSecondTable {
    entries: Vec<LeapSecond>,
    valid_through: f64,
    policy: ExtrapolationPolicy,
}

impl LeapSecondTable {
    /// Build a table from `(UTC Julian date, TAI − UTC)` pairs.
    ///
    /// Return
    /// ----------
    /// * [`OrreryError::LeapSecondTable`] when the table is empty, not strictly
    ///   increasing in date, or expires before its last entry.
    pub fn new(entries: Vec<LeapSecond>, valid_through: f64) -> Result<Self> {
        let Some(last) = entries.last() else {
            return Err(OrreryError::LeapSecondTable("no entry".into()));
        };
        if entries
            .iter()
            .any(|e| !(e.jd_utc.is_finite() && e.offset.is_finite()))
        {
            return Err(OrreryError::LeapSecondTable("non-finite entry".into()));
        }
        if entries.windows(2).any(|w| w[0].jd_utc >= w[1].jd_utc) {
            return Err(OrreryError::LeapSecondTable(
                "entries are not in increasing date order".into(),
            ));
        }
        if !(valid_through >= last.jd_utc) {
            return Err(OrreryError::LeapSecondTable(format!(
                "valid-through JD {valid_through} precedes the last entry JD {}",
                last.jd_utc
            )));
        }
        Ok(LeapSecondTable {
            entries,
            valid_through,
            policy: ExtrapolationPolicy::default(),
        })
    }

    pub fn builtin() -> Self {
        BUILTIN_LEAP_SECONDS.clone()
    }

    /// Read a leap-second file.
    pub fn load(path: &Utf8Path, format: LeapSecondFormat) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| OrreryError::io(path.as_str(), e))?;
        Self::parse(&text, format)
    }

    pub fn parse(text: &str, format: LeapSecondFormat) -> Result<Self> {
        match format {
            LeapSecondFormat::Iers => Self::parse_iers(text),
            LeapSecondFormat::Usno => Self::parse_usno(text),
        }
    }

    /// Parse an IERS `Leap_Second.dat` file.
    pub fn parse_iers(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        let mut expires = None;
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if let Some(comment) = line.strip_prefix('#') {
                if let Some(date) = comment.trim().strip_prefix("File expires on") {
                    expires = Some(parse_expiry(date.trim())?);
                }
                continue;
            }
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [mjd, _day, _month, _year, offset] = fields[..] else {
                return Err(OrreryError::LeapSecondTable(format!(
                    "line {}: expected 5 fields, found {}",
                    number + 1,
                    fields.len()
                )));
            };
            entries.push(LeapSecond {
                jd_utc: parse_number(mjd, number)? + JDTOMJD,
                offset: parse_number(offset, number)?,
            });
        }
        let last = entries.last().map_or(f64::NAN, |e| e.jd_utc);
        Self::new(entries, expires.unwrap_or(last))
    }

    /// Parse a USNO `leapsec.dat` file (Julian date in field 5, offset in field 7).
    pub fn parse_usno(text: &str) -> Result<Self> {
        let entries = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                match (fields.get(4), fields.get(6)) {
                    (Some(jd), Some(offset)) => Ok(LeapSecond {
                        jd_utc: parse_number(jd, number)?,
                        offset: parse_number(offset, number)?,
                    }),
                    _ => Err(OrreryError::LeapSecondTable(format!(
                        "line {}: expected at least 7 fields",
                        number + 1
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let last = entries.last().map_or(f64::NAN, |e| e.jd_utc);
        Self::new(entries, last)
    }

    pub fn with_valid_through(mut self, jd_utc: f64) -> Result<Self> {
        let last = self.entries.last().map_or(f64::NAN, |e| e.jd_utc);
        if !(jd_utc >= last) {
            return Err(OrreryError::LeapSecondTable(format!(
                "valid-through JD {jd_utc} precedes the last entry JD {last}"
            )));
        }
        self.valid_through = jd_utc;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: ExtrapolationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn entries(&self) -> &[LeapSecond] {
        &self.entries
    }

    /// UTC Julian date up to which the table is authoritative.
    pub fn valid_through(&self) -> f64 {
        self.valid_through
    }

    pub fn policy(&self) -> ExtrapolationPolicy {
        self.policy
    }

    /// Mean rate of the last two entries, in seconds per day.
    fn last_rate(&self) -> f64 {
        match self.entries[..] {
            [.., a, b] => (b.offset - a.offset) / (b.jd_utc - a.jd_utc),
            _ => 0.0,
        }
    }

    fn extrapolate(&self, jd_utc: f64) -> (f64, Option<ExtrapolatedLeapSecondWarning>) {
        let last = self.entries[self.entries.len() - 1].offset;
        if jd_utc <= self.valid_through {
            return (last, None);
        }
        let offset = match self.policy {
            ExtrapolationPolicy::Hold => last,
            ExtrapolationPolicy::LastRate => {
                last + self.last_rate() * (jd_utc - self.valid_through)
            }
        };
        let warning = ExtrapolatedLeapSecondWarning {
            valid_through: self.valid_through,
            jd_utc,
            offset,
        };
        (offset, Some(warning))
    }

    /// TAI − UTC in effect at a UTC Julian date.
    ///
    /// Arguments
    /// -----------------
    /// * `jd_utc`: Julian date on the UTC axis.
    ///
    /// Return
    /// ----------
    /// * The offset in seconds, with a warning when `jd_utc` lies past the
    ///   valid-through date.
    pub fn offset_at(&self, jd_utc: f64) -> (f64, Option<ExtrapolatedLeapSecondWarning>) {
        let index = self.entries.partition_point(|e| e.jd_utc <= jd_utc);
        if index == self.entries.len() {
            return self.extrapolate(jd_utc);
        }
        let entry = self.entries[index.saturating_sub(1)];
        (entry.offset, None)
    }

    /// Read UTC off a two-part TAI Julian date.
    ///
    /// Inside an inserted leap second the returned Julian date lies on the
    /// midnight that follows it, and `leap_second` tells how far into the
    /// inserted second the instant is.
    pub fn utc_from_tai(&self, whole: f64, fraction: f64) -> UtcSplit {
        let tai = whole + fraction;
        let index = self
            .entries
            .partition_point(|e| e.jd_utc + e.offset / SECONDS_PER_DAY <= tai);

        if index == self.entries.len() {
            // Past the last entry the offset may drift, solve j = tai - offset(j).
            let mut offset = self.entries[index - 1].offset;
            let mut warning = None;
            for _ in 0..4 {
                (offset, warning) = self.extrapolate(tai - offset / SECONDS_PER_DAY);
            }
            return UtcSplit {
                whole,
                fraction: fraction - offset / SECONDS_PER_DAY,
                leap_second: None,
                warning,
            };
        }

        let offset = self.entries[index.saturating_sub(1)].offset;
        let utc_fraction = fraction - offset / SECONDS_PER_DAY;
        let next = self.entries[index];
        // Days past the next entry, split so the leap second keeps its precision.
        let past_next = (whole - next.jd_utc) + utc_fraction;
        let leap_second =
            (index > 0 && past_next >= 0.0).then(|| (past_next * SECONDS_PER_DAY, next.jd_utc));

        UtcSplit {
            whole,
            fraction: utc_fraction,
            leap_second,
            warning: None,
        }
    }
}

fn parse_number(field: &str, line: usize) -> Result<f64> {
    field.parse().map_err(|_| {
        OrreryError::LeapSecondTable(format!("line {}: '{field}' is not a number", line + 1))
    })
}

/// `28 June 2026` to the Julian date of its midnight.
fn parse_expiry(text: &str) -> Result<f64> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let bad = || OrreryError::LeapSecondTable(format!("unreadable expiry date '{text}'"));
    let fields: Vec<&str> = text.split_whitespace().collect();
    let [day, month, year] = fields[..] else {
        return Err(bad());
    };
    let day: u8 = day.parse().map_err(|_| bad())?;
    let year: i32 = year.parse().map_err(|_| bad())?;
    let month = month.to_ascii_lowercase();
    let month = MONTHS
        .iter()
        .position(|m| month.starts_with(m))
        .ok_or_else(bad)? as u8
        + 1;
    Ok(julian_day_number(year, month, day) as f64 - 0.5)
}

#[cfg(test)]
mod test_leap_seconds {
    use super::*;
    use approx::assert_relative_eq;

    const IERS_SAMPLE: &str = "\
#  Value of TAI-UTC in second valid beetween the initial value until
#  the epoch given on the next line. The last line reads that NO
#  leap second was introduced since the corresponding date
#
#  File expires on 28 June 2026
#
#    MJD        Date        TAI-UTC (s)
#           day month year
#    ---    --------------   ------
#
    41317.0    1  1 1972       10
    41499.0    1  7 1972       11
    57204.0    1  7 2015       36
    57754.0    1  1 2017       37
";

    const USNO_SAMPLE: &str = "\
 1972 JAN  1 =JD 2441317.5  TAI-UTC=  10.0       S + (MJD - 41317.) X 0.0      S
 1972 JUL  1 =JD 2441499.5  TAI-UTC=  11.0       S + (MJD - 41317.) X 0.0      S
 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S
";

    #[test]
    fn test_parse_iers() {
        let table = LeapSecondTable::parse_iers(IERS_SAMPLE).unwrap();
        assert_eq!(table.entries().len(), 4);
        assert_eq!(table.entries()[0].jd_utc, 2441317.5);
        assert_eq!(table.valid_through(), BUILTIN_VALID_THROUGH);
    }

    #[test]
    fn test_parse_usno() {
        let table = LeapSecondTable::parse(USNO_SAMPLE, LeapSecondFormat::Usno).unwrap();
        assert_eq!(table.entries().len(), 3);
        assert_eq!(table.entries()[2].offset, 37.0);
        assert_eq!(table.valid_through(), 2457754.5);
    }

    #[test]
    fn test_malformed_files() {
        assert!(LeapSecondTable::parse_iers("41317.0 1 1 1972").is_err());
        assert!(LeapSecondTable::parse_iers("# only comments\n").is_err());
        assert!(LeapSecondTable::parse_usno("1972 JAN 1 =JD x TAI-UTC= 10.0").is_err());
        let reversed = "41499.0 1 7 1972 11\n41317.0 1 1 1972 10\n";
        assert!(LeapSecondTable::parse_iers(reversed).is_err());
    }

    #[test]
    fn test_offset_lookup() {
        let table = LeapSecondTable::builtin();
        assert_eq!(table.offset_at(2441317.5), (10.0, None));
        assert_eq!(table.offset_at(2457754.5 - 1e-6), (36.0, None));
        assert_eq!(table.offset_at(2457754.5), (37.0, None));
        // Before 1972 the first offset is held.
        assert_eq!(table.offset_at(2440000.5), (10.0, None));
    }

    #[test]
    fn test_extrapolation_policies() {
        let table = LeapSecondTable::builtin();
        let later = BUILTIN_VALID_THROUGH + 550.0;

        let (offset, warning) = table.offset_at(later);
        let warning = warning.unwrap();
        // 1 s over 550 days between the last two entries
        assert_relative_eq!(offset, 38.0, epsilon = 1e-12);
        assert_eq!(warning.valid_through, BUILTIN_VALID_THROUGH);
        assert_eq!(warning.jd_utc, later);

        let held = table.with_policy(ExtrapolationPolicy::Hold);
        let (offset, warning) = held.offset_at(later);
        assert_eq!(offset, 37.0);
        assert!(warning.is_some());
    }

    #[test]
    fn test_utc_from_tai_inside_leap_second() {
        let table = LeapSecondTable::builtin();
        // 2016-12-31T23:59:60.5 UTC is 2017-01-01T00:00:36.5 TAI
        let tai_fraction = 36.5 / SECONDS_PER_DAY;
        let split = table.utc_from_tai(2457754.5, tai_fraction);
        let (into, date) = split.leap_second.unwrap();
        assert_relative_eq!(into, 0.5, epsilon = 1e-6);
        assert_eq!(date, 2457754.5);

        // One second later UTC resumes at 00:00:00.5
        let split = table.utc_from_tai(2457754.5, 37.5 / SECONDS_PER_DAY);
        assert!(split.leap_second.is_none());
        assert_relative_eq!(split.fraction * SECONDS_PER_DAY, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_valid_through_override() {
        let table = LeapSecondTable::builtin();
        assert!(table.clone().with_valid_through(2400000.5).is_err());
        let extended = table.with_valid_through(2470000.5).unwrap();
        assert_eq!(extended.offset_at(2465000.5), (37.0, None));
    }
}
