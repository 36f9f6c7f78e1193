//! Proleptic Gregorian calendar arithmetic.
//!
//! Julian day numbers are computed with the integer algorithm of Fliegel &
//! Van Flandern (1968), which is exact for every date after
//! JD 0 (-4713-11-24). The civil day starts at `.5`, so the Julian date of a
//! calendar day at midnight is `jdn - 0.5`.

use std::{fmt, str::FromStr};

use nom::{
    bytes::complete::tag,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map_res, opt, recognize},
    number::complete::double,
    sequence::preceded,
    IResult, Parser,
};

use crate::orrery_errors::{OrreryError, Result};

/// Julian day number of a proleptic Gregorian date.
pub fn julian_day_number(year: i32, month: u8, day: u8) -> i64 {
    let (year, month, day) = (year as i64, month as i64, day as i64);
    let janfeb = i64::from(month < 3);
    day - 32075 + 1461 * (year + 4800 - janfeb) / 4 + 367 * (month - 2 + janfeb * 12) / 12
        - 3 * ((year + 4900 - janfeb) / 100) / 4
}

/// Julian date of a civil date and time, as `(whole, fraction)`.
///
/// `whole` is the Julian date of the preceding midnight and `fraction` the
/// elapsed part of the day, so that precision is kept below the microsecond.
pub fn julian_date(
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: f64,
) -> (f64, f64) {
    let whole = julian_day_number(year, month, day) as f64 - 0.5;
    let fraction = ((second / 60.0 + minute as f64) / 60.0 + hour as f64) / 24.0;
    (whole, fraction)
}

/// Gregorian `(year, month, day)` of a Julian day number.
pub fn calendar_date(jdn: i64) -> (i32, u8, u8) {
    let mut k = jdn + 68569;
    let n = 4 * k / 146097;
    k -= (146097 * n + 3) / 4;
    let m = 4000 * (k + 1) / 1461001;
    k = k - 1461 * m / 4 + 31;
    let month = 80 * k / 2447;
    let day = k - 2447 * month / 80;
    let k = month / 11;
    let month = month + 2 - 12 * k;
    let year = 100 * (n - 49) + m + k;
    (year as i32, month as u8, day as u8)
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// A civil date and time of day.
///
/// `second` may reach `60.x` to name the inserted second of a leap-second day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: f64,
}

impl CalendarTime {
    /// Build a validated calendar time.
    ///
    /// Return
    /// ----------
    /// * [`OrreryError::InvalidCalendarDate`] for a month, day, hour or minute
    ///   outside its range, or a second outside `[0, 60)`. Seconds in `[60, 61)`
    ///   are only accepted at 23:59, where leap seconds are inserted.
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: f64) -> Result<Self> {
        let time = CalendarTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        };
        if !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || !(0.0..61.0).contains(&second)
            || (second >= 60.0 && (hour, minute) != (23, 59))
        {
            return Err(OrreryError::InvalidCalendarDate(time.to_string()));
        }
        Ok(time)
    }

    pub fn date(year: i32, month: u8, day: u8) -> Result<Self> {
        Self::new(year, month, day, 0, 0, 0.0)
    }

    /// Julian date of the time, taking the second at face value.
    pub fn julian_date(&self) -> (f64, f64) {
        julian_date(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
    }

    /// Calendar time of a two-part Julian date, without leap-second awareness.
    pub fn from_julian_date(whole: f64, fraction: f64) -> Self {
        // Shift to a midnight-based day before splitting.
        let shifted = whole + 0.5;
        let mut day = shifted.floor();
        let mut frac = (shifted - day) + fraction;
        let carry = frac.floor();
        day += carry;
        frac -= carry;

        let (year, month, dom) = calendar_date(day as i64);
        let hours = frac * 24.0;
        let hour = hours.floor().min(23.0);
        let minutes = (hours - hour) * 60.0;
        let minute = minutes.floor().min(59.0);
        let second = ((minutes - minute) * 60.0).max(0.0);
        CalendarTime {
            year,
            month,
            day: dom,
            hour: hour as u8,
            minute: minute as u8,
            second,
        }
    }

    /// ISO 8601 text with `places` decimals on the seconds and a `Z` suffix.
    ///
    /// Seconds are truncated, callers round beforehand.
    pub fn iso(&self, places: usize) -> String {
        let whole = self.second.floor();
        let mut text = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, whole as u8
        );
        if places > 0 {
            let scale = 10f64.powi(places as i32);
            let digits = ((self.second - whole) * scale).floor() as u64;
            text.push_str(&format!(".{digits:0places$}"));
        }
        text.push('Z');
        text
    }
}

impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:06.3}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

fn number<T: FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, str::parse).parse(input)
}

fn signed_year(input: &str) -> IResult<&str, i32> {
    map_res(recognize((opt(one_of("+-")), digit1)), str::parse).parse(input)
}

/// `YYYY-MM-DD[(T| )HH:MM[:SS[.fff]]][Z]`
fn iso_time(input: &str) -> IResult<&str, (i32, u8, u8, u8, u8, f64)> {
    let (input, (year, _, month, _, day)) =
        (signed_year, char('-'), number::<u8>, char('-'), number::<u8>).parse(input)?;
    let (input, time) = opt(preceded(
        one_of("T "),
        (
            number::<u8>,
            char(':'),
            number::<u8>,
            opt(preceded(char(':'), |s| double(s))),
        ),
    ))
    .parse(input)?;
    let (input, _) = opt(tag("Z")).parse(input)?;
    let (hour, minute, second) = time.map_or((0, 0, 0.0), |(h, _, m, s)| (h, m, s.unwrap_or(0.0)));
    Ok((input, (year, month, day, hour, minute, second)))
}

impl FromStr for CalendarTime {
    type Err = OrreryError;

    fn from_str(s: &str) -> Result<Self> {
        let (_, (year, month, day, hour, minute, second)) = all_consuming(iso_time)
            .parse(s.trim())
            .map_err(|_| OrreryError::InvalidCalendarDate(s.to_string()))?;
        CalendarTime::new(year, month, day, hour, minute, second)
    }
}
