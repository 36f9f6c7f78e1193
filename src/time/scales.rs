//! Conversions between UTC, TAI, TT, TDB and UT1.
//!
//! Every conversion goes through TT, the uniform scale of the crate:
//!
//! ```text
//!            leap seconds          32.184 s          tdb_minus_tt
//!    UTC  ───────────────▶  TAI  ──────────▶  TT  ───────────────▶  TDB
//!                                             │
//!                                             └──── ΔT ───▶  UT1
//! ```
//!
//! Forward steps are closed-form; TDB → TT and TAI → UTC past the table end
//! are solved by fixed-point iteration, which converges in a few steps since
//! both offsets vary by far less than a second per day.

use camino::Utf8Path;
use tracing::warn;

use crate::{
    constants::{DAYS_PER_CENTURY, J2000, SECONDS_PER_DAY, TT_MINUS_TAI},
    orrery_errors::Result,
};

use super::{
    calendar::{julian_date, CalendarTime},
    leap_seconds::{ExtrapolatedLeapSecondWarning, LeapSecondFormat, LeapSecondTable},
    Instant, TimeScale,
};

/// Default TT − UT1, in seconds (value around 2024).
pub const DEFAULT_DELTA_T: f64 = 69.2;

/// TDB − TT in seconds at a TT Julian date.
///
/// Arguments
/// -----------------
/// * `whole`, `fraction`: Two-part Julian date on TT (TDB gives the same
///   result to a few picoseconds).
///
/// Return
/// ----------
/// * The periodic offset from USNO Circular 179, eq. 2.6 (amplitude ~1.7 ms).
pub fn tdb_minus_tt(whole: f64, fraction: f64) -> f64 {
    let t = ((whole - J2000) + fraction) / DAYS_PER_CENTURY;
    0.001657 * (628.3076 * t + 6.2401).sin()
        + 0.000022 * (575.3385 * t + 4.2970).sin()
        + 0.000014 * (1256.6152 * t + 6.1969).sin()
        + 0.000005 * (606.9777 * t + 4.0212).sin()
        + 0.000005 * (52.9691 * t + 0.4444).sin()
        + 0.000002 * (21.3299 * t + 5.5431).sin()
        + 0.000010 * t * (628.3076 * t + 4.2490).sin()
}

/// Anything that can be brought to the uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeInput {
    /// Civil UTC date and time.
    Calendar(CalendarTime),
    Instant(Instant),
}

impl From<CalendarTime> for TimeInput {
    fn from(time: CalendarTime) -> Self {
        TimeInput::Calendar(time)
    }
}

impl From<Instant> for TimeInput {
    fn from(instant: Instant) -> Self {
        TimeInput::Instant(instant)
    }
}

impl From<&Instant> for TimeInput {
    fn from(instant: &Instant) -> Self {
        TimeInput::Instant(*instant)
    }
}

/// Converter between time scales.
///
/// Holds only immutable tables, so one value can be shared (`Arc`) by every
/// thread issuing queries.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeScales {
    leap_seconds: LeapSecondTable,
    delta_t: f64,
}

impl Default for TimeScales {
    fn default() -> Self {
        TimeScales::new(LeapSecondTable::builtin())
    }
}

impl TimeScales {
    pub fn new(leap_seconds: LeapSecondTable) -> Self {
        TimeScales {
            leap_seconds,
            delta_t: DEFAULT_DELTA_T,
        }
    }

    /// Converter using a leap-second file instead of the built-in table.
    pub fn from_leap_second_file(path: &Utf8Path, format: LeapSecondFormat) -> Result<Self> {
        Ok(Self::new(LeapSecondTable::load(path, format)?))
    }

    /// Set TT − UT1, in seconds.
    pub fn with_delta_t(mut self, seconds: f64) -> Self {
        self.delta_t = seconds;
        self
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    pub fn leap_seconds(&self) -> &LeapSecondTable {
        &self.leap_seconds
    }

    /// Last date (UTC) for which the leap-second table is authoritative.
    pub fn valid_through(&self) -> CalendarTime {
        CalendarTime::from_julian_date(self.leap_seconds.valid_through(), 0.0)
    }

    fn report(
        &self,
        warning: Option<ExtrapolatedLeapSecondWarning>,
    ) -> Option<ExtrapolatedLeapSecondWarning> {
        if let Some(w) = &warning {
            warn!(
                jd_utc = w.jd_utc,
                valid_through = w.valid_through,
                offset = w.offset,
                "leap-second table extrapolated"
            );
        }
        warning
    }

    /// TT instant of a UTC civil time.
    ///
    /// The offset is looked up at the start of the minute, so a `second` of
    /// 60 during a leap-second day lands on the inserted second.
    fn calendar_to_tt(&self, time: &CalendarTime) -> Instant {
        let (whole, minutes) = julian_date(time.year, time.month, time.day, time.hour, time.minute, 0.0);
        let (offset, warning) = self.leap_seconds.offset_at(whole + minutes);
        let warning = self.report(warning);
        let fraction = minutes + (time.second + offset + TT_MINUS_TAI) / SECONDS_PER_DAY;
        Instant::from_jd_parts(whole, fraction, TimeScale::Tt).with_warning(warning)
    }

    /// Convert to TT, the uniform scale.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: A [`CalendarTime`] read as UTC, or an [`Instant`] on any scale.
    ///
    /// Return
    /// ----------
    /// * The TT instant, carrying an [`ExtrapolatedLeapSecondWarning`] when the
    ///   leap-second table had to be extrapolated.
    ///
    /// See also
    /// ------------
    /// * [`TimeScales::to_kernel_scale`] – Continue to TDB.
    pub fn to_uniform_scale(&self, input: impl Into<TimeInput>) -> Instant {
        match input.into() {
            TimeInput::Calendar(time) => self.calendar_to_tt(&time),
            TimeInput::Instant(instant) => self.to_tt(&instant),
        }
    }

    /// Convert to TDB, the scale of kernel time arguments.
    pub fn to_kernel_scale(&self, instant: &Instant) -> Instant {
        self.convert(instant, TimeScale::Tdb)
    }

    /// TT instant of a UTC civil time given by its components.
    pub fn utc(
        &self,
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: f64,
    ) -> Result<Instant> {
        let time = CalendarTime::new(year, month, day, hour, minute, second)?;
        Ok(self.calendar_to_tt(&time))
    }

    pub fn tt_jd(&self, jd: f64) -> Instant {
        Instant::from_jd(jd, TimeScale::Tt)
    }

    pub fn tdb_jd(&self, jd: f64) -> Instant {
        Instant::from_jd(jd, TimeScale::Tdb)
    }

    fn to_tt(&self, instant: &Instant) -> Instant {
        let (whole, fraction) = (instant.whole(), instant.fraction());
        match instant.scale() {
            TimeScale::Tt => *instant,
            TimeScale::Tai => {
                instant.rescaled(whole, fraction + TT_MINUS_TAI / SECONDS_PER_DAY, TimeScale::Tt)
            }
            TimeScale::Utc => {
                // Inside a leap second the offset of the day before still holds.
                let day = if instant.is_leap_second() {
                    instant.jd() - 1.0
                } else {
                    instant.jd()
                };
                let (offset, warning) = self.leap_seconds.offset_at(day);
                let warning = self.report(warning);
                instant
                    .rescaled(
                        whole,
                        fraction + (offset + TT_MINUS_TAI) / SECONDS_PER_DAY,
                        TimeScale::Tt,
                    )
                    .with_warning(warning)
            }
            TimeScale::Tdb => {
                let mut tt_fraction = fraction;
                for _ in 0..3 {
                    tt_fraction = fraction - tdb_minus_tt(whole, tt_fraction) / SECONDS_PER_DAY;
                }
                instant.rescaled(whole, tt_fraction, TimeScale::Tt)
            }
            TimeScale::Ut1 => {
                instant.rescaled(whole, fraction + self.delta_t / SECONDS_PER_DAY, TimeScale::Tt)
            }
        }
    }

    fn from_tt(&self, tt: &Instant, scale: TimeScale) -> Instant {
        let (whole, fraction) = (tt.whole(), tt.fraction());
        match scale {
            TimeScale::Tt => *tt,
            TimeScale::Tai => {
                tt.rescaled(whole, fraction - TT_MINUS_TAI / SECONDS_PER_DAY, TimeScale::Tai)
            }
            TimeScale::Utc => {
                let split = self
                    .leap_seconds
                    .utc_from_tai(whole, fraction - TT_MINUS_TAI / SECONDS_PER_DAY);
                let warning = self.report(split.warning);
                tt.rescaled(split.whole, split.fraction, TimeScale::Utc)
                    .within_leap_second(split.leap_second.is_some())
                    .with_warning(warning)
            }
            TimeScale::Tdb => tt.rescaled(
                whole,
                fraction + tdb_minus_tt(whole, fraction) / SECONDS_PER_DAY,
                TimeScale::Tdb,
            ),
            TimeScale::Ut1 => {
                tt.rescaled(whole, fraction - self.delta_t / SECONDS_PER_DAY, TimeScale::Ut1)
            }
        }
    }

    /// Express an instant on another scale.
    pub fn convert(&self, instant: &Instant, scale: TimeScale) -> Instant {
        if instant.scale() == scale {
            return *instant;
        }
        let tt = self.to_tt(instant);
        self.from_tt(&tt, scale)
    }

    /// UTC civil time of an instant, naming `23:59:60` inside leap seconds.
    pub fn utc_calendar(&self, instant: &Instant) -> CalendarTime {
        self.utc_calendar_offset(instant, 0.0)
    }

    fn utc_calendar_offset(&self, instant: &Instant, offset_seconds: f64) -> CalendarTime {
        let tt = self.to_tt(instant);
        let split = self.leap_seconds.utc_from_tai(
            tt.whole(),
            tt.fraction() + (offset_seconds - TT_MINUS_TAI) / SECONDS_PER_DAY,
        );
        match split.leap_second {
            Some((into, next_midnight)) => {
                let day_before = CalendarTime::from_julian_date(next_midnight - 1.0, 0.0);
                CalendarTime {
                    hour: 23,
                    minute: 59,
                    second: 60.0 + into,
                    ..day_before
                }
            }
            None => CalendarTime::from_julian_date(split.whole, split.fraction),
        }
    }

    /// ISO 8601 UTC text of an instant, rounded to `places` decimals.
    ///
    /// Return
    /// ----------
    /// * Text such as `2016-12-31T23:59:60.50Z`.
    pub fn utc_iso(&self, instant: &Instant, places: usize) -> String {
        let half_unit = 0.5 * 10f64.powi(-(places as i32));
        self.utc_calendar_offset(instant, half_unit).iso(places)
    }
}
