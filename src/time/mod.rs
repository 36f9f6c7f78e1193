//! # Time scales
//!
//! Kernels are indexed in **TDB seconds past J2000**, users speak **UTC**, and
//! Earth orientation needs **TT** and **UT1**. This module provides:
//!
//! * [`Instant`]: a two-part Julian date tagged with its [`TimeScale`],
//! * [`TimeScales`]: the converter between scales, holding the leap-second
//!   table and ΔT,
//! * [`CalendarTime`]: civil dates, including the `23:59:60` of leap-second days.
//!
//! ## Two-part Julian dates
//!
//! A Julian date near 2.45 million days only resolves ~40 µs in one `f64`.
//! [`Instant`] keeps the integer day and the day fraction apart, so that
//! conversions between any two scales round-trip below the microsecond.
//!
//! ## Offsets
//!
//! ```text
//! TAI = UTC + (TAI − UTC)              leap-second table
//! TT  = TAI + 32.184 s
//! TDB = TT  + tdb_minus_tt(TT)         USNO Circular 179, eq. 2.6
//! UT1 = TT  − ΔT
//! ```

pub mod calendar;
pub mod leap_seconds;
pub mod scales;

use std::{
    fmt,
    ops::{Add, Sub},
};

use hifitime::Epoch;

use crate::{
    constants::{TdbSeconds, DAYS_PER_CENTURY, J2000, JDTOMJD, SECONDS_PER_DAY},
    orrery_errors::{OrreryError, Result},
};

pub use calendar::CalendarTime;
pub use leap_seconds::{
    ExtrapolatedLeapSecondWarning, ExtrapolationPolicy, LeapSecondFormat, LeapSecondTable,
};
pub use scales::{tdb_minus_tt, TimeInput, TimeScales};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeScale {
    Utc,
    Tai,
    Tt,
    Tdb,
    Ut1,
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeScale::Utc => "UTC",
            TimeScale::Tai => "TAI",
            TimeScale::Tt => "TT",
            TimeScale::Tdb => "TDB",
            TimeScale::Ut1 => "UT1",
        };
        write!(f, "{s}")
    }
}

/// A point in time on one time scale.
///
/// The Julian date is `whole + fraction` with `whole` integral and
/// `fraction ∈ [0, 1)`.
///
/// A UTC Julian date inside an inserted leap second reads the same as the
/// first second of the following day, so UTC instants carry a flag telling
/// the two apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instant {
    whole: f64,
    fraction: f64,
    scale: TimeScale,
    leap_second: bool,
    warning: Option<ExtrapolatedLeapSecondWarning>,
}

impl Instant {
    pub fn from_jd(jd: f64, scale: TimeScale) -> Self {
        Self::from_jd_parts(jd, 0.0, scale)
    }

    /// Build an instant from a Julian date split in two arbitrary parts.
    pub fn from_jd_parts(whole: f64, fraction: f64, scale: TimeScale) -> Self {
        let base = whole.floor();
        let rest = (whole - base) + fraction;
        let carry = rest.floor();
        Instant {
            whole: base + carry,
            fraction: rest - carry,
            scale,
            leap_second: false,
            warning: None,
        }
    }

    /// TDB instant from kernel seconds past J2000.
    pub fn from_kernel_seconds(seconds: TdbSeconds) -> Self {
        let days = (seconds / SECONDS_PER_DAY).floor();
        let rest = (seconds - days * SECONDS_PER_DAY) / SECONDS_PER_DAY;
        Self::from_jd_parts(J2000 + days, rest, TimeScale::Tdb)
    }

    /// TT instant of a hifitime epoch.
    pub fn from_epoch(epoch: Epoch) -> Self {
        let mjd = epoch.to_mjd_tt_days();
        Self::from_jd_parts(JDTOMJD + mjd.floor(), mjd - mjd.floor(), TimeScale::Tt)
    }

    /// hifitime epoch of a TT instant.
    pub fn to_epoch(&self) -> Result<Epoch> {
        self.require(TimeScale::Tt)?;
        let mjd = (self.whole - JDTOMJD) + self.fraction;
        Ok(Epoch::from_mjd_in_time_scale(mjd, hifitime::TimeScale::TT))
    }

    pub(crate) fn with_warning(mut self, warning: Option<ExtrapolatedLeapSecondWarning>) -> Self {
        self.warning = self.warning.or(warning);
        self
    }

    pub(crate) fn within_leap_second(mut self, leap_second: bool) -> Self {
        self.leap_second = leap_second && self.scale == TimeScale::Utc;
        self
    }

    /// Whether this UTC instant lies inside an inserted leap second.
    pub fn is_leap_second(&self) -> bool {
        self.leap_second
    }

    pub(crate) fn rescaled(&self, whole: f64, fraction: f64, scale: TimeScale) -> Self {
        Self::from_jd_parts(whole, fraction, scale).with_warning(self.warning)
    }

    pub fn whole(&self) -> f64 {
        self.whole
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn jd(&self) -> f64 {
        self.whole + self.fraction
    }

    pub fn mjd(&self) -> f64 {
        (self.whole - JDTOMJD) + self.fraction
    }

    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    /// Set when the instant was derived past the end of the leap-second table.
    pub fn warning(&self) -> Option<ExtrapolatedLeapSecondWarning> {
        self.warning
    }

    /// Julian centuries since J2000 on the instant's own scale.
    pub fn centuries_since_j2000(&self) -> f64 {
        ((self.whole - J2000) + self.fraction) / DAYS_PER_CENTURY
    }

    fn require(&self, expected: TimeScale) -> Result<()> {
        if self.scale != expected {
            return Err(OrreryError::ScaleMismatch {
                expected: expected.to_string(),
                found: self.scale.to_string(),
            });
        }
        Ok(())
    }

    /// TDB seconds past J2000, the time argument of every kernel.
    ///
    /// Return
    /// ----------
    /// * [`OrreryError::ScaleMismatch`] unless the instant is on TDB; convert
    ///   with [`TimeScales::to_kernel_scale`] first.
    pub fn to_kernel_seconds(&self) -> Result<TdbSeconds> {
        self.require(TimeScale::Tdb)?;
        Ok(((self.whole - J2000) + self.fraction) * SECONDS_PER_DAY)
    }

    /// `self − other` in days. Both instants must be on the same scale.
    pub fn days_since(&self, other: &Instant) -> Result<f64> {
        other.require(self.scale)?;
        Ok((self.whole - other.whole) + (self.fraction - other.fraction))
    }

    pub fn seconds_since(&self, other: &Instant) -> Result<f64> {
        Ok(self.days_since(other)? * SECONDS_PER_DAY)
    }

    /// Instants from `self` to `self + days` included, every `step` days.
    pub fn day_range(&self, days: f64, step: f64) -> Vec<Instant> {
        if !(step > 0.0) || !(days >= 0.0) {
            return vec![*self];
        }
        let count = ((days + step * 0.5) / step).floor() as usize + 1;
        (0..count).map(|i| *self + i as f64 * step).collect()
    }

    /// Exact key for hashing, stable across identical inputs.
    pub(crate) fn key(&self) -> (u64, u64, TimeScale) {
        (self.whole.to_bits(), self.fraction.to_bits(), self.scale)
    }
}

impl Add<f64> for Instant {
    type Output = Instant;

    /// Shift by a number of days on the same scale.
    fn add(self, days: f64) -> Instant {
        self.rescaled(self.whole, self.fraction + days, self.scale)
    }
}

impl Sub<f64> for Instant {
    type Output = Instant;

    fn sub(self, days: f64) -> Instant {
        self + (-days)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JD {:.9} {}", self.jd(), self.scale)
    }
}
