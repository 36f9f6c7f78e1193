//! Configuration of an [`Orrery`](crate::orrery::Orrery).
//!
//! The configuration is a TOML document; every key is optional:
//!
//! ```toml
//! kernels = ["data/de440s.bsp", "data/jup365.bsp"]
//! delta_t = 69.2              # TT − UT1, seconds
//! cache_capacity = 1024       # 0 disables the query cache
//! extrapolation = "last_rate" # or "hold"
//! valid_through = "2026-06-28"
//!
//! [leap_seconds]
//! path = "data/Leap_Second.dat"
//! format = "iers"             # or "usno"
//! ```
//!
//! Without a `[leap_seconds]` table the built-in leap-second table is used.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::{
    orrery_errors::{OrreryError, Result},
    time::{
        scales::DEFAULT_DELTA_T, CalendarTime, ExtrapolationPolicy, LeapSecondFormat,
        LeapSecondTable, TimeScales,
    },
};

/// Default number of memoized query results.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Location and layout of a leap-second file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeapSecondSource {
    pub path: Utf8PathBuf,
    pub format: LeapSecondFormat,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrreryConfig {
    /// SPK kernels, in load order (later kernels take precedence).
    pub kernels: Vec<Utf8PathBuf>,
    pub leap_seconds: Option<LeapSecondSource>,
    /// Override of the valid-through date of the leap-second table (UTC, ISO 8601).
    pub valid_through: Option<String>,
    pub extrapolation: ExtrapolationPolicy,
    /// TT − UT1, in seconds.
    pub delta_t: f64,
    pub cache_capacity: usize,
}

impl Default for OrreryConfig {
    fn default() -> Self {
        OrreryConfig {
            kernels: Vec::new(),
            leap_seconds: None,
            valid_through: None,
            extrapolation: ExtrapolationPolicy::default(),
            delta_t: DEFAULT_DELTA_T,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl OrreryConfig {
    /// Parse a TOML configuration.
    ///
    /// Return
    /// ----------
    /// * [`OrreryError::Config`] on a syntax error, an unknown key or a
    ///   non-finite `delta_t`.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: OrreryConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| OrreryError::io(path.as_str(), e))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if !self.delta_t.is_finite() {
            return Err(OrreryError::Config(format!(
                "delta_t must be finite, got {}",
                self.delta_t
            )));
        }
        Ok(())
    }

    pub fn with_kernel(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.kernels.push(path.into());
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Build the time-scale converter described by the configuration.
    ///
    /// Return
    /// ----------
    /// * The converter, or an error if the leap-second file cannot be read or
    ///   the `valid_through` override is not a date.
    pub fn time_scales(&self) -> Result<TimeScales> {
        let mut table = match &self.leap_seconds {
            Some(source) => LeapSecondTable::load(&source.path, source.format)?,
            None => LeapSecondTable::builtin(),
        };
        if let Some(date) = &self.valid_through {
            let time: CalendarTime = date
                .parse()
                .map_err(|_| OrreryError::Config(format!("valid_through: invalid date {date:?}")))?;
            let (whole, fraction) = time.julian_date();
            table = table.with_valid_through(whole + fraction)?;
        }
        Ok(TimeScales::new(table.with_policy(self.extrapolation)).with_delta_t(self.delta_t))
    }
}
