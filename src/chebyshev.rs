//! Chebyshev record evaluation.
//!
//! An SPK type 2/3 record stores, for one time interval, the interval midpoint
//! `mid`, its half-length `radius` and one Chebyshev series per state
//! component. This module evaluates such a record at an arbitrary epoch.
//!
//! ## Normalized time
//! The epoch is mapped onto the series domain with
//!
//! ```text
//! t' = 2 (t - mid) / span = (t - mid) / radius,      span = 2 radius
//! ```
//!
//! and must fall within `[-1, 1]`. Epochs outside the domain are rejected,
//! never clamped, since a clamped value would silently return the state at
//! the record edge.
//!
//! ## Series
//! The first-kind polynomials and their derivatives are built once per call
//! with the forward recurrences
//!
//! ```text
//! T_0 = 1,  T_1 = t',  T_n  = 2 t' T_{n-1} - T_{n-2}
//! T'_0 = 0, T'_1 = 1,  T'_n = 2 T_{n-1} + 2 t' T'_{n-1} - T'_{n-2}
//! ```
//!
//! Position is `Σ c_n T_n(t')` (km). For position-only records the velocity is
//! the analytic derivative `Σ c_n T'_n(t')` times `dt'/dt = 2 / span` (km/s).
//! Position-velocity records carry their own velocity series, already in km/s.
//!
//! ## See also
//! ------------
//! * [`crate::kernel::segment::Segment::record_at`] – Locate and decode the record.
//! * NAIF SPK Required Reading – Type 2 and type 3 evaluation.

use std::fmt;

use nalgebra::Vector3;
use smallvec::SmallVec;

use crate::{
    constants::TdbSeconds,
    orrery_errors::{OrreryError, Result},
};

/// Slack on the normalized time absorbing the rounding of `(t - mid) / radius`
/// at the record edges.
const DOMAIN_SLACK: f64 = 1e-9;

/// Basis values for the usual degrees stay on the stack.
type Basis = SmallVec<[f64; 32]>;

/// One decoded Chebyshev record.
///
/// `coefficients` is component-major: the `n_coeffs` coefficients of X, then
/// Y, then Z, then (type 3 only) VX, VY, VZ.
#[derive(Debug, Clone, PartialEq)]
pub struct ChebyshevRecord {
    /// Midpoint of the record interval (TDB seconds past J2000).
    pub mid: TdbSeconds,
    /// Half-length of the record interval (seconds).
    pub radius: f64,
    /// Coefficients per series (polynomial degree + 1).
    pub n_coeffs: usize,
    /// 3 for position-only records, 6 for position-velocity records.
    pub components: usize,
    pub coefficients: Vec<f64>,
}

impl ChebyshevRecord {
    /// Build a record from its raw words `[mid, radius, coefficients...]`.
    ///
    /// Return
    /// ----------
    /// * `None` if the word count does not match `components` series.
    pub fn from_words(words: &[f64], components: usize) -> Option<Self> {
        let (head, coefficients) = words.split_at_checked(2)?;
        if components == 0 || coefficients.is_empty() || coefficients.len() % components != 0 {
            return None;
        }
        Some(ChebyshevRecord {
            mid: head[0],
            radius: head[1],
            n_coeffs: coefficients.len() / components,
            components,
            coefficients: coefficients.to_vec(),
        })
    }

    /// Polynomial degree of each series.
    pub fn degree(&self) -> usize {
        self.n_coeffs - 1
    }

    /// Interval covered by the record, `[mid - radius, mid + radius]`.
    pub fn interval(&self) -> (TdbSeconds, TdbSeconds) {
        (self.mid - self.radius, self.mid + self.radius)
    }

    /// Map an epoch onto the series domain.
    ///
    /// Arguments
    /// -----------------
    /// * `et`: Epoch in TDB seconds past J2000.
    ///
    /// Return
    /// ----------
    /// * The normalized time `t' ∈ [-1, 1]`, or [`OrreryError::OutOfRange`] when
    ///   the epoch lies outside the record interval.
    pub fn normalized_time(&self, et: TdbSeconds) -> Result<f64> {
        let t = (et - self.mid) / self.radius;
        if !t.is_finite() || t.abs() > 1.0 + DOMAIN_SLACK {
            return Err(OrreryError::OutOfRange {
                center: 0,
                target: 0,
                tdb_seconds: et,
                coverage: Some(self.interval()),
            });
        }
        Ok(t)
    }

    fn series(&self, component: usize) -> &[f64] {
        let start = component * self.n_coeffs;
        &self.coefficients[start..start + self.n_coeffs]
    }

    /// Evaluate position (km) and velocity (km/s) at `et`.
    ///
    /// Arguments
    /// -----------------
    /// * `et`: Epoch in TDB seconds past J2000.
    ///
    /// Return
    /// ----------
    /// * `(position, velocity)` in the native frame of the segment.
    ///
    /// See also
    /// ------------
    /// * [`chebyshev_basis`] – The polynomial and derivative recurrences.
    pub fn evaluate(&self, et: TdbSeconds) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let t = self.normalized_time(et)?;
        let (basis, derivative) = chebyshev_basis(t, self.n_coeffs);

        let dot = |series: &[f64], values: &[f64]| -> f64 {
            series.iter().zip(values).map(|(c, p)| c * p).sum()
        };

        let position = Vector3::from_fn(|i, _| dot(self.series(i), &basis));

        let velocity = if self.components == 6 {
            Vector3::from_fn(|i, _| dot(self.series(i + 3), &basis))
        } else {
            // dt'/dt = 2 / span = 1 / radius
            let scale = 1.0 / self.radius;
            Vector3::from_fn(|i, _| dot(self.series(i), &derivative) * scale)
        };

        Ok((position, velocity))
    }
}

/// Chebyshev polynomials of the first kind and their derivatives at `t`.
///
/// Arguments
/// -----------------
/// * `t`: Normalized time in `[-1, 1]`.
/// * `n`: Number of terms (degree + 1).
///
/// Return
/// ----------
/// * `(T_0..T_{n-1}, T'_0..T'_{n-1})` evaluated at `t`.
pub fn chebyshev_basis(t: f64, n: usize) -> (Basis, Basis) {
    let mut values: Basis = SmallVec::from_elem(0.0, n);
    let mut derivatives: Basis = SmallVec::from_elem(0.0, n);
    if n == 0 {
        return (values, derivatives);
    }

    values[0] = 1.0;
    if n > 1 {
        values[1] = t;
        derivatives[1] = 1.0;
    }
    for k in 2..n {
        values[k] = 2.0 * t * values[k - 1] - values[k - 2];
        derivatives[k] = 2.0 * values[k - 1] + 2.0 * t * derivatives[k - 1] - derivatives[k - 2];
    }

    (values, derivatives)
}

impl fmt::Display for ChebyshevRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.interval();
        writeln!(
            f,
            "Chebyshev record: mid = {:.3} s, radius = {:.3} s, [{start:.3}, {end:.3}]",
            self.mid, self.radius
        )?;
        let labels = ["X", "Y", "Z", "VX", "VY", "VZ"];
        for (component, label) in labels.iter().enumerate().take(self.components) {
            let series = self.series(component);
            write!(f, "  {label:<2} (degree {}):", self.degree())?;
            for c in series {
                write!(f, " {c:+.6e}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
