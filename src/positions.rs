//! Positions and states returned by queries, with their derived coordinates.
//!
//! A [`StateVector`] is the full answer of a query: position, velocity, the
//! frame they are expressed in, the instant they refer to and the non-fatal
//! warnings raised while computing them. [`FramedVector`] is its single-vector
//! counterpart. Both derive spherical coordinates:
//!
//! * [`RaDec`] in any frame (right ascension/declination in equatorial frames,
//!   longitude/latitude in the ecliptic one),
//! * [`AltAz`] in a [`Frame::Horizon`].

use std::fmt;

use nalgebra::Vector3;

use crate::{
    bodies::Body,
    constants::{Kilometer, NaifId, Radian, AU, DPI, SECONDS_PER_DAY},
    frames::Frame,
    orrery_errors::{OrreryError, Result},
    time::{ExtrapolatedLeapSecondWarning, Instant},
    topos::Topos,
};

/// Where a query is observed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observer {
    /// Center of a body (or barycenter).
    Body(NaifId),
    /// A site on the surface of the Earth (399).
    Topos(Topos),
}

impl Observer {
    /// Body whose center the observer is attached to.
    pub fn center(&self) -> NaifId {
        match self {
            Observer::Body(id) => *id,
            Observer::Topos(_) => Body::EARTH.id(),
        }
    }
}

impl From<NaifId> for Observer {
    fn from(id: NaifId) -> Self {
        Observer::Body(id)
    }
}

impl From<Body> for Observer {
    fn from(body: Body) -> Self {
        Observer::Body(body.id())
    }
}

impl From<Topos> for Observer {
    fn from(site: Topos) -> Self {
        Observer::Topos(site)
    }
}

impl fmt::Display for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observer::Body(id) => write!(f, "{}", Body::from_id(*id)),
            Observer::Topos(site) => write!(f, "site {site}"),
        }
    }
}

/// Spherical coordinates of a vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaDec {
    /// Right ascension (or longitude), in `[0, 2π)`.
    pub ra: Radian,
    /// Declination (or latitude), in `[-π/2, π/2]`.
    pub dec: Radian,
    pub distance: Kilometer,
}

impl RaDec {
    pub fn ra_hours(&self) -> f64 {
        self.ra * 24.0 / DPI
    }

    pub fn dec_degrees(&self) -> f64 {
        self.dec.to_degrees()
    }
}

/// Local horizontal coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltAz {
    /// Altitude above the horizon plane.
    pub altitude: Radian,
    /// Azimuth from north through east, in `[0, 2π)`.
    pub azimuth: Radian,
    pub distance: Kilometer,
}

/// Longitude in `[0, 2π)`, latitude and norm of a cartesian vector.
///
/// A null vector maps to all zeros.
pub fn cartesian_to_spherical(v: &Vector3<f64>) -> (Radian, Radian, f64) {
    let r = v.norm();
    if r == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let lon = v.y.atan2(v.x).rem_euclid(DPI);
    let lat = (v.z / r).clamp(-1.0, 1.0).asin();
    (lon, lat, r)
}

/// Unit vector of a longitude and latitude.
pub fn spherical_to_cartesian(lon: Radian, lat: Radian) -> Vector3<f64> {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

fn radec_of(v: &Vector3<f64>) -> RaDec {
    let (ra, dec, distance) = cartesian_to_spherical(v);
    RaDec { ra, dec, distance }
}

fn altaz_of(v: &Vector3<f64>, frame: &Frame) -> Result<AltAz> {
    if !matches!(frame, Frame::Horizon(_)) {
        return Err(OrreryError::UnsupportedFrame {
            from: frame.to_string(),
            to: "HORIZON".into(),
        });
    }
    // East, north, up
    let distance = v.norm();
    let azimuth = v.x.atan2(v.y).rem_euclid(DPI);
    let altitude = if distance == 0.0 {
        0.0
    } else {
        (v.z / distance).clamp(-1.0, 1.0).asin()
    };
    Ok(AltAz {
        altitude,
        azimuth,
        distance,
    })
}

/// A single vector tagged with its frame and instant.
#[derive(Debug, Clone, PartialEq)]
pub struct FramedVector {
    pub vector: Vector3<f64>,
    pub frame: Frame,
    pub instant: Instant,
    pub warnings: Vec<ExtrapolatedLeapSecondWarning>,
}

impl FramedVector {
    pub fn norm(&self) -> f64 {
        self.vector.norm()
    }

    pub fn radec(&self) -> RaDec {
        radec_of(&self.vector)
    }

    /// Altitude and azimuth; the vector must be in a horizon frame.
    pub fn altaz(&self) -> Result<AltAz> {
        altaz_of(&self.vector, &self.frame)
    }

    /// The vector divided by the astronomical unit.
    pub fn to_au(&self) -> Vector3<f64> {
        self.vector / AU
    }
}

/// Position and velocity of a target relative to an observer.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    pub target: NaifId,
    pub observer: Observer,
    /// Position in km.
    pub position: Vector3<f64>,
    /// Velocity in km/s of TDB.
    pub velocity: Vector3<f64>,
    pub frame: Frame,
    /// The instant of the query, on TT for states returned by an orrery.
    pub instant: Instant,
    /// One-way light time in seconds, for light-time corrected states.
    pub light_time: Option<f64>,
    pub warnings: Vec<ExtrapolatedLeapSecondWarning>,
}

impl StateVector {
    pub fn distance(&self) -> Kilometer {
        self.position.norm()
    }

    /// Rate of change of the distance, in km/s.
    pub fn range_rate(&self) -> f64 {
        let d = self.distance();
        if d == 0.0 {
            0.0
        } else {
            self.position.dot(&self.velocity) / d
        }
    }

    pub fn position_vector(&self) -> FramedVector {
        FramedVector {
            vector: self.position,
            frame: self.frame,
            instant: self.instant,
            warnings: self.warnings.clone(),
        }
    }

    pub fn velocity_vector(&self) -> FramedVector {
        FramedVector {
            vector: self.velocity,
            frame: self.frame,
            instant: self.instant,
            warnings: self.warnings.clone(),
        }
    }

    pub fn radec(&self) -> RaDec {
        radec_of(&self.position)
    }

    pub fn altaz(&self) -> Result<AltAz> {
        altaz_of(&self.position, &self.frame)
    }

    /// Position in AU and velocity in AU/day.
    pub fn to_au(&self) -> (Vector3<f64>, Vector3<f64>) {
        (self.position / AU, self.velocity * SECONDS_PER_DAY / AU)
    }

    pub fn is_extrapolated(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let radec = self.radec();
        write!(
            f,
            "{} from {} at {} [{}]: RA {:.6} h, Dec {:+.5}°, {:.3} km",
            Body::from_id(self.target),
            self.observer,
            self.instant,
            self.frame,
            radec.ra_hours(),
            radec.dec_degrees(),
            radec.distance
        )?;
        if self.is_extrapolated() {
            write!(f, " (leap seconds extrapolated)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_positions {
    use super::*;
    use crate::{constants::J2000, time::TimeScale};
    use approx::assert_relative_eq;

    fn state(position: Vector3<f64>, frame: Frame) -> StateVector {
        StateVector {
            target: 301,
            observer: Observer::Body(399),
            position,
            velocity: Vector3::new(0.0, 1.0, 0.0),
            frame,
            instant: Instant::from_jd(J2000, TimeScale::Tt),
            light_time: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_spherical() {
        let (lon, lat, r) = cartesian_to_spherical(&Vector3::new(0.0, -2.0, 0.0));
        assert_relative_eq!(lon, 1.5 * std::f64::consts::PI);
        assert_eq!(lat, 0.0);
        assert_eq!(r, 2.0);

        let v = spherical_to_cartesian(1.2, -0.3) * 5.0;
        let (lon, lat, r) = cartesian_to_spherical(&v);
        assert_relative_eq!(lon, 1.2, epsilon = 1e-15);
        assert_relative_eq!(lat, -0.3, epsilon = 1e-15);
        assert_relative_eq!(r, 5.0, epsilon = 1e-14);

        assert_eq!(cartesian_to_spherical(&Vector3::zeros()), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_radec() {
        let s = state(Vector3::new(1.0, 1.0, 2f64.sqrt()), Frame::Icrf);
        let radec = s.radec();
        assert_relative_eq!(radec.ra_hours(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(radec.dec_degrees(), 45.0, epsilon = 1e-12);
        assert_relative_eq!(radec.distance, 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_altaz() {
        let site = Topos::new(0.0, 45.0, 0.0).unwrap();
        // Due east, 30° high.
        let v = Vector3::new((30f64).to_radians().cos(), 0.0, (30f64).to_radians().sin());
        let altaz = state(v, Frame::Horizon(site)).altaz().unwrap();
        assert_relative_eq!(altaz.altitude.to_degrees(), 30.0, epsilon = 1e-12);
        assert_relative_eq!(altaz.azimuth.to_degrees(), 90.0, epsilon = 1e-12);

        assert!(matches!(
            state(v, Frame::Icrf).altaz(),
            Err(OrreryError::UnsupportedFrame { .. })
        ));
    }

    #[test]
    fn test_units_and_rates() {
        let s = state(Vector3::new(AU, 0.0, 0.0), Frame::Icrf);
        let (p, v) = s.to_au();
        assert_eq!(p, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v.y, SECONDS_PER_DAY / AU);
        assert_eq!(s.range_rate(), 0.0);
        assert_eq!(s.position_vector().to_au(), p);
        assert!(!s.is_extrapolated());
    }

    #[test]
    fn test_observer() {
        let site = Topos::new(0.0, 0.0, 0.0).unwrap();
        assert_eq!(Observer::from(site).center(), 399);
        assert_eq!(Observer::from(Body::MOON).center(), 301);
        assert_eq!(Observer::from(10).to_string(), "Sun");
    }
}
