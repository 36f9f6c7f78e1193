//! # Topocentric observing sites
//!
//! A [`Topos`] is a fixed point on the WGS84 ellipsoid, given by its geodetic
//! longitude, latitude and elevation. It provides:
//!
//! * its **Earth-fixed** position (km) through the geocentric parallax
//!   constants `(ρ·cosφ', ρ·sinφ')`,
//! * the rotation from the Earth-fixed frame to its local **east-north-up**
//!   horizon frame,
//! * its inertial position and velocity once combined with a
//!   [`FrameChain`](crate::frames::FrameChain).
//!
//! Coordinates are stored as [`NotNan`] so that a site can be hashed and used
//! in [`Frame::Horizon`](crate::frames::Frame::Horizon) and in cache keys.

use std::fmt;

use nalgebra::{Matrix3, Vector3};
use ordered_float::NotNan;

use crate::{
    constants::{Degree, Kilometer, Meter, Radian, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS},
    frames::{Frame, FrameChain},
    orrery_errors::{OrreryError, Result},
    time::Instant,
};

/// A geodetic site on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topos {
    /// Geodetic longitude in **degrees**, east positive.
    longitude: NotNan<f64>,

    /// Geodetic latitude in **degrees**.
    latitude: NotNan<f64>,

    /// Height above the ellipsoid in **meters**.
    elevation: NotNan<f64>,
}

impl Topos {
    /// Create a site from geodetic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `longitude`: Geodetic longitude in **degrees**, east positive, within `[-360, 360]`.
    /// * `latitude`: Geodetic latitude in **degrees**, within `[-90, 90]`.
    /// * `elevation`: Height above the WGS84 ellipsoid in **meters**.
    ///
    /// Return
    /// ----------
    /// * The site, or [`OrreryError::InvalidSite`] if a coordinate is NaN,
    ///   infinite or out of its range.
    pub fn new(longitude: Degree, latitude: Degree, elevation: Meter) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(OrreryError::InvalidSite(format!(
                "latitude {latitude}° outside [-90°, 90°]"
            )));
        }
        if !(-360.0..=360.0).contains(&longitude) {
            return Err(OrreryError::InvalidSite(format!(
                "longitude {longitude}° outside [-360°, 360°]"
            )));
        }
        if !elevation.is_finite() {
            return Err(OrreryError::InvalidSite(format!(
                "elevation {elevation} m is not finite"
            )));
        }
        Ok(Topos {
            longitude: NotNan::new(longitude)?,
            latitude: NotNan::new(latitude)?,
            elevation: NotNan::new(elevation)?,
        })
    }

    pub fn longitude(&self) -> Degree {
        self.longitude.into_inner()
    }

    pub fn latitude(&self) -> Degree {
        self.latitude.into_inner()
    }

    pub fn elevation(&self) -> Meter {
        self.elevation.into_inner()
    }

    /// Geocentric parallax constants `(ρ·cosφ', ρ·sinφ')` in Earth equatorial radii.
    pub fn parallax(&self) -> (f64, f64) {
        geodetic_to_parallax(self.latitude(), self.elevation())
    }

    /// Position of the site in the Earth-fixed frame, in **km**.
    pub fn earth_fixed_position(&self) -> Vector3<Kilometer> {
        let (rho_cos_phi, rho_sin_phi) = self.parallax();
        let lon = self.longitude().to_radians();
        let radius = EARTH_MAJOR_AXIS / 1000.0;

        Vector3::new(
            radius * rho_cos_phi * lon.cos(),
            radius * rho_cos_phi * lon.sin(),
            radius * rho_sin_phi,
        )
    }

    /// Rotation from the Earth-fixed frame to the local east-north-up frame.
    ///
    /// The rows of the matrix are the east, north and up unit vectors, with
    /// "up" along the ellipsoid normal (geodetic vertical).
    pub fn enu_matrix(&self) -> Matrix3<f64> {
        let (sin_lon, cos_lon) = self.longitude().to_radians().sin_cos();
        let (sin_lat, cos_lat) = self.latitude().to_radians().sin_cos();

        #[rustfmt::skip]
        let enu = Matrix3::new(
            -sin_lon,            cos_lon,            0.0,
            -sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat,
             cos_lat * cos_lon,  cos_lat * sin_lon, sin_lat,
        );
        enu
    }

    /// Geocentric position (km) and velocity (km/s) of the site in `frame`.
    ///
    /// The site is at rest in the Earth-fixed frame; its velocity in inertial
    /// frames comes from the Earth spin carried by the frame chain.
    ///
    /// Arguments
    /// -----------------
    /// * `chain`: Frame chain providing the Earth orientation.
    /// * `frame`: Frame of the result, typically [`Frame::Icrf`].
    /// * `instant`: Time of the state, on any scale.
    ///
    /// See also
    /// ------------
    /// * [`FrameChain::transform_state`] – The underlying state rotation.
    pub fn geocentric_state(
        &self,
        chain: &FrameChain,
        frame: &Frame,
        instant: &Instant,
    ) -> Result<(Vector3<f64>, Vector3<f64>)> {
        chain.transform_state(
            &self.earth_fixed_position(),
            &Vector3::zeros(),
            &Frame::EarthFixed,
            frame,
            instant,
        )
    }
}

impl fmt::Display for Topos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.latitude();
        let lon = self.longitude();
        write!(
            f,
            "{:.4}°{} {:.4}°{} {:.1} m",
            lat.abs(),
            if lat >= 0.0 { 'N' } else { 'S' },
            lon.abs(),
            if lon >= 0.0 { 'E' } else { 'W' },
            self.elevation()
        )
    }
}

/// Convert geodetic latitude and height into parallax constants on the
/// WGS84 ellipsoid.
///
/// Arguments
/// -----------------
/// * `lat`: Geodetic latitude in **radians**.
/// * `height`: Height above the ellipsoid in **meters**.
///
/// Return
/// ----------
/// * `(ρ·cosφ', ρ·sinφ')`, in units of the equatorial radius, where `φ'` is
///   the geocentric latitude.
///
/// ```text
/// u      = atan2(b/a · sin φ, cos φ)
/// ρ sinφ' = b/a · sin u + h/a · sin φ
/// ρ cosφ' = cos u + h/a · cos φ
/// ```
pub fn lat_alt_to_parallax(lat: Radian, height: Meter) -> (f64, f64) {
    let axis_ratio = EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS;

    // Parametric latitude
    let u = (lat.sin() * axis_ratio).atan2(lat.cos());

    let rho_sin_phi = axis_ratio * u.sin() + (height / EARTH_MAJOR_AXIS) * lat.sin();
    let rho_cos_phi = u.cos() + (height / EARTH_MAJOR_AXIS) * lat.cos();

    (rho_cos_phi, rho_sin_phi)
}

/// Same as [`lat_alt_to_parallax`] with the latitude in degrees.
pub fn geodetic_to_parallax(lat: Degree, height: Meter) -> (f64, f64) {
    lat_alt_to_parallax(lat.to_radians(), height)
}

#[cfg(test)]
mod test_topos {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parallax_values() {
        // Pan-STARRS 1, Haleakala
        let (rho_cos_phi, rho_sin_phi) = geodetic_to_parallax(20.707233557, 3067.694);
        assert_relative_eq!(rho_cos_phi, 0.9362410003211518, epsilon = 1e-14);
        assert_relative_eq!(rho_sin_phi, 0.35154299856304305, epsilon = 1e-14);
    }

    #[test]
    fn test_equator_and_pole() {
        let (c, s) = lat_alt_to_parallax(0.0, 0.0);
        assert_relative_eq!(c, 1.0, epsilon = 1e-15);
        assert_relative_eq!(s, 0.0, epsilon = 1e-15);

        let pole = Topos::new(0.0, 90.0, 0.0).unwrap();
        assert_relative_eq!(
            pole.earth_fixed_position(),
            Vector3::new(0.0, 0.0, EARTH_MINOR_AXIS / 1000.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_invalid_sites() {
        assert!(Topos::new(0.0, 91.0, 0.0).is_err());
        assert!(Topos::new(f64::NAN, 0.0, 0.0).is_err());
        assert!(Topos::new(0.0, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_enu_matrix() {
        let site = Topos::new(-70.0, -30.0, 2000.0).unwrap();
        let enu = site.enu_matrix();
        assert_relative_eq!(enu * enu.transpose(), Matrix3::identity(), epsilon = 1e-15);
        assert_relative_eq!(enu.determinant(), 1.0, epsilon = 1e-15);

        // The site position points mostly "up".
        let up = enu * site.earth_fixed_position().normalize();
        assert!(up.z > 0.99);
        assert!(up.x.abs() < 1e-12);
    }

    #[test]
    fn test_hash_and_display() {
        use std::collections::HashSet;
        let a = Topos::new(2.35, 48.85, 35.0).unwrap();
        let b = Topos::new(2.35, 48.85, 35.0).unwrap();
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_eq!(a.to_string(), "48.8500°N 2.3500°E 35.0 m");
    }
}
