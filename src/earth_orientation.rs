//! Earth orientation: obliquity, precession, nutation and sidereal time.
//!
//! The rotations here chain the inertial frames to the rotating Earth:
//!
//! ```text
//! ICRF ──B──▶ mean J2000 ──P(t)──▶ mean of date ──N(t)──▶ true of date ──R3(GAST)──▶ Earth-fixed
//! ```
//!
//! * `B`: frame bias, IERS 2003 conventions;
//! * `P`: precession, Capitaine et al. (2003) four-rotation form;
//! * `N`: nutation, IAU 1980 (Wahr) series with the IAU 1976 mean obliquity;
//! * `GAST`: IAU 1982 mean sidereal time plus the equation of the equinoxes.
//!
//! Every matrix is a **passive** rotation: it re-expresses a fixed vector in
//! the target frame, `x_target = M · x_source`.
//!
//! Time arguments are Julian centuries of TT since J2000 unless stated
//! otherwise (TDB is interchangeable at this precision).

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use once_cell::sync::Lazy;

use crate::{
    constants::{ArcSec, Radian, DAYS_PER_CENTURY, DPI, JDTOMJD, J2000, RADSEC, SIDEREAL_RATIO},
    time::Instant,
};

/// J2000 mean obliquity of the IAU 2006 precession, in arcseconds.
const EPS0: ArcSec = 84_381.406;

/// Coordinate axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Passive rotation of the coordinate frame by `angle` about `axis`.
///
/// Arguments
/// -----------------
/// * `angle`: Rotation angle in radians, counter-clockwise seen from the tip
///   of the axis.
/// * `axis`: Rotation axis.
///
/// Return
/// ----------
/// * The matrix expressing a fixed vector in the rotated frame.
pub fn rotmt(angle: Radian, axis: Axis) -> Matrix3<f64> {
    let axis: Unit<Vector3<f64>> = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };
    Rotation3::from_axis_angle(&axis, -angle).into_inner()
}

/// Frame bias from the ICRF to the dynamical mean equator and equinox of J2000.
pub static FRAME_BIAS: Lazy<Matrix3<f64>> = Lazy::new(|| {
    let xi0 = -0.0166170 * RADSEC;
    let eta0 = -0.0068192 * RADSEC;
    let da0 = -0.01460 * RADSEC;

    let (xy, xz) = (da0, -xi0);
    let (yx, yz) = (-da0, -eta0);
    let (zx, zy) = (xi0, eta0);

    let xx = 1.0 - 0.5 * (yx * yx + zx * zx);
    let yy = 1.0 - 0.5 * (yx * yx + zy * zy);
    let zz = 1.0 - 0.5 * (zy * zy + zx * zx);

    Matrix3::new(xx, xy, xz, yx, yy, yz, zx, zy, zz)
});

/// Rotation from the J2000 mean equator to the mean ecliptic and equinox of J2000.
pub static EQUATOR_TO_ECLIPTIC_J2000: Lazy<Matrix3<f64>> =
    Lazy::new(|| rotmt(crate::constants::OBLIQUITY_J2000_ARCSEC * RADSEC, Axis::X));

/// Mean obliquity of the ecliptic, IAU 1976.
///
/// Arguments
/// -----------------
/// * `t`: Julian centuries of TT since J2000.
///
/// Return
/// ----------
/// * `ε = 84381.448" − 46.815" T − 0.0006" T² + 0.00181" T³`, in radians.
pub fn mean_obliquity(t: f64) -> Radian {
    let ob0 = ((23.0 * 3600.0 + 26.0 * 60.0) + 21.448) * RADSEC;
    let ob1 = -46.815 * RADSEC;
    let ob2 = -0.0006 * RADSEC;
    let ob3 = 0.00181 * RADSEC;

    ((ob3 * t + ob2) * t + ob1) * t + ob0
}

/// Nutation in longitude and obliquity, IAU 1980 (Wahr) theory.
///
/// The 106-term series is evaluated with products of the sines and cosines
/// of the five Delaunay arguments instead of one trigonometric call per term.
///
/// Arguments
/// -----------------
/// * `t`: Julian centuries of TT since J2000.
///
/// Return
/// ----------
/// * `(Δψ, Δε)` in arcseconds.
///
/// See also
/// ------------
/// * [`nutation_matrix`] – Rotation built from these angles.
pub fn nutation_angles(t: f64) -> (ArcSec, ArcSec) {
    let t2 = t * t;
    let t3 = t2 * t;

    let dl = (485866.733 + 1717915922.633 * t + 31.310 * t2 + 0.064 * t3) * RADSEC;
    let dp = (1287099.804 + 129596581.224 * t - 0.577 * t2 - 0.012 * t3) * RADSEC;
    let df = (335778.877 + 1739527263.137 * t - 13.257 * t2 + 0.011 * t3) * RADSEC;
    let dd = (1072261.307 + 1602961601.328 * t - 6.891 * t2 + 0.019 * t3) * RADSEC;
    let dn = (450160.280 - 6962890.539 * t + 7.455 * t2 + 0.008 * t3) * RADSEC;

    let l = dl % DPI;
    let p = dp % DPI;
    let x = df % DPI * 2.0;
    let d = dd % DPI;
    let n = dn % DPI;

    let cos_sin = |x: f64| -> (f64, f64) { (x.cos(), x.sin()) };

    let (cl, sl) = cos_sin(l);
    let (cp, sp) = cos_sin(p);
    let (cx, sx) = cos_sin(x);
    let (cd, sd) = cos_sin(d);
    let (cn, sn) = cos_sin(n);

    let cp2 = 2.0 * cp * cp - 1.0;

    let sp2 = 2.0 * sp * cp;
    let cd2 = 2.0 * cd * cd - 1.0;
    let sd2 = 2.0 * sd * cd;
    let cn2 = 2.0 * cn * cn - 1.0;
    let sn2 = 2.0 * sn * cn;
    let cl2 = 2.0 * cl * cl - 1.0;
    let sl2 = 2.0 * sl * cl;

    let ca = cx * cd2 + sx * sd2;
    let sa = sx * cd2 - cx * sd2;
    let cb = ca * cn - sa * sn;
    let sb = sa * cn + ca * sn;
    let cc = cb * cn - sb * sn;
    let sc = sb * cn + cb * sn;

    let cv = cx * cd2 - sx * sd2;
    let sv = sx * cd2 + cx * sd2;
    let ce = cv * cn - sv * sn;
    let se = sv * cn + cv * sn;
    let cf = ce * cn - se * sn;
    let sf = se * cn + ce * sn;

    let cg = cl * cd2 + sl * sd2;
    let sg = sl * cd2 - cl * sd2;
    let ch = cx * cn2 - sx * sn2;
    let sh = sx * cn2 + cx * sn2;
    let cj = ch * cl - sh * sl;
    let sj = sh * cl + ch * sl;

    let ck = cj * cl - sj * sl;
    let sk = sj * cl + cj * sl;
    let cm = cx * cl2 + sx * sl2;
    let sm = sx * cl2 - cx * sl2;
    let cq = cl * cd + sl * sd;
    let sq = sl * cd - cl * sd;

    let cr = 2.0 * cq * cq - 1.0;
    let sr = 2.0 * sq * cq;
    let cs = cx * cn - sx * sn;
    let ss = sx * cn + cx * sn;
    let ct = cs * cl - ss * sl;
    let st = ss * cl + cs * sl;

    let cu = cf * cl + sf * sl;
    let su = sf * cl - cf * sl;
    let cw = cp * cg - sp * sg;
    let sw = sp * cg + cp * sg;

    // Longitude terms, in units of 0.1 mas
    let mut dpsi =
        -(171996.0 + 174.2 * t) * sn + (2062.0 + 0.2 * t) * sn2 + 46.0 * (sm * cn + cm * sn)
            - 11.0 * sm
            - 3.0 * (sm * cn2 + cm * sn2)
            - 3.0 * (sq * cp - cq * sp)
            - 2.0 * (sb * cp2 - cb * sp2)
            + (sn * cm - cn * sm)
            - (13187.0 + 1.6 * t) * sc
            + (1426.0 - 3.4 * t) * sp
            - (517.0 - 1.2 * t) * (sc * cp + cc * sp)
            + (217.0 - 0.5 * t) * (sc * cp - cc * sp)
            + (129.0 + 0.1 * t) * sb
            + 48.0 * sr
            - 22.0 * sa
            + (17.0 - 0.1 * t) * sp2
            - 15.0 * (sp * cn + cp * sn)
            - (16.0 - 0.1 * t) * (sc * cp2 + cc * sp2)
            - 12.0 * (sn * cp - cn * sp);

    dpsi += -6.0 * (sn * cr - cn * sr) - 5.0 * (sb * cp - cb * sp)
        + 4.0 * (sr * cn + cr * sn)
        + 4.0 * (sb * cp + cb * sp)
        - 4.0 * sq
        + (sr * cp + cr * sp)
        + (sn * ca - cn * sa)
        - (sp * ca - cp * sa)
        + (sp * cn2 + cp * sn2)
        + (sn * cq - cn * sq)
        - (sp * ca + cp * sa)
        - (2274.0 + 0.2 * t) * sh
        + (712.0 + 0.1 * t) * sl
        - (386.0 + 0.4 * t) * ss
        - 301.0 * sj
        - 158.0 * sg
        + 123.0 * (sh * cl - ch * sl)
        + 63.0 * sd2
        + (63.0 + 0.1 * t) * (sl * cn + cl * sn)
        - (58.0 + 0.1 * t) * (sn * cl - cn * sl)
        - 59.0 * su
        - 51.0 * st
        - 38.0 * sf
        + 29.0 * sl2;

    dpsi += 29.0 * (sc * cl + cc * sl) - 31.0 * sk
        + 26.0 * sx
        + 21.0 * (ss * cl - cs * sl)
        + 16.0 * (sn * cg - cn * sg)
        - 13.0 * (sn * cg + cn * sg)
        - 10.0 * (se * cl - ce * sl)
        - 7.0 * (sg * cp + cg * sp)
        + 7.0 * (sh * cp + ch * sp)
        - 7.0 * (sh * cp - ch * sp)
        - 8.0 * (sf * cl + cf * sl)
        + 6.0 * (sl * cd2 + cl * sd2)
        + 6.0 * (sc * cl2 + cc * sl2)
        - 6.0 * (sn * cd2 + cn * sd2)
        - 7.0 * se
        + 6.0 * (sb * cl + cb * sl)
        - 5.0 * (sn * cd2 - cn * sd2)
        + 5.0 * (sl * cp - cl * sp)
        - 5.0 * (ss * cl2 + cs * sl2)
        - 4.0 * (sp * cd2 - cp * sd2);

    dpsi += 4.0 * (sl * cx - cl * sx) - 4.0 * sd - 3.0 * (sl * cp + cl * sp)
        + 3.0 * (sl * cx + cl * sx)
        - 3.0 * (sj * cp - cj * sp)
        - 3.0 * (su * cp - cu * sp)
        - 2.0 * (sn * cl2 - cn * sl2)
        - 3.0 * (sk * cl + ck * sl)
        - 3.0 * (sf * cp - cf * sp)
        + 2.0 * (sj * cp + cj * sp)
        - 2.0 * (sb * cl - cb * sl);

    dpsi += 2.0 * (sn * cl2 + cn * sl2) - 2.0 * (sl * cn2 + cl * sn2)
        + 2.0 * (sl * cl2 + cl * sl2)
        + 2.0 * (sh * cd + ch * sd)
        + (sn2 * cl - cn2 * sl)
        - (sg * cd2 - cg * sd2)
        + (sf * cl2 - cf * sl2)
        - 2.0 * (su * cd2 + cu * sd2)
        - (sr * cd2 - cr * sd2)
        + (sw * ch + cw * sh)
        - (sl * ce + cl * se)
        - (sf * cr - cf * sr)
        + (su * ca + cu * sa)
        + (sg * cp - cg * sp)
        + (sb * cl2 + cb * sl2)
        - (sf * cl2 + cf * sl2)
        - (st * ca - ct * sa)
        + (sc * cx + cc * sx)
        + (sj * cr + cj * sr)
        - (sg * cx + cg * sx);

    dpsi += (sp * cs + cp * ss) + (sn * cw - cn * sw)
        - (sn * cx - cn * sx)
        - (sh * cd - ch * sd)
        - (sp * cd2 + cp * sd2)
        - (sl * cv - cl * sv)
        - (ss * cp - cs * sp)
        - (sw * cn + cw * sn)
        - (sl * ca - cl * sa)
        + (sl2 * cd2 + cl2 * sd2)
        - (sf * cd2 + cf * sd2)
        + (sp * cd + cp * sd);

    // Obliquity terms, in units of 0.1 mas
    let mut deps = (92025.0 + 8.9 * t) * cn - (895.0 - 0.5 * t) * cn2 - 24.0 * (cm * cn - sm * sn)
        + (cm * cn2 - sm * sn2)
        + (cb * cp2 + sb * sp2)
        + (5736.0 - 3.1 * t) * cc
        + (54.0 - 0.1 * t) * cp
        + (224.0 - 0.6 * t) * (cc * cp - sc * sp)
        - (95.0 - 0.3 * t) * (cc * cp + sc * sp)
        - 70.0 * cb
        + cr
        + 9.0 * (cp * cn - sp * sn)
        + 7.0 * (cc * cp2 - sc * sp2)
        + 6.0 * (cn * cp + sn * sp)
        + 3.0 * (cn * cr + sn * sr)
        + 3.0 * (cb * cp + sb * sp)
        - 2.0 * (cr * cn - sr * sn)
        - 2.0 * (cb * cp - sb * sp);

    deps += (977.0 - 0.5 * t) * ch - 7.0 * cl + 200.0 * cs + (129.0 - 0.1 * t) * cj
        - cg
        - 53.0 * (ch * cl + sh * sl)
        - 2.0 * cd2
        - 33.0 * (cl * cn - sl * sn)
        + 32.0 * (cn * cl + sn * sl)
        + 26.0 * cu
        + 27.0 * ct
        + 16.0 * cf
        - cl2
        - 12.0 * (cc * cl - sc * sl)
        + 13.0 * ck
        - cx
        - 10.0 * (cs * cl + ss * sl)
        - 8.0 * (cn * cg + sn * sg)
        + 7.0 * (cn * cg - sn * sg)
        + 5.0 * (ce * cl + se * sl)
        - 3.0 * (ch * cp - sh * sp)
        + 3.0 * (ch * cp + sh * sp)
        + 3.0 * (cf * cl - sf * sl)
        - 3.0 * (cc * cl2 - sc * sl2)
        + 3.0 * (cn * cd2 - sn * sd2)
        + 3.0 * ce
        - 3.0 * (cb * cl - sb * sl)
        + 3.0 * (cn * cd2 + sn * sd2)
        + 3.0 * (cs * cl2 - ss * sl2)
        + (cj * cp + sj * sp)
        + (cu * cp + su * sp)
        + (cn * cl2 + sn * sl2)
        + (ck * cl - sk * sl)
        + (cf * cp + sf * sp)
        - (cj * cp - sj * sp)
        + (cb * cl + sb * sl)
        - (cn * cl2 - sn * sl2)
        + (cl * cn2 - sl * sn2)
        - (ch * cd - sh * sd)
        - (cn2 * cl + sn2 * sl)
        - (cf * cl2 + sf * sl2)
        + (cu * cd2 - su * sd2)
        - (cw * ch - sw * sh)
        + (cl * ce - sl * se)
        + (cf * cr + sf * sr)
        - (cb * cl2 - sb * sl2);

    dpsi *= 1e-4;
    deps *= 1e-4;

    (dpsi, deps)
}

/// Nutation matrix from the mean to the true equator and equinox of date.
///
/// `N = R1(−ε − Δε) · R3(−Δψ) · R1(ε)`
pub fn nutation_matrix(t: f64) -> Matrix3<f64> {
    let eps = mean_obliquity(t);
    let (dpsi, deps) = nutation_angles(t);
    let true_eps = eps + deps * RADSEC;
    rotmt(-true_eps, Axis::X) * rotmt(-dpsi * RADSEC, Axis::Z) * rotmt(eps, Axis::X)
}

/// Precession matrix from the mean equator and equinox of J2000 to the mean
/// equator and equinox of date, Capitaine et al. (2003).
///
/// `P = R3(χ_A) · R1(−ω_A) · R3(−ψ_A) · R1(ε_0)`
pub fn precession_matrix(t: f64) -> Matrix3<f64> {
    let psi_a =
        ((((-0.0000000951 * t + 0.000132851) * t - 0.00114045) * t - 1.0790069) * t + 5038.481507)
            * t;
    let omega_a =
        ((((0.0000003337 * t - 0.000000467) * t - 0.00772503) * t + 0.0512623) * t - 0.025754) * t
            + EPS0;
    let chi_a =
        ((((-0.0000000560 * t + 0.000170663) * t - 0.00121197) * t - 2.3814292) * t + 10.556403)
            * t;

    rotmt(chi_a * RADSEC, Axis::Z)
        * rotmt(-omega_a * RADSEC, Axis::X)
        * rotmt(-psi_a * RADSEC, Axis::Z)
        * rotmt(EPS0 * RADSEC, Axis::X)
}

/// Equation of the equinoxes `Δψ cos ε`, in radians.
pub fn equation_of_equinoxes(t: f64) -> Radian {
    let (dpsi, _) = nutation_angles(t);
    RADSEC * dpsi * mean_obliquity(t).cos()
}

/// Greenwich mean sidereal time, IAU 1982.
///
/// Arguments
/// -----------------
/// * `mjd_ut1`: Modified Julian date on UT1.
///
/// Return
/// ----------
/// * GMST in radians, within `[0, 2π)`.
pub fn gmst(mjd_ut1: f64) -> Radian {
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Sidereal time at 0h UT1 of the day, then the rotation since midnight.
    let midnight = mjd_ut1.floor();
    let t = (midnight + JDTOMJD - J2000) / DAYS_PER_CENTURY;
    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / 86400.0;
    let angle = gmst0 + (mjd_ut1 - midnight) * DPI * SIDEREAL_RATIO;

    angle.rem_euclid(DPI)
}

/// Greenwich apparent sidereal time, in radians within `[0, 2π)`.
///
/// Arguments
/// -----------------
/// * `ut1`: The instant on UT1, driving the Earth rotation angle.
/// * `tt`: The same instant on TT, driving the nutation.
pub fn gast(ut1: &Instant, tt: &Instant) -> Radian {
    (gmst(ut1.mjd()) + equation_of_equinoxes(tt.centuries_since_j2000())).rem_euclid(DPI)
}

/// Full rotation from the ICRF to the true equator and equinox of date,
/// `M = N · P · B`.
pub fn icrf_to_true_of_date(t: f64) -> Matrix3<f64> {
    nutation_matrix(t) * precession_matrix(t) * *FRAME_BIAS
}
