//! # Reference frames and the frame transform chain
//!
//! Vectors produced by the [`BodyGraph`](crate::body_graph::BodyGraph) are in
//! the ICRF. [`FrameChain`] re-expresses them in any other supported [`Frame`]
//! by composing elementary rotations along a fixed table of edges:
//!
//! ```text
//!                       EclipticJ2000
//!                            │ ε₀
//! Icrf ── B ── MeanJ2000 ────┴── P(t) ── MeanOfDate ── N(t) ── TrueOfDate ── R3(GAST) ── EarthFixed ── ENU ── Horizon(site)
//! ```
//!
//! Every edge is usable in both directions (the inverse of a rotation is its
//! transpose). The path between two frames is the shortest one found by a
//! breadth-first search; a frame with no edge, such as an unknown
//! [`Frame::Naif`] id, yields [`OrreryError::UnsupportedFrame`]. There is no
//! identity fallback.
//!
//! Only the Earth rotation step carries a spin vector: velocities crossing it
//! gain or lose the `ω × r` term of a rotating frame. The slow drift of
//! precession and nutation is neglected in velocities.

use std::{collections::VecDeque, fmt, sync::Arc};

use nalgebra::{Matrix3, Vector3};
use smallvec::SmallVec;
use tracing::trace;

use crate::{
    constants::EARTH_ROTATION_RATE,
    earth_orientation::{
        gast, nutation_matrix, precession_matrix, rotmt, Axis, EQUATOR_TO_ECLIPTIC_J2000,
        FRAME_BIAS,
    },
    orrery_errors::{OrreryError, Result},
    time::{Instant, TimeScale, TimeScales},
    topos::Topos,
};

/// NAIF id of the `J2000` inertial frame, aligned with the ICRF.
pub const NAIF_J2000: i32 = 1;
/// NAIF id of the `ECLIPJ2000` frame.
pub const NAIF_ECLIPJ2000: i32 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Frame {
    /// International Celestial Reference Frame, base of every kernel vector.
    Icrf,
    /// Dynamical mean equator and equinox of J2000.
    MeanJ2000,
    /// Mean ecliptic and equinox of J2000.
    EclipticJ2000,
    /// Mean equator and equinox of date.
    MeanOfDate,
    /// True equator and equinox of date.
    TrueOfDate,
    /// Terrestrial frame rotating with the Earth (GAST, no polar motion).
    EarthFixed,
    /// Local east-north-up frame of a site.
    Horizon(Topos),
    /// Kernel frame without a known conversion.
    Naif(i32),
}

impl Frame {
    /// Every frame reachable without a site, in chain order.
    pub const INERTIAL_AND_EARTH: [Frame; 6] = [
        Frame::Icrf,
        Frame::MeanJ2000,
        Frame::EclipticJ2000,
        Frame::MeanOfDate,
        Frame::TrueOfDate,
        Frame::EarthFixed,
    ];

    /// Frame of a segment given its NAIF frame id.
    pub fn from_naif_id(id: i32) -> Frame {
        match id {
            NAIF_J2000 => Frame::Icrf,
            NAIF_ECLIPJ2000 => Frame::EclipticJ2000,
            other => Frame::Naif(other),
        }
    }

    /// Frames one elementary rotation away. `sites` lists the horizon frames
    /// the search may enter from [`Frame::EarthFixed`].
    fn neighbours(&self, sites: &[Topos]) -> SmallVec<[Frame; 4]> {
        use Frame::*;
        match self {
            Icrf => SmallVec::from_slice(&[MeanJ2000]),
            MeanJ2000 => SmallVec::from_slice(&[Icrf, EclipticJ2000, MeanOfDate]),
            EclipticJ2000 => SmallVec::from_slice(&[MeanJ2000]),
            MeanOfDate => SmallVec::from_slice(&[MeanJ2000, TrueOfDate]),
            TrueOfDate => SmallVec::from_slice(&[MeanOfDate, EarthFixed]),
            EarthFixed => std::iter::once(TrueOfDate)
                .chain(sites.iter().map(|site| Horizon(*site)))
                .collect(),
            Horizon(_) => SmallVec::from_slice(&[EarthFixed]),
            Naif(_) => SmallVec::new(),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Icrf => write!(f, "ICRF"),
            Frame::MeanJ2000 => write!(f, "MEAN_J2000"),
            Frame::EclipticJ2000 => write!(f, "ECLIPJ2000"),
            Frame::MeanOfDate => write!(f, "MEAN_OF_DATE"),
            Frame::TrueOfDate => write!(f, "TRUE_OF_DATE"),
            Frame::EarthFixed => write!(f, "EARTH_FIXED"),
            Frame::Horizon(site) => write!(f, "HORIZON({site})"),
            Frame::Naif(id) => write!(f, "NAIF({id})"),
        }
    }
}

/// One rotation of the chain, valid at a given instant.
///
/// `spin` is the angular velocity (rad/s) of the target frame relative to the
/// source frame, expressed in the target frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    pub matrix: Matrix3<f64>,
    pub spin: Option<Vector3<f64>>,
}

impl FrameStep {
    fn fixed(matrix: Matrix3<f64>) -> Self {
        FrameStep { matrix, spin: None }
    }

    /// The step in the opposite direction.
    pub fn inverse(&self) -> Self {
        let matrix = self.matrix.transpose();
        FrameStep {
            matrix,
            spin: self.spin.map(|w| -(matrix * w)),
        }
    }

    /// Apply the step to a position and a velocity.
    pub fn apply(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let p = self.matrix * position;
        let mut v = self.matrix * velocity;
        if let Some(w) = self.spin {
            v -= w.cross(&p);
        }
        (p, v)
    }
}

/// Time arguments of the time-dependent rotations.
struct Epochs {
    tt: Instant,
    ut1: Instant,
}

/// Composer of frame rotations.
///
/// Time-dependent steps take their TT and UT1 arguments from the shared
/// [`TimeScales`], whatever the scale of the instant passed in.
#[derive(Debug, Clone)]
pub struct FrameChain {
    scales: Arc<TimeScales>,
}

impl Default for FrameChain {
    fn default() -> Self {
        FrameChain::new(Arc::new(TimeScales::default()))
    }
}

impl FrameChain {
    pub fn new(scales: Arc<TimeScales>) -> Self {
        FrameChain { scales }
    }

    pub fn time_scales(&self) -> &TimeScales {
        &self.scales
    }

    /// Shortest sequence of frames from `from` to `to`, both included.
    ///
    /// Return
    /// ----------
    /// * [`OrreryError::UnsupportedFrame`] when the two frames are not connected.
    pub fn path(&self, from: &Frame, to: &Frame) -> Result<SmallVec<[Frame; 8]>> {
        if from == to {
            return Ok(SmallVec::from_slice(&[*from]));
        }

        let sites: SmallVec<[Topos; 2]> = [from, to]
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Horizon(site) => Some(*site),
                _ => None,
            })
            .collect();

        // Breadth-first search; the graph has a handful of nodes.
        let mut previous: SmallVec<[(Frame, Frame); 8]> = SmallVec::new();
        let mut queue = VecDeque::from([*from]);
        let mut found = false;
        while let Some(frame) = queue.pop_front() {
            if frame == *to {
                found = true;
                break;
            }
            for next in frame.neighbours(&sites) {
                if next != *from && !previous.iter().any(|(f, _)| *f == next) {
                    previous.push((next, frame));
                    queue.push_back(next);
                }
            }
        }
        if !found {
            return Err(OrreryError::UnsupportedFrame {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut path: SmallVec<[Frame; 8]> = SmallVec::from_slice(&[*to]);
        let mut cursor = *to;
        while let Some((_, prev)) = previous.iter().find(|(f, _)| *f == cursor) {
            path.push(*prev);
            cursor = *prev;
        }
        path.reverse();
        trace!(from = %from, to = %to, hops = path.len() - 1, "frame path");
        Ok(path)
    }

    fn epochs(&self, instant: &Instant) -> Epochs {
        Epochs {
            tt: self.scales.convert(instant, TimeScale::Tt),
            ut1: self.scales.convert(instant, TimeScale::Ut1),
        }
    }

    /// The elementary rotation of one edge, in the forward direction of the table.
    fn forward_step(&self, from: &Frame, to: &Frame, epochs: &Epochs) -> Option<FrameStep> {
        let t = epochs.tt.centuries_since_j2000();
        let step = match (from, to) {
            (Frame::Icrf, Frame::MeanJ2000) => FrameStep::fixed(*FRAME_BIAS),
            (Frame::MeanJ2000, Frame::EclipticJ2000) => {
                FrameStep::fixed(*EQUATOR_TO_ECLIPTIC_J2000)
            }
            (Frame::MeanJ2000, Frame::MeanOfDate) => FrameStep::fixed(precession_matrix(t)),
            (Frame::MeanOfDate, Frame::TrueOfDate) => FrameStep::fixed(nutation_matrix(t)),
            (Frame::TrueOfDate, Frame::EarthFixed) => FrameStep {
                matrix: rotmt(gast(&epochs.ut1, &epochs.tt), Axis::Z),
                spin: Some(Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE)),
            },
            (Frame::EarthFixed, Frame::Horizon(site)) => FrameStep::fixed(site.enu_matrix()),
            _ => return None,
        };
        Some(step)
    }

    fn step(&self, from: &Frame, to: &Frame, epochs: &Epochs) -> Result<FrameStep> {
        self.forward_step(from, to, epochs)
            .or_else(|| self.forward_step(to, from, epochs).map(|s| s.inverse()))
            .ok_or_else(|| OrreryError::UnsupportedFrame {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// The steps from `from` to `to`, in application order.
    pub fn steps(&self, from: &Frame, to: &Frame, instant: &Instant) -> Result<Vec<FrameStep>> {
        let path = self.path(from, to)?;
        if path.len() < 2 {
            return Ok(Vec::new());
        }
        let epochs = self.epochs(instant);
        path.windows(2)
            .map(|pair| self.step(&pair[0], &pair[1], &epochs))
            .collect()
    }

    /// Rotation matrix `M = R_n ⋯ R_1` with `x_to = M · x_from`.
    ///
    /// Arguments
    /// -----------------
    /// * `from`, `to`: Source and target frames.
    /// * `instant`: Time of the rotation, on any scale.
    ///
    /// See also
    /// ------------
    /// * [`FrameChain::transform_state`] – Also carries the velocity through rotating frames.
    pub fn rotation(&self, from: &Frame, to: &Frame, instant: &Instant) -> Result<Matrix3<f64>> {
        Ok(self
            .steps(from, to, instant)?
            .iter()
            .fold(Matrix3::identity(), |m, step| step.matrix * m))
    }

    /// Express a direction or position vector of `from` in `to`.
    pub fn transform(
        &self,
        vector: &Vector3<f64>,
        from: &Frame,
        to: &Frame,
        instant: &Instant,
    ) -> Result<Vector3<f64>> {
        Ok(self.rotation(from, to, instant)? * vector)
    }

    /// Express a position (km) and velocity (km/s) of `from` in `to`.
    ///
    /// Crossing the Earth rotation adds the `ω × r` term of the rotating frame.
    pub fn transform_state(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        from: &Frame,
        to: &Frame,
        instant: &Instant,
    ) -> Result<(Vector3<f64>, Vector3<f64>)> {
        Ok(self
            .steps(from, to, instant)?
            .iter()
            .fold((*position, *velocity), |(p, v), step| step.apply(&p, &v)))
    }
}
