//! # Orrery: the query façade
//!
//! [`Orrery`] wires the crate together:
//!
//! 1. **Time scales** ([`TimeScales`]): caller times to TT, then to TDB seconds.
//! 2. **Body graph** ([`BodyGraph`]): chained kernel segments, ICRF vectors.
//! 3. **Frame chain** ([`FrameChain`]): rotation into the requested [`Frame`].
//! 4. **Query cache** ([`QueryCache`]): optional memoization of the answers.
//!
//! ## Typical usage
//!
//! ```rust, no_run
//! use orrery::{bodies::Body, config::OrreryConfig, frames::Frame, orrery::Orrery, time::CalendarTime};
//!
//! let config = OrreryConfig::default().with_kernel("de440s.bsp");
//! let orrery = Orrery::from_config(config).unwrap();
//!
//! let time: CalendarTime = "2024-04-08T18:00:00Z".parse().unwrap();
//! let moon = orrery.astrometric(Body::MOON, Body::EARTH, time, Frame::Icrf).unwrap();
//! let radec = moon.radec();
//! println!("RA {:.4} h, Dec {:.4}°", radec.ra_hours(), radec.dec_degrees());
//! ```
//!
//! ## Queries
//!
//! * [`Orrery::state`]: geometric position and velocity of a target relative
//!   to an observer (a body or a site on the Earth).
//! * [`Orrery::position`] / [`Orrery::velocity`]: one of the two vectors.
//! * [`Orrery::astrometric`]: the target seen where it was when the light
//!   received at the query time left it.
//!
//! Every answer carries the leap-second extrapolation warnings raised by the
//! time conversion; they are also logged with `tracing::warn!`.

use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::{
    bodies::Body,
    body_graph::{BodyGraph, PosVel},
    cache::{QueryCache, QueryKey, QueryKind},
    config::OrreryConfig,
    constants::{NaifId, TdbSeconds, VLIGHT},
    frames::{Frame, FrameChain},
    kernel::{segment::Segment, Kernel},
    orrery_errors::{OrreryError, Result},
    positions::{FramedVector, Observer, StateVector},
    time::{Instant, TimeInput, TimeScales},
};

/// Number of light-time iterations; the correction converges to far below a
/// microsecond for solar system distances.
const LIGHT_TIME_ITERATIONS: usize = 3;

#[derive(Debug)]
pub struct Orrery {
    scales: Arc<TimeScales>,
    graph: BodyGraph,
    cache: QueryCache,
}

impl Orrery {
    /// Open the kernels and build the converters listed in a configuration.
    ///
    /// Arguments
    /// -----------------
    /// * `config`: Kernel paths, leap-second source, ΔT and cache capacity.
    ///
    /// Return
    /// ----------
    /// * The ready-to-query orrery, or the first error met while reading the
    ///   leap-second file or opening a kernel.
    ///
    /// See also
    /// ------------
    /// * [`OrreryConfig::from_toml_str`] – Configuration from TOML text.
    /// * [`Orrery::new`] – Build from already opened kernels.
    #[instrument(skip_all, fields(kernels = config.kernels.len()))]
    pub fn from_config(config: OrreryConfig) -> Result<Self> {
        let scales = config.time_scales()?;
        let kernels = config
            .kernels
            .iter()
            .map(|path| Kernel::open(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(kernels, scales, config.cache_capacity))
    }

    /// Build an orrery over opened kernels, given in load order.
    pub fn new(kernels: Vec<Kernel>, scales: TimeScales, cache_capacity: usize) -> Self {
        let scales = Arc::new(scales);
        let frames = FrameChain::new(Arc::clone(&scales));
        let graph = BodyGraph::new(kernels.into_iter().map(Arc::new).collect(), frames);
        debug!(bodies = graph.bodies().len(), cache_capacity, "orrery ready");
        Orrery {
            scales,
            graph,
            cache: QueryCache::new(cache_capacity),
        }
    }

    pub fn time_scales(&self) -> &TimeScales {
        &self.scales
    }

    pub fn frame_chain(&self) -> &FrameChain {
        self.graph.frames()
    }

    pub fn body_graph(&self) -> &BodyGraph {
        &self.graph
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Bodies reachable through at least one evaluable segment.
    pub fn bodies(&self) -> Vec<Body> {
        self.graph.bodies().into_iter().map(Body::from_id).collect()
    }

    /// Frames every query can be expressed in, besides site horizons.
    pub fn frames(&self) -> Vec<Frame> {
        Frame::INERTIAL_AND_EARTH.to_vec()
    }

    /// Every segment of every kernel with the name of its kernel.
    pub fn segments(&self) -> Vec<(&str, &Segment)> {
        self.graph
            .kernels()
            .iter()
            .flat_map(|kernel| kernel.segments().iter().map(move |s| (kernel.path(), s)))
            .collect()
    }

    /// TDB seconds past J2000 of a caller time.
    pub fn kernel_seconds(&self, time: impl Into<TimeInput>) -> Result<TdbSeconds> {
        let tt = self.scales.to_uniform_scale(time);
        self.scales.to_kernel_scale(&tt).to_kernel_seconds()
    }

    /// Geometric state of `target` relative to `observer`.
    ///
    /// Arguments
    /// -----------------
    /// * `target`: Observed body, as a [`Body`] or a NAIF id.
    /// * `observer`: A body, a NAIF id or a [`Topos`](crate::topos::Topos) on the Earth.
    /// * `time`: A UTC [`CalendarTime`](crate::time::CalendarTime) or an [`Instant`] on any scale.
    /// * `frame`: Frame of the result.
    ///
    /// Return
    /// ----------
    /// * The state in km and km/s, or the first error among
    ///   [`OrreryError::OutOfRange`], [`OrreryError::NoPath`] and
    ///   [`OrreryError::UnsupportedFrame`].
    ///
    /// See also
    /// ------------
    /// * [`Orrery::astrometric`] – Light-time corrected variant.
    pub fn state(
        &self,
        target: impl Into<NaifId>,
        observer: impl Into<Observer>,
        time: impl Into<TimeInput>,
        frame: Frame,
    ) -> Result<StateVector> {
        let tt = self.scales.to_uniform_scale(time);
        self.query(target.into(), observer.into(), tt, frame, QueryKind::Geometric)
    }

    pub fn position(
        &self,
        target: impl Into<NaifId>,
        observer: impl Into<Observer>,
        time: impl Into<TimeInput>,
        frame: Frame,
    ) -> Result<FramedVector> {
        Ok(self.state(target, observer, time, frame)?.position_vector())
    }

    pub fn velocity(
        &self,
        target: impl Into<NaifId>,
        observer: impl Into<Observer>,
        time: impl Into<TimeInput>,
        frame: Frame,
    ) -> Result<FramedVector> {
        Ok(self.state(target, observer, time, frame)?.velocity_vector())
    }

    /// Light-time corrected state of `target` seen from `observer`.
    ///
    /// The target is evaluated at `t − τ`, where `τ` is the one-way light
    /// time, and the observer at `t`. Both are referred to the solar system
    /// barycenter when the loaded kernels reach it, otherwise to the center
    /// body of the observer. Aberration and light deflection are not applied.
    pub fn astrometric(
        &self,
        target: impl Into<NaifId>,
        observer: impl Into<Observer>,
        time: impl Into<TimeInput>,
        frame: Frame,
    ) -> Result<StateVector> {
        let tt = self.scales.to_uniform_scale(time);
        self.query(target.into(), observer.into(), tt, frame, QueryKind::Astrometric)
    }

    #[instrument(level = "debug", skip(self))]
    fn query(
        &self,
        target: NaifId,
        observer: Observer,
        tt: Instant,
        frame: Frame,
        kind: QueryKind,
    ) -> Result<StateVector> {
        let key = QueryKey::new(target, observer, &tt, frame, kind);
        self.cache.get_or_try_insert(key, || {
            let tdb = self.scales.to_kernel_scale(&tt);
            let et = tdb.to_kernel_seconds()?;

            let ((position, velocity), light_time) = match kind {
                QueryKind::Geometric => {
                    (self.relative_state(target, observer, observer.center(), et, &tdb)?, None)
                }
                QueryKind::Astrometric => {
                    let (state, tau) = self.light_time_state(target, observer, et, &tdb)?;
                    (state, Some(tau))
                }
            };

            let (position, velocity) = if frame == Frame::Icrf {
                (position, velocity)
            } else {
                self.frame_chain()
                    .transform_state(&position, &velocity, &Frame::Icrf, &frame, &tdb)?
            };

            Ok::<_, OrreryError>(StateVector {
                target,
                observer,
                position,
                velocity,
                frame,
                instant: tt,
                light_time,
                warnings: tt.warning().into_iter().collect(),
            })
        })
    }

    /// State of the observer relative to `reference`, in the ICRF.
    fn observer_state(
        &self,
        observer: Observer,
        reference: NaifId,
        et: TdbSeconds,
        instant: &Instant,
    ) -> Result<PosVel> {
        match observer {
            Observer::Body(id) => self.graph.position_of(id, reference, et),
            Observer::Topos(site) => {
                let (p, v) = self.graph.position_of(observer.center(), reference, et)?;
                let (sp, sv) = site.geocentric_state(self.frame_chain(), &Frame::Icrf, instant)?;
                Ok((p + sp, v + sv))
            }
        }
    }

    /// Geometric state of `target` minus the observer, both relative to `reference`.
    fn relative_state(
        &self,
        target: NaifId,
        observer: Observer,
        reference: NaifId,
        et: TdbSeconds,
        instant: &Instant,
    ) -> Result<PosVel> {
        let (tp, tv) = self.graph.position_of(target, reference, et)?;
        let (op, ov) = self.observer_state(observer, reference, et, instant)?;
        Ok((tp - op, tv - ov))
    }

    fn light_time_state(
        &self,
        target: NaifId,
        observer: Observer,
        et: TdbSeconds,
        instant: &Instant,
    ) -> Result<(PosVel, f64)> {
        let reference = if self.graph.contains(Body::SSB.id()) {
            Body::SSB.id()
        } else {
            observer.center()
        };
        let (op, ov) = self.observer_state(observer, reference, et, instant)?;

        let mut tau = 0.0;
        let mut state = self.graph.position_of(target, reference, et)?;
        for _ in 0..LIGHT_TIME_ITERATIONS {
            tau = (state.0 - op).norm() / VLIGHT;
            state = self.graph.position_of(target, reference, et - tau)?;
        }
        let (tp, tv) = state;
        Ok(((tp - op, tv - ov), tau))
    }

    /// One line per loaded kernel with its segment count and bodies.
    pub fn describe(&self) -> String {
        self.graph
            .kernels()
            .iter()
            .map(|k| {
                format!(
                    "{}: {} segments, bodies {}",
                    k.path(),
                    k.segments().len(),
                    k.bodies().iter().join(", ")
                )
            })
            .join("\n")
    }
}

#[cfg(test)]
mod test_orrery {
    use super::*;
    use crate::{
        constants::{J2000, SECONDS_PER_DAY},
        kernel::{
            spk_type::SpkDataType,
            writer::{SegmentSpec, SpkWriter},
        },
        time::TimeScale,
        topos::Topos,
    };
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const DAY: f64 = SECONDS_PER_DAY;

    /// `target` moves along +y at `speed` km/s from `(x, 0, 0)` at the start.
    fn moving(target: NaifId, center: NaifId, x: f64, speed: f64) -> SegmentSpec {
        let series = (0..20)
            .map(|i| {
                let y_mid = speed * (i as f64 + 0.5) * DAY;
                let y_half = speed * 0.5 * DAY;
                vec![x, 0.0, y_mid, y_half, 0.0, 0.0]
            })
            .collect();
        SegmentSpec::uniform(
            target,
            center,
            -10.0 * DAY,
            DAY,
            series,
            SpkDataType::ChebyshevPositionOnly,
        )
        .unwrap()
    }

    fn orrery(capacity: usize) -> Orrery {
        let bytes = SpkWriter::new("TEST")
            .segment(moving(3, 0, 1.5e8, 30.0))
            .segment(moving(399, 3, -4_700.0, 0.0))
            .segment(moving(301, 3, 380_000.0, 1.0))
            .to_bytes();
        let kernel = Kernel::from_bytes("test.bsp", bytes).unwrap();
        Orrery::new(vec![kernel], TimeScales::default(), capacity)
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Orrery>();
    }

    #[test]
    fn test_geometric_state() {
        let o = orrery(16);
        let t = Instant::from_jd(J2000, TimeScale::Tdb);
        let s = o.state(301, Body::EARTH, t, Frame::Icrf).unwrap();
        assert_relative_eq!(s.position.x, 384_700.0, epsilon = 1e-6);
        assert_relative_eq!(s.velocity.y, 1.0, epsilon = 1e-9);
        assert!(s.light_time.is_none());
        assert_eq!(s.instant.scale(), TimeScale::Tt);

        // Cached the second time.
        let again = o.state(301, Body::EARTH, t, Frame::Icrf).unwrap();
        assert_eq!(again, s);
        assert_eq!(o.cache().len(), 1);
    }

    #[test]
    fn test_astrometric_light_time() {
        let o = orrery(0);
        let t = Instant::from_jd(J2000, TimeScale::Tdb);
        let geometric = o.state(301, 399, t, Frame::Icrf).unwrap();
        let apparent = o.astrometric(301, 399, t, Frame::Icrf).unwrap();

        let tau = apparent.light_time.unwrap();
        assert_relative_eq!(tau, geometric.distance() / VLIGHT, max_relative = 1e-3);
        // The Moon moved by ~1.28 km (1 km/s relative to the Earth) during
        // the light time, but the Earth itself moved 30 km/s around the SSB.
        let shift = geometric.position - apparent.position;
        assert_relative_eq!(shift.y, 31.0 * tau, max_relative = 1e-6);
        assert!(o.cache().is_empty());
    }

    #[test]
    fn test_topocentric_observer() {
        let o = orrery(0);
        let t = Instant::from_jd(J2000, TimeScale::Tt);
        let site = Topos::new(0.0, 0.0, 0.0).unwrap();
        let geo = o.state(301, 399, t, Frame::Icrf).unwrap();
        let topo = o.state(301, site, t, Frame::Icrf).unwrap();
        let offset = geo.position - topo.position;
        assert_relative_eq!(offset.norm(), 6378.137, epsilon = 1e-6);

        let horizon = o.state(301, site, t, Frame::Horizon(site)).unwrap();
        assert_relative_eq!(horizon.distance(), topo.distance(), max_relative = 1e-12);
        assert!(horizon.altaz().is_ok());
    }

    #[test]
    fn test_introspection() {
        let o = orrery(0);
        assert_eq!(
            o.bodies(),
            vec![Body::SSB, Body::EARTH_MOON_BARYCENTER, Body::MOON, Body::EARTH]
        );
        assert_eq!(o.segments().len(), 3);
        assert_eq!(o.frames().len(), 6);
        assert!(o.describe().starts_with("test.bsp: 3 segments"));
    }

    #[test]
    fn test_errors() {
        let o = orrery(4);
        let t = Instant::from_jd(J2000 + 30.0, TimeScale::Tdb);
        assert!(matches!(
            o.state(301, 399, t, Frame::Icrf),
            Err(OrreryError::OutOfRange { .. })
        ));
        assert!(matches!(
            o.position(301, 399, Instant::from_jd(J2000, TimeScale::Tdb), Frame::Naif(31006)),
            Err(OrreryError::UnsupportedFrame { .. })
        ));
        assert!(o.cache().is_empty());
        assert_eq!(
            o.velocity(399, 399, Instant::from_jd(J2000, TimeScale::Tdb), Frame::Icrf)
                .unwrap()
                .vector,
            Vector3::zeros()
        );
    }
}
