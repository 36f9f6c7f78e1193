//! # Body graph resolver
//!
//! Every segment of every loaded kernel gives the state of a **target** body
//! relative to a **center** body. [`BodyGraph`] gathers those links in an
//! undirected graph over NAIF ids and answers "where is body A seen from body
//! B" by chaining links:
//!
//! ```text
//!   Moon (301) ── 3 ── Earth-Moon barycenter (3) ── 0 ── SSB (0) ── 10 ── Sun (10)
//!                          │
//!                       Earth (399)
//! ```
//!
//! ## Path search
//!
//! * Breadth-first over the links that **cover the query time**, so the path
//!   with the fewest hops wins.
//! * Neighbours are visited by increasing NAIF id, which breaks ties
//!   deterministically.
//! * The search always runs from the lower id to the higher id and the result
//!   is negated when the query is the other way round, so that
//!   `position_of(a, b) == -position_of(b, a)` holds bit for bit.
//!
//! ## Failures
//!
//! * [`OrreryError::OutOfRange`] when the bodies are connected in the graph but
//!   a needed link has no segment covering the time. The link and its loaded
//!   coverage are reported.
//! * [`OrreryError::NoPath`] when no chain of links connects them at all.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use ahash::AHashMap;
use itertools::Itertools;
use nalgebra::Vector3;
use petgraph::graphmap::UnGraphMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{
    constants::{NaifId, TdbSeconds},
    frames::{Frame, FrameChain},
    kernel::{
        coverage, locate,
        segment::{Segment, SegmentId},
        Kernel,
    },
    orrery_errors::{OrreryError, Result},
    time::Instant,
};

/// Position (km) and velocity (km/s).
pub type PosVel = (Vector3<f64>, Vector3<f64>);

/// A segment of one of the loaded kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentRef {
    pub kernel: usize,
    pub segment: SegmentId,
}

/// Chain of bodies from the search origin to its goal.
pub type BodyPath = SmallVec<[NaifId; 8]>;

/// Resolver of body-to-body states across a set of kernels.
#[derive(Debug, Clone)]
pub struct BodyGraph {
    kernels: Vec<Arc<Kernel>>,
    graph: UnGraphMap<NaifId, ()>,
    links: BTreeMap<(NaifId, NaifId), Vec<SegmentRef>>,
    frames: FrameChain,
}

impl BodyGraph {
    /// Index the evaluable segments of `kernels`.
    ///
    /// Segments of a link coming from several kernels are merged and sorted
    /// by start time; for identical starts, the kernel loaded last wins.
    ///
    /// Arguments
    /// -----------------
    /// * `kernels`: The loaded kernels, in load order.
    /// * `frames`: Frame chain used to bring non-ICRF segments to the ICRF.
    pub fn new(kernels: Vec<Arc<Kernel>>, frames: FrameChain) -> Self {
        let mut graph = UnGraphMap::new();
        let mut links: BTreeMap<(NaifId, NaifId), Vec<SegmentRef>> = BTreeMap::new();

        for (k, kernel) in kernels.iter().enumerate() {
            for (center, target) in kernel.links() {
                graph.add_edge(center, target, ());
                links
                    .entry((center, target))
                    .or_default()
                    .extend(
                        kernel
                            .segment_ids_for(center, target)
                            .iter()
                            .map(|&segment| SegmentRef { kernel: k, segment }),
                    );
            }
        }

        let mut body_graph = BodyGraph {
            kernels,
            graph,
            links,
            frames,
        };
        let starts: AHashMap<SegmentRef, TdbSeconds> = body_graph
            .links
            .values()
            .flatten()
            .map(|r| (*r, body_graph.segment(*r).start()))
            .collect();
        for refs in body_graph.links.values_mut() {
            refs.sort_by(|a, b| starts[a].total_cmp(&starts[b]));
        }

        debug!(
            kernels = body_graph.kernels.len(),
            bodies = body_graph.graph.node_count(),
            links = body_graph.links.len(),
            "body graph built"
        );
        body_graph
    }

    pub fn kernels(&self) -> &[Arc<Kernel>] {
        &self.kernels
    }

    pub fn frames(&self) -> &FrameChain {
        &self.frames
    }

    pub fn segment(&self, r: SegmentRef) -> &Segment {
        self.kernels[r.kernel].segment(r.segment)
    }

    /// Every body known to at least one evaluable segment, by increasing id.
    pub fn bodies(&self) -> Vec<NaifId> {
        self.graph.nodes().sorted().collect()
    }

    pub fn contains(&self, body: NaifId) -> bool {
        self.graph.contains_node(body)
    }

    /// Every `(center, target)` link, with its merged segments.
    pub fn links(&self) -> impl Iterator<Item = (&(NaifId, NaifId), &[SegmentRef])> {
        self.links.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// The segments of `center -> target` across kernels, sorted by start.
    pub fn segments_for(&self, center: NaifId, target: NaifId) -> &[SegmentRef] {
        self.links
            .get(&(center, target))
            .map_or(&[], |refs| refs.as_slice())
    }

    fn segment_at(&self, center: NaifId, target: NaifId, et: TdbSeconds) -> Option<SegmentRef> {
        locate(self.segments_for(center, target), et, |r| self.segment(r))
    }

    /// Whether some segment, in either direction, links `a` and `b` at `et`.
    fn link_covers(&self, a: NaifId, b: NaifId, et: TdbSeconds) -> bool {
        self.segment_at(a, b, et).is_some() || self.segment_at(b, a, et).is_some()
    }

    /// Breadth-first search from `from` to `to` over the edges accepted by
    /// `usable`, visiting neighbours by increasing id.
    fn search(
        &self,
        from: NaifId,
        to: NaifId,
        usable: impl Fn(NaifId, NaifId) -> bool,
    ) -> Option<BodyPath> {
        if !self.graph.contains_node(from) || !self.graph.contains_node(to) {
            return None;
        }
        let mut parent: AHashMap<NaifId, NaifId> = AHashMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(body) = queue.pop_front() {
            if body == to {
                let mut path: BodyPath = SmallVec::from_slice(&[to]);
                let mut cursor = to;
                while let Some(&p) = parent.get(&cursor) {
                    path.push(p);
                    cursor = p;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.graph.neighbors(body).sorted() {
                if next != from && !parent.contains_key(&next) && usable(body, next) {
                    parent.insert(next, body);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Chain of bodies from `from` to `to` usable at `et`.
    pub fn path_at(&self, from: NaifId, to: NaifId, et: TdbSeconds) -> Option<BodyPath> {
        self.search(from, to, |a, b| self.link_covers(a, b, et))
    }

    /// Evaluate the state of `to` relative to `from` over one covered link,
    /// rotated into the ICRF.
    fn hop(&self, from: NaifId, to: NaifId, et: TdbSeconds) -> Result<PosVel> {
        let (r, sign) = match self.segment_at(from, to, et) {
            Some(r) => (r, 1.0),
            None => match self.segment_at(to, from, et) {
                Some(r) => (r, -1.0),
                None => {
                    return Err(self.out_of_range(from, to, et));
                }
            },
        };

        let kernel = &self.kernels[r.kernel];
        let (position, velocity) = kernel.evaluate(r.segment, et)?;
        let frame = Frame::from_naif_id(self.segment(r).frame_id());
        let (position, velocity) = if frame == Frame::Icrf {
            (position, velocity)
        } else {
            self.frames.transform_state(
                &position,
                &velocity,
                &frame,
                &Frame::Icrf,
                &Instant::from_kernel_seconds(et),
            )?
        };
        Ok((position * sign, velocity * sign))
    }

    /// Out-of-range error for the link between `a` and `b`, in the direction
    /// stored in the kernels.
    fn out_of_range(&self, a: NaifId, b: NaifId, et: TdbSeconds) -> OrreryError {
        let (center, target) = if self.links.contains_key(&(a, b)) {
            (a, b)
        } else {
            (b, a)
        };
        OrreryError::OutOfRange {
            center,
            target,
            tdb_seconds: et,
            coverage: coverage(
                self.segments_for(center, target)
                    .iter()
                    .map(|r| self.segment(*r)),
            ),
        }
    }

    /// State of `target` relative to `observer` in the ICRF.
    ///
    /// Arguments
    /// -----------------
    /// * `target`: NAIF id of the observed body.
    /// * `observer`: NAIF id of the body the state is relative to.
    /// * `et`: TDB seconds past J2000.
    ///
    /// Return
    /// ----------
    /// * Position (km) and velocity (km/s), or [`OrreryError::OutOfRange`] /
    ///   [`OrreryError::NoPath`] as described in the module documentation.
    ///
    /// See also
    /// ------------
    /// * [`BodyGraph::path_at`] – The chain of bodies used for the sum.
    pub fn position_of(&self, target: NaifId, observer: NaifId, et: TdbSeconds) -> Result<PosVel> {
        if target == observer {
            return Ok((Vector3::zeros(), Vector3::zeros()));
        }

        let (low, high) = (target.min(observer), target.max(observer));
        let Some(path) = self.path_at(low, high, et) else {
            return Err(self.explain_failure(target, observer, low, high, et));
        };
        trace!(target, observer, et, path = ?path.as_slice(), "body path");

        let mut position = Vector3::zeros();
        let mut velocity = Vector3::zeros();
        for pair in path.windows(2) {
            let (p, v) = self.hop(pair[0], pair[1], et)?;
            position += p;
            velocity += v;
        }

        // The sum gives `high` relative to `low`.
        if target == high {
            Ok((position, velocity))
        } else {
            Ok((-position, -velocity))
        }
    }

    /// Tell apart a coverage gap from a disconnected pair.
    fn explain_failure(
        &self,
        target: NaifId,
        observer: NaifId,
        low: NaifId,
        high: NaifId,
        et: TdbSeconds,
    ) -> OrreryError {
        let Some(path) = self.search(low, high, |_, _| true) else {
            return OrreryError::NoPath {
                target,
                observer,
                tdb_seconds: et,
            };
        };
        path.windows(2)
            .find(|pair| !self.link_covers(pair[0], pair[1], et))
            .map(|pair| self.out_of_range(pair[0], pair[1], et))
            .unwrap_or(OrreryError::NoPath {
                target,
                observer,
                tdb_seconds: et,
            })
    }
}
