//! Memoization of query results.
//!
//! The cache is keyed on everything that determines an answer: target,
//! observer (body or site), the exact bits of the instant and its scale, the
//! output frame and the kind of query. Only successful results are stored.
//! When the map reaches its capacity it is cleared in one go.

use std::sync::{Mutex, PoisonError};

use ahash::AHashMap;

use crate::{
    constants::NaifId,
    frames::Frame,
    positions::{Observer, StateVector},
    time::{Instant, TimeScale},
};

/// Kind of query a state answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Geometric,
    Astrometric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey {
    target: NaifId,
    observer: Observer,
    time: (u64, u64, TimeScale),
    frame: Frame,
    kind: QueryKind,
}

impl QueryKey {
    pub fn new(
        target: NaifId,
        observer: Observer,
        instant: &Instant,
        frame: Frame,
        kind: QueryKind,
    ) -> Self {
        QueryKey {
            target,
            observer,
            time: instant.key(),
            frame,
            kind,
        }
    }
}

/// Thread-safe bounded map of query results.
#[derive(Debug, Default)]
pub struct QueryCache {
    capacity: usize,
    entries: Mutex<AHashMap<QueryKey, StateVector>>,
}

impl QueryCache {
    /// A cache holding at most `capacity` states; `0` disables caching.
    pub fn new(capacity: usize) -> Self {
        QueryCache {
            capacity,
            entries: Mutex::new(AHashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AHashMap<QueryKey, StateVector>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &QueryKey) -> Option<StateVector> {
        if !self.is_enabled() {
            return None;
        }
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: QueryKey, state: StateVector) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.clear();
        }
        entries.insert(key, state);
    }

    /// Return the cached state or compute, store and return it.
    ///
    /// Errors of `compute` are passed through and never stored.
    pub fn get_or_try_insert<E>(
        &self,
        key: QueryKey,
        compute: impl FnOnce() -> Result<StateVector, E>,
    ) -> Result<StateVector, E> {
        if let Some(state) = self.get(&key) {
            return Ok(state);
        }
        let state = compute()?;
        self.insert(key, state.clone());
        Ok(state)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod test_cache {
    use super::*;
    use crate::{constants::J2000, orrery_errors::OrreryError};
    use nalgebra::Vector3;

    fn state(x: f64) -> StateVector {
        StateVector {
            target: 301,
            observer: Observer::Body(399),
            position: Vector3::new(x, 0.0, 0.0),
            velocity: Vector3::zeros(),
            frame: Frame::Icrf,
            instant: Instant::from_jd(J2000, TimeScale::Tdb),
            light_time: None,
            warnings: Vec::new(),
        }
    }

    fn key(day: f64) -> QueryKey {
        QueryKey::new(
            301,
            Observer::Body(399),
            &Instant::from_jd(J2000 + day, TimeScale::Tdb),
            Frame::Icrf,
            QueryKind::Geometric,
        )
    }

    #[test]
    fn test_hit_and_clear_on_full() {
        let cache = QueryCache::new(2);
        cache.insert(key(0.0), state(1.0));
        cache.insert(key(1.0), state(2.0));
        assert_eq!(cache.get(&key(0.0)).unwrap().position.x, 1.0);
        assert_eq!(cache.len(), 2);

        // Replacing an existing key does not evict.
        cache.insert(key(1.0), state(3.0));
        assert_eq!(cache.len(), 2);

        cache.insert(key(2.0), state(4.0));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key(0.0)).is_none());
    }

    #[test]
    fn test_disabled() {
        let cache = QueryCache::new(0);
        cache.insert(key(0.0), state(1.0));
        assert!(cache.is_empty());
        assert!(cache.get(&key(0.0)).is_none());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = QueryCache::new(4);
        let err: Result<StateVector, OrreryError> =
            cache.get_or_try_insert(key(0.0), || Err(OrreryError::UnknownBody("x".into())));
        assert!(err.is_err());
        assert!(cache.is_empty());

        let mut calls = 0;
        for _ in 0..3 {
            let s = cache
                .get_or_try_insert(key(0.0), || {
                    calls += 1;
                    Ok::<_, OrreryError>(state(5.0))
                })
                .unwrap();
            assert_eq!(s.position.x, 5.0);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_key_distinguishes_scale_and_kind() {
        let tt = Instant::from_jd(J2000, TimeScale::Tt);
        let tdb = Instant::from_jd(J2000, TimeScale::Tdb);
        let a = QueryKey::new(301, Observer::Body(399), &tt, Frame::Icrf, QueryKind::Geometric);
        let b = QueryKey::new(301, Observer::Body(399), &tdb, Frame::Icrf, QueryKind::Geometric);
        let c = QueryKey::new(301, Observer::Body(399), &tt, Frame::Icrf, QueryKind::Astrometric);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
