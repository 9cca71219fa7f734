//! The Sitnikov problem: a massless body moving along the axis through the
//! barycenter of two equal primaries on Kepler orbits of eccentricity `e`.
//!
//! Units put the primaries' semi-major axis at 1 and their period at `2 pi`,
//! so the mean anomaly equals the time.

use crate::error::{IntegratorError, Result};
use crate::traits::HamiltonianSystem;
use crate::vector::Vector;
use std::collections::HashMap;
use std::f64::consts::{PI, TAU};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Fixed-point iteration cap in [`solve_kepler`].
pub const KEPLER_MAX_ITERATIONS: usize = 64;

/// Default number of angles a [`KeplerCache`] holds before it starts over.
pub const KEPLER_CACHE_CAPACITY: usize = 1 << 16;

/// Maps an angle to `[-pi, pi)`.
pub fn reduce_angle(x: f64) -> f64 {
    if (-PI..PI).contains(&x) {
        return x;
    }
    let reduced = (x + PI).rem_euclid(TAU) - PI;
    // rem_euclid may round up to TAU for tiny negative inputs.
    if reduced >= PI {
        reduced - TAU
    } else {
        reduced
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    /// Eccentric anomaly, in `[-pi, pi)`.
    pub eccentric_anomaly: f64,
    pub sin: f64,
    pub cos: f64,
}

/// Solves Kepler's equation `M = E - e sin E` by the fixed-point iteration
/// `E <- M + e sin E`, which contracts for `0 <= e < 1`.
///
/// Always returns the latest iterate, even if the cap was hit first.
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
    let m = reduce_angle(mean_anomaly);
    let mut anomaly = m;
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let next = reduce_angle(m + eccentricity * anomaly.sin());
        let change = reduce_angle(next - anomaly).abs();
        anomaly = next;
        if change <= 4.0 * f64::EPSILON {
            break;
        }
    }

    let (sin, cos) = anomaly.sin_cos();
    KeplerSolution {
        eccentric_anomaly: anomaly,
        sin,
        cos,
    }
}

/// Distance of either primary from the barycenter at time `t`, in units of
/// the semi-major axis.
pub fn primary_distance(t: f64, eccentricity: f64) -> f64 {
    1.0 - eccentricity * solve_kepler(t, eccentricity).cos
}

/// Thread-safe memo of per-angle values, keyed by the reduced mean anomaly.
///
/// Lookups take the read lock only. A miss is computed with no lock held and
/// then inserted if still absent, so two threads racing on the same key may
/// both compute it but every reader sees the first stored value.
///
/// Time only grows, so a long run keeps producing new angles. Inserting a
/// new key into a full cache empties it first.
#[derive(Debug)]
pub struct KeplerCache {
    entries: RwLock<HashMap<u64, f64>>,
    capacity: usize,
}

impl Default for KeplerCache {
    fn default() -> Self {
        Self::with_capacity(KEPLER_CACHE_CAPACITY)
    }
}

fn cache_key(reduced: f64) -> u64 {
    // -0.0 and 0.0 are the same angle.
    if reduced == 0.0 {
        0.0f64.to_bits()
    } else {
        reduced.to_bits()
    }
}

impl KeplerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` angles (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the cached value for `mean_anomaly`, computing it from the
    /// reduced angle on a miss.
    pub fn get_or_insert_with<F>(&self, mean_anomaly: f64, compute: F) -> f64
    where
        F: FnOnce(f64) -> f64,
    {
        let reduced = reduce_angle(mean_anomaly);
        let key = cache_key(reduced);

        // Cached values are plain numbers, so a poisoned lock is still usable.
        if let Some(&value) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return value;
        }

        let value = compute(reduced);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            debug!(capacity = self.capacity, "Kepler cache full, clearing");
            entries.clear();
        }
        *entries.entry(key).or_insert(value)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Sitnikov force field over `q = [z, t]`, `p = [p_z, p_t]`.
///
/// Time rides along as the second position coordinate and drifts at unit
/// speed, so the integrator never needs to know the problem is
/// non-autonomous. Both gradients index their argument directly and panic
/// on vectors shorter than two.
#[derive(Debug)]
pub struct SitnikovSystem {
    eccentricity: f64,
    distances: KeplerCache,
}

impl SitnikovSystem {
    pub fn new(eccentricity: f64) -> Result<Self> {
        Self::with_cache_capacity(eccentricity, KEPLER_CACHE_CAPACITY)
    }

    /// Like [`SitnikovSystem::new`] with a distance cache of at most
    /// `capacity` angles.
    pub fn with_cache_capacity(eccentricity: f64, capacity: usize) -> Result<Self> {
        if !(0.0..1.0).contains(&eccentricity) {
            return Err(IntegratorError::InvalidArgument(format!(
                "eccentricity must lie in [0, 1), got {eccentricity}"
            )));
        }
        debug!(eccentricity, capacity, "created Sitnikov system");
        Ok(Self {
            eccentricity,
            distances: KeplerCache::with_capacity(capacity),
        })
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// Primary distance at time `t`, memoized.
    pub fn distance(&self, t: f64) -> f64 {
        let e = self.eccentricity;
        self.distances
            .get_or_insert_with(t, |m| primary_distance(m, e))
    }

    pub fn cache(&self) -> &KeplerCache {
        &self.distances
    }

    /// `p_z^2 / 2 - 1 / sqrt(r(t)^2 + z^2)`; conserved only when `e = 0`.
    pub fn energy(&self, q: &Vector<f64>, p: &Vector<f64>) -> f64 {
        let (z, t) = (q[0], q[1]);
        let r = self.distance(t);
        0.5 * p[0] * p[0] - 1.0 / (r * r + z * z).sqrt()
    }
}

impl HamiltonianSystem<Vector<f64>> for SitnikovSystem {
    fn dv(&self, q: &Vector<f64>) -> Vector<f64> {
        let (z, t) = (q[0], q[1]);
        let r = self.distance(t);
        let denominator = (r * r + z * z).powf(1.5);
        Vector::from([z / denominator, 0.0])
    }

    fn dt(&self, p: &Vector<f64>) -> Vector<f64> {
        Vector::from([p[0], 1.0])
    }
}
