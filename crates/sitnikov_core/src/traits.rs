use num_traits::{Float, FromPrimitive, One};
use std::fmt::Debug;

use crate::solvers::Trajectory;

/// A trait for types that can be used as the scalar field of a phase space.
/// Must support ordered-field arithmetic, debug printing, and an explicit
/// conversion from integers.
pub trait Field: Float + FromPrimitive + Debug + Send + Sync + 'static {
    /// Exact image of an integer in the field (exact for every order we solve).
    fn from_integer(n: i64) -> Self;

    fn two() -> Self {
        Self::one() + Self::one()
    }
}

impl Field for f32 {
    fn from_integer(n: i64) -> Self {
        n as f32
    }
}

impl Field for f64 {
    fn from_integer(n: i64) -> Self {
        n as f64
    }
}

/// A real linear space over a [`Field`]: positions and momenta live here.
///
/// Only addition, scaling and the additive identity are required; negation
/// and subtraction are derived from them.
pub trait LinearSpace: Clone {
    type Scalar: Field;

    /// Additive identity. It may be a dimensionless sentinel.
    fn zero() -> Self;

    fn plus(self, rhs: Self) -> Self;

    fn scale(self, k: Self::Scalar) -> Self;

    fn negated(self) -> Self {
        self.scale(-Self::Scalar::one())
    }

    fn minus(self, rhs: Self) -> Self {
        self.plus(rhs.negated())
    }
}

/// A separable Hamiltonian `H(q, p) = T(p) + V(q)`, described by its two
/// gradients.
pub trait HamiltonianSystem<S: LinearSpace> {
    /// Force gradient `dV/dq`, drives kicks.
    fn dv(&self, q: &S) -> S;

    /// Velocity gradient `dT/dp`, drives drifts.
    fn dt(&self, p: &S) -> S;
}

impl<S: LinearSpace, H: HamiltonianSystem<S> + ?Sized> HamiltonianSystem<S> for &H {
    fn dv(&self, q: &S) -> S {
        (**self).dv(q)
    }

    fn dt(&self, p: &S) -> S {
        (**self).dt(p)
    }
}

/// A Hamiltonian given by a pair of plain functions.
#[derive(Debug, Clone, Copy)]
pub struct Separable<DV, DT> {
    dv: DV,
    dt: DT,
}

impl<DV, DT> Separable<DV, DT> {
    pub fn new(dv: DV, dt: DT) -> Self {
        Self { dv, dt }
    }
}

impl<S, DV, DT> HamiltonianSystem<S> for Separable<DV, DT>
where
    S: LinearSpace,
    DV: Fn(&S) -> S,
    DT: Fn(&S) -> S,
{
    fn dv(&self, q: &S) -> S {
        (self.dv)(q)
    }

    fn dt(&self, p: &S) -> S {
        (self.dt)(p)
    }
}

/// A trait for integrators that advance a `(q, p)` pair by one time step.
pub trait SymplecticIntegrator<S: LinearSpace> {
    /// Performs one step of size `tau`.
    fn step(&self, q: S, p: S, tau: S::Scalar) -> (S, S);

    /// Lazily integrates from `(q0, p0)` at `t = 0`, yielding `(t, q, p)`
    /// until `t` would exceed `total_time`.
    fn integrate(
        &self,
        total_time: S::Scalar,
        tau: S::Scalar,
        q0: S,
        p0: S,
    ) -> Trajectory<'_, Self, S>
    where
        Self: Sized,
    {
        Trajectory::new(self, total_time, tau, q0, p0)
    }
}
