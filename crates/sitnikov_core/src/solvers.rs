use crate::composition::{solve_coefficients, Coefficients, CompositionSettings};
use crate::error::{IntegratorError, Result};
use crate::traits::{Field, HamiltonianSystem, LinearSpace, SymplecticIntegrator};
use num_traits::{Float, Zero};
use serde::{Deserialize, Serialize};

/// The two elementary operations every splitting scheme is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Momentum update driven by `dV`.
    Kick,
    /// Position update driven by `dT`.
    Drift,
}

impl StepKind {
    pub fn apply<S, H>(self, system: &H, tau: S::Scalar, q: S, p: S) -> (S, S)
    where
        S: LinearSpace,
        H: HamiltonianSystem<S> + ?Sized,
    {
        match self {
            StepKind::Kick => kick(system, tau, q, p),
            StepKind::Drift => drift(system, tau, q, p),
        }
    }
}

/// `p <- p - tau * dV(q)`
pub fn kick<S, H>(system: &H, tau: S::Scalar, q: S, p: S) -> (S, S)
where
    S: LinearSpace,
    H: HamiltonianSystem<S> + ?Sized,
{
    let force = system.dv(&q);
    (q, p.minus(force.scale(tau)))
}

/// `q <- q + tau * dT(p)`
pub fn drift<S, H>(system: &H, tau: S::Scalar, q: S, p: S) -> (S, S)
where
    S: LinearSpace,
    H: HamiltonianSystem<S> + ?Sized,
{
    let velocity = system.dt(&p);
    (q.plus(velocity.scale(tau)), p)
}

/// Second order kick-drift-kick Leapfrog.
#[derive(Debug, Clone)]
pub struct Leapfrog<H> {
    system: H,
}

impl<H> Leapfrog<H> {
    pub fn new(system: H) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &H {
        &self.system
    }
}

impl<S, H> SymplecticIntegrator<S> for Leapfrog<H>
where
    S: LinearSpace,
    H: HamiltonianSystem<S>,
{
    fn step(&self, q: S, p: S, tau: S::Scalar) -> (S, S) {
        leapfrog_step(&self.system, q, p, tau)
    }
}

fn leapfrog_step<S, H>(system: &H, q: S, p: S, tau: S::Scalar) -> (S, S)
where
    S: LinearSpace,
    H: HamiltonianSystem<S> + ?Sized,
{
    let half = tau / S::Scalar::two();
    let (q, p) = kick(system, half, q, p);
    let (q, p) = drift(system, tau, q, p);
    kick(system, half, q, p)
}

/// Yoshida triple-jump composition of Leapfrog, evaluated recursively.
///
/// `levels[i]` holds the coefficients that lift order `2(i + 1)` to
/// `2(i + 2)`. A step at level `n` runs level `n - 1` three times with
/// `tau x1`, `tau x0`, `tau x1`; level 0 is Leapfrog. This is the reference
/// the flat [`crate::integrator::Integrator`] is derived from and checked
/// against.
#[derive(Debug, Clone)]
pub struct CompositeIntegrator<T, H> {
    levels: Vec<Coefficients<T>>,
    system: H,
}

impl<T: Field, H> CompositeIntegrator<T, H> {
    /// Builds the composition for `order` (1 is plain Leapfrog).
    pub fn new(order: usize, system: H, settings: &CompositionSettings) -> Result<Self> {
        if order == 0 {
            return Err(IntegratorError::InvalidArgument(
                "integrator order must be at least 1".to_string(),
            ));
        }

        let levels = (1..order)
            .map(|level| solve_coefficients::<T>(level, settings))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { levels, system })
    }

    /// Uses pre-solved coefficients, lowest level first.
    pub fn from_levels(levels: Vec<Coefficients<T>>, system: H) -> Self {
        Self { levels, system }
    }

    pub fn order(&self) -> usize {
        self.levels.len() + 1
    }

    pub fn levels(&self) -> &[Coefficients<T>] {
        &self.levels
    }

    pub fn system(&self) -> &H {
        &self.system
    }

    fn step_level<S>(&self, level: usize, q: S, p: S, tau: T) -> (S, S)
    where
        S: LinearSpace<Scalar = T>,
        H: HamiltonianSystem<S>,
    {
        if level == 0 {
            return leapfrog_step(&self.system, q, p, tau);
        }

        let Coefficients { x0, x1, .. } = self.levels[level - 1];
        let (q, p) = self.step_level(level - 1, q, p, tau * x1);
        let (q, p) = self.step_level(level - 1, q, p, tau * x0);
        self.step_level(level - 1, q, p, tau * x1)
    }
}

impl<T, S, H> SymplecticIntegrator<S> for CompositeIntegrator<T, H>
where
    T: Field,
    S: LinearSpace<Scalar = T>,
    H: HamiltonianSystem<S>,
{
    fn step(&self, q: S, p: S, tau: T) -> (S, S) {
        self.step_level(self.levels.len(), q, p, tau)
    }
}

/// Lazy `(t, q, p)` sequence produced by [`SymplecticIntegrator::integrate`].
///
/// The first item is the initial state at `t = 0`; each further item costs
/// exactly one `step`. Iteration ends before `t` exceeds the total time, and
/// also once `t + tau` no longer moves `t`.
pub struct Trajectory<'a, I: ?Sized, S: LinearSpace> {
    integrator: &'a I,
    total_time: S::Scalar,
    tau: S::Scalar,
    t: S::Scalar,
    state: Option<(S, S)>,
    started: bool,
}

impl<'a, I, S> Trajectory<'a, I, S>
where
    I: SymplecticIntegrator<S> + ?Sized,
    S: LinearSpace,
{
    pub fn new(integrator: &'a I, total_time: S::Scalar, tau: S::Scalar, q0: S, p0: S) -> Self {
        Self {
            integrator,
            total_time,
            tau,
            t: S::Scalar::zero(),
            state: Some((q0, p0)),
            started: false,
        }
    }

    pub fn time(&self) -> S::Scalar {
        self.t
    }
}

impl<'a, I: ?Sized, S: LinearSpace> Clone for Trajectory<'a, I, S> {
    fn clone(&self) -> Self {
        Self {
            integrator: self.integrator,
            total_time: self.total_time,
            tau: self.tau,
            t: self.t,
            state: self.state.clone(),
            started: self.started,
        }
    }
}

impl<'a, I, S> Iterator for Trajectory<'a, I, S>
where
    I: SymplecticIntegrator<S> + ?Sized,
    S: LinearSpace,
{
    type Item = (S::Scalar, S, S);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            let (q, p) = self.state.as_ref()?;
            return Some((self.t, q.clone(), p.clone()));
        }

        // A non-positive step or a NaN end would never stop.
        let step_is_usable = self.tau > S::Scalar::zero() && self.tau.is_finite();
        if !step_is_usable || self.total_time.is_nan() {
            self.state = None;
        }
        let (q, p) = self.state.take()?;

        // Once `t + tau` rounds back to `t`, time has stalled.
        let next_t = self.t + self.tau;
        if next_t > self.total_time || next_t <= self.t {
            return None;
        }

        let (q, p) = self.integrator.step(q, p, self.tau);
        self.t = next_t;
        self.state = Some((q.clone(), p.clone()));
        Some((self.t, q, p))
    }
}
