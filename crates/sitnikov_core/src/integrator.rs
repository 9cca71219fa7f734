use crate::composition::CompositionSettings;
use crate::error::{IntegratorError, Result};
use crate::schedule::StepSchedule;
use crate::tracer::trace_schedule;
use crate::traits::{HamiltonianSystem, LinearSpace, Separable, SymplecticIntegrator};
use tracing::debug;

/// Symplectic integrator of accuracy `2 * order` that executes a flat
/// schedule of kicks and drifts.
///
/// The schedule is derived once, at construction, from the recursive
/// triple-jump composition; stepping never recurses. `step` only reads the
/// schedule and the system, so the integrator can be shared between threads
/// whenever the system can.
#[derive(Debug, Clone)]
pub struct Integrator<S: LinearSpace, H> {
    order: usize,
    schedule: StepSchedule<S::Scalar>,
    system: H,
}

impl<S: LinearSpace, H: HamiltonianSystem<S>> Integrator<S, H> {
    /// Wraps an already flattened schedule.
    pub fn from_schedule(order: usize, schedule: StepSchedule<S::Scalar>, system: H) -> Self {
        Self {
            order,
            schedule,
            system,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Accuracy order of the scheme (twice the composition order).
    pub fn accuracy(&self) -> usize {
        2 * self.order
    }

    pub fn schedule(&self) -> &StepSchedule<S::Scalar> {
        &self.schedule
    }

    pub fn system(&self) -> &H {
        &self.system
    }
}

impl<S: LinearSpace, H: HamiltonianSystem<S>> SymplecticIntegrator<S> for Integrator<S, H> {
    fn step(&self, q: S, p: S, tau: S::Scalar) -> (S, S) {
        self.schedule.apply(&self.system, q, p, tau)
    }
}

/// Builds an integrator for `order` with default composition settings.
/// Order 1 is Leapfrog.
pub fn build<S, H>(order: usize, system: H) -> Result<Integrator<S, H>>
where
    S: LinearSpace,
    H: HamiltonianSystem<S>,
{
    build_with_settings(order, system, &CompositionSettings::default())
}

pub fn build_with_settings<S, H>(
    order: usize,
    system: H,
    settings: &CompositionSettings,
) -> Result<Integrator<S, H>>
where
    S: LinearSpace,
    H: HamiltonianSystem<S>,
{
    let schedule = match order {
        0 => {
            return Err(IntegratorError::InvalidArgument(
                "integrator order must be at least 1".to_string(),
            ))
        }
        1 => StepSchedule::leapfrog(),
        _ => trace_schedule::<S::Scalar>(order, settings)?,
    };

    debug!(
        order,
        steps = schedule.len(),
        force_evaluations = schedule.kick_count(),
        "built integrator"
    );

    Ok(Integrator::from_schedule(order, schedule, system))
}

/// Builds an integrator from a plain `(dV, dT)` function pair.
pub fn build_from_fns<S, DV, DT>(
    order: usize,
    dv: DV,
    dt: DT,
) -> Result<Integrator<S, Separable<DV, DT>>>
where
    S: LinearSpace,
    DV: Fn(&S) -> S,
    DT: Fn(&S) -> S,
{
    build(order, Separable::new(dv, dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::{CompositeIntegrator, Leapfrog};
    use crate::vector::Vector;
    use std::f64::consts::PI;

    fn identity(v: &Vector<f64>) -> Vector<f64> {
        v.clone()
    }

    fn oscillator() -> Separable<fn(&Vector<f64>) -> Vector<f64>, fn(&Vector<f64>) -> Vector<f64>>
    {
        Separable::new(identity, identity)
    }

    /// Pendulum: V = -cos q, T = p^2 / 2.
    fn pendulum() -> Separable<fn(&Vector<f64>) -> Vector<f64>, fn(&Vector<f64>) -> Vector<f64>> {
        fn dv(q: &Vector<f64>) -> Vector<f64> {
            q.iter().map(|x| x.sin()).collect()
        }
        Separable::new(dv, identity)
    }

    #[test]
    fn order_one_is_bitwise_leapfrog() {
        let integrator = build(1, oscillator()).expect("order 1");
        let leapfrog = Leapfrog::new(oscillator());

        for &(q0, p0, tau) in &[(1.0, 0.0, 0.01), (-0.3, 2.5, 0.7), (4.0, -1.0, -0.125)] {
            let (q, p) = integrator.step(Vector::from([q0]), Vector::from([p0]), tau);

            let p_half = p0 - q0 * (tau / 2.0);
            let q1 = q0 + p_half * tau;
            let p1 = p_half - q1 * (tau / 2.0);
            assert_eq!(q[0].to_bits(), q1.to_bits(), "q for ({q0}, {p0}, {tau})");
            assert_eq!(p[0].to_bits(), p1.to_bits(), "p for ({q0}, {p0}, {tau})");

            let (lq, lp) = leapfrog.step(Vector::from([q0]), Vector::from([p0]), tau);
            assert_eq!((q, p), (lq, lp));
        }
    }

    #[test]
    fn flattened_matches_recursive_composition() {
        let settings = CompositionSettings::default();
        let samples = [(1.0, 0.0, 0.01), (0.5, -1.5, 0.2), (-2.0, 0.3, 0.05)];
        for order in 1..=4 {
            let flat = build(order, pendulum()).expect("flat integrator");
            let nested = CompositeIntegrator::<f64, _>::new(order, pendulum(), &settings)
                .expect("recursive integrator");

            for &(q0, p0, tau) in &samples {
                let (mut fq, mut fp) = (Vector::from([q0]), Vector::from([p0]));
                let (mut nq, mut np) = (fq.clone(), fp.clone());
                for _ in 0..50 {
                    (fq, fp) = flat.step(fq, fp, tau);
                    (nq, np) = nested.step(nq, np, tau);
                }
                assert!(
                    (fq[0] - nq[0]).abs() < 1e-11 && (fp[0] - np[0]).abs() < 1e-11,
                    "order {order}, start ({q0}, {p0}), tau {tau}: flat ({}, {}) vs nested ({}, {})",
                    fq[0],
                    fp[0],
                    nq[0],
                    np[0]
                );
            }
        }
    }

    #[test]
    fn stepping_back_returns_to_start() {
        for order in 1..=4 {
            let integrator = build(order, pendulum()).expect("integrator");
            let (q0, p0) = (Vector::from([0.9]), Vector::from([-0.4]));
            let (q, p) = integrator.step(q0.clone(), p0.clone(), 0.1);
            let (q, p) = integrator.step(q, p, -0.1);
            assert!((q[0] - q0[0]).abs() < 1e-12, "order {order}: q = {}", q[0]);
            assert!((p[0] - p0[0]).abs() < 1e-12, "order {order}: p = {}", p[0]);
        }
    }

    #[test]
    fn harmonic_oscillator_returns_after_one_period() {
        let integrator = build(2, oscillator()).expect("order 2");
        let steps = 1000;
        let tau = 2.0 * PI / steps as f64;
        // Half a step of slack so accumulated rounding in t keeps the last step.
        let total_time = 2.0 * PI + tau / 2.0;

        let (t, q, p) = integrator
            .integrate(total_time, tau, Vector::from([1.0]), Vector::from([0.0]))
            .last()
            .expect("trajectory is never empty");

        assert!((t - 2.0 * PI).abs() < 1e-9, "t = {t}");
        assert!((q[0] - 1.0).abs() < 1e-3, "q = {}", q[0]);
        assert!(p[0].abs() < 1e-3, "p = {}", p[0]);
        let energy = q[0] * q[0] + p[0] * p[0];
        assert!((energy - 1.0).abs() < 1e-3, "energy = {energy}");
    }

    #[test]
    fn harmonic_oscillator_tracks_exact_solution() {
        let integrator = build(2, oscillator()).expect("order 2");
        let mut max_energy_error: f64 = 0.0;
        let mut steps = 0;
        for (t, q, p) in integrator.integrate(2.0 * PI, 0.01, Vector::from([1.0]), Vector::from([0.0])) {
            assert!((q[0] - t.cos()).abs() < 1e-6, "t = {t}: q = {}", q[0]);
            assert!((p[0] + t.sin()).abs() < 1e-6, "t = {t}: p = {}", p[0]);
            max_energy_error = max_energy_error.max((q[0] * q[0] + p[0] * p[0] - 1.0).abs());
            steps += 1;
        }
        assert_eq!(steps, 629);
        assert!(max_energy_error < 1e-3, "energy drift {max_energy_error}");
    }

    #[test]
    fn build_from_fns_accepts_closures() {
        let stiffness = 4.0;
        let integrator = build_from_fns(
            3,
            move |q: &Vector<f64>| q.clone() * stiffness,
            |p: &Vector<f64>| p.clone(),
        )
        .expect("order 3");
        assert_eq!(integrator.accuracy(), 6);

        // omega = 2: a quarter period is pi / 4.
        let (q, p) = (0..100).fold((Vector::from([1.0]), Vector::from([0.0])), |(q, p), _| {
            integrator.step(q, p, PI / 400.0)
        });
        assert!(q[0].abs() < 1e-7, "q = {}", q[0]);
        assert!((p[0] + 2.0).abs() < 1e-7, "p = {}", p[0]);
    }

    #[test]
    fn order_zero_is_rejected() {
        let err = build(0, oscillator()).expect_err("order 0 must fail");
        assert!(matches!(err, IntegratorError::InvalidArgument(_)));
    }

    #[test]
    fn single_precision_integrator_conserves_energy() {
        fn id32(v: &Vector<f32>) -> Vector<f32> {
            v.clone()
        }
        let integrator = build_from_fns(3, id32, id32).expect("f32 integrator");
        let (q, p) = (0..500).fold((Vector::from([1.0f32]), Vector::from([0.0f32])), |(q, p), _| {
            integrator.step(q, p, 0.02)
        });
        let energy = q[0] * q[0] + p[0] * p[0];
        assert!((energy - 1.0).abs() < 1e-3, "energy = {energy}");
    }

    #[test]
    fn concurrent_steps_match_sequential_ones() {
        let integrator = build(3, pendulum()).expect("integrator");
        let starts: Vec<(f64, f64)> = (0..8).map(|i| (0.25 * i as f64, 0.1 * i as f64)).collect();

        let sequential: Vec<_> = starts
            .iter()
            .map(|&(q, p)| integrator.step(Vector::from([q]), Vector::from([p]), 0.05))
            .collect();

        let concurrent: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = starts
                .iter()
                .map(|&(q, p)| {
                    let integrator = &integrator;
                    scope.spawn(move || {
                        integrator.step(Vector::from([q]), Vector::from([p]), 0.05)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("worker panicked"))
                .collect()
        });

        assert_eq!(sequential, concurrent);
    }
}
