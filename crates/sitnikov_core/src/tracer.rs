//! Flattening of recursive compositions by tracing.
//!
//! A composition built over [`Tracer`] sees a constant unit gradient, so
//! every kick is `p -= c` and every drift is `q += c`. One unit step from the
//! origin therefore turns the whole nested composition into a chain of
//! scalar additions. The tracer logs the phase-space coordinate seen by each
//! call; walking the log backwards from the final state recovers every
//! coefficient.

use crate::composition::CompositionSettings;
use crate::error::Result;
use crate::schedule::{Step, StepSchedule};
use crate::solvers::{CompositeIntegrator, StepKind};
use crate::traits::{Field, HamiltonianSystem, SymplecticIntegrator};
use crate::vector::Vector;
use std::cell::RefCell;
use tracing::debug;

/// One logged gradient evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRecord<T> {
    /// Position at the time of the call.
    pub q: T,
    /// Momentum at the time of the call.
    pub p: T,
    pub kind: StepKind,
}

#[derive(Debug)]
struct TraceLog<T> {
    records: Vec<TraceRecord<T>>,
    q_cache: T,
    p_cache: T,
}

/// Unit-gradient force field that records every call, in order.
///
/// A kick only sees `q` and a drift only sees `p`, so each remembers the last
/// value the other one saw. The log is private to this instance.
#[derive(Debug)]
pub struct Tracer<T> {
    log: RefCell<TraceLog<T>>,
}

impl<T: Field> Tracer<T> {
    pub fn new() -> Self {
        Self {
            log: RefCell::new(TraceLog {
                records: Vec::new(),
                q_cache: T::zero(),
                p_cache: T::zero(),
            }),
        }
    }

    pub fn records(&self) -> Vec<TraceRecord<T>> {
        self.log.borrow().records.clone()
    }

    pub fn into_records(self) -> Vec<TraceRecord<T>> {
        self.log.into_inner().records
    }
}

impl<T: Field> Default for Tracer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Field> HamiltonianSystem<Vector<T>> for Tracer<T> {
    fn dv(&self, q: &Vector<T>) -> Vector<T> {
        let mut log = self.log.borrow_mut();
        let record = TraceRecord {
            q: q[0],
            p: log.p_cache,
            kind: StepKind::Kick,
        };
        log.records.push(record);
        log.q_cache = q[0];
        Vector::unit()
    }

    fn dt(&self, p: &Vector<T>) -> Vector<T> {
        let mut log = self.log.borrow_mut();
        let record = TraceRecord {
            q: log.q_cache,
            p: p[0],
            kind: StepKind::Drift,
        };
        log.records.push(record);
        log.p_cache = p[0];
        Vector::unit()
    }
}

/// Recovers the coefficient of every logged step, in chronological order.
///
/// Read backwards, each record holds the coordinate before its own step was
/// applied, so the difference to the running "after" value is exactly that
/// step's coefficient.
pub fn recover_steps<T: Field>(records: &[TraceRecord<T>], q_end: T, p_end: T) -> Vec<Step<T>> {
    let mut q_after = q_end;
    let mut p_after = p_end;
    let mut steps: Vec<Step<T>> = records
        .iter()
        .rev()
        .map(|record| match record.kind {
            StepKind::Kick => {
                let coefficient = record.p - p_after;
                p_after = record.p;
                Step::new(coefficient, StepKind::Kick)
            }
            StepKind::Drift => {
                let coefficient = q_after - record.q;
                q_after = record.q;
                Step::new(coefficient, StepKind::Drift)
            }
        })
        .collect();
    steps.reverse();
    steps
}

/// Traces the order-`order` composition once and returns its reduced flat
/// schedule.
pub fn trace_schedule<T: Field>(
    order: usize,
    settings: &CompositionSettings,
) -> Result<StepSchedule<T>> {
    let tracer = Tracer::<T>::new();
    let composite = CompositeIntegrator::<T, _>::new(order, &tracer, settings)?;
    let (q, p) = composite.step(
        Vector::from([T::zero()]),
        Vector::from([T::zero()]),
        T::one(),
    );
    drop(composite);

    let records = tracer.into_records();
    let raw = recover_steps(&records, q[0], p[0]);
    let raw_len = raw.len();
    let schedule = StepSchedule::new(raw);
    debug!(
        order,
        raw_steps = raw_len,
        reduced_steps = schedule.len(),
        "flattened composition"
    );

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::solve_coefficients;

    #[test]
    fn tracer_logs_calls_with_cached_counterparts() {
        let tracer = Tracer::<f64>::new();
        assert_eq!(tracer.dt(&Vector::from([-0.5])), Vector::from([1.0]));
        assert_eq!(tracer.dv(&Vector::from([2.0])), Vector::from([1.0]));

        let records = tracer.records();
        assert_eq!(
            records,
            vec![
                TraceRecord {
                    q: 0.0,
                    p: -0.5,
                    kind: StepKind::Drift
                },
                TraceRecord {
                    q: 2.0,
                    p: -0.5,
                    kind: StepKind::Kick
                },
            ]
        );
    }

    #[test]
    fn traced_leapfrog_recovers_its_coefficients() {
        let schedule = trace_schedule::<f64>(1, &CompositionSettings::default())
            .expect("leapfrog trace");
        assert_eq!(schedule, StepSchedule::leapfrog());
    }

    #[test]
    fn recovered_steps_cover_every_call() {
        let settings = CompositionSettings::default();
        let tracer = Tracer::<f64>::new();
        let composite =
            CompositeIntegrator::<f64, _>::new(2, &tracer, &settings).expect("order 2");
        let (q, p) = composite.step(Vector::from([0.0]), Vector::from([0.0]), 1.0);
        drop(composite);

        let records = tracer.into_records();
        assert_eq!(records.len(), 9);
        let steps = recover_steps(&records, q[0], p[0]);
        assert_eq!(steps.len(), records.len());

        let x = solve_coefficients::<f64>(1, &settings).expect("order 1 coefficients");
        let expected_drifts = [x.x1, x.x0, x.x1];
        let drifts: Vec<f64> = steps
            .iter()
            .filter(|step| step.kind == StepKind::Drift)
            .map(|step| step.coefficient)
            .collect();
        for (actual, expected) in drifts.iter().zip(expected_drifts) {
            assert!((actual - expected).abs() < 1e-14, "{actual} vs {expected}");
        }

        let traced = trace_schedule::<f64>(2, &settings).expect("order 2 trace");
        assert_eq!(traced, StepSchedule::new(steps));
        assert_eq!(traced.len(), 7);
    }

    #[test]
    fn flattened_schedules_alternate_and_sum_to_one() {
        for order in 1..=5 {
            let schedule = trace_schedule::<f64>(order, &CompositionSettings::default())
                .expect("trace should succeed");
            assert!(schedule.is_alternating(), "order {order}: {schedule:?}");
            assert!(
                (schedule.total(StepKind::Kick) - 1.0).abs() < 1e-12,
                "order {order}: kicks sum to {}",
                schedule.total(StepKind::Kick)
            );
            assert!(
                (schedule.total(StepKind::Drift) - 1.0).abs() < 1e-12,
                "order {order}: drifts sum to {}",
                schedule.total(StepKind::Drift)
            );
            // 3^(order-1) drifts, each separated by one kick, plus both ends.
            let drifts = 3usize.pow(order as u32 - 1);
            assert_eq!(schedule.len(), 2 * drifts + 1, "order {order}");
        }
    }

    #[test]
    fn single_precision_trace_is_consistent() {
        let schedule = trace_schedule::<f32>(3, &CompositionSettings::default())
            .expect("trace should succeed");
        assert!(schedule.is_alternating());
        assert!((schedule.total(StepKind::Drift) - 1.0).abs() < 1e-4);
        assert!((schedule.total(StepKind::Kick) - 1.0).abs() < 1e-4);
    }
}
