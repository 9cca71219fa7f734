//! Flat schedules of elementary kicks and drifts.

use crate::solvers::StepKind;
use crate::traits::{Field, HamiltonianSystem, LinearSpace};
use serde::{Deserialize, Serialize};

/// One elementary operation: a kick or drift by `coefficient * tau`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step<T> {
    pub coefficient: T,
    pub kind: StepKind,
}

impl<T> Step<T> {
    pub fn new(coefficient: T, kind: StepKind) -> Self {
        Self { coefficient, kind }
    }
}

/// Merges every run of adjacent steps of the same kind into one step whose
/// coefficient is the sum of the run.
pub fn reduce<T: Field>(steps: impl IntoIterator<Item = Step<T>>) -> Vec<Step<T>> {
    let mut reduced: Vec<Step<T>> = Vec::new();
    for step in steps {
        match reduced.last_mut() {
            Some(last) if last.kind == step.kind => {
                last.coefficient = last.coefficient + step.coefficient;
            }
            _ => reduced.push(step),
        }
    }
    reduced
}

/// An ordered, reduced list of elementary steps for a unit time step.
///
/// Scaling every coefficient by `tau` and applying the steps in order
/// advances the system by `tau`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSchedule<T> {
    steps: Vec<Step<T>>,
}

impl<T: Field> StepSchedule<T> {
    /// Builds a schedule, merging adjacent steps of the same kind.
    pub fn new(steps: impl IntoIterator<Item = Step<T>>) -> Self {
        Self {
            steps: reduce(steps),
        }
    }

    /// `(1/2, Kick), (1, Drift), (1/2, Kick)`.
    pub fn leapfrog() -> Self {
        let half = T::one() / T::two();
        Self {
            steps: vec![
                Step::new(half, StepKind::Kick),
                Step::new(T::one(), StepKind::Drift),
                Step::new(half, StepKind::Kick),
            ],
        }
    }

    pub fn steps(&self) -> &[Step<T>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of force evaluations (`dV` calls) per step.
    pub fn kick_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.kind == StepKind::Kick)
            .count()
    }

    /// Sum of the coefficients of one kind; 1 for a consistent scheme.
    pub fn total(&self, kind: StepKind) -> T {
        self.steps
            .iter()
            .filter(|step| step.kind == kind)
            .fold(T::zero(), |acc, step| acc + step.coefficient)
    }

    /// True when no two adjacent steps share a kind.
    pub fn is_alternating(&self) -> bool {
        self.steps.windows(2).all(|pair| pair[0].kind != pair[1].kind)
    }

    /// Applies the whole schedule for a step of size `tau`.
    pub fn apply<S, H>(&self, system: &H, q: S, p: S, tau: T) -> (S, S)
    where
        S: LinearSpace<Scalar = T>,
        H: HamiltonianSystem<S> + ?Sized,
    {
        self.steps.iter().fold((q, p), |(q, p), step| {
            step.kind.apply(system, tau * step.coefficient, q, p)
        })
    }

    /// Coefficients as `[drift, kick]` pairs, zero-padded wherever the
    /// schedule does not follow that pattern. The result always has even
    /// length, so a shader can consume it two values at a time.
    pub fn packed_pairs(&self) -> Vec<T> {
        let mut packed = Vec::with_capacity(self.steps.len() + 2);
        for step in &self.steps {
            let slot_kind = if packed.len() % 2 == 0 {
                StepKind::Drift
            } else {
                StepKind::Kick
            };
            if step.kind != slot_kind {
                packed.push(T::zero());
            }
            packed.push(step.coefficient);
        }
        if packed.len() % 2 != 0 {
            packed.push(T::zero());
        }
        packed
    }
}
