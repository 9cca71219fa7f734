//! Coefficients of the symmetric triple-jump (Yoshida) composition.
//!
//! Composing a symmetric integrator `S` of order `2n` as
//! `S(x1 tau) S(x0 tau) S(x1 tau)` yields order `2n + 2` when
//!
//! ```text
//! 2 x1 + x0 = 1
//! 2 x1^(2n+1) + x0^(2n+1) = 0
//! ```

use crate::error::{IntegratorError, Result};
use crate::math::{pow, root};
use crate::traits::Field;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionSettings {
    /// Hard cap on Newton refinement steps.
    pub max_iterations: usize,
    /// Accepted scaled residual, in multiples of the field epsilon.
    pub tolerance_epsilons: f64,
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance_epsilons: 64.0,
        }
    }
}

impl CompositionSettings {
    fn tolerance<T: Field>(&self) -> T {
        T::from_f64(self.tolerance_epsilons).unwrap_or_else(T::one) * T::epsilon()
    }
}

/// Solved `(x0, x1)` for one composition level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients<T> {
    /// Order index `n`: the composed scheme has accuracy `2n + 2`.
    pub order: usize,
    /// Middle (backward) sub-step.
    pub x0: T,
    /// Outer sub-steps.
    pub x1: T,
}

impl<T: Field> Coefficients<T> {
    /// Residuals `(y0, y1)` of the two order conditions.
    pub fn residuals(&self) -> (T, T) {
        order_conditions(self.order, self.x0, self.x1)
    }
}

fn order_conditions<T: Field>(order: usize, x0: T, x1: T) -> (T, T) {
    let k = exponent(order);
    let y0 = T::two() * x1 + x0 - T::one();
    let y1 = T::two() * pow(x1, k) + pow(x0, k);
    (y0, y1)
}

fn exponent(order: usize) -> i32 {
    2 * order as i32 + 1
}

/// Residual with the second condition measured relative to the magnitude of
/// its terms, so one tolerance serves every order.
fn scaled_residual<T: Field>(order: usize, x0: T, x1: T) -> T {
    let k = exponent(order);
    let (y0, y1) = order_conditions(order, x0, x1);
    let magnitude = T::two() * pow(x1.abs(), k) + pow(x0.abs(), k);
    let y1 = if magnitude > T::zero() {
        y1.abs() / magnitude
    } else {
        y1.abs()
    };
    y0.abs().max(y1)
}

/// Solves the order conditions for order index `order >= 1`.
///
/// The analytic seed `x1 = 1 / (2 - 2^(1/k))` is refined by a bounded 2-D
/// Newton iteration with the exact Jacobian.
pub fn solve_coefficients<T: Field>(
    order: usize,
    settings: &CompositionSettings,
) -> Result<Coefficients<T>> {
    if order == 0 {
        return Err(IntegratorError::InvalidArgument(
            "composition order must be at least 1".to_string(),
        ));
    }
    if order > (i32::MAX as usize - 1) / 2 {
        return Err(IntegratorError::InvalidArgument(format!(
            "composition order {order} is too large"
        )));
    }

    let k = exponent(order);
    let kf = T::from_integer(i64::from(k));
    let two = T::two();
    let tolerance = settings.tolerance::<T>();

    let mut x1 = T::one() / (two - root(two, k as u32)?);
    let mut x0 = T::one() - two * x1;

    let mut residual = scaled_residual(order, x0, x1);
    let mut iterations = 0usize;

    while residual > tolerance && iterations < settings.max_iterations {
        // Jacobian of (y0, y1) with respect to (x0, x1).
        let w11 = T::one();
        let w12 = two;
        let w21 = kf * pow(x0, k - 1);
        let w22 = two * kf * pow(x1, k - 1);
        let det = w11 * w22 - w21 * w12;
        if det == T::zero() || !det.is_finite() {
            break;
        }

        let (y0, y1) = order_conditions(order, x0, x1);
        x0 = x0 - (w22 * y0 - w12 * y1) / det;
        x1 = x1 - (w11 * y1 - w21 * y0) / det;

        iterations += 1;
        residual = scaled_residual(order, x0, x1);
    }

    if !(residual <= tolerance) {
        let residual = residual.to_f64().unwrap_or(f64::NAN);
        warn!(order, iterations, residual, "composition coefficients did not converge");
        return Err(IntegratorError::ConvergenceFailure {
            order,
            residual,
            iterations,
        });
    }

    debug!(
        order,
        iterations,
        x0 = ?x0,
        x1 = ?x1,
        "solved composition coefficients"
    );

    Ok(Coefficients { order, x0, x1 })
}
