//! Exponentiation and root finding over a generic [`Field`].

use crate::error::{IntegratorError, Result};
use crate::traits::Field;
use std::collections::HashMap;

/// Upper bound on Newton iterations in [`root`].
pub const ROOT_MAX_ITERATIONS: usize = 100;

/// Integer power by repeated squaring.
///
/// Sub-powers are memoized for the duration of the call, so `x^k` costs
/// `O(log k)` multiplications. Negative exponents return `1 / x^-k`.
pub fn pow<T: Field>(x: T, k: i32) -> T {
    let mut cache = HashMap::new();
    cache.insert(0u32, T::one());
    cache.insert(1u32, x);

    if k < 0 {
        T::one() / pow_memoized(x, k.unsigned_abs(), &mut cache)
    } else {
        pow_memoized(x, k.unsigned_abs(), &mut cache)
    }
}

fn pow_memoized<T: Field>(x: T, k: u32, cache: &mut HashMap<u32, T>) -> T {
    if let Some(&value) = cache.get(&k) {
        return value;
    }

    let half = pow_memoized(x, k / 2, cache);
    let value = if k % 2 == 0 {
        half * half
    } else {
        x * half * half
    };
    cache.insert(k, value);
    value
}

/// Real `k`-th root of `x` by Newton iteration
/// `r <- ((k - 1) r + x / r^(k - 1)) / k`, started from `r = x`.
///
/// Iteration stops once two successive iterates agree to within a few field
/// epsilons (relative), and fails after [`ROOT_MAX_ITERATIONS`].
pub fn root<T: Field>(x: T, k: u32) -> Result<T> {
    if k == 0 {
        return Err(IntegratorError::InvalidArgument(
            "root degree must be at least 1".to_string(),
        ));
    }
    if x == T::zero() {
        return Ok(x);
    }

    let kf = T::from_integer(i64::from(k));
    let k_minus_one = kf - T::one();
    let exponent = (k - 1) as i32;

    // Rounding in r^(k - 1) can leave the iterates cycling over a few ulps.
    let tolerance = T::from_integer(4) * T::epsilon();

    let mut r = x;
    let mut last_step = T::infinity();
    for _ in 0..ROOT_MAX_ITERATIONS {
        let next = (k_minus_one * r + x / pow(r, exponent)) / kf;
        last_step = (next - r).abs();
        if !next.is_finite() {
            break;
        }
        if last_step <= tolerance * next.abs() {
            return Ok(next);
        }
        r = next;
    }

    Err(IntegratorError::RootNotConverged {
        degree: k,
        iterations: ROOT_MAX_ITERATIONS,
        last_step: last_step.to_f64().unwrap_or(f64::NAN),
    })
}
