use thiserror::Error;

/// Errors raised while building integrators or combining phase-space vectors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegratorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "composition coefficients for order {order} did not converge after {iterations} \
         iterations (residual = {residual:e})"
    )]
    ConvergenceFailure {
        order: usize,
        residual: f64,
        iterations: usize,
    },

    #[error("root of degree {degree} did not converge after {iterations} iterations (last step = {last_step:e})")]
    RootNotConverged {
        degree: u32,
        iterations: usize,
        last_step: f64,
    },
}

impl IntegratorError {
    pub(crate) fn dimension_mismatch(left: usize, right: usize) -> Self {
        IntegratorError::InvalidArgument(format!(
            "vectors must have the same dimension (got {left} and {right})"
        ))
    }
}

pub type Result<T> = std::result::Result<T, IntegratorError>;
