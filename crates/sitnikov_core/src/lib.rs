//! The `sitnikov_core` crate builds high-order symplectic integrators for
//! separable Hamiltonians and applies them to the Sitnikov problem.
//!
//! Key components:
//! - **Traits**: `Field` (scalar abstraction), `LinearSpace` (phase-space algebra),
//!   `HamiltonianSystem` (the `dV`/`dT` pair), `SymplecticIntegrator` (anything with `step`).
//! - **Solvers**: Leapfrog and the recursive triple-jump `CompositeIntegrator`.
//! - **Flattening**: `Tracer` runs a composition once with unit gradients; the
//!   recovered `StepSchedule` drives the flat `Integrator` returned by `build`.
//! - **Sitnikov**: Kepler solver, concurrent distance cache and the force field,
//!   plus Poincaré sections and a particle grid on top of it.
pub mod analysis;
pub mod composition;
pub mod config;
pub mod error;
pub mod integrator;
pub mod math;
pub mod particles;
pub mod schedule;
pub mod sitnikov;
pub mod solvers;
pub mod tracer;
pub mod traits;
pub mod vector;

pub use error::{IntegratorError, Result};
pub use integrator::{build, build_from_fns, build_with_settings, Integrator};
pub use traits::{Field, HamiltonianSystem, LinearSpace, SymplecticIntegrator};
pub use vector::Vector;
