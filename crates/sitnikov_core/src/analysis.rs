use crate::traits::SymplecticIntegrator;
use crate::vector::Vector;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::info;

/// Stroboscopic sampling of `([z, t], [p_z, p_t])` systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoincareSettings {
    /// Sampling period; the primaries' period by default.
    pub period: f64,
    /// Requested step size. The actual step is `period / round(period / tau)`.
    pub tau: f64,
    /// Section points recorded per orbit.
    pub iterations: usize,
}

impl Default for PoincareSettings {
    fn default() -> Self {
        Self {
            period: TAU,
            tau: 0.01,
            iterations: 1000,
        }
    }
}

impl PoincareSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.period.is_finite() && self.period > 0.0) {
            bail!("Poincare period must be positive and finite.");
        }
        if !(self.tau.is_finite() && self.tau > 0.0) {
            bail!("Step size tau must be positive and finite.");
        }
        if self.steps_per_period() == 0 {
            bail!("Step size tau must not exceed twice the period.");
        }
        Ok(())
    }

    pub fn steps_per_period(&self) -> usize {
        (self.period / self.tau).round() as usize
    }

    /// Step size that lands exactly on the period.
    pub fn step_size(&self) -> f64 {
        self.period / self.steps_per_period() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionPoint {
    pub q: f64,
    pub p: f64,
}

/// Samples the orbit through `(q0, p0)` once per period.
///
/// Every period restarts the time coordinate at zero, so rounding in the
/// accumulated time never shifts the section.
pub fn poincare_section<I>(
    integrator: &I,
    q0: f64,
    p0: f64,
    settings: &PoincareSettings,
) -> Result<Vec<SectionPoint>>
where
    I: SymplecticIntegrator<Vector<f64>> + ?Sized,
{
    settings.validate()?;
    let steps = settings.steps_per_period();
    let h = settings.step_size();

    let mut point = SectionPoint { q: q0, p: p0 };
    let mut section = Vec::with_capacity(settings.iterations);
    for _ in 0..settings.iterations {
        let mut q = Vector::from([point.q, 0.0]);
        let mut p = Vector::from([point.p, 0.0]);
        for _ in 0..steps {
            (q, p) = integrator.step(q, p, h);
        }
        point = SectionPoint { q: q[0], p: p[0] };
        section.push(point);
    }
    Ok(section)
}

/// Grid of section seeds over `q`, with momenta spread across the range an
/// orbit starting at `q` can escape with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoincareGrid {
    pub q_range: (f64, f64),
    pub q_samples: usize,
    pub p_samples: usize,
    pub velocity_scale: f64,
}

impl Default for PoincareGrid {
    fn default() -> Self {
        Self {
            q_range: (-2.5, 2.5),
            q_samples: 100,
            p_samples: 100,
            velocity_scale: 1.5,
        }
    }
}

impl PoincareGrid {
    pub fn validate(&self) -> Result<()> {
        let (q_min, q_max) = self.q_range;
        if !(q_min.is_finite() && q_max.is_finite()) || q_min > q_max {
            bail!("q_range must be a finite, ordered interval.");
        }
        if self.q_samples == 0 || self.p_samples == 0 {
            bail!("Poincare grid needs at least one sample per axis.");
        }
        if !self.velocity_scale.is_finite() {
            bail!("velocity_scale must be finite.");
        }
        Ok(())
    }

    /// Seeds in row-major order: all momenta for the first `q`, then the next.
    pub fn seeds(&self) -> Vec<(f64, f64)> {
        let (q_min, q_max) = self.q_range;
        let n = self.q_samples as f64;
        let m = self.p_samples as f64;

        let mut seeds = Vec::with_capacity(self.q_samples * self.p_samples);
        for i in 0..self.q_samples {
            let q = q_min + (q_max - q_min) * i as f64 / n;
            // Escape speed from the circular problem's potential well.
            let v = self.velocity_scale * (2.0 / (q * q + 1.0).sqrt()).sqrt();
            for j in 0..self.p_samples {
                seeds.push((q, -v + 2.0 * v * j as f64 / m));
            }
        }
        seeds
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoincareOrbit {
    pub q0: f64,
    pub p0: f64,
    pub points: Vec<SectionPoint>,
}

/// Section of every grid seed, computed one after another.
pub fn poincare_grid<I>(
    integrator: &I,
    grid: &PoincareGrid,
    settings: &PoincareSettings,
) -> Result<Vec<PoincareOrbit>>
where
    I: SymplecticIntegrator<Vector<f64>> + ?Sized,
{
    let mut batch = PoincareBatch::new(grid, *settings)?;
    batch.advance(integrator, usize::MAX)?;
    Ok(batch.into_orbits())
}

/// Resumable grid computation that can yield between orbits.
#[derive(Debug, Clone)]
pub struct PoincareBatch {
    seeds: Vec<(f64, f64)>,
    settings: PoincareSettings,
    orbits: Vec<PoincareOrbit>,
}

impl PoincareBatch {
    pub fn new(grid: &PoincareGrid, settings: PoincareSettings) -> Result<Self> {
        grid.validate().context("Invalid Poincare grid")?;
        settings.validate().context("Invalid Poincare settings")?;
        let seeds = grid.seeds();
        info!(
            seeds = seeds.len(),
            iterations = settings.iterations,
            steps_per_period = settings.steps_per_period(),
            "starting Poincare batch"
        );
        Ok(Self {
            orbits: Vec::with_capacity(seeds.len()),
            seeds,
            settings,
        })
    }

    /// Computes up to `max_orbits` further orbits. Returns `true` once every
    /// seed is done.
    pub fn advance<I>(&mut self, integrator: &I, max_orbits: usize) -> Result<bool>
    where
        I: SymplecticIntegrator<Vector<f64>> + ?Sized,
    {
        let start = self.orbits.len();
        let end = start.saturating_add(max_orbits).min(self.seeds.len());
        for &(q0, p0) in &self.seeds[start..end] {
            let points = poincare_section(integrator, q0, p0, &self.settings)
                .with_context(|| format!("Poincare section from ({q0}, {p0}) failed"))?;
            self.orbits.push(PoincareOrbit { q0, p0, points });
        }
        Ok(self.is_done())
    }

    pub fn is_done(&self) -> bool {
        self.orbits.len() == self.seeds.len()
    }

    pub fn completed(&self) -> usize {
        self.orbits.len()
    }

    pub fn total(&self) -> usize {
        self.seeds.len()
    }

    pub fn orbits(&self) -> &[PoincareOrbit] {
        &self.orbits
    }

    pub fn into_orbits(self) -> Vec<PoincareOrbit> {
        self.orbits
    }
}
