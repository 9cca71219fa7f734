//! A grid of independent particles in the `(z, p_z)` plane, advanced one
//! frame at a time for display.

use crate::traits::SymplecticIntegrator;
use crate::vector::Vector;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size_x: usize,
    pub size_y: usize,
    pub range_x: (f64, f64),
    pub range_y: (f64, f64),
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size_x: 100,
            size_y: 100,
            range_x: (-2.5, 2.5),
            range_y: (-2.5, 2.5),
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size_x == 0 || self.size_y == 0 {
            bail!("Particle grid must have at least one particle per axis.");
        }
        for (name, (start, end)) in [("range_x", self.range_x), ("range_y", self.range_y)] {
            if !(start.is_finite() && end.is_finite()) {
                bail!("{name} must be finite.");
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.size_x * self.size_y
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fraction `i / (n - 1)`, or 0 for a single sample.
fn grid_fraction(i: usize, n: usize) -> f64 {
    if n > 1 {
        i as f64 / (n - 1) as f64
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// `(z, p_z)`.
    pub position: [f64; 2],
    /// Displacement over the last frame.
    pub offset: [f64; 2],
    /// RGBA, fixed at creation from the particle's grid cell.
    pub color: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct ParticleField<I> {
    integrator: I,
    particles: Vec<Particle>,
}

impl<I: SymplecticIntegrator<Vector<f64>>> ParticleField<I> {
    /// Lays particles out row by row, `x` varying fastest, covering both
    /// ranges end to end.
    pub fn new(integrator: I, grid: &GridConfig) -> Result<Self> {
        grid.validate()?;
        let (x0, x1) = grid.range_x;
        let (y0, y1) = grid.range_y;

        let mut particles = Vec::with_capacity(grid.len());
        for yy in 0..grid.size_y {
            let fy = grid_fraction(yy, grid.size_y);
            for xx in 0..grid.size_x {
                let fx = grid_fraction(xx, grid.size_x);
                particles.push(Particle {
                    position: [x0 + fx * (x1 - x0), y0 + fy * (y1 - y0)],
                    offset: [0.0, 1.0],
                    color: [fx as f32, fy as f32, 1.0, 1.0],
                });
            }
        }

        info!(
            particles = particles.len(),
            size_x = grid.size_x,
            size_y = grid.size_y,
            "created particle field"
        );
        Ok(Self {
            integrator,
            particles,
        })
    }

    /// Advances every particle by `delta`, starting from time `total_time`.
    pub fn update(&mut self, delta: f64, total_time: f64) {
        let integrator = &self.integrator;
        for particle in &mut self.particles {
            let [x, y] = particle.position;
            let (q, p) = integrator.step(
                Vector::from([x, total_time]),
                Vector::from([y, 0.0]),
                delta,
            );
            particle.position = [q[0], p[0]];
            particle.offset = [q[0] - x, p[0] - y];
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    /// `[x, y, dx, dy]` per particle, as vertex data.
    pub fn packed_positions(&self) -> Vec<f32> {
        self.particles
            .iter()
            .flat_map(|particle| {
                let [x, y] = particle.position;
                let [dx, dy] = particle.offset;
                [x as f32, y as f32, dx as f32, dy as f32]
            })
            .collect()
    }

    pub fn packed_colors(&self) -> Vec<f32> {
        self.particles
            .iter()
            .flat_map(|particle| particle.color)
            .collect()
    }
}
