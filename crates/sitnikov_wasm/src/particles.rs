//! Particle grid bridge for the renderer.

use js_sys::Float32Array;
use serde_wasm_bindgen::from_value;
use sitnikov_core::config::{SimulationConfig, SitnikovIntegrator};
use sitnikov_core::particles::{GridConfig, ParticleField};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmParticleField {
    field: ParticleField<SitnikovIntegrator>,
    time_step: f64,
    time: f64,
}

impl WasmParticleField {
    pub(crate) fn from_simulation_config(config: &SimulationConfig) -> anyhow::Result<Self> {
        let integrator = config.build_integrator()?;
        Ok(Self {
            field: ParticleField::new(integrator, &config.grid)?,
            time_step: config.time_step,
            time: 0.0,
        })
    }
}

#[wasm_bindgen]
impl WasmParticleField {
    #[allow(clippy::too_many_arguments)]
    #[wasm_bindgen(constructor)]
    pub fn new(
        order: u32,
        eccentricity: f64,
        size_x: u32,
        size_y: u32,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
    ) -> Result<WasmParticleField, JsValue> {
        console_error_panic_hook::set_once();

        let config = SimulationConfig {
            order: order as usize,
            eccentricity,
            grid: GridConfig {
                size_x: size_x as usize,
                size_y: size_y as usize,
                range_x: (x_min, x_max),
                range_y: (y_min, y_max),
            },
            ..SimulationConfig::default()
        };
        Self::from_simulation_config(&config)
            .map_err(|e| JsValue::from_str(&format!("Failed to create particle field: {e:#}")))
    }

    pub fn from_config(config: JsValue) -> Result<WasmParticleField, JsValue> {
        console_error_panic_hook::set_once();

        let config: SimulationConfig = from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid configuration: {}", e)))?;
        Self::from_simulation_config(&config)
            .map_err(|e| JsValue::from_str(&format!("Failed to create particle field: {e:#}")))
    }

    /// Advances every particle by one frame of length `delta`.
    pub fn update(&mut self, delta: f64, total_time: f64) {
        self.field.update(delta, total_time);
    }

    /// One frame of the configured `time_step`, starting at the field's own
    /// clock.
    pub fn advance(&mut self) {
        self.field.update(self.time_step, self.time);
        self.time += self.time_step;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// `[x, y, dx, dy]` per particle.
    pub fn positions(&self) -> Float32Array {
        Float32Array::from(self.field.packed_positions().as_slice())
    }

    /// `[r, g, b, a]` per particle.
    pub fn colors(&self) -> Float32Array {
        Float32Array::from(self.field.packed_colors().as_slice())
    }

    pub fn len(&self) -> u32 {
        self.field.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: usize) -> SimulationConfig {
        SimulationConfig {
            order: 1,
            grid: GridConfig {
                size_x: size,
                size_y: size,
                ..GridConfig::default()
            },
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn field_holds_the_whole_grid() {
        let field = WasmParticleField::from_simulation_config(&config(4)).expect("field");
        assert_eq!(field.len(), 16);
        assert!(!field.is_empty());
    }

    #[test]
    fn update_moves_particles() {
        let mut field = WasmParticleField::from_simulation_config(&config(2)).expect("field");
        let before = field.field.packed_positions();
        field.update(0.05, 0.0);
        let after = field.field.packed_positions();
        assert_eq!(before.len(), after.len());
        assert_ne!(before, after);
    }

    #[test]
    fn advance_steps_by_the_configured_time_step() {
        let settings = SimulationConfig {
            time_step: 0.04,
            ..config(2)
        };
        let mut advanced = WasmParticleField::from_simulation_config(&settings).expect("field");
        let mut updated = WasmParticleField::from_simulation_config(&settings).expect("field");
        assert_eq!(advanced.time_step(), 0.04);

        advanced.set_time(1.0);
        advanced.advance();
        advanced.advance();
        updated.update(0.04, 1.0);
        updated.update(0.04, 1.0 + 0.04);

        assert_eq!(advanced.field.packed_positions(), updated.field.packed_positions());
        assert!((advanced.time() - 1.08).abs() < 1e-12);
    }

    #[test]
    fn empty_grid_is_an_error() {
        assert!(WasmParticleField::from_simulation_config(&config(0)).is_err());
    }
}
