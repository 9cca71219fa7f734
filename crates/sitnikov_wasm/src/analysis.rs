//! Stepped Poincaré grid runner.

use serde::Serialize;
use serde_wasm_bindgen::to_value;
use sitnikov_core::analysis::{PoincareBatch, PoincareGrid, PoincareSettings};
use sitnikov_core::config::{SimulationConfig, SitnikovIntegrator};
use wasm_bindgen::prelude::*;

/// Progress payload for the stepped Poincaré runner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct PoincareProgress {
    done: bool,
    completed: usize,
    total: usize,
}

struct PoincareRunnerState {
    integrator: SitnikovIntegrator,
    batch: PoincareBatch,
}

impl PoincareRunnerState {
    fn new(
        config: &SimulationConfig,
        grid: &PoincareGrid,
    ) -> anyhow::Result<Self> {
        let integrator = config.build_integrator()?;
        let batch = PoincareBatch::new(grid, config.poincare)?;
        Ok(Self { integrator, batch })
    }

    fn run(&mut self, batch_size: usize) -> anyhow::Result<PoincareProgress> {
        self.batch.advance(&self.integrator, batch_size)?;
        Ok(self.progress())
    }

    fn progress(&self) -> PoincareProgress {
        PoincareProgress {
            done: self.batch.is_done(),
            completed: self.batch.completed(),
            total: self.batch.total(),
        }
    }
}

#[wasm_bindgen]
pub struct WasmPoincareRunner {
    state: PoincareRunnerState,
}

#[wasm_bindgen]
impl WasmPoincareRunner {
    #[allow(clippy::too_many_arguments)]
    #[wasm_bindgen(constructor)]
    pub fn new(
        order: u32,
        eccentricity: f64,
        q_min: f64,
        q_max: f64,
        q_samples: u32,
        p_samples: u32,
        velocity_scale: f64,
        iterations: u32,
        tau: f64,
    ) -> Result<WasmPoincareRunner, JsValue> {
        console_error_panic_hook::set_once();

        let config = SimulationConfig {
            order: order as usize,
            eccentricity,
            poincare: PoincareSettings {
                iterations: iterations as usize,
                tau,
                ..PoincareSettings::default()
            },
            ..SimulationConfig::default()
        };
        let grid = PoincareGrid {
            q_range: (q_min, q_max),
            q_samples: q_samples as usize,
            p_samples: p_samples as usize,
            velocity_scale,
        };

        let state = PoincareRunnerState::new(&config, &grid)
            .map_err(|e| JsValue::from_str(&format!("Failed to start Poincare runner: {e:#}")))?;
        Ok(WasmPoincareRunner { state })
    }

    pub fn is_done(&self) -> bool {
        self.state.batch.is_done()
    }

    /// Computes up to `batch_size` more orbits.
    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let progress = self
            .state
            .run(batch_size as usize)
            .map_err(|e| JsValue::from_str(&format!("Poincare computation failed: {e:#}")))?;
        to_value(&progress).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state.progress())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Every orbit computed so far; an error until the whole grid is done.
    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        if !self.state.batch.is_done() {
            return Err(JsValue::from_str("Poincare runner has not finished yet."));
        }
        to_value(self.state.batch.orbits())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
