use js_sys::{Float32Array, Float64Array};
use serde_wasm_bindgen::{from_value, to_value};
use sitnikov_core::config::{SimulationConfig, SitnikovIntegrator};
use sitnikov_core::traits::SymplecticIntegrator;
use sitnikov_core::vector::Vector;
use wasm_bindgen::prelude::*;

/// One Sitnikov orbit driven from JS: state `[z, p_z]` plus the time.
#[wasm_bindgen]
pub struct WasmIntegrator {
    integrator: SitnikovIntegrator,
    state: [f64; 2],
    t: f64,
    time_step: f64,
}

impl WasmIntegrator {
    pub(crate) fn from_simulation_config(config: &SimulationConfig) -> anyhow::Result<Self> {
        Ok(Self {
            integrator: config.build_integrator()?,
            state: [0.0, 0.0],
            t: 0.0,
            time_step: config.time_step,
        })
    }

    /// `[t, z, p_z]` for every trajectory point, starting from the current state.
    pub(crate) fn trajectory_values(&self, total_time: f64, tau: f64) -> Vec<f64> {
        let [z, pz] = self.state;
        self.integrator
            .integrate(
                total_time,
                tau,
                Vector::from([z, self.t]),
                Vector::from([pz, 0.0]),
            )
            .flat_map(|(t, q, p)| [self.t + t, q[0], p[0]])
            .collect()
    }

    pub(crate) fn step_table_values(&self) -> Vec<f32> {
        self.integrator
            .schedule()
            .packed_pairs()
            .into_iter()
            .map(|c| c as f32)
            .collect()
    }
}

#[wasm_bindgen]
impl WasmIntegrator {
    #[wasm_bindgen(constructor)]
    pub fn new(order: u32, eccentricity: f64) -> Result<WasmIntegrator, JsValue> {
        console_error_panic_hook::set_once();

        let config = SimulationConfig {
            order: order as usize,
            eccentricity,
            ..SimulationConfig::default()
        };
        Self::from_simulation_config(&config)
            .map_err(|e| JsValue::from_str(&format!("Failed to build integrator: {e:#}")))
    }

    /// Builds from a (possibly partial) `SimulationConfig` object.
    pub fn from_config(config: JsValue) -> Result<WasmIntegrator, JsValue> {
        console_error_panic_hook::set_once();

        let config: SimulationConfig = from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid configuration: {}", e)))?;
        Self::from_simulation_config(&config)
            .map_err(|e| JsValue::from_str(&format!("Failed to build integrator: {e:#}")))
    }

    pub fn set_state(&mut self, state: &[f64]) -> Result<(), JsValue> {
        match state {
            [z, pz] => {
                self.state = [*z, *pz];
                Ok(())
            }
            _ => Err(JsValue::from_str("State must be [z, p_z].")),
        }
    }

    pub fn get_state(&self) -> Vec<f64> {
        self.state.to_vec()
    }

    pub fn set_t(&mut self, t: f64) {
        self.t = t;
    }

    pub fn get_t(&self) -> f64 {
        self.t
    }

    pub fn order(&self) -> u32 {
        self.integrator.order() as u32
    }

    pub fn eccentricity(&self) -> f64 {
        self.integrator.system().eccentricity()
    }

    pub fn step(&mut self, dt: f64) {
        let [z, pz] = self.state;
        let (q, p) = self.integrator.step(
            Vector::from([z, self.t]),
            Vector::from([pz, 0.0]),
            dt,
        );
        self.state = [q[0], p[0]];
        self.t = q[1];
    }

    /// Configured frame step.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Steps once by the configured `time_step`.
    pub fn advance(&mut self) {
        self.step(self.time_step);
    }

    /// Flat `[t, z, p_z, ...]` samples; does not move the current state.
    pub fn trajectory(&self, total_time: f64, tau: f64) -> Float64Array {
        Float64Array::from(self.trajectory_values(total_time, tau).as_slice())
    }

    /// Packed `[drift, kick]` coefficient pairs for the compute shader.
    pub fn step_table(&self) -> Float32Array {
        Float32Array::from(self.step_table_values().as_slice())
    }

    pub fn schedule(&self) -> Result<JsValue, JsValue> {
        to_value(self.integrator.schedule())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
