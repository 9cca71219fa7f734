use crate::analysis::PoincareSettings;
use crate::composition::CompositionSettings;
use crate::integrator::{build_with_settings, Integrator};
use crate::particles::GridConfig;
use crate::sitnikov::SitnikovSystem;
use crate::vector::Vector;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Integrator for the Sitnikov problem as built from a [`SimulationConfig`].
pub type SitnikovIntegrator = Integrator<Vector<f64>, SitnikovSystem>;

/// Everything a run needs. Missing fields take their defaults, so a
/// document like `{"order": 3}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub eccentricity: f64,
    /// Composition order; the integrator's accuracy is twice this.
    pub order: usize,
    /// Step size per frame.
    pub time_step: f64,
    pub grid: GridConfig,
    pub poincare: PoincareSettings,
    pub composition: CompositionSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            eccentricity: 0.1,
            order: 2,
            time_step: 0.01,
            grid: GridConfig::default(),
            poincare: PoincareSettings::default(),
            composition: CompositionSettings::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.eccentricity) {
            bail!(
                "Eccentricity must lie in [0, 1), got {}.",
                self.eccentricity
            );
        }
        if self.order == 0 {
            bail!("Integrator order must be at least 1.");
        }
        if !(self.time_step.is_finite() && self.time_step != 0.0) {
            bail!("Time step must be finite and non-zero.");
        }
        self.grid.validate().context("Invalid particle grid")?;
        self.poincare
            .validate()
            .context("Invalid Poincare settings")?;
        Ok(())
    }

    pub fn build_integrator(&self) -> Result<SitnikovIntegrator> {
        self.validate()?;
        let system = SitnikovSystem::new(self.eccentricity)?;
        let integrator = build_with_settings(self.order, system, &self.composition)
            .with_context(|| format!("Failed to build order {} integrator", self.order))?;
        Ok(integrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::SymplecticIntegrator;

    #[test]
    fn defaults_build_a_fourth_order_integrator() {
        let config = SimulationConfig::default();
        config.validate().expect("defaults are valid");
        let integrator = config.build_integrator().expect("build");
        assert_eq!(integrator.order(), 2);
        assert_eq!(integrator.system().eccentricity(), 0.1);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"order": 3, "grid": {"size_x": 4}}"#).expect("parse");
        assert_eq!(config.order, 3);
        assert_eq!(config.eccentricity, 0.1);
        assert_eq!(config.grid.size_x, 4);
        assert_eq!(config.grid.size_y, GridConfig::default().size_y);
        assert_eq!(config.poincare, PoincareSettings::default());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SimulationConfig {
            eccentricity: 0.25,
            order: 4,
            ..SimulationConfig::default()
        };
        let text = serde_json::to_string(&config).expect("serialize");
        let back: SimulationConfig = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, config);
    }

    #[test]
    fn invalid_fields_are_reported() {
        let cases = [
            SimulationConfig {
                eccentricity: 1.0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                order: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                time_step: f64::NAN,
                ..SimulationConfig::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
            assert!(config.build_integrator().is_err());
        }
    }

    #[test]
    fn nested_errors_keep_their_context() {
        let config = SimulationConfig {
            grid: GridConfig {
                size_x: 0,
                ..GridConfig::default()
            },
            ..SimulationConfig::default()
        };
        let message = format!("{:#}", config.validate().expect_err("empty grid"));
        assert!(message.contains("Invalid particle grid"), "{message}");
    }

    #[test]
    fn unconverged_coefficients_surface_as_errors() {
        let config = SimulationConfig {
            order: 3,
            composition: CompositionSettings {
                max_iterations: 0,
                tolerance_epsilons: -1.0,
            },
            ..SimulationConfig::default()
        };
        let message = format!("{:#}", config.build_integrator().expect_err("no iterations"));
        assert!(message.contains("order 3"), "{message}");
    }

    #[test]
    fn built_integrator_steps_the_sitnikov_system() {
        let config = SimulationConfig {
            eccentricity: 0.0,
            order: 1,
            ..SimulationConfig::default()
        };
        let integrator = config.build_integrator().expect("build");
        let (q, p) = integrator.step(
            Vector::from([0.0, 0.0]),
            Vector::from([0.5, 0.0]),
            config.time_step,
        );
        assert!((q[0] - 0.005).abs() < 1e-9);
        assert!((q[1] - config.time_step).abs() < 1e-15);
        assert!(p[0] < 0.5);
    }
}
