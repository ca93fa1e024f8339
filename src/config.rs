use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::control::{BulletproofController, ControllerParameters};
use crate::dynamics::{DipDynamics, PlantParameters, SampleInterval};
use crate::error::{ConfigError, ConfigResult};
use crate::sim::SimConfig;

// ---------------------------------------------------------------------------
// Top-level run configuration
// ---------------------------------------------------------------------------

/// Everything needed to build a plant, a controller and a run.
///
/// Every section falls back to its defaults, so a file only needs the
/// fields it changes:
///
/// ```json
/// { "controller": { "max_force": 3.0 }, "sim": { "steps": 5000 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DipConfig {
    /// Shared by the plant step and the controller's rate limiter.
    pub sample_interval: SampleInterval,
    pub plant: PlantParameters,
    pub controller: ControllerParameters,
    pub sim: SimConfig,
}

impl DipConfig {
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!("loading config from {}", path.display());
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        // Deserialisation bypasses SampleInterval::new, so re-check here.
        SampleInterval::new(self.sample_interval.seconds())?;
        self.plant.validate()?;
        self.controller.validate()?;
        if let Some(index) = self.sim.initial_state.first_non_finite() {
            return Err(ConfigError::invalid(
                "sim.initial_state",
                format!("component {index} is not finite"),
            ));
        }
        Ok(())
    }

    pub fn dynamics(&self) -> ConfigResult<DipDynamics> {
        DipDynamics::new(self.plant.clone(), self.sample_interval)
    }

    pub fn controller(&self) -> ConfigResult<BulletproofController> {
        BulletproofController::new(self.controller.clone(), self.sample_interval)
    }
}
