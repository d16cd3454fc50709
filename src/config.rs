use crate::{Continous, GridWorldConfig, MdpError, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// In place: later states of a sweep see values already updated earlier
    /// in the same sweep.
    #[default]
    GaussSeidel,
    /// Every state of a sweep is backed up from a frozen copy of the
    /// previous sweep.
    Synchronous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Discount factor, in `[0, 1)`.
    pub gamma: Continous,
    /// A sweep whose largest per-state change is `<= theta` ends the solve.
    pub theta: Continous,
    /// Actions within this distance of the best Q-value share the policy.
    pub rounding_tolerance: Continous,
    /// Unbounded when `None`. Hitting the cap is an error, not a result.
    pub max_iterations: Option<usize>,
    pub sweep: SweepMode,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            theta: 1e-4,
            rounding_tolerance: 1e-4,
            max_iterations: None,
            sweep: SweepMode::GaussSeidel,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        validate_gamma(self.gamma)?;
        validate_positive("theta", self.theta)?;
        validate_positive("rounding_tolerance", self.rounding_tolerance)?;
        validate_max_iterations(self.max_iterations)
    }
}

pub fn validate_gamma(gamma: Continous) -> Result<()> {
    if (0. ..1.).contains(&gamma) {
        Ok(())
    } else {
        Err(MdpError::Configuration(format!(
            "Discount factor gamma must be in [0, 1), got {gamma}."
        )))
    }
}

pub fn validate_positive(name: &str, value: Continous) -> Result<()> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(MdpError::Configuration(format!(
            "{name} must be a positive finite number, got {value}."
        )))
    }
}

pub fn validate_max_iterations(max_iterations: Option<usize>) -> Result<()> {
    if max_iterations == Some(0) {
        Err(MdpError::Configuration(
            "max_iterations must allow at least one sweep.".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Entropy seeded when `None`.
    pub seed: Option<u64>,
    /// Pause between narrated steps.
    pub step_delay_ms: u64,
    /// Unbounded when `None`.
    pub max_steps: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: SolverConfig,
    pub grid_world: GridWorldConfig,
    pub episode: EpisodeConfig,
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        self.grid_world.validate()
    }
}
