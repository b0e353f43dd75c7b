use std::path::{Path, PathBuf};
use std::time::Duration;

use haul_solver::Solver;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Settings for a batch of scenario runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub solver: SolverConfig,
}

/// Options passed through to the solver untouched by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Wall-clock limit per solve, in seconds
    pub time_limit_secs: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            time_limit_secs: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(source)?;
        config.solver.validate()?;
        Ok(config)
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "solver.tolerance",
                reason: format!("expected a positive number, got {}", self.tolerance),
            });
        }
        self.time_limit()?;
        Ok(())
    }

    /// The wall-clock limit as a `Duration`, if one is set
    pub fn time_limit(&self) -> Result<Option<Duration>, ConfigError> {
        self.time_limit_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
                    field: "solver.time_limit_secs",
                    reason: format!("expected a non-negative number of seconds, got {} ({})", secs, e),
                })
            })
            .transpose()
    }

    pub fn build(&self) -> Result<Solver, ConfigError> {
        self.validate()?;
        let mut solver = Solver::new()
            .with_max_iterations(self.max_iterations)
            .with_tolerance(self.tolerance);
        if let Some(limit) = self.time_limit()? {
            solver = solver.with_time_limit(limit);
        }
        Ok(solver)
    }
}
