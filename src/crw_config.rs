// Model and statistics-layout configuration
//
// Both structs load from YAML and accept partial files; anything missing
// falls back to the documented defaults.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::crw_diffusion::DiffusionTable;
use crate::crw_error::{ModelError, ModelResult};
use crate::crw_quadrature::Quadrature;

/// Simulated time parameters of every experiment in a batch
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExpSetup {
    pub duration_secs: f64,
    pub ticks_per_sec: u32,
}

impl Default for ExpSetup {
    fn default() -> Self {
        Self {
            duration_secs: 10000.0,
            ticks_per_sec: 5,
        }
    }
}

impl ExpSetup {
    /// Total experiment length in timesteps
    pub fn total_ticks(&self) -> f64 {
        self.duration_secs * f64::from(self.ticks_per_sec)
    }
}

/// Parameters of the CRW foraging models
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Mean robot speed while searching (m/s)
    pub wander_mean_speed: f64,
    /// Mean robot speed while returning to the nest (m/s)
    pub homing_mean_speed: f64,
    pub exp_setup: ExpSetup,
    pub diffusion: DiffusionTable,
    pub quadrature: Quadrature,
    /// Minimum RK4 steps between two reported ODE datapoints
    pub ode_substeps: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            wander_mean_speed: 0.1,
            homing_mean_speed: 0.1,
            exp_setup: ExpSetup::default(),
            diffusion: DiffusionTable::default(),
            quadrature: Quadrature::default(),
            ode_substeps: 10,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if !(self.wander_mean_speed.is_finite() && self.wander_mean_speed > 0.0) {
            return Err(ModelError::Config(format!(
                "wander_mean_speed must be positive, got {}",
                self.wander_mean_speed
            )));
        }
        if !(self.homing_mean_speed.is_finite() && self.homing_mean_speed > 0.0) {
            return Err(ModelError::Config(format!(
                "homing_mean_speed must be positive, got {}",
                self.homing_mean_speed
            )));
        }
        if self.exp_setup.ticks_per_sec == 0 {
            return Err(ModelError::Config("exp_setup.ticks_per_sec must be positive".to_string()));
        }
        if self.quadrature.limit == 0 {
            return Err(ModelError::Config("quadrature.limit must be positive".to_string()));
        }
        Ok(())
    }
}

/// Columns used for the self-organization measure
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PerfConfig {
    pub intra_interference_csv: String,
    pub intra_interference_col: String,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            intra_interference_csv: "fsm-interference-counts.csv".to_string(),
            intra_interference_col: "cum_avg_exp_interference".to_string(),
        }
    }
}

impl PerfConfig {
    /// File stem of the interference csv (everything before the first '.')
    pub fn intra_interference_stem(&self) -> &str {
        self.intra_interference_csv
            .split('.')
            .next()
            .unwrap_or(&self.intra_interference_csv)
    }
}

/// Layout of the collated statistics the models read
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    /// Directory under each run's output dir holding its metrics
    pub run_metrics_leaf: String,
    /// Extension of averaged statistics files
    pub stats_ext: String,
    /// Extension of per-run metrics files
    pub run_ext: String,
    pub separator: char,
    pub perf: PerfConfig,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            run_metrics_leaf: "metrics".to_string(),
            stats_ext: ".mean".to_string(),
            run_ext: ".csv".to_string(),
            separator: ';',
            perf: PerfConfig::default(),
        }
    }
}

pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> ModelResult<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    serde_yaml::from_str(&content)
        .map_err(|e| ModelError::Config(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_model_config() {
        let yaml = "wander_mean_speed: 0.2\nexp_setup:\n  ticks_per_sec: 10\n";
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.wander_mean_speed, 0.2);
        assert_eq!(config.homing_mean_speed, 0.1);
        assert_eq!(config.exp_setup.ticks_per_sec, 10);
        assert_eq!(config.exp_setup.duration_secs, 10000.0);
        assert_eq!(config.quadrature.limit, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_model_config() {
        let mut config = ModelConfig::default();
        config.exp_setup.ticks_per_sec = 0;
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));

        let mut config = ModelConfig::default();
        config.homing_mean_speed = 0.0;
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));
    }

    #[test]
    fn test_main_config_defaults() {
        let config: MainConfig = serde_yaml::from_str("run_metrics_leaf: output").unwrap();
        assert_eq!(config.run_metrics_leaf, "output");
        assert_eq!(config.stats_ext, ".mean");
        assert_eq!(config.separator, ';');
        assert_eq!(config.perf.intra_interference_stem(), "fsm-interference-counts");
    }

    #[test]
    fn test_total_ticks() {
        let setup = ExpSetup {
            duration_secs: 100.0,
            ticks_per_sec: 5,
        };
        assert_eq!(setup.total_ticks(), 500.0);
    }

    #[test]
    fn test_load_yaml_missing_file() {
        let err = load_yaml::<ModelConfig>("/nonexistent/model.yaml");
        assert!(matches!(err, Err(ModelError::Io { .. })));
    }
}
