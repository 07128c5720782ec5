//! # crw_rust - Analytical models of CRW swarm foraging
//!
//! Steady-state and time-series predictions for a swarm of robots that forage
//! for blocks with a correlated random walk (CRW), given the geometry of the
//! arena and a small amount of measured data.
//!
//! ## Core Components
//!
//! - **DistanceMeasure2D / densities**: where in a cluster blocks get picked
//!   up, and how far that is from the nest
//! - **ExpectedAcqDist**: population-average acquisition distance
//! - **Kernels**: diffusion, block acquisition/collection rates, interference
//!   rate and time, homing time, performance measures; each a plain function
//! - **CrwSolver**: four-state ODE model of searching/homing/avoiding robots
//! - **Intra/inter-experiment models**: gather kernel arguments from collated
//!   statistics and produce per-interval series or per-experiment rows
//!
//! ## Usage
//!
//! ```no_run
//! use crw_rust::{registry, BatchContext, InterExpModel, PopulationSizeCriteria, ScenarioSpec};
//!
//! let scenario: ScenarioSpec = "SS.24x12x2".parse().unwrap();
//! let batch = BatchContext::new(scenario, "output", "statistics", "models");
//! let criteria = PopulationSizeCriteria::new(vec![1, 2, 4, 8, 16]);
//!
//! let model = registry::build_inter("InterExp_RawPerf_NRobots").unwrap();
//! for row in model.run(&batch, &criteria).unwrap() {
//!     println!("{:?}", row.values());
//! }
//! ```
//!
//! ## Running Batches
//!
//! The `model_runner` binary in `simulator/` loads a YAML batch description
//! and writes every selected model's output next to the statistics.

pub mod crw_error;
pub mod crw_interface;
pub mod crw_quadrature;
pub mod crw_scenario;
pub mod crw_stats;
pub mod crw_config;
pub mod crw_batch;

// Geometry and densities
pub mod crw_representation;
pub mod crw_dist_measure;
pub mod crw_density;
pub mod crw_diffusion;

// Models
pub mod crw_blocks;
pub mod crw_interference;
pub mod crw_homing_time;
pub mod crw_ode;
pub mod crw_ode_models;
pub mod crw_perf_measures;
pub mod crw_model_error;
pub mod crw_registry;

pub use crw_registry as registry;

// Re-export commonly used types
pub use crw_batch::{BatchContext, BatchCriteria, ExpContext, PopulationSizeCriteria};
pub use crw_blocks::ExpectedAcqDist;
pub use crw_config::{MainConfig, ModelConfig};
pub use crw_density::{AcqNormalization, BlockAcqDensity, ClusterBlockDensity};
pub use crw_dist_measure::DistanceMeasure2D;
pub use crw_error::{ModelError, ModelResult};
pub use crw_interface::{
    ArenaExtent, Density, InterExpModel, IntraExpModel, ModelCategory, Series, Vector3D,
};
pub use crw_ode::{CrwParams, CrwSolver, OdeSolution, OdeState};
pub use crw_representation::{BlockCluster, BlockClusterSet, Nest};
pub use crw_scenario::{BlockDistribution, ScenarioSpec};
pub use crw_stats::{BatchRow, StatsTable};
