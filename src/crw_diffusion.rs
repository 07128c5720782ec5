// CRW diffusion constants for bounded arenas
//
// The drift term comes from solving the Codling (2010) turning-angle integral
// over [-5, 5] degrees instead of [-pi, pi], which yields 0.055. The per-scenario
// geometric corrections are fitted, not derived, so they live in a table.

use serde::Deserialize;

use crate::crw_error::{ModelError, ModelResult};
use crate::crw_scenario::BlockDistribution;

/// Codling integral over a [-5, 5] degree turning range
pub const CODLING_FACTOR: f64 = 0.055;

/// Fitted correction constants for one block distribution
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScenarioConstants {
    /// Geometric correction L_s applied to the searching diffusion constant
    pub searching_ls: f64,
    /// Multiplier applied to D / 0.055 in the avoiding regime
    pub avoiding_scale: f64,
}

/// Per-distribution diffusion constants.
///
/// A distribution with no entry has no fitted constants and is rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiffusionTable {
    pub ss: Option<ScenarioConstants>,
    pub ds: Option<ScenarioConstants>,
    pub qs: Option<ScenarioConstants>,
    pub pl: Option<ScenarioConstants>,
    pub rn: Option<ScenarioConstants>,
}

impl Default for DiffusionTable {
    fn default() -> Self {
        let sqrt2 = std::f64::consts::SQRT_2;
        Self {
            ss: Some(ScenarioConstants {
                searching_ls: CODLING_FACTOR * 2.0 * sqrt2,
                avoiding_scale: 1.0 / (2.0 * sqrt2),
            }),
            ds: Some(ScenarioConstants {
                searching_ls: CODLING_FACTOR * 1.5 * sqrt2,
                avoiding_scale: 1.0 / (1.5 * sqrt2),
            }),
            qs: None,
            pl: Some(ScenarioConstants {
                searching_ls: CODLING_FACTOR / (3.75 * sqrt2),
                avoiding_scale: 10.0 * sqrt2,
            }),
            rn: Some(ScenarioConstants {
                searching_ls: CODLING_FACTOR / sqrt2,
                avoiding_scale: 2.5 * sqrt2,
            }),
        }
    }
}

impl DiffusionTable {
    pub fn constants(&self, dist: BlockDistribution) -> ModelResult<ScenarioConstants> {
        let entry = match dist {
            BlockDistribution::SingleSource => self.ss,
            BlockDistribution::DualSource => self.ds,
            BlockDistribution::QuadSource => self.qs,
            BlockDistribution::PowerLaw => self.pl,
            BlockDistribution::Random => self.rn,
        };
        entry.ok_or_else(|| ModelError::unsupported("diffusion", dist))
    }
}

/// Diffusion constant for a swarm of `n_robots` CRW robots while searching:
/// `N * v^2 / (4 * tick_len * 0.055) * L_s`
pub fn crw_d_for_searching(
    table: &DiffusionTable,
    n_robots: f64,
    wander_speed: f64,
    ticks_per_sec: u32,
    dist: BlockDistribution,
) -> ModelResult<f64> {
    if ticks_per_sec == 0 {
        return Err(ModelError::Config("ticks_per_sec must be positive".to_string()));
    }
    let constants = table.constants(dist)?;

    let tick_len = 1.0 / f64::from(ticks_per_sec);
    let drift_xy = wander_speed * wander_speed / (4.0 * tick_len) / CODLING_FACTOR;

    Ok(n_robots * drift_xy * constants.searching_ls)
}

/// Diffusion constant while avoiding collisions
pub fn crw_d_for_avoiding(
    table: &DiffusionTable,
    n_robots: f64,
    wander_speed: f64,
    ticks_per_sec: u32,
    dist: BlockDistribution,
) -> ModelResult<f64> {
    let d = crw_d_for_searching(table, n_robots, wander_speed, ticks_per_sec, dist)?;
    let constants = table.constants(dist)?;
    Ok(d / CODLING_FACTOR * constants.avoiding_scale)
}
