// Homing time: how long a robot takes to carry a block back to the nest

use crate::crw_batch::{steady_state_rows, BatchContext, BatchCriteria, ExpContext};
use crate::crw_blocks::CLUSTERS_STEM;
use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::{InterExpModel, IntraExpModel, ModelCategory, Series};
use crate::crw_interference::{IntraExpRobotInterferenceRateNRobots, IntraExpRobotInterferenceTimeNRobots};
use crate::crw_stats::BatchRow;

pub fn available_models(category: ModelCategory) -> Vec<&'static str> {
    match category {
        ModelCategory::Intra => vec!["IntraExp_HomingTime_1Robot", "IntraExp_HomingTime_NRobots"],
        ModelCategory::Inter => vec!["InterExp_HomingTime_NRobots"],
    }
}

/// `tau_h^N = tau_h^1 * (1 + alpha_ca^N * tau_av^N / N)`
///
/// An empty swarm never homes, so its homing time is 0.
pub fn homing_time_kernel(tau_h1: f64, alpha_ca_n: f64, tau_av_n: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    tau_h1 * (1.0 + alpha_ca_n * tau_av_n / n as f64)
}

/// Homing time of a lone robot, in timesteps.
///
/// Computed from first principles (cluster geometry and homing speed), so
/// it is not a kernel over empirical data.
pub struct IntraExpHomingTime1Robot;

impl IntraExpHomingTime1Robot {
    pub fn steady_state(ctx: &ExpContext<'_>) -> ModelResult<f64> {
        let config = ctx.model_config();
        if config.homing_mean_speed <= 0.0 {
            return Err(ModelError::InvalidParameter {
                name: "homing_mean_speed",
                value: config.homing_mean_speed,
            });
        }
        let secs = ctx.expected_acq_dist()? / config.homing_mean_speed;
        Ok(secs * f64::from(config.exp_setup.ticks_per_sec))
    }
}

impl IntraExpModel for IntraExpHomingTime1Robot {
    fn name(&self) -> &'static str {
        "IntraExp_HomingTime_1Robot"
    }

    fn run_for_exp(&self, criteria: &dyn BatchCriteria, exp_num: usize) -> bool {
        criteria.populations().get(exp_num) == Some(&1)
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["block-transport-time"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Homing Time"]
    }

    fn run(&self, ctx: &ExpContext<'_>, _criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        let tau_h1 = Self::steady_state(ctx)?;
        let n_rows = ctx.read_stats(CLUSTERS_STEM)?.n_rows();
        Ok(vec![vec![tau_h1; n_rows]])
    }
}

/// Homing time in a swarm of N robots: the 1-robot time stretched by the
/// time spent avoiding other robots on the way back
pub struct IntraExpHomingTimeNRobots;

impl IntraExpModel for IntraExpHomingTimeNRobots {
    fn name(&self) -> &'static str {
        "IntraExp_HomingTime_NRobots"
    }

    fn run_for_exp(&self, _criteria: &dyn BatchCriteria, _exp_num: usize) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["block-transport-time"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Homing Time"]
    }

    fn run(&self, ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        let n = criteria.population(ctx.exp_num)?;
        let n_rows = ctx.read_stats(CLUSTERS_STEM)?.n_rows();

        let tau_h1 = IntraExpHomingTime1Robot::steady_state(ctx)?;
        let alpha_ca_n = first(IntraExpRobotInterferenceRateNRobots.run(ctx, criteria)?);
        let tau_av_n = first(IntraExpRobotInterferenceTimeNRobots.run(ctx, criteria)?);

        let at = |s: &Series, i: usize| s.get(i).copied().unwrap_or(f64::NAN);
        let series = (0..n_rows)
            .map(|i| homing_time_kernel(tau_h1, at(&alpha_ca_n, i), at(&tau_av_n, i), n))
            .collect();
        Ok(vec![series])
    }
}

fn first(mut series: Vec<Series>) -> Series {
    if series.is_empty() {
        Series::new()
    } else {
        series.swap_remove(0)
    }
}

pub struct InterExpHomingTimeNRobots;

impl InterExpModel for InterExpHomingTimeNRobots {
    fn name(&self) -> &'static str {
        "InterExp_HomingTime_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["block-transport-time-cum-avg"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Homing Time"]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        steady_state_rows(batch, criteria, self.name(), |ctx| {
            IntraExpHomingTimeNRobots.run(ctx, criteria)
        })
    }
}
