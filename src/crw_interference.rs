// Interference rate and duration models
//
// Robots are either avoiding a collision or doing something else, which is
// modelled as a two-state queueing network. With the mean number of robots in
// the interference queue and the mean time spent in it known from data,
// Little's Law gives the arrival rate.

use crate::crw_batch::{steady_state_rows, BatchContext, BatchCriteria, ExpContext};
use crate::crw_error::ModelResult;
use crate::crw_interface::{InterExpModel, IntraExpModel, ModelCategory, Series};
use crate::crw_stats::BatchRow;

pub const FSM_STEM: &str = "fsm-interference-counts";
pub const N_AV_COL: &str = "cum_avg_exp_interference";
pub const TAU_AV_COL: &str = "cum_avg_interference_duration";

pub fn available_models(category: ModelCategory) -> Vec<&'static str> {
    match category {
        ModelCategory::Intra => vec![
            "IntraExp_WallInterferenceRate_1Robot",
            "IntraExp_RobotInterferenceRate_NRobots",
            "IntraExp_RobotInterferenceTime_NRobots",
        ],
        ModelCategory::Inter => vec![
            "InterExp_RobotInterferenceRate_NRobots",
            "InterExp_RobotInterferenceTime_NRobots",
        ],
    }
}

// ============================================================================
// Kernels
// ============================================================================

/// Rate at which a lone robot enters interference (from walls only):
/// `alpha_ca^1 = N_av^1 / tau_av^1`
pub fn wall_interference_rate_kernel(n_av1: f64, tau_av1: f64) -> f64 {
    n_av1 / tau_av1
}

/// Rate of robots entering interference because of other robots. The wall
/// component measured with one robot is removed, scaled by the queue size:
/// `alpha_ca^N = N_av^N / tau_av^N - alpha_ca^1 * N_av^N`
pub fn robot_interference_rate_kernel(n_av1: f64, tau_av1: f64, n_av_n: f64, tau_av_n: f64) -> f64 {
    let alpha_ca1 = wall_interference_rate_kernel(n_av1, tau_av1);
    n_av_n / tau_av_n - alpha_ca1 * n_av_n
}

/// Mean time spent in the interference queue by a robot in a swarm of `n`
pub fn robot_interference_time_kernel(
    n_av1: f64,
    tau_av1: f64,
    n_av_n: f64,
    tau_av_n: f64,
    n: usize,
) -> f64 {
    let alpha_ca1 = wall_interference_rate_kernel(n_av1, tau_av1);
    if n == 1 {
        return n_av1 / alpha_ca1;
    }
    let alpha_ca_n = robot_interference_rate_kernel(n_av1, tau_av1, n_av_n, tau_av_n);
    n_av_n / alpha_ca_n - alpha_ca1 * n_av_n
}

/// Kernel arguments gathered from the 1-robot experiment (exp0) and the
/// current experiment, one value per collection interval
#[derive(Debug, Clone, PartialEq)]
pub struct InterferenceArgs {
    pub n_av1: Series,
    pub tau_av1: Series,
    pub n_av_n: Series,
    pub tau_av_n: Series,
}

impl InterferenceArgs {
    pub fn gather(ctx: &ExpContext<'_>) -> ModelResult<Self> {
        let exp0 = ctx.read_exp0_stats(FSM_STEM)?;
        let exp_n = ctx.read_stats(FSM_STEM)?;
        Ok(Self {
            n_av1: exp0.column(N_AV_COL)?.to_vec(),
            tau_av1: exp0.column(TAU_AV_COL)?.to_vec(),
            n_av_n: exp_n.column(N_AV_COL)?.to_vec(),
            tau_av_n: exp_n.column(TAU_AV_COL)?.to_vec(),
        })
    }

    /// Apply `kernel` interval by interval over the current experiment's
    /// series. Intervals past the end of the exp0 data have no baseline and
    /// yield NaN.
    pub fn apply<F>(&self, kernel: F) -> Series
    where
        F: Fn(f64, f64, f64, f64) -> f64,
    {
        let at = |s: &Series, i: usize| s.get(i).copied().unwrap_or(f64::NAN);
        (0..self.n_av_n.len())
            .map(|i| {
                kernel(
                    at(&self.n_av1, i),
                    at(&self.tau_av1, i),
                    at(&self.n_av_n, i),
                    at(&self.tau_av_n, i),
                )
            })
            .collect()
    }
}

// ============================================================================
// Intra-experiment models
// ============================================================================

/// Interference rate of a swarm of one robot. Only runs for N = 1.
pub struct IntraExpWallInterferenceRate1Robot;

impl IntraExpWallInterferenceRate1Robot {
    /// Steady-state alpha_ca^1 read from a stats root holding a 1-robot experiment
    pub fn steady_state(ctx: &ExpContext<'_>) -> ModelResult<f64> {
        let table = ctx.read_exp0_stats(FSM_STEM)?;
        Ok(wall_interference_rate_kernel(
            table.last(N_AV_COL)?,
            table.last(TAU_AV_COL)?,
        ))
    }
}

impl IntraExpModel for IntraExpWallInterferenceRate1Robot {
    fn name(&self) -> &'static str {
        "IntraExp_WallInterferenceRate_1Robot"
    }

    fn run_for_exp(&self, criteria: &dyn BatchCriteria, exp_num: usize) -> bool {
        criteria.populations().get(exp_num) == Some(&1)
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec![FSM_STEM]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Interference Rate"]
    }

    fn run(&self, ctx: &ExpContext<'_>, _criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        let table = ctx.read_stats(FSM_STEM)?;
        let series = table
            .column(N_AV_COL)?
            .iter()
            .zip(table.column(TAU_AV_COL)?)
            .map(|(&n_av, &tau_av)| wall_interference_rate_kernel(n_av, tau_av))
            .collect();
        Ok(vec![series])
    }
}

/// Inter-robot interference rate of a swarm of N robots
pub struct IntraExpRobotInterferenceRateNRobots;

impl IntraExpModel for IntraExpRobotInterferenceRateNRobots {
    fn name(&self) -> &'static str {
        "IntraExp_RobotInterferenceRate_NRobots"
    }

    fn run_for_exp(&self, _criteria: &dyn BatchCriteria, _exp_num: usize) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec![FSM_STEM]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Interference Rate"]
    }

    fn run(&self, ctx: &ExpContext<'_>, _criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        let args = InterferenceArgs::gather(ctx)?;
        Ok(vec![args.apply(robot_interference_rate_kernel)])
    }
}

/// Time a robot in a swarm of N robots spends avoiding other robots
pub struct IntraExpRobotInterferenceTimeNRobots;

impl IntraExpModel for IntraExpRobotInterferenceTimeNRobots {
    fn name(&self) -> &'static str {
        "IntraExp_RobotInterferenceTime_NRobots"
    }

    fn run_for_exp(&self, _criteria: &dyn BatchCriteria, _exp_num: usize) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["fsm-interference-duration"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Interference Time"]
    }

    fn run(&self, ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        let n = criteria.population(ctx.exp_num)?;
        let args = InterferenceArgs::gather(ctx)?;
        Ok(vec![args.apply(|n_av1, tau_av1, n_av_n, tau_av_n| {
            robot_interference_time_kernel(n_av1, tau_av1, n_av_n, tau_av_n, n)
        })])
    }
}

// ============================================================================
// Inter-experiment models
// ============================================================================

pub struct InterExpRobotInterferenceRateNRobots;

impl InterExpModel for InterExpRobotInterferenceRateNRobots {
    fn name(&self) -> &'static str {
        "InterExp_RobotInterferenceRate_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["interference-entered-cum-avg"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Interference Rate"]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        steady_state_rows(batch, criteria, self.name(), |ctx| {
            IntraExpRobotInterferenceRateNRobots.run(ctx, criteria)
        })
    }
}

pub struct InterExpRobotInterferenceTimeNRobots;

impl InterExpModel for InterExpRobotInterferenceTimeNRobots {
    fn name(&self) -> &'static str {
        "InterExp_RobotInterferenceTime_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["interference-duration-cum-avg"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Interference Time"]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        steady_state_rows(batch, criteria, self.name(), |ctx| {
            IntraExpRobotInterferenceTimeNRobots.run(ctx, criteria)
        })
    }
}
