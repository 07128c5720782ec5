// ODE models of searching/homing/avoiding robot counts over an experiment
//
// Parameters come from the steady-state rate models; the few quantities that
// cannot be derived a priori (time spent avoiding, robots in the avoidance
// queue) are read from the interference statistics.

use log::debug;

use crate::crw_batch::{steady_state_rows, BatchContext, BatchCriteria, ExpContext};
use crate::crw_blocks::{IntraExpBlockAcqRate, CLUSTERS_STEM};
use crate::crw_diffusion::crw_d_for_avoiding;
use crate::crw_error::{ModelError, ModelResult};
use crate::crw_homing_time::{IntraExpHomingTime1Robot, IntraExpHomingTimeNRobots};
use crate::crw_interface::{InterExpModel, IntraExpModel, ModelCategory, Series};
use crate::crw_interference::{IntraExpWallInterferenceRate1Robot, FSM_STEM, N_AV_COL};
use crate::crw_ode::{CrwParams, CrwSolver, OdeState};
use crate::crw_perf_measures::{marginal_fractional_losses, parallel_fractions, InterExpRawPerf, InterExpSelfOrg};
use crate::crw_representation::BlockClusterSet;
use crate::crw_stats::BatchRow;

pub const INT_TAU_AV_COL: &str = "int_avg_interference_duration";

const ODE_STEMS: [&str; 3] = [
    "block-acq-counts",
    "block-transporter-homing-nest",
    "fsm-interference-counts",
];

pub fn available_models(category: ModelCategory) -> Vec<&'static str> {
    match category {
        ModelCategory::Intra => vec!["IntraExp_ODE_1Robot", "IntraExp_ODE_NRobots"],
        ModelCategory::Inter => vec!["InterExp_ODE_NRobots", "InterExp_ODEWrapper_NRobots"],
    }
}

/// Per-robot rate of entering collision avoidance in a swarm of `n_robots`,
/// from Little's Law on the avoidance queue: `N_av` robots each stay
/// `tau_av`, fed by the `N - N_av` robots not already avoiding
pub fn swarm_avoidance_rate(n_robots: usize, n_av: f64, tau_av: f64) -> ModelResult<f64> {
    let free = n_robots as f64 - n_av;
    let rate = n_av / (tau_av * free);
    if !(free > 0.0 && rate.is_finite() && rate >= 0.0) {
        return Err(ModelError::InvalidParameter {
            name: "alpha_ca",
            value: rate,
        });
    }
    Ok(rate)
}

fn last_value(mut series: Vec<Series>, ctx: &ExpContext<'_>) -> ModelResult<f64> {
    series
        .first_mut()
        .and_then(|s| s.pop())
        .ok_or_else(|| ModelError::EmptyTable(ctx.stat_root.clone()))
}

fn initial_blocks(ctx: &ExpContext<'_>, exp0: bool) -> ModelResult<f64> {
    let path = if exp0 {
        ctx.exp0_stat_path(CLUSTERS_STEM)
    } else {
        ctx.stat_path(CLUSTERS_STEM)
    };
    let clusters = BlockClusterSet::read(ctx.scenario().dist, ctx.nest(), path, ctx.main_config().separator)?;
    Ok(clusters.total_blocks())
}

fn solve(ctx: &ExpContext<'_>, params: CrwParams, blocks: f64) -> ModelResult<Vec<Series>> {
    let solver = CrwSolver::new(params, ctx.model_config().ode_substeps)?;
    let soln = solver.solve(OdeState::all_searching(params.n_robots, blocks));
    Ok(vec![soln.searching(), soln.homing(), soln.avoiding()])
}

// ============================================================================
// Intra-experiment models
// ============================================================================

/// ODE solution for a swarm of one robot. Only runs for N = 1.
pub struct IntraExpOde1Robot;

impl IntraExpOde1Robot {
    /// 1-robot parameters, with avoidance statistics from the batch's first
    /// experiment
    pub fn params(ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<CrwParams> {
        let fsm = ctx.read_exp0_stats(FSM_STEM)?;

        let params = CrwParams {
            n_robots: 1.0,
            duration: ctx.model_config().exp_setup.total_ticks(),
            tau_av: fsm.last(INT_TAU_AV_COL)?,
            tau_h: IntraExpHomingTime1Robot::steady_state(ctx)?,
            alpha_b: IntraExpBlockAcqRate::alpha_b(ctx, criteria)?,
            alpha_ca: IntraExpWallInterferenceRate1Robot::steady_state(ctx)?,
            n_datapoints: fsm.n_rows(),
        };
        debug!("ODE params for 1 robot ({}): {:?}", ctx.exp_name, params);
        Ok(params)
    }
}

impl IntraExpModel for IntraExpOde1Robot {
    fn name(&self) -> &'static str {
        "IntraExp_ODE_1Robot"
    }

    fn run_for_exp(&self, criteria: &dyn BatchCriteria, exp_num: usize) -> bool {
        criteria.populations().get(exp_num) == Some(&1)
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        ODE_STEMS.to_vec()
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec![
            "ODE Solution for Searching Counts (1 Robot)",
            "ODE Solution for Homing Counts (1 Robot)",
            "ODE Solution for Interference Counts (1 Robot)",
        ]
    }

    fn run(&self, ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        let params = Self::params(ctx, criteria)?;
        solve(ctx, params, initial_blocks(ctx, true)?)
    }
}

/// ODE solution for a swarm of N robots
pub struct IntraExpOdeNRobots;

impl IntraExpOdeNRobots {
    pub fn params(ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<CrwParams> {
        let n = criteria.population(ctx.exp_num)?;
        let config = ctx.model_config();
        let fsm = ctx.read_stats(FSM_STEM)?;

        let tau_av = fsm.last(INT_TAU_AV_COL)?;
        let n_av = fsm.last(N_AV_COL)?;

        // The acquisition model gives the whole swarm's rate
        let alpha_b = IntraExpBlockAcqRate::alpha_b(ctx, criteria)? / n as f64;

        let params = CrwParams {
            n_robots: n as f64,
            duration: config.exp_setup.total_ticks(),
            tau_av,
            tau_h: last_value(IntraExpHomingTimeNRobots.run(ctx, criteria)?, ctx)?,
            alpha_b,
            alpha_ca: swarm_avoidance_rate(n, n_av, tau_av)?,
            n_datapoints: fsm.n_rows(),
        };

        let crw_d = crw_d_for_avoiding(
            &config.diffusion,
            n as f64,
            config.wander_mean_speed,
            config.exp_setup.ticks_per_sec,
            ctx.scenario().dist,
        )?;
        debug!(
            "ODE params for {} robots ({}): {:?}, avoiding diffusion {:.6}",
            n, ctx.exp_name, params, crw_d
        );
        Ok(params)
    }
}

impl IntraExpModel for IntraExpOdeNRobots {
    fn name(&self) -> &'static str {
        "IntraExp_ODE_NRobots"
    }

    fn run_for_exp(&self, _criteria: &dyn BatchCriteria, _exp_num: usize) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        ODE_STEMS.to_vec()
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec![
            "ODE Solution for Searching Counts (N Robots)",
            "ODE Solution for Homing Counts (N Robots)",
            "ODE Solution for Interference Counts (N Robots)",
        ]
    }

    fn run(&self, ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        if criteria.population(ctx.exp_num)? == 1 {
            return IntraExpOde1Robot.run(&ctx.exp0(criteria)?, criteria);
        }
        let params = Self::params(ctx, criteria)?;
        solve(ctx, params, initial_blocks(ctx, false)?)
    }
}

// ============================================================================
// Inter-experiment models
// ============================================================================

/// Steady-state searching, homing and avoiding counts across the batch
pub struct InterExpOdeNRobots;

impl InterExpModel for InterExpOdeNRobots {
    fn name(&self) -> &'static str {
        "InterExp_ODE_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec![
            "block-acq-counts-true-exploring-int-avg",
            "block-transporter-homing-nest-int-avg",
            "interference-in-int-avg",
        ]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec![
            "ODE Solution for Exploring Counts",
            "ODE Solution for Homing Counts",
            "ODE Solution for Interference Counts",
        ]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        steady_state_rows(batch, criteria, self.name(), |ctx| {
            IntraExpOdeNRobots.run(ctx, criteria)
        })
    }
}

/// Performance predictions (raw, scalability, self-organization) bundled
/// for comparison against the ODE solution
pub struct InterExpOdeWrapper;

impl InterExpModel for InterExpOdeWrapper {
    fn name(&self) -> &'static str {
        "InterExp_ODEWrapper_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec![
            "PM-ss-raw",
            "PM-ss-scalability-parallel-frac",
            "PM-ss-self-org-mfl",
        ]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec![
            "Predicted Blocks Transported",
            "Predicted Parallel Fraction",
            "Predicted Emergent Self-Organization",
        ]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        let raw = InterExpRawPerf
            .run(batch, criteria)?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Config("raw performance model produced no rows".to_string()))?;
        let scalability = parallel_fractions(&raw, criteria)?;
        let tlost = InterExpSelfOrg::time_lost(batch, criteria)?;
        let self_org = marginal_fractional_losses(&raw, &tlost, criteria)?;
        Ok(vec![raw, scalability, self_org])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crw_batch::PopulationSizeCriteria;
    use crate::crw_blocks::tests::{BLOCK_MANIP, SS_CLUSTERS};
    use crate::crw_interference::tests::write_fsm_batch;
    use crate::crw_scenario::ScenarioSpec;
    use crate::crw_stats::tests::scratch_dir;
    use std::fs;
    use std::path::Path;

    fn write_batch(root: &Path) -> BatchContext {
        write_fsm_batch(root);
        for exp in ["exp0", "exp1"] {
            let stat = root.join("stats").join(exp);
            fs::write(stat.join("block-clusters.mean"), SS_CLUSTERS).unwrap();
            fs::write(stat.join("block-manipulation.mean"), BLOCK_MANIP).unwrap();
        }
        BatchContext::new(
            ScenarioSpec::parse("SS.24x12x2").unwrap(),
            root.join("output"),
            root.join("stats"),
            root.join("models"),
        )
    }

    #[test]
    fn test_swarm_avoidance_rate() {
        let rate = swarm_avoidance_rate(4, 2.0, 25.0).unwrap();
        assert!((rate - 0.04).abs() < 1e-12);
        assert_eq!(swarm_avoidance_rate(4, 0.0, 25.0).unwrap(), 0.0);
        assert!(matches!(
            swarm_avoidance_rate(2, 2.0, 25.0),
            Err(ModelError::InvalidParameter { name: "alpha_ca", .. })
        ));
    }

    #[test]
    fn test_1robot_params_and_solution() {
        let root = scratch_dir("ode_1robot");
        let batch = write_batch(&root);
        let criteria = PopulationSizeCriteria::new(vec![1, 4]);
        let ctx0 = batch.for_exp(&criteria, 0).unwrap();

        let p = IntraExpOde1Robot::params(&ctx0, &criteria).unwrap();
        assert_eq!(p.n_robots, 1.0);
        assert_eq!(p.tau_av, 10.0);
        assert_eq!(p.n_datapoints, 2);
        assert_eq!(p.duration, 50000.0);
        assert!((p.alpha_ca - 0.02).abs() < 1e-12);

        let soln = IntraExpOde1Robot.run(&ctx0, &criteria).unwrap();
        assert_eq!(soln.len(), 3);
        assert_eq!(soln[0][0], 1.0);
        for i in 0..2 {
            assert!((soln[0][i] + soln[1][i] + soln[2][i] - 1.0).abs() < 1e-9);
        }

        // One robot in the swarm: the N-robot model is the 1-robot model
        let delegated = IntraExpOdeNRobots.run(&ctx0, &criteria).unwrap();
        assert_eq!(delegated, soln);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_nrobot_params_and_solution() {
        let root = scratch_dir("ode_nrobots");
        let batch = write_batch(&root);
        let criteria = PopulationSizeCriteria::new(vec![1, 4]);
        let ctx1 = batch.for_exp(&criteria, 1).unwrap();

        let p = IntraExpOdeNRobots::params(&ctx1, &criteria).unwrap();
        assert_eq!(p.n_robots, 4.0);
        assert_eq!(p.tau_av, 25.0);
        assert_eq!(p.n_datapoints, 3);
        assert!((p.alpha_ca - 0.04).abs() < 1e-12);
        let swarm_rate = IntraExpBlockAcqRate::alpha_b(&ctx1, &criteria).unwrap();
        assert!((p.alpha_b * 4.0 - swarm_rate).abs() < 1e-12);

        let soln = IntraExpOdeNRobots.run(&ctx1, &criteria).unwrap();
        assert_eq!(soln.len(), 3);
        assert_eq!(soln[0].len(), 3);
        for i in 0..3 {
            assert!((soln[0][i] + soln[1][i] + soln[2][i] - 4.0).abs() < 1e-9);
        }

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_inter_models() {
        let root = scratch_dir("ode_inter");
        let batch = write_batch(&root);
        let criteria = PopulationSizeCriteria::new(vec![1, 4]);

        let rows = InterExpOdeNRobots.run(&batch, &criteria).unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.exp_names().collect::<Vec<_>>(), vec!["exp0", "exp1"]);
        }

        let wrapped = InterExpOdeWrapper.run(&batch, &criteria).unwrap();
        assert_eq!(wrapped.len(), 3);
        assert_eq!(wrapped[0].len(), 2);
        assert_eq!(wrapped[1].exp_names().collect::<Vec<_>>(), vec!["exp1"]);
        assert_eq!(wrapped[2].exp_names().collect::<Vec<_>>(), vec!["exp1"]);
        assert_eq!(InterExpOdeWrapper.target_csv_stems().len(), wrapped.len());

        fs::remove_dir_all(&root).unwrap();
    }
}
