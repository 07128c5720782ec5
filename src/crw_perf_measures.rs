// Swarm performance measures built on the steady-state acquisition model
//
// Raw performance is the predicted block acquisition rate. Scalability and
// emergent self-organization compare each experiment against the one before
// it, so neither has a value for the first experiment.

use log::{debug, info};

use crate::crw_batch::{steady_state_rows, BatchContext, BatchCriteria};
use crate::crw_blocks::IntraExpBlockAcqRate;
use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::{InterExpModel, IntraExpModel, ModelCategory};
use crate::crw_stats::BatchRow;

pub fn available_models(category: ModelCategory) -> Vec<&'static str> {
    match category {
        ModelCategory::Intra => vec![],
        ModelCategory::Inter => vec![
            "InterExp_RawPerf_NRobots",
            "InterExp_Scalability_NRobots",
            "InterExp_SelfOrg_NRobots",
        ],
    }
}

// ============================================================================
// Kernels
// ============================================================================

/// Performance lost to inter-robot interference, relative to N independent
/// copies of the 1-robot swarm:
/// `P_lost = (P_N * t_lost_N - N * P_1 * t_lost_1) / N`
///
/// A lone robot loses nothing by definition. A swarm that achieves nothing
/// has lost everything, reported as `+inf`.
pub fn perf_lost_kernel(perf1: f64, tlost1: f64, perf_n: f64, tlost_n: f64, n_robots: usize) -> f64 {
    if perf_n == 0.0 {
        return f64::INFINITY;
    }
    if n_robots <= 1 {
        return 0.0;
    }
    let n = n_robots as f64;
    (perf_n * tlost_n - n * perf1 * tlost1) / n
}

/// Fractional performance loss `P_lost / P_N`, rounded to 8 decimals.
/// Zero performance is a total (1.0) loss.
pub fn fractional_loss_kernel(perf_n: f64, plost_n: f64) -> f64 {
    if perf_n == 0.0 {
        return 1.0;
    }
    round_to(plost_n / perf_n, 8)
}

/// Parallel fraction between two consecutive swarm sizes: how much of the
/// speedup `S = P_i / P_(i-1)` the size ratio `n = N_i / N_(i-1)` explains,
/// `(1 - 1/S) / (1 - 1/n)` (Karp-Flatt style; 1.0 is perfectly linear)
pub fn parallel_fraction_kernel(perf_prev: f64, perf: f64, n_prev: usize, n: usize) -> f64 {
    let speedup = perf / perf_prev;
    let size_ratio = n as f64 / n_prev as f64;
    (1.0 - 1.0 / speedup) / (1.0 - 1.0 / size_ratio)
}

/// Marginal fractional loss: the loss the previous swarm would have had at
/// the current size, minus the loss actually observed. Positive values mean
/// the bigger swarm organized itself better than linear scaling predicts.
pub fn marginal_fl_kernel(fl_prev: f64, fl: f64, n_prev: usize, n: usize) -> f64 {
    fl_prev * (n as f64 / n_prev as f64) - fl
}

fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

// ============================================================================
// Batch-level pipelines
// ============================================================================

/// Values of `row` in batch order, failing if any experiment is missing
fn ordered(row: &BatchRow, exp_names: &[String]) -> ModelResult<Vec<f64>> {
    exp_names
        .iter()
        .map(|name| {
            row.get(name)
                .ok_or_else(|| ModelError::Config(format!("No value for experiment '{}'", name)))
        })
        .collect()
}

/// Parallel fraction of every experiment after the first
pub fn parallel_fractions(perf: &BatchRow, criteria: &dyn BatchCriteria) -> ModelResult<BatchRow> {
    let names = criteria.gen_exp_dirnames();
    let values = ordered(perf, &names)?;

    let mut row = BatchRow::new();
    for i in 1..names.len() {
        let pf = parallel_fraction_kernel(
            values[i - 1],
            values[i],
            criteria.population(i - 1)?,
            criteria.population(i)?,
        );
        row.insert(names[i].clone(), pf);
    }
    Ok(row)
}

/// Marginal fractional loss of every experiment after the first, from raw
/// performance and the measured time lost to interference. The first
/// experiment is the baseline and loses nothing by definition, whatever its
/// swarm size.
pub fn marginal_fractional_losses(
    perf: &BatchRow,
    tlost: &BatchRow,
    criteria: &dyn BatchCriteria,
) -> ModelResult<BatchRow> {
    let names = criteria.gen_exp_dirnames();
    let perf = ordered(perf, &names)?;
    let tlost = ordered(tlost, &names)?;
    if perf.is_empty() {
        return Ok(BatchRow::new());
    }

    let mut fl = Vec::with_capacity(names.len());
    for i in 0..names.len() {
        let plost = if i == 0 {
            0.0
        } else {
            perf_lost_kernel(perf[0], tlost[0], perf[i], tlost[i], criteria.population(i)?)
        };
        fl.push(fractional_loss_kernel(perf[i], plost));
    }
    debug!("Fractional losses: {:?}", fl);

    let mut row = BatchRow::new();
    for i in 1..names.len() {
        let mfl = marginal_fl_kernel(
            fl[i - 1],
            fl[i],
            criteria.population(i - 1)?,
            criteria.population(i)?,
        );
        row.insert(names[i].clone(), mfl);
    }
    Ok(row)
}

// ============================================================================
// Inter-experiment models
// ============================================================================

/// Predicted raw performance: the steady-state block acquisition rate of
/// each experiment
pub struct InterExpRawPerf;

impl InterExpModel for InterExpRawPerf {
    fn name(&self) -> &'static str {
        "InterExp_RawPerf_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["PM-ss-raw"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Blocks Transported"]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        steady_state_rows(batch, criteria, self.name(), |ctx| {
            IntraExpBlockAcqRate.run(ctx, criteria)
        })
    }
}

pub struct InterExpScalability;

impl InterExpModel for InterExpScalability {
    fn name(&self) -> &'static str {
        "InterExp_Scalability_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["PM-ss-scalability-parallel-frac"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Parallel Fraction"]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        let perf = raw_perf(batch, criteria)?;
        let row = parallel_fractions(&perf, criteria)?;
        info!("{}: {:?}", self.name(), row.values());
        Ok(vec![row])
    }
}

pub struct InterExpSelfOrg;

impl InterExpSelfOrg {
    /// Steady-state interference count of every experiment, read from the
    /// configured interference table and column
    pub fn time_lost(batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<BatchRow> {
        let perf_config = &batch.main_config.perf;
        let stem = perf_config.intra_interference_stem();
        let mut row = BatchRow::new();
        for exp_num in 0..criteria.n_exp() {
            let ctx = batch.for_exp(criteria, exp_num)?;
            let value = ctx.read_stats(stem)?.last(&perf_config.intra_interference_col)?;
            row.insert(ctx.exp_name.clone(), value);
        }
        Ok(row)
    }
}

impl InterExpModel for InterExpSelfOrg {
    fn name(&self) -> &'static str {
        "InterExp_SelfOrg_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["PM-ss-self-org-mfl"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Emergent Self-Organization"]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        let perf = raw_perf(batch, criteria)?;
        let tlost = Self::time_lost(batch, criteria)?;
        let row = marginal_fractional_losses(&perf, &tlost, criteria)?;
        info!("{}: {:?}", self.name(), row.values());
        Ok(vec![row])
    }
}

fn raw_perf(batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<BatchRow> {
    InterExpRawPerf
        .run(batch, criteria)?
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::Config("raw performance model produced no rows".to_string()))
}
