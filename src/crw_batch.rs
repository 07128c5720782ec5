// Batch criteria and per-experiment directory context
//
// A batch is a list of experiments differing in one variable (here, swarm
// size). Each experiment has an output root with one directory per run, a
// statistics root with averaged tables, and a model root that predictions
// are written to.

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::crw_blocks::ExpectedAcqDist;
use crate::crw_config::{MainConfig, ModelConfig};
use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::Series;
use crate::crw_representation::Nest;
use crate::crw_scenario::ScenarioSpec;
use crate::crw_stats::{BatchRow, StatsTable};

// ============================================================================
// Batch criteria
// ============================================================================

/// The variable a batch sweeps over, as seen by the models
pub trait BatchCriteria {
    /// Swarm size of each experiment, in batch order
    fn populations(&self) -> Vec<usize>;

    /// Directory name of each experiment, in batch order
    fn gen_exp_dirnames(&self) -> Vec<String>;

    fn n_exp(&self) -> usize {
        self.gen_exp_dirnames().len()
    }

    fn population(&self, exp_num: usize) -> ModelResult<usize> {
        let pops = self.populations();
        pops.get(exp_num).copied().ok_or(ModelError::ExperimentIndex {
            index: exp_num,
            count: pops.len(),
        })
    }
}

/// Batch criteria sweeping swarm population size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationSizeCriteria {
    populations: Vec<usize>,
    dirnames: Vec<String>,
}

impl PopulationSizeCriteria {
    /// Experiments named `exp0`, `exp1`, ...
    pub fn new(populations: Vec<usize>) -> Self {
        let dirnames = (0..populations.len()).map(|i| format!("exp{}", i)).collect();
        Self {
            populations,
            dirnames,
        }
    }

    pub fn with_dirnames(populations: Vec<usize>, dirnames: Vec<String>) -> ModelResult<Self> {
        if populations.len() != dirnames.len() {
            return Err(ModelError::Config(format!(
                "{} populations but {} experiment names",
                populations.len(),
                dirnames.len()
            )));
        }
        Ok(Self {
            populations,
            dirnames,
        })
    }
}

impl BatchCriteria for PopulationSizeCriteria {
    fn populations(&self) -> Vec<usize> {
        self.populations.clone()
    }

    fn gen_exp_dirnames(&self) -> Vec<String> {
        self.dirnames.clone()
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// Roots and configuration shared by every experiment of a batch
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub scenario: ScenarioSpec,
    pub output_root: PathBuf,
    pub stat_root: PathBuf,
    pub model_root: PathBuf,
    pub model_config: ModelConfig,
    pub main_config: MainConfig,
}

impl BatchContext {
    pub fn new(
        scenario: ScenarioSpec,
        output_root: impl Into<PathBuf>,
        stat_root: impl Into<PathBuf>,
        model_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scenario,
            output_root: output_root.into(),
            stat_root: stat_root.into(),
            model_root: model_root.into(),
            model_config: ModelConfig::default(),
            main_config: MainConfig::default(),
        }
    }

    pub fn with_configs(mut self, model_config: ModelConfig, main_config: MainConfig) -> Self {
        self.model_config = model_config;
        self.main_config = main_config;
        self
    }

    /// Context for experiment `exp_num`; creates its model directory
    pub fn for_exp(&self, criteria: &dyn BatchCriteria, exp_num: usize) -> ModelResult<ExpContext<'_>> {
        let dirs = criteria.gen_exp_dirnames();
        let exp = dirs.get(exp_num).ok_or(ModelError::ExperimentIndex {
            index: exp_num,
            count: dirs.len(),
        })?;
        let exp0 = &dirs[0];

        let model_root = self.model_root.join(exp);
        fs::create_dir_all(&model_root).map_err(|e| ModelError::io(&model_root, e))?;

        Ok(ExpContext {
            batch: self,
            exp_num,
            exp_name: exp.clone(),
            output_root: self.output_root.join(exp),
            stat_root: self.stat_root.join(exp),
            model_root,
            exp0_output_root: self.output_root.join(exp0),
            exp0_stat_root: self.stat_root.join(exp0),
            nest: OnceCell::new(),
            acq_dist: OnceCell::new(),
        })
    }
}

/// One experiment's directories, plus values computed once per experiment
#[derive(Debug)]
pub struct ExpContext<'a> {
    pub batch: &'a BatchContext,
    pub exp_num: usize,
    pub exp_name: String,
    pub output_root: PathBuf,
    pub stat_root: PathBuf,
    pub model_root: PathBuf,
    pub exp0_output_root: PathBuf,
    pub exp0_stat_root: PathBuf,
    nest: OnceCell<Nest>,
    acq_dist: OnceCell<f64>,
}

impl<'a> ExpContext<'a> {
    pub fn scenario(&self) -> &ScenarioSpec {
        &self.batch.scenario
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.batch.model_config
    }

    pub fn main_config(&self) -> &MainConfig {
        &self.batch.main_config
    }

    pub fn is_exp0(&self) -> bool {
        self.exp_num == 0
    }

    /// Context of the batch's first experiment
    pub fn exp0(&self, criteria: &dyn BatchCriteria) -> ModelResult<ExpContext<'a>> {
        self.batch.for_exp(criteria, 0)
    }

    pub fn nest(&self) -> &Nest {
        self.nest
            .get_or_init(|| Nest::for_scenario(&self.batch.scenario))
    }

    /// Expected nest-to-acquisition distance, computed on first use
    pub fn expected_acq_dist(&self) -> ModelResult<f64> {
        if let Some(d) = self.acq_dist.get() {
            return Ok(*d);
        }
        let d = ExpectedAcqDist::for_exp(self)?;
        Ok(*self.acq_dist.get_or_init(|| d))
    }

    pub fn stat_path(&self, stem: &str) -> PathBuf {
        self.stat_root
            .join(format!("{}{}", stem, self.main_config().stats_ext))
    }

    pub fn exp0_stat_path(&self, stem: &str) -> PathBuf {
        self.exp0_stat_root
            .join(format!("{}{}", stem, self.main_config().stats_ext))
    }

    pub fn model_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.model_root.join(format!("{}{}", stem, ext))
    }

    pub fn read_stats(&self, stem: &str) -> ModelResult<StatsTable> {
        StatsTable::read(self.stat_path(stem), self.main_config().separator)
    }

    pub fn read_exp0_stats(&self, stem: &str) -> ModelResult<StatsTable> {
        StatsTable::read(self.exp0_stat_path(stem), self.main_config().separator)
    }

    /// Metrics directory of every run of this experiment, sorted by run name
    pub fn run_metrics_dirs(&self) -> ModelResult<Vec<PathBuf>> {
        run_metrics_dirs(&self.output_root, &self.main_config().run_metrics_leaf)
    }

    /// Per-run file `<stem><run_ext>` inside a run metrics directory
    pub fn run_file(&self, run_dir: &Path, stem: &str) -> PathBuf {
        run_dir.join(format!("{}{}", stem, self.main_config().run_ext))
    }
}

/// Run an intra-experiment computation for every experiment in the batch and
/// keep the final (steady-state) value of each returned series, one row per
/// series.
pub fn steady_state_rows<F>(
    batch: &BatchContext,
    criteria: &dyn BatchCriteria,
    model: &str,
    mut intra: F,
) -> ModelResult<Vec<BatchRow>>
where
    F: FnMut(&ExpContext<'_>) -> ModelResult<Vec<Series>>,
{
    let mut rows: Vec<BatchRow> = Vec::new();
    for exp_num in 0..criteria.n_exp() {
        let ctx = batch.for_exp(criteria, exp_num)?;
        let series = intra(&ctx)?;
        if rows.is_empty() {
            rows = vec![BatchRow::new(); series.len()];
        }

        let mut finals = Vec::with_capacity(series.len());
        for (row, s) in rows.iter_mut().zip(&series) {
            let last = s
                .last()
                .copied()
                .ok_or_else(|| ModelError::EmptyTable(ctx.stat_root.clone()))?;
            row.insert(ctx.exp_name.clone(), last);
            finals.push(last);
        }
        info!("{}: {} -> {:?}", model, ctx.exp_name, finals);
    }
    Ok(rows)
}

pub fn run_metrics_dirs(output_root: &Path, leaf: &str) -> ModelResult<Vec<PathBuf>> {
    let entries = fs::read_dir(output_root).map_err(|e| ModelError::io(output_root, e))?;

    let mut runs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_dir())
        .collect();
    runs.sort();

    let mut dirs = Vec::with_capacity(runs.len());
    for run in runs {
        let metrics = run.join(leaf);
        if metrics.is_dir() {
            dirs.push(metrics);
        } else {
            warn!("Run {} has no '{}' directory; skipping", run.display(), leaf);
        }
    }

    if dirs.is_empty() {
        return Err(ModelError::NoRuns(output_root.to_path_buf()));
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crw_stats::tests::scratch_dir;

    #[test]
    fn test_population_criteria() {
        let c = PopulationSizeCriteria::new(vec![1, 2, 4, 8]);
        assert_eq!(c.n_exp(), 4);
        assert_eq!(c.gen_exp_dirnames()[3], "exp3");
        assert_eq!(c.population(2).unwrap(), 4);
        assert!(matches!(
            c.population(4),
            Err(ModelError::ExperimentIndex { index: 4, count: 4 })
        ));
    }

    #[test]
    fn test_mismatched_dirnames_rejected() {
        let err = PopulationSizeCriteria::with_dirnames(vec![1, 2], vec!["a".to_string()]);
        assert!(matches!(err, Err(ModelError::Config(_))));
    }

    #[test]
    fn test_for_exp_creates_model_dir_and_paths() {
        let root = scratch_dir("batch_ctx");
        let batch = BatchContext::new(
            ScenarioSpec::parse("SS.16x8x2").unwrap(),
            root.join("output"),
            root.join("stats"),
            root.join("models"),
        );
        let criteria = PopulationSizeCriteria::new(vec![1, 4]);

        let ctx = batch.for_exp(&criteria, 1).unwrap();
        assert!(ctx.model_root.is_dir());
        assert_eq!(ctx.stat_path("block-clusters"), root.join("stats/exp1/block-clusters.mean"));
        assert_eq!(ctx.exp0_stat_root, root.join("stats/exp0"));
        assert!(!ctx.is_exp0());
        assert_eq!(ctx.nest().center().x, 8.0);

        assert!(matches!(
            batch.for_exp(&criteria, 2),
            Err(ModelError::ExperimentIndex { index: 2, .. })
        ));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_run_metrics_dirs_skips_incomplete_runs() {
        let root = scratch_dir("runs");
        fs::create_dir_all(root.join("run1/metrics")).unwrap();
        fs::create_dir_all(root.join("run0/metrics")).unwrap();
        fs::create_dir_all(root.join("run2")).unwrap();

        let dirs = run_metrics_dirs(&root, "metrics").unwrap();
        assert_eq!(dirs, vec![root.join("run0/metrics"), root.join("run1/metrics")]);

        let empty = scratch_dir("no_runs");
        assert!(matches!(
            run_metrics_dirs(&empty, "metrics"),
            Err(ModelError::NoRuns(_))
        ));
        fs::remove_dir_all(&root).unwrap();
        fs::remove_dir_all(&empty).unwrap();
    }
}
