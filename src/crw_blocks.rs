// Block acquisition and block collection models

use std::path::{Path, PathBuf};

use log::debug;

use crate::crw_batch::{steady_state_rows, BatchContext, BatchCriteria, ExpContext};
use crate::crw_diffusion::{crw_d_for_searching, DiffusionTable};
use crate::crw_dist_measure::DistanceMeasure2D;
use crate::crw_density::BlockAcqDensity;
use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::{
    Density, InterExpModel, IntraExpModel, ModelCategory, Series, Vector3D,
};
use crate::crw_quadrature::Quadrature;
use crate::crw_representation::{BlockCluster, BlockClusterSet, Nest};
use crate::crw_scenario::BlockDistribution;
use crate::crw_stats::BatchRow;

pub const CLUSTERS_STEM: &str = "block-clusters";
pub const BLOCK_MANIP_STEM: &str = "block-manipulation";
pub const DROP_PENALTY_COL: &str = "cum_avg_free_drop_penalty";

pub fn available_models(category: ModelCategory) -> Vec<&'static str> {
    match category {
        ModelCategory::Intra => vec![
            "IntraExp_BlockAcqRate_NRobots",
            "IntraExp_BlockCollectionRate_NRobots",
        ],
        ModelCategory::Inter => vec![
            "InterExp_BlockAcqRate_NRobots",
            "InterExp_BlockCollectionRate_NRobots",
        ],
    }
}

// ============================================================================
// Expected acquisition distance
// ============================================================================

/// Population-average distance from the nest to where blocks get picked up
pub struct ExpectedAcqDist;

impl ExpectedAcqDist {
    /// Unweighted mean over clusters of the adjusted distance from the nest
    /// to each cluster's expected acquisition point. Clusters holding no
    /// blocks have an all-zero density but still count toward the mean.
    pub fn for_clusters(
        dist: BlockDistribution,
        nest: &Nest,
        clusters: &BlockClusterSet,
        quadrature: &Quadrature,
    ) -> ModelResult<f64> {
        if clusters.is_empty() {
            return Err(ModelError::NoClusters(PathBuf::new()));
        }
        let dist_measure = DistanceMeasure2D::new(dist, nest, quadrature)?;

        let total: f64 = clusters
            .iter()
            .map(|c| Self::nest_to_cluster(c, nest, dist_measure, quadrature))
            .sum();
        Ok(total / clusters.len() as f64)
    }

    fn nest_to_cluster(
        cluster: &BlockCluster,
        nest: &Nest,
        dist_measure: DistanceMeasure2D,
        quadrature: &Quadrature,
    ) -> f64 {
        let density = BlockAcqDensity::new(nest, cluster, dist_measure, *quadrature);
        let ll = cluster.extent.ll();
        let ur = cluster.extent.ur();
        let evx = density.evx_for_region(ll, ur);
        let evy = density.evy_for_region(ll, ur);
        let d = dist_measure.to_nest(Vector3D::planar(evx, evy));
        debug!(
            "Cluster {}: E[acq]=({:.4}, {:.4}) dist={:.4}",
            cluster.cluster_id, evx, evy, d
        );
        d
    }

    /// Expected distance for one block-clusters table on disk
    pub fn for_file(
        dist: BlockDistribution,
        nest: &Nest,
        path: &Path,
        separator: char,
        quadrature: &Quadrature,
    ) -> ModelResult<f64> {
        let clusters = BlockClusterSet::read(dist, nest, path, separator)?;
        Self::for_clusters(dist, nest, &clusters, quadrature)
    }

    /// Expected distance for an experiment. Power-law cluster placement
    /// differs between runs, so each run is evaluated on its own and the
    /// results averaged; every other distribution uses the averaged stats.
    pub fn for_exp(ctx: &ExpContext<'_>) -> ModelResult<f64> {
        let dist = ctx.scenario().dist;
        let nest = ctx.nest();
        let sep = ctx.main_config().separator;
        let q = &ctx.model_config().quadrature;

        if dist == BlockDistribution::PowerLaw {
            let runs = ctx.run_metrics_dirs()?;
            let mut total = 0.0;
            for run in &runs {
                total += Self::for_file(dist, nest, &ctx.run_file(run, CLUSTERS_STEM), sep, q)?;
            }
            Ok(total / runs.len() as f64)
        } else {
            Self::for_file(dist, nest, &ctx.stat_path(CLUSTERS_STEM), sep, q)
        }
    }
}

// ============================================================================
// Kernels
// ============================================================================

/// Block acquisition rate alpha_b: inverse of the time to diffuse from the
/// nest to the expected acquisition location, `d^2 / (2D)`
pub fn block_acq_rate_kernel(
    table: &DiffusionTable,
    n_robots: f64,
    wander_speed: f64,
    ticks_per_sec: u32,
    avg_acq_dist: f64,
    dist: BlockDistribution,
) -> ModelResult<f64> {
    let d = crw_d_for_searching(table, n_robots, wander_speed, ticks_per_sec, dist)?;
    let diff_time = avg_acq_dist * avg_acq_dist / (2.0 * d);
    Ok(1.0 / diff_time)
}

/// Block collection rate via Little's Law: `L_b = alpha_b / mu_b`
pub fn block_collection_rate_kernel(alpha_b: f64, mu_b: f64) -> f64 {
    alpha_b / mu_b
}

// ============================================================================
// Intra-experiment models
// ============================================================================

/// Steady-state block acquisition rate of a swarm of N CRW robots.
///
/// Needs no empirical data beyond cluster geometry.
pub struct IntraExpBlockAcqRate;

impl IntraExpBlockAcqRate {
    pub fn alpha_b(ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<f64> {
        let config = ctx.model_config();
        let n_robots = criteria.population(ctx.exp_num)?;
        block_acq_rate_kernel(
            &config.diffusion,
            n_robots as f64,
            config.wander_mean_speed,
            config.exp_setup.ticks_per_sec,
            ctx.expected_acq_dist()?,
            ctx.scenario().dist,
        )
    }
}

impl IntraExpModel for IntraExpBlockAcqRate {
    fn name(&self) -> &'static str {
        "IntraExp_BlockAcqRate_NRobots"
    }

    fn run_for_exp(&self, _criteria: &dyn BatchCriteria, _exp_num: usize) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["block-manip-events-free-pickup"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Block Acquisition Rate"]
    }

    fn run(&self, ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        let alpha_b = Self::alpha_b(ctx, criteria)?;
        let n_rows = ctx.read_stats(BLOCK_MANIP_STEM)?.n_rows();
        Ok(vec![vec![alpha_b; n_rows]])
    }
}

/// Steady-state block collection rate, from the acquisition rate and the
/// measured nest drop penalty
pub struct IntraExpBlockCollectionRate;

impl IntraExpModel for IntraExpBlockCollectionRate {
    fn name(&self) -> &'static str {
        "IntraExp_BlockCollectionRate_NRobots"
    }

    fn run_for_exp(&self, _criteria: &dyn BatchCriteria, _exp_num: usize) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["block-manip-events-free-drop"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Block Collection Rate"]
    }

    fn run(&self, ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>> {
        let manip = ctx.read_stats(BLOCK_MANIP_STEM)?;
        let alpha_b = IntraExpBlockAcqRate::alpha_b(ctx, criteria)?;
        let series = manip
            .column(DROP_PENALTY_COL)?
            .iter()
            .map(|&mu_b| block_collection_rate_kernel(alpha_b, mu_b))
            .collect();
        Ok(vec![series])
    }
}

// ============================================================================
// Inter-experiment models
// ============================================================================

pub struct InterExpBlockAcqRate;

impl InterExpModel for InterExpBlockAcqRate {
    fn name(&self) -> &'static str {
        "InterExp_BlockAcqRate_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["block-manip-free-pickup-events-cum-avg"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Block Acquisition Rate"]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        steady_state_rows(batch, criteria, self.name(), |ctx| {
            IntraExpBlockAcqRate.run(ctx, criteria)
        })
    }
}

pub struct InterExpBlockCollectionRate;

impl InterExpModel for InterExpBlockCollectionRate {
    fn name(&self) -> &'static str {
        "InterExp_BlockCollectionRate_NRobots"
    }

    fn run_for_batch(&self, _criteria: &dyn BatchCriteria) -> bool {
        true
    }

    fn target_csv_stems(&self) -> Vec<&'static str> {
        vec!["blocks-transported-cum-avg"]
    }

    fn legend_names(&self) -> Vec<&'static str> {
        vec!["Predicted Block Collection Rate"]
    }

    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>> {
        steady_state_rows(batch, criteria, self.name(), |ctx| {
            IntraExpBlockCollectionRate.run(ctx, criteria)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crw_batch::PopulationSizeCriteria;
    use crate::crw_scenario::ScenarioSpec;
    use crate::crw_stats::tests::scratch_dir;
    use std::fs;

    /// Two-cluster single-source style block-clusters table
    pub(crate) const SS_CLUSTERS: &str =
        "cluster0_xmin;cluster0_xmax;cluster0_ymin;cluster0_ymax;cluster0_area;int_avg_cluster0_block_count\n\
         18;22;4;8;16;20\n\
         18;22;4;8;16;30\n";

    pub(crate) const BLOCK_MANIP: &str =
        "clock;cum_avg_free_drop_penalty\n\
         1;2.0\n\
         2;4.0\n\
         3;5.0\n";

    #[test]
    fn test_acq_rate_kernel() {
        let table = DiffusionTable::default();
        let rate =
            block_acq_rate_kernel(&table, 10.0, 0.2, 5, 2.0, BlockDistribution::Random).unwrap();
        let d = crw_d_for_searching(&table, 10.0, 0.2, 5, BlockDistribution::Random).unwrap();
        assert!((rate - 2.0 * d / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_acq_rate_kernel_zero_robots() {
        let table = DiffusionTable::default();
        let rate =
            block_acq_rate_kernel(&table, 0.0, 0.2, 5, 3.0, BlockDistribution::SingleSource).unwrap();
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn test_collection_rate_kernel() {
        assert_eq!(block_collection_rate_kernel(0.5, 2.0), 0.25);
    }

    #[test]
    fn test_expected_acq_dist_averages_clusters() {
        let spec = ScenarioSpec::parse("SS.24x12x2").unwrap();
        let nest = Nest::for_scenario(&spec);
        let q = Quadrature::default();
        let near = BlockCluster::new(Vector3D::planar(18.0, 4.0), Vector3D::planar(22.0, 8.0), 0, 20.0);
        let one = BlockClusterSet::from_clusters(vec![near]);
        let d1 = ExpectedAcqDist::for_clusters(BlockDistribution::SingleSource, &nest, &one, &q).unwrap();
        assert!(d1 > 0.0 && d1 < 10.0, "d1 {}", d1);

        let two = BlockClusterSet::from_clusters(vec![near, near]);
        let d2 = ExpectedAcqDist::for_clusters(BlockDistribution::SingleSource, &nest, &two, &q).unwrap();
        assert!((d1 - d2).abs() < 1e-12);

        let none = BlockClusterSet::from_clusters(vec![]);
        assert!(matches!(
            ExpectedAcqDist::for_clusters(BlockDistribution::SingleSource, &nest, &none, &q),
            Err(ModelError::NoClusters(_))
        ));
    }

    #[test]
    fn test_acq_rate_model_from_disk() {
        let root = scratch_dir("acq_rate");
        for exp in ["exp0", "exp1"] {
            let stat = root.join("stats").join(exp);
            fs::create_dir_all(&stat).unwrap();
            fs::write(stat.join("block-clusters.mean"), SS_CLUSTERS).unwrap();
            fs::write(stat.join("block-manipulation.mean"), BLOCK_MANIP).unwrap();
        }
        let batch = BatchContext::new(
            ScenarioSpec::parse("SS.24x12x2").unwrap(),
            root.join("output"),
            root.join("stats"),
            root.join("models"),
        );
        let criteria = PopulationSizeCriteria::new(vec![1, 4]);

        let ctx = batch.for_exp(&criteria, 1).unwrap();
        let acq = IntraExpBlockAcqRate.run(&ctx, &criteria).unwrap();
        assert_eq!(acq[0].len(), 3);
        assert!(acq[0][0] > 0.0);

        let coll = IntraExpBlockCollectionRate.run(&ctx, &criteria).unwrap();
        assert!((coll[0][2] - acq[0][0] / 5.0).abs() < 1e-12);

        let rows = InterExpBlockAcqRate.run(&batch, &criteria).unwrap();
        assert_eq!(rows.len(), 1);
        // Same geometry, four times the robots
        let r0 = rows[0].get("exp0").unwrap();
        let r1 = rows[0].get("exp1").unwrap();
        assert!((r1 - 4.0 * r0).abs() < 1e-9 * r1);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_powerlaw_uses_every_run() {
        let root = scratch_dir("acq_pl");
        let out = root.join("output/exp0");
        for run in ["run0", "run1"] {
            let metrics = out.join(run).join("metrics");
            fs::create_dir_all(&metrics).unwrap();
            fs::write(metrics.join("block-clusters.csv"), SS_CLUSTERS).unwrap();
        }
        let batch = BatchContext::new(
            ScenarioSpec::parse("PL.24x12x2").unwrap(),
            root.join("output"),
            root.join("stats"),
            root.join("models"),
        );
        let criteria = PopulationSizeCriteria::new(vec![1]);
        let ctx = batch.for_exp(&criteria, 0).unwrap();
        let d = ctx.expected_acq_dist().unwrap();

        let single = ExpectedAcqDist::for_file(
            BlockDistribution::PowerLaw,
            ctx.nest(),
            &out.join("run0/metrics/block-clusters.csv"),
            ';',
            &Quadrature::default(),
        )
        .unwrap();
        assert!((d - single).abs() < 1e-12);

        let empty_batch = BatchContext::new(
            ScenarioSpec::parse("PL.24x12x2").unwrap(),
            root.join("nothing"),
            root.join("stats"),
            root.join("models"),
        );
        let ctx = empty_batch.for_exp(&criteria, 0).unwrap();
        assert!(ctx.expected_acq_dist().is_err());

        fs::remove_dir_all(&root).unwrap();
    }
}
