// Block and block-acquisition densities over a single cluster

use log::debug;

use crate::crw_dist_measure::DistanceMeasure2D;
use crate::crw_interface::{ArenaExtent, Density, Vector3D};
use crate::crw_quadrature::Quadrature;
use crate::crw_representation::{BlockCluster, Nest};

/// Edge length of the cubical blocks (m)
pub const CUBE_BLOCK_DIM: f64 = 0.2;

// ============================================================================
// ClusterBlockDensity
// ============================================================================

/// Uniform block density within a cluster, zero inside the nest
#[derive(Debug, Clone)]
pub struct ClusterBlockDensity {
    cluster: ArenaExtent,
    nest: ArenaExtent,
    rho_b: f64,
    norm_factor: f64,
    quadrature: Quadrature,
}

impl ClusterBlockDensity {
    pub fn new(cluster: &BlockCluster, nest: &Nest, quadrature: Quadrature) -> Self {
        let mut area = cluster.extent.area();
        if cluster.extent.contains(nest.center()) {
            area -= nest.extent.area();
        }

        let rho_b = if area > 0.0 {
            cluster.avg_blocks * CUBE_BLOCK_DIM * CUBE_BLOCK_DIM / area
        } else {
            0.0
        };
        let norm_factor = if rho_b > 0.0 { 1.0 / (rho_b * area) } else { 0.0 };

        Self {
            cluster: cluster.extent,
            nest: nest.extent,
            rho_b,
            norm_factor,
            quadrature,
        }
    }

    /// Fraction of usable cluster area covered by blocks
    pub fn rho_b(&self) -> f64 {
        self.rho_b
    }

    pub fn norm_factor(&self) -> f64 {
        self.norm_factor
    }
}

impl Density for ClusterBlockDensity {
    fn density(&self, x: f64, y: f64) -> f64 {
        let pt = Vector3D::planar(x, y);
        if !self.cluster.contains(pt) || self.nest.contains(pt) {
            return 0.0;
        }
        self.rho_b * self.norm_factor
    }

    fn support(&self) -> ArenaExtent {
        self.cluster
    }

    fn quadrature(&self) -> &Quadrature {
        &self.quadrature
    }
}

// ============================================================================
// BlockAcqDensity
// ============================================================================

/// Normalization state of an acquisition density
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcqNormalization {
    /// The cluster holds no blocks; no acquisitions happen there
    Empty,
    Normalized { rho: f64, norm_factor: f64 },
}

/// Probability density of a block acquisition at a point of one cluster:
/// `1 / (sqrt(z) + rho)^2` with `z` the adjusted distance to the nest and
/// `rho = -ln(rho_b^(rho_b / 2))`, normalized to integrate to 1.
#[derive(Debug, Clone)]
pub struct BlockAcqDensity {
    cluster: ArenaExtent,
    dist_measure: DistanceMeasure2D,
    normalization: AcqNormalization,
    quadrature: Quadrature,
}

impl BlockAcqDensity {
    pub fn new(
        nest: &Nest,
        cluster: &BlockCluster,
        dist_measure: DistanceMeasure2D,
        quadrature: Quadrature,
    ) -> Self {
        let rho_b = ClusterBlockDensity::new(cluster, nest, quadrature).rho_b();

        let mut density = Self {
            cluster: cluster.extent,
            dist_measure,
            normalization: AcqNormalization::Empty,
            quadrature,
        };
        if rho_b <= 0.0 {
            debug!(
                "Cluster {} has zero block density; acquisition density is empty",
                cluster.cluster_id
            );
            return density;
        }

        let rho = -(rho_b / 2.0) * rho_b.ln();
        density.normalization = AcqNormalization::Normalized {
            rho,
            norm_factor: 1.0,
        };

        let total = density.for_region(cluster.extent.ll(), cluster.extent.ur());
        density.normalization = if total.is_finite() && total > 0.0 {
            AcqNormalization::Normalized {
                rho,
                norm_factor: 1.0 / total,
            }
        } else {
            debug!(
                "Cluster {} acquisition density integral is {}; treating as empty",
                cluster.cluster_id, total
            );
            AcqNormalization::Empty
        };
        density
    }

    pub fn normalization(&self) -> AcqNormalization {
        self.normalization
    }
}

impl Density for BlockAcqDensity {
    fn density(&self, x: f64, y: f64) -> f64 {
        match self.normalization {
            AcqNormalization::Empty => 0.0,
            AcqNormalization::Normalized { rho, norm_factor } => {
                let z = self.dist_measure.to_nest(Vector3D::planar(x, y)).max(0.0);
                let denom = z.sqrt() + rho;
                norm_factor / (denom * denom)
            }
        }
    }

    fn support(&self) -> ArenaExtent {
        self.cluster
    }

    fn quadrature(&self) -> &Quadrature {
        &self.quadrature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crw_scenario::{BlockDistribution, ScenarioSpec};

    fn ss_setup(avg_blocks: f64) -> (Nest, BlockCluster, DistanceMeasure2D) {
        let spec = ScenarioSpec::parse("SS.24x12x2").unwrap();
        let nest = Nest::for_scenario(&spec);
        let cluster = BlockCluster::new(
            Vector3D::planar(18.0, 4.0),
            Vector3D::planar(22.0, 8.0),
            0,
            avg_blocks,
        );
        let dm = DistanceMeasure2D::new(BlockDistribution::SingleSource, &nest, &Quadrature::default())
            .unwrap();
        (nest, cluster, dm)
    }

    #[test]
    fn test_cluster_density_is_normalized() {
        let (nest, cluster, _) = ss_setup(20.0);
        let d = ClusterBlockDensity::new(&cluster, &nest, Quadrature::default());
        assert!((d.rho_b() - 20.0 * 0.04 / 16.0).abs() < 1e-12);
        let total = d.for_region(cluster.extent.ll(), cluster.extent.ur());
        assert!((total - 1.0).abs() < 1e-6, "total {}", total);
    }

    #[test]
    fn test_cluster_density_zero_outside_and_in_nest() {
        let (nest, cluster, _) = ss_setup(20.0);
        let d = ClusterBlockDensity::new(&cluster, &nest, Quadrature::default());
        assert_eq!(d.at_point(Some(1.0), Some(1.0)), 0.0);
        assert!(d.at_point(Some(20.0), Some(6.0)) > 0.0);

        // A cluster covering the nest is zero over the nest footprint
        let big = BlockCluster::new(Vector3D::planar(0.0, 0.0), Vector3D::planar(24.0, 12.0), 0, 50.0);
        let d = ClusterBlockDensity::new(&big, &nest, Quadrature::default());
        assert_eq!(d.at_point(Some(12.0), Some(6.0)), 0.0);
        assert!(d.at_point(Some(1.0), Some(1.0)) > 0.0);
    }

    #[test]
    fn test_empty_cluster_density_is_zero() {
        let (nest, cluster, dm) = ss_setup(0.0);
        let d = ClusterBlockDensity::new(&cluster, &nest, Quadrature::default());
        assert_eq!(d.norm_factor(), 0.0);
        assert_eq!(d.at_point(Some(20.0), Some(6.0)), 0.0);

        let acq = BlockAcqDensity::new(&nest, &cluster, dm, Quadrature::default());
        assert_eq!(acq.normalization(), AcqNormalization::Empty);
        assert_eq!(acq.at_point(Some(20.0), Some(6.0)), 0.0);
        assert_eq!(acq.at_point(Some(20.0), None), 0.0);
        let ev = acq.evx_for_region(cluster.extent.ll(), cluster.extent.ur());
        assert!(ev == 0.0 && !ev.is_nan());
    }

    #[test]
    fn test_acq_density_integrates_to_one() {
        let (nest, cluster, dm) = ss_setup(30.0);
        let acq = BlockAcqDensity::new(&nest, &cluster, dm, Quadrature::default());
        assert!(matches!(acq.normalization(), AcqNormalization::Normalized { .. }));
        let total = acq.for_region(cluster.extent.ll(), cluster.extent.ur());
        assert!((total - 1.0).abs() < 1e-6, "total {}", total);
        assert!((acq.at_point(None, None) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_acq_density_prefers_points_near_nest() {
        let (nest, cluster, dm) = ss_setup(30.0);
        let acq = BlockAcqDensity::new(&nest, &cluster, dm, Quadrature::default());
        assert!(acq.at_point(Some(18.5), Some(6.0)) > acq.at_point(Some(21.5), Some(6.0)));

        // Expected X is pulled toward the nest side of the cluster
        let evx = acq.evx_for_region(cluster.extent.ll(), cluster.extent.ur());
        assert!(evx > 18.0 && evx < 20.0, "evx {}", evx);
        let evy = acq.evy_for_region(cluster.extent.ll(), cluster.extent.ur());
        assert!((evy - 6.0).abs() < 1e-3, "evy {}", evy);
    }

    #[test]
    fn test_marginal_integrates_to_one() {
        let (nest, cluster, dm) = ss_setup(30.0);
        let acq = BlockAcqDensity::new(&nest, &cluster, dm, Quadrature::default());
        let q = Quadrature::default();
        let total = q
            .integrate(|x| acq.at_point(Some(x), None), 18.0, 22.0)
            .value;
        assert!((total - 1.0).abs() < 1e-6, "total {}", total);
    }

    #[test]
    fn test_acq_density_is_idempotent() {
        let (nest, cluster, dm) = ss_setup(12.0);
        let a = BlockAcqDensity::new(&nest, &cluster, dm, Quadrature::default());
        let b = BlockAcqDensity::new(&nest, &cluster, dm, Quadrature::default());
        assert_eq!(a.normalization(), b.normalization());
        assert_eq!(a.at_point(Some(19.3), Some(5.1)), b.at_point(Some(19.3), Some(5.1)));
    }
}
