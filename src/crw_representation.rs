// Geometric entities derived from scenario configuration and cluster stats

use std::path::Path;

use log::debug;

use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::{ArenaExtent, Vector3D};
use crate::crw_scenario::{BlockDistribution, ScenarioSpec};
use crate::crw_stats::StatsTable;

// ============================================================================
// Nest
// ============================================================================

/// The nest footprint for an experiment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nest {
    pub extent: ArenaExtent,
}

impl Nest {
    /// Place the nest the way the experiment generator does: centered in the
    /// arena, 20% x 20% of it for every distribution except dual source,
    /// where it is a 10% x 80% strip between the two sources.
    pub fn for_scenario(spec: &ScenarioSpec) -> Self {
        let arena = spec.arena();
        let (fx, fy) = match spec.dist {
            BlockDistribution::DualSource => (0.1, 0.8),
            BlockDistribution::SingleSource
            | BlockDistribution::QuadSource
            | BlockDistribution::PowerLaw
            | BlockDistribution::Random => (0.2, 0.2),
        };
        let dims = Vector3D::planar(arena.xsize() * fx, arena.ysize() * fy);
        let center = Vector3D::planar(arena.center().x, arena.center().y);
        Self::from_center(center, dims)
    }

    pub fn from_center(center: Vector3D, dims: Vector3D) -> Self {
        Self {
            extent: ArenaExtent::new(dims, center - dims / 2.0),
        }
    }

    pub fn center(&self) -> Vector3D {
        self.extent.center()
    }
}

// ============================================================================
// Block clusters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockCluster {
    pub extent: ArenaExtent,
    pub cluster_id: usize,
    /// Estimated steady-state number of blocks in the cluster
    pub avg_blocks: f64,
}

impl BlockCluster {
    pub fn new(ll: Vector3D, ur: Vector3D, cluster_id: usize, avg_blocks: f64) -> Self {
        Self {
            extent: ArenaExtent::from_corners(ll, ur),
            cluster_id,
            avg_blocks: avg_blocks.max(0.0),
        }
    }

    /// Build cluster `cluster_id` from the final row of a block-clusters table.
    ///
    /// The total observed block count is apportioned to the cluster by its
    /// share of the total cluster area.
    pub fn from_table(table: &StatsTable, cluster_id: usize) -> ModelResult<Self> {
        let stem = format!("cluster{}", cluster_id);
        let xmin = table.last(&format!("{}_xmin", stem))?;
        let xmax = table.last(&format!("{}_xmax", stem))?;
        let ymin = table.last(&format!("{}_ymin", stem))?;
        let ymax = table.last(&format!("{}_ymax", stem))?;

        let total_blocks = sum_last_matching(table, "int_avg_cluster", "_block_count")?;
        let total_area = sum_last_matching(table, "cluster", "_area")?;

        let ll = Vector3D::planar(xmin, ymin);
        let ur = Vector3D::planar(xmax, ymax);
        let cluster_area = ArenaExtent::from_corners(ll, ur).area();
        let avg_blocks = if total_area > 0.0 {
            total_blocks * cluster_area / total_area
        } else {
            0.0
        };

        Ok(Self::new(ll, ur, cluster_id, avg_blocks))
    }
}

/// Sum of the last row over columns named `<prefix><digits><suffix>`
fn sum_last_matching(table: &StatsTable, prefix: &str, suffix: &str) -> ModelResult<f64> {
    let mut total = 0.0;
    for name in table.column_names() {
        let is_match = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .map_or(false, |id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()));
        if is_match {
            total += table.last(name)?;
        }
    }
    Ok(total)
}

/// All block clusters in one experiment's arena
#[derive(Debug, Clone, PartialEq)]
pub struct BlockClusterSet {
    clusters: Vec<BlockCluster>,
}

impl BlockClusterSet {
    pub fn from_table(dist: BlockDistribution, nest: &Nest, table: &StatsTable) -> ModelResult<Self> {
        let n_clusters = table.columns_matching("xmin").len();
        if n_clusters == 0 {
            return Err(ModelError::NoClusters(table.path().to_path_buf()));
        }

        let clusters = if dist == BlockDistribution::Random {
            let cluster = BlockCluster::from_table(table, 0)?;
            decompose_around_nest(&cluster, nest).to_vec()
        } else {
            (0..n_clusters)
                .map(|id| BlockCluster::from_table(table, id))
                .collect::<ModelResult<Vec<_>>>()?
        };

        for c in clusters.iter().filter(|c| c.avg_blocks <= 0.0) {
            debug!("Cluster {} in {} holds no blocks", c.cluster_id, table.path().display());
        }
        Ok(Self { clusters })
    }

    pub fn read(
        dist: BlockDistribution,
        nest: &Nest,
        path: impl AsRef<Path>,
        separator: char,
    ) -> ModelResult<Self> {
        let table = StatsTable::read(path, separator)?;
        Self::from_table(dist, nest, &table)
    }

    pub fn from_clusters(clusters: Vec<BlockCluster>) -> Self {
        Self { clusters }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockCluster> {
        self.clusters.iter()
    }

    pub fn total_blocks(&self) -> f64 {
        self.clusters.iter().map(|c| c.avg_blocks).sum()
    }
}

impl<'a> IntoIterator for &'a BlockClusterSet {
    type Item = &'a BlockCluster;
    type IntoIter = std::slice::Iter<'a, BlockCluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}

/// Split a cluster that contains the nest into the four rectangles tiling
/// the cluster minus the nest footprint:
///
/// ```text
///  +----+-----+----+
///  |    |  3  |    |
///  | 1  +-----+ 4  |
///  |    |nest |    |
///  |    +-----+    |
///  |    |  2  |    |
///  +----+-----+----+
/// ```
///
/// Blocks never spawn inside the nest, so each piece gets the share of
/// `avg_blocks` matching its share of the usable (non-nest) area.
pub fn decompose_around_nest(cluster: &BlockCluster, nest: &Nest) -> [BlockCluster; 4] {
    let c_ll = cluster.extent.ll();
    let c_ur = cluster.extent.ur();
    let n_ll = nest.extent.ll();
    let n_ur = nest.extent.ur();

    let corners = [
        (c_ll, Vector3D::planar(n_ll.x, c_ur.y)),
        (Vector3D::planar(n_ll.x, c_ll.y), Vector3D::planar(n_ur.x, n_ll.y)),
        (Vector3D::planar(n_ll.x, n_ur.y), Vector3D::planar(n_ur.x, c_ur.y)),
        (Vector3D::planar(n_ur.x, c_ll.y), c_ur),
    ];

    let usable = corners
        .iter()
        .map(|(ll, ur)| ArenaExtent::from_corners(*ll, *ur).area())
        .sum::<f64>();

    let mut pieces = [*cluster; 4];
    for (i, (ll, ur)) in corners.iter().enumerate() {
        let area = ArenaExtent::from_corners(*ll, *ur).area();
        let share = if usable > 0.0 { area / usable } else { 0.0 };
        pieces[i] = BlockCluster::new(*ll, *ur, i, cluster.avg_blocks * share);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters_table(content: &str) -> StatsTable {
        StatsTable::parse("block-clusters.mean", content, ';').unwrap()
    }

    #[test]
    fn test_nest_placement() {
        let ss = Nest::for_scenario(&ScenarioSpec::parse("SS.32x16x2").unwrap());
        assert_eq!(ss.center(), Vector3D::planar(16.0, 8.0));
        assert!((ss.extent.xsize() - 6.4).abs() < 1e-12);
        assert!((ss.extent.ysize() - 3.2).abs() < 1e-12);

        let ds = Nest::for_scenario(&ScenarioSpec::parse("DS.32x16x2").unwrap());
        assert_eq!(ds.center(), Vector3D::planar(16.0, 8.0));
        assert!((ds.extent.xsize() - 3.2).abs() < 1e-12);
        assert!((ds.extent.ysize() - 12.8).abs() < 1e-12);
    }

    #[test]
    fn test_cluster_from_table_apportions_blocks() {
        let table = clusters_table(
            "cluster0_xmin;cluster0_xmax;cluster0_ymin;cluster0_ymax;cluster0_area;int_avg_cluster0_block_count;\
             cluster1_xmin;cluster1_xmax;cluster1_ymin;cluster1_ymax;cluster1_area;int_avg_cluster1_block_count\n\
             0;1;0;1;1;5;0;1;0;1;1;5\n\
             1;3;1;3;4;8;10;12;1;2;2;4\n",
        );
        let c0 = BlockCluster::from_table(&table, 0).unwrap();
        let c1 = BlockCluster::from_table(&table, 1).unwrap();
        // 12 blocks over 6 units of area
        assert!((c0.avg_blocks - 8.0).abs() < 1e-12);
        assert!((c1.avg_blocks - 4.0).abs() < 1e-12);
        assert_eq!(c1.extent.ll(), Vector3D::planar(10.0, 1.0));
    }

    #[test]
    fn test_cluster_with_zero_total_area_is_empty() {
        let table = clusters_table(
            "cluster0_xmin;cluster0_xmax;cluster0_ymin;cluster0_ymax;cluster0_area;int_avg_cluster0_block_count\n\
             0;0;0;0;0;3\n",
        );
        let c = BlockCluster::from_table(&table, 0).unwrap();
        assert_eq!(c.avg_blocks, 0.0);
    }

    #[test]
    fn test_set_without_clusters_fails() {
        let table = clusters_table("clock;other\n1;2\n");
        let nest = Nest::from_center(Vector3D::planar(5.0, 5.0), Vector3D::planar(2.0, 2.0));
        assert!(matches!(
            BlockClusterSet::from_table(BlockDistribution::SingleSource, &nest, &table),
            Err(ModelError::NoClusters(_))
        ));
    }

    #[test]
    fn test_random_distribution_decomposes_into_four() {
        let table = clusters_table(
            "cluster0_xmin;cluster0_xmax;cluster0_ymin;cluster0_ymax;cluster0_area;int_avg_cluster0_block_count\n\
             2;18;2;18;256;40\n",
        );
        let nest = Nest::for_scenario(&ScenarioSpec::parse("RN.20x20x2").unwrap());
        let set = BlockClusterSet::from_table(BlockDistribution::Random, &nest, &table).unwrap();
        assert_eq!(set.len(), 4);
        assert!((set.total_blocks() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_decomposition_partitions_cluster_randomized() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let cx0 = rng.gen_range(0.0..5.0);
            let cy0 = rng.gen_range(0.0..5.0);
            let cx1 = cx0 + rng.gen_range(6.0..30.0);
            let cy1 = cy0 + rng.gen_range(6.0..30.0);
            let nx = rng.gen_range(cx0 + 1.0..cx1 - 3.0);
            let ny = rng.gen_range(cy0 + 1.0..cy1 - 3.0);
            let nw = rng.gen_range(0.5..(cx1 - nx - 0.5));
            let nh = rng.gen_range(0.5..(cy1 - ny - 0.5));
            let avg_blocks = rng.gen_range(0.0..200.0);

            let cluster = BlockCluster::new(
                Vector3D::planar(cx0, cy0),
                Vector3D::planar(cx1, cy1),
                0,
                avg_blocks,
            );
            let nest = Nest {
                extent: ArenaExtent::new(Vector3D::planar(nw, nh), Vector3D::planar(nx, ny)),
            };

            let pieces = decompose_around_nest(&cluster, &nest);
            let area: f64 = pieces.iter().map(|p| p.extent.area()).sum();
            let blocks: f64 = pieces.iter().map(|p| p.avg_blocks).sum();
            let expected_area = cluster.extent.area() - nest.extent.area();

            assert!((area - expected_area).abs() < 1e-9 * expected_area.max(1.0));
            assert!((blocks - avg_blocks).abs() < 1e-9 * avg_blocks.max(1.0));

            // Pieces do not overlap each other or the nest
            for (i, a) in pieces.iter().enumerate() {
                let center = a.extent.center();
                assert!(!nest.extent.contains(center) || a.extent.area() == 0.0);
                for b in pieces.iter().skip(i + 1) {
                    let ox = (a.extent.ur().x.min(b.extent.ur().x)
                        - a.extent.ll().x.max(b.extent.ll().x))
                    .max(0.0);
                    let oy = (a.extent.ur().y.min(b.extent.ur().y)
                        - a.extent.ll().y.max(b.extent.ll().y))
                    .max(0.0);
                    assert!(ox * oy < 1e-9);
                }
            }
        }
    }
}
