use crw_rust::crw_quadrature::Quadrature;
use crw_rust::{BlockCluster, BlockClusterSet, BlockDistribution, ExpectedAcqDist, Nest, ScenarioSpec, Vector3D};
use std::time::Instant;

/// Benchmark expected acquisition distance over growing cluster counts
fn main() {
    std::env::set_var("RUST_LOG", "error");
    let _ = simple_logger::init();

    println!("\n=== Expected Acquisition Distance Benchmark ===\n");

    let scenarios = vec![
        ("SS.32x16x2", BlockDistribution::SingleSource),
        ("DS.32x16x2", BlockDistribution::DualSource),
        ("RN.32x32x2", BlockDistribution::Random),
        ("PL.32x32x2", BlockDistribution::PowerLaw),
    ];
    let cluster_counts = [1, 4, 16];
    let limits = [50, 100, 200];

    println!("{:<14} {:>9} {:>7} {:>12} {:>14}",
             "Scenario", "Clusters", "Limit", "Time (ms)", "E[dist] (m)");
    println!("{}", "-".repeat(60));

    for (input, dist) in &scenarios {
        let spec = match ScenarioSpec::parse(input) {
            Ok(spec) => spec,
            Err(e) => {
                eprintln!("{}: {}", input, e);
                continue;
            }
        };
        let nest = Nest::for_scenario(&spec);

        for &n_clusters in &cluster_counts {
            let clusters = clusters_along_edge(spec.arena_x, spec.arena_y, n_clusters);
            for &limit in &limits {
                let q = Quadrature::with_limit(limit);

                let samples = 3;
                let mut total_time = 0.0;
                let mut result = f64::NAN;
                for _ in 0..samples {
                    let start = Instant::now();
                    result = ExpectedAcqDist::for_clusters(*dist, &nest, &clusters, &q).unwrap_or(f64::NAN);
                    total_time += start.elapsed().as_secs_f64();
                }

                println!("{:<14} {:>9} {:>7} {:>12.2} {:>14.4}",
                         input, n_clusters, limit, total_time / samples as f64 * 1000.0, result);
            }
        }
    }

    println!("\n{}", "=".repeat(60));
}

/// `n` equal clusters in a 2m strip along the right edge of the arena
fn clusters_along_edge(arena_x: f64, arena_y: f64, n: usize) -> BlockClusterSet {
    let height = arena_y / n as f64;
    let clusters = (0..n)
        .map(|i| {
            let ll = Vector3D::planar(arena_x - 3.0, height * i as f64);
            let ur = Vector3D::planar(arena_x - 1.0, height * (i + 1) as f64);
            BlockCluster::new(ll, ur, i, 20.0)
        })
        .collect();
    BlockClusterSet::from_clusters(clusters)
}
