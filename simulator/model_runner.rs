// Model Runner - Run foraging models over a collated batch
//
// Usage:
//   cargo run --bin model_runner batches/ss_pop_sweep.yaml
//   cargo run --bin model_runner batches/  (runs all .yaml files in directory)
//
// Intra-experiment models write `<model_root>/<exp>/<stem>.model` plus a
// `.legend` file; inter-experiment models write `<model_root>/<stem>.model`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

use crw_rust::crw_config::load_yaml;
use crw_rust::crw_model_error::SeriesL1Error;
use crw_rust::crw_stats::{write_legend, write_series};
use crw_rust::{
    registry, BatchContext, BatchCriteria, MainConfig, ModelConfig, ModelError, ModelResult,
    PopulationSizeCriteria, ScenarioSpec,
};

/// Batch description file format
#[derive(Debug, serde::Deserialize)]
struct BatchFile {
    scenario: String,
    output_root: PathBuf,
    stat_root: PathBuf,
    model_root: PathBuf,

    /// Swarm size of each experiment
    populations: Vec<usize>,

    /// Experiment directory names; `exp0`, `exp1`, ... when omitted
    #[serde(default)]
    exp_names: Option<Vec<String>>,

    #[serde(default)]
    intra_models: Vec<String>,

    #[serde(default)]
    inter_models: Vec<String>,

    #[serde(default)]
    errors: Vec<ErrorSpec>,

    #[serde(default)]
    model_config: ModelConfig,

    #[serde(default)]
    main_config: MainConfig,
}

/// Compare one intra-experiment model output against a data column
#[derive(Debug, serde::Deserialize)]
struct ErrorSpec {
    model: String,
    #[serde(default)]
    series: usize,
    data_stem: String,
    data_col: String,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <batch.yaml | directory/> [--log-level LEVEL]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} batches/ss_pop_sweep.yaml", args[0]);
        eprintln!("  {} batches/ --log-level debug", args[0]);
        std::process::exit(1);
    }

    let level = if args.len() >= 4 && args[2] == "--log-level" {
        LevelFilter::from_str(&args[3]).unwrap_or_else(|_| {
            eprintln!("Invalid log level: {}", args[3]);
            std::process::exit(1);
        })
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init().unwrap();

    let path = Path::new(&args[1]);
    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        yaml_files(path)
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    };

    if files.is_empty() {
        eprintln!("No .yaml files found in {}", path.display());
        std::process::exit(1);
    }

    let mut failed = 0;
    for (i, file) in files.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, files.len(), file.display());
        if let Err(e) = run_batch_file(file) {
            eprintln!("Batch {} failed: {}", file.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!("\n{} of {} batch(es) failed", failed, files.len());
        std::process::exit(1);
    }
    println!("\n✓ All batches complete!\n");
}

fn yaml_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

fn run_batch_file(path: &Path) -> ModelResult<()> {
    let file: BatchFile = load_yaml(path)?;
    file.model_config.validate()?;

    let scenario = ScenarioSpec::parse(&file.scenario)?;
    let criteria = match file.exp_names {
        Some(names) => PopulationSizeCriteria::with_dirnames(file.populations, names)?,
        None => PopulationSizeCriteria::new(file.populations),
    };
    let batch = BatchContext::new(scenario, file.output_root, file.stat_root, file.model_root)
        .with_configs(file.model_config, file.main_config);

    println!("Configuration:");
    println!("  Scenario: {}", batch.scenario);
    println!("  Populations: {:?}", criteria.populations());
    println!("  Intra models: {}", file.intra_models.len());
    println!("  Inter models: {}", file.inter_models.len());
    println!("  Error measures: {}", file.errors.len());

    for name in &file.intra_models {
        run_intra(&batch, &criteria, name)?;
    }
    for name in &file.inter_models {
        run_inter(&batch, &criteria, name)?;
    }
    for spec in &file.errors {
        run_error(&batch, &criteria, spec)?;
    }
    Ok(())
}

fn run_intra(batch: &BatchContext, criteria: &dyn BatchCriteria, name: &str) -> ModelResult<()> {
    let model = registry::build_intra(name)?;
    let stems = model.target_csv_stems();
    let legends = model.legend_names();

    for exp_num in 0..criteria.n_exp() {
        if !model.run_for_exp(criteria, exp_num) {
            info!("{}: skipping experiment {}", name, exp_num);
            continue;
        }
        let ctx = batch.for_exp(criteria, exp_num)?;
        let outputs = model.run(&ctx, criteria)?;

        for ((stem, legend), series) in stems.iter().zip(&legends).zip(&outputs) {
            write_series(ctx.model_path(stem, ".model"), "model", series)?;
            write_legend(ctx.model_path(stem, ".legend"), legend)?;
        }
        info!("{}: wrote {} series for {}", name, outputs.len(), ctx.exp_name);
    }
    Ok(())
}

fn run_inter(batch: &BatchContext, criteria: &dyn BatchCriteria, name: &str) -> ModelResult<()> {
    let model = registry::build_inter(name)?;
    if !model.run_for_batch(criteria) {
        info!("{}: not applicable to this batch", name);
        return Ok(());
    }

    fs::create_dir_all(&batch.model_root).map_err(|e| ModelError::Io {
        path: batch.model_root.clone(),
        source: e,
    })?;

    let rows = model.run(batch, criteria)?;
    let sep = batch.main_config.separator;
    for ((stem, legend), row) in model
        .target_csv_stems()
        .iter()
        .zip(model.legend_names())
        .zip(&rows)
    {
        row.write(batch.model_root.join(format!("{}.model", stem)), sep)?;
        write_legend(batch.model_root.join(format!("{}.legend", stem)), legend)?;
        println!("  {} -> {}: {:?}", name, stem, row.values());
    }
    Ok(())
}

fn run_error(batch: &BatchContext, criteria: &dyn BatchCriteria, spec: &ErrorSpec) -> ModelResult<()> {
    let model = registry::build_intra(&spec.model)?;
    let measure = SeriesL1Error::new(model.as_ref(), spec.series, spec.data_stem.as_str(), spec.data_col.as_str());
    let row = measure.generate(batch, criteria)?;

    fs::create_dir_all(&batch.model_root).map_err(|e| ModelError::Io {
        path: batch.model_root.clone(),
        source: e,
    })?;
    let out = batch
        .model_root
        .join(format!("{}-{}-error.model", spec.model, spec.data_stem));
    row.write(&out, batch.main_config.separator)?;
    println!("  {} error vs {}: {:?}", spec.model, spec.data_stem, row.values());
    Ok(())
}
