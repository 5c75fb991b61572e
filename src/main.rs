use std::path::PathBuf;

use anyhow::Result;

use fpl_pipeline::config::PipelineConfig;
use fpl_pipeline::pipeline::{EpThisPredictions, FilePredictions, Pipeline, PredictionSource};
use fpl_pipeline::provider::FplProvider;
use fpl_pipeline::snapshot::SnapshotStore;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let data_dir = parse_value_arg(&args, "--data-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    let target_gameweek = parse_value_arg(&args, "--gameweek").and_then(|val| val.parse().ok());
    let preds_path = parse_value_arg(&args, "--preds").map(PathBuf::from);

    let provider = FplProvider::new()?;
    let store = SnapshotStore::new(&data_dir);
    let config = PipelineConfig::from_env();
    let pipeline = Pipeline::new(&provider, &store, config);

    let file_preds = preds_path.map(FilePredictions::new);
    let ep_this = EpThisPredictions::new(&store);
    let predictions: &dyn PredictionSource = match &file_preds {
        Some(source) => source,
        None => &ep_this,
    };

    let summary = pipeline.run(target_gameweek, predictions)?;

    println!("Pipeline run complete for gameweek {}", summary.gameweek);
    println!("Data dir: {}", store.root().display());
    println!(
        "Catalog: {} players, {} clubs, {} fixtures",
        summary.players, summary.clubs, summary.fixtures
    );
    println!(
        "Managers sampled: {} ({} failed), template pool {}",
        summary.sampled_managers, summary.failed_managers, summary.template_pool
    );
    match summary.ownership_objective {
        Some(objective) => println!("Template squad objective: {objective:.2}"),
        None => println!("Template squad: not produced"),
    }
    match summary.prediction_objective {
        Some(objective) => println!("AI squad objective: {objective:.2}"),
        None => println!("AI squad: not produced"),
    }
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}

fn parse_value_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
