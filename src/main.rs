mod cam;
mod config;
mod dataset;
mod errors;
mod evaluate;
mod metrics;
mod model;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use config::Args;
use dataset::ImageFolder;
use evaluate::EvalOptions;
use metrics::MetricsSummary;
use model::TorchScriptModel;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    args.validate()?;

    // Set up GPU
    let device = args.device();

    let dataset = ImageFolder::new(&args.data_dir, args.input_size)
        .with_context(|| format!("Failed to index {}", args.data_dir.display()))?;
    let positives = dataset.samples().iter().filter(|s| s.label == 1).count();
    info!(
        "Loaded {} images ({} positive) from {} (classes: {:?})",
        dataset.len(),
        positives,
        args.data_dir.display(),
        dataset.classes()
    );

    let model = TorchScriptModel::load(&args.checkpoint, device)?;
    info!("Loaded {} from {}", model, args.checkpoint.display());

    let options = EvalOptions {
        threshold: args.threshold,
        segmentation_threshold: args.segmentation_threshold,
        pred_dir: args.pred_dir.clone(),
    };
    let report = evaluate::evaluate(&model, &dataset, &options).context("Evaluation failed")?;

    for line in output::report_lines(&report) {
        println!("{}", line);
    }

    output::write_cam_list(&report.cam_list, &args.cam_list)?;
    info!(
        "Saved {} activation maps to {}",
        report.cam_list.len(),
        args.cam_list.display()
    );

    if let Some(path) = &args.metrics_out {
        output::write_metrics(&MetricsSummary::from(&report.stats), path)?;
        info!("Saved metrics to {}", path.display());
    }

    Ok(())
}
