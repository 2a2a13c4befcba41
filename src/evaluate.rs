use crate::cam;
use crate::dataset::ImageFolder;
use crate::errors::EvalError;
use crate::metrics::ConfusionStats;
use crate::model::CamModel;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tch::{Device, Kind, Tensor};
use tracing::{debug, info};

const POSITIVE_CLASS: i64 = 1;
const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub threshold: f64,
    pub segmentation_threshold: f64,
    pub pred_dir: PathBuf,
}

/// Activation map kept for one image; all zeros when predicted negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CamEntry {
    pub path: PathBuf,
    pub cam: Vec<Vec<f32>>,
}

#[derive(Debug)]
pub struct EvalReport {
    pub stats: ConfusionStats,
    pub metric_value: f64,
    pub cam_list: Vec<CamEntry>,
}

/// Runs the model over every sample once, writing a mask PNG for each
/// positive prediction and collecting confusion counts.
pub fn evaluate<M: CamModel>(
    model: &M,
    dataset: &ImageFolder,
    options: &EvalOptions,
) -> Result<EvalReport, EvalError> {
    fs::create_dir_all(&options.pred_dir)?;

    let progress = ProgressBar::new(dataset.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut stats = ConfusionStats::default();
    let mut cam_list = Vec::with_capacity(dataset.len());
    for index in 0..dataset.len() {
        let (image, label, path) = dataset.get(index)?;
        let input = image.unsqueeze(0).to_device(model.device());
        let output = tch::no_grad(|| model.forward_cam(&input))?;

        let prob = positive_probability(&output.logits)?;
        let predicted = prob >= options.threshold;
        let cam = output.cam.squeeze_dim(0).to_device(Device::Cpu);

        if predicted {
            let mask = cam::threshold_mask(&cam, options.segmentation_threshold);
            cam::write_mask(&mask, &cam::mask_path(&options.pred_dir, path))?;
            cam_list.push(CamEntry {
                path: path.to_path_buf(),
                cam: cam::to_rows(&cam)?,
            });
        } else {
            cam_list.push(CamEntry {
                path: path.to_path_buf(),
                cam: cam::to_rows(&cam.zeros_like())?,
            });
        }

        stats.record(predicted, label == POSITIVE_CLASS);
        debug!(
            path = %path.display(),
            label,
            prob,
            predicted,
            "evaluated sample"
        );
        progress.inc(1);
    }
    progress.finish_and_clear();
    info!("evaluated {} images", dataset.len());

    Ok(EvalReport {
        metric_value: stats.accuracy(),
        stats,
        cam_list,
    })
}

/// Softmax probability of the positive class for a single-sample batch.
pub fn positive_probability(logits: &Tensor) -> Result<f64, EvalError> {
    match logits.size().as_slice() {
        [1, classes] if *classes > POSITIVE_CLASS => {}
        other => {
            return Err(EvalError::ModelOutput(format!(
                "expected logits of shape [1, 2], got {other:?}"
            )))
        }
    }
    let prob = logits
        .to_device(Device::Cpu)
        .softmax(1, Kind::Float)
        .double_value(&[0, POSITIVE_CLASS]);
    Ok(prob)
}
