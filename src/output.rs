use crate::evaluate::{CamEntry, EvalReport};
use crate::metrics::MetricsSummary;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Writes the `(cam, path)` list as a JSON array.
pub fn write_cam_list(cam_list: &[CamEntry], path: &Path) -> Result<()> {
    write_json(cam_list, path)
}

pub fn write_metrics(summary: &MetricsSummary, path: &Path) -> Result<()> {
    write_json(summary, path)
}

/// Human-readable report lines, in the order they are printed.
pub fn report_lines(report: &EvalReport) -> Vec<String> {
    let stats = &report.stats;
    vec![
        format!("metric value: {}", report.metric_value),
        format!("precision: {:.4}", stats.precision()),
        format!("recall: {:.4}", stats.recall()),
        format!(
            "TP: {} FP: {} TN: {} FN: {}",
            stats.tp, stats.fp, stats.tn, stats.fn_
        ),
    ]
}
