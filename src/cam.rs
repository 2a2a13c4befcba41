use crate::errors::EvalError;
use image::GrayImage;
use std::path::{Path, PathBuf};
use tch::{Device, Kind, Tensor};

/// Rescales a class-activation map to [0, 1].
///
/// Returns `None` when the map is flat or holds non-finite values, since
/// the min-max range is undefined there.
pub fn rescale(cam: &Tensor) -> Option<Tensor> {
    let cam = cam.to_kind(Kind::Float);
    let min = cam.min().double_value(&[]);
    let max = cam.max().double_value(&[]);
    if !min.is_finite() || !max.is_finite() || max <= min {
        return None;
    }
    Some((cam - min) / (max - min))
}

/// Binary mask with 255 where the rescaled map exceeds `threshold`, 0 elsewhere.
pub fn threshold_mask(cam: &Tensor, threshold: f64) -> Tensor {
    match rescale(cam) {
        Some(rescaled) => {
            (rescaled.gt(threshold).to_kind(Kind::Float) * 255.0).to_kind(Kind::Uint8)
        }
        None => Tensor::zeros(cam.size(), (Kind::Uint8, cam.device())),
    }
}

/// `<pred_dir>/<stem>_pred.png`, stem being the file name up to its first dot.
pub fn mask_path(pred_dir: &Path, image_path: &Path) -> PathBuf {
    let name = image_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    pred_dir.join(format!("{stem}_pred.png"))
}

/// Writes a `[h, w]` (or `[1, h, w]`) u8 mask as a grayscale PNG.
pub fn write_mask(mask: &Tensor, path: &Path) -> Result<(), EvalError> {
    let mask = mask.to_device(Device::Cpu).to_kind(Kind::Uint8);
    let (height, width) = match mask.size().as_slice() {
        [h, w] | [1, h, w] => (*h, *w),
        other => {
            return Err(EvalError::ModelOutput(format!(
                "activation map must be 2-d, got shape {other:?}"
            )))
        }
    };
    let pixels = Vec::<u8>::try_from(&mask.flatten(0, -1))?;
    let image = GrayImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        EvalError::ModelOutput(format!("mask buffer does not fit {width}x{height}"))
    })?;
    image.save(path).map_err(|source| EvalError::MaskWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Copies a `[h, w]` map into nested rows.
pub fn to_rows(cam: &Tensor) -> Result<Vec<Vec<f32>>, EvalError> {
    let cam = cam.to_device(Device::Cpu).to_kind(Kind::Float);
    let width = match cam.size().as_slice() {
        [_, w] => *w as usize,
        other => {
            return Err(EvalError::ModelOutput(format!(
                "activation map must be 2-d, got shape {other:?}"
            )))
        }
    };
    let values = Vec::<f32>::try_from(&cam.flatten(0, -1))?;
    if width == 0 {
        return Ok(Vec::new());
    }
    Ok(values.chunks(width).map(|row| row.to_vec()).collect())
}
