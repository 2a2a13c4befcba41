use crate::errors::EvalError;
use clap::Parser;
use std::path::PathBuf;
use tch::Device;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cam_eval",
    about = "Evaluate a CAM-producing classifier on a labelled image folder"
)]
pub struct Args {
    /// Image folder root, one sub-directory per class.
    #[arg(long)]
    pub data_dir: PathBuf,
    /// TorchScript checkpoint returning (aux, logits, cam).
    #[arg(long)]
    pub checkpoint: PathBuf,
    /// Shorter-side resize target.
    #[arg(long, default_value_t = 400)]
    pub input_size: u32,
    /// Positive-class probability threshold.
    #[arg(long, default_value_t = 0.5)]
    pub threshold: f64,
    /// Cutoff applied to the rescaled activation map.
    #[arg(long, default_value_t = 0.37)]
    pub segmentation_threshold: f64,
    /// Directory receiving `<stem>_pred.png` masks.
    #[arg(long, default_value = "test_pred")]
    pub pred_dir: PathBuf,
    /// Where to write the (cam, path) list.
    #[arg(long, default_value = "CAM_list.json")]
    pub cam_list: PathBuf,
    /// Optional JSON file for confusion counts and metrics.
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,
    /// Run on CPU even if CUDA is available.
    #[arg(long)]
    pub cpu: bool,
}

impl Args {
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.input_size == 0 {
            return Err(EvalError::Config("input size must be positive".into()));
        }
        for (name, value) in [
            ("threshold", self.threshold),
            ("segmentation threshold", self.segmentation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EvalError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn device(&self) -> Device {
        if self.cpu {
            Device::Cpu
        } else {
            Device::cuda_if_available()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["cam_eval", "--data-dir", "data", "--checkpoint", "m.pt"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.input_size, 400);
        assert_eq!(args.threshold, 0.5);
        assert_eq!(args.segmentation_threshold, 0.37);
        assert_eq!(args.pred_dir, PathBuf::from("test_pred"));
        assert_eq!(args.cam_list, PathBuf::from("CAM_list.json"));
        assert!(args.metrics_out.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert!(parse(&["--threshold", "1.5"]).validate().is_err());
        assert!(parse(&["--segmentation-threshold", "1.2"]).validate().is_err());
        assert!(parse(&["--input-size", "0"]).validate().is_err());
    }

    #[test]
    fn cpu_flag_forces_cpu() {
        assert_eq!(parse(&["--cpu"]).device(), Device::Cpu);
    }

    #[test]
    fn missing_required_args() {
        assert!(Args::try_parse_from(["cam_eval", "--data-dir", "data"]).is_err());
    }
}
