use crate::errors::EvalError;
use std::fmt;
use std::path::Path;
use tch::{CModule, Device, IValue, Tensor};

/// Classifier logits `[N, 2]` and class-activation map `[N, h, w]`.
#[derive(Debug)]
pub struct CamOutput {
    pub logits: Tensor,
    pub cam: Tensor,
}

/// A model that classifies an image batch and reports where it looked.
pub trait CamModel {
    fn device(&self) -> Device;
    fn forward_cam(&self, input: &Tensor) -> Result<CamOutput, EvalError>;
}

/// TorchScript export of the segmentation network. Its `forward(x, testing)`
/// returns `(aux, logits, cam)` when `testing` is true.
pub struct TorchScriptModel {
    module: CModule,
    device: Device,
}

impl fmt::Display for TorchScriptModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TorchScriptModel on {:?}", self.device)
    }
}

impl TorchScriptModel {
    pub fn load<P: AsRef<Path>>(path: P, device: Device) -> Result<TorchScriptModel, EvalError> {
        let path = path.as_ref();
        let mut module =
            CModule::load_on_device(path, device).map_err(|source| EvalError::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;
        module.set_eval();
        Ok(TorchScriptModel { module, device })
    }
}

impl CamModel for TorchScriptModel {
    fn device(&self) -> Device {
        self.device
    }

    fn forward_cam(&self, input: &Tensor) -> Result<CamOutput, EvalError> {
        let inputs = [IValue::Tensor(input.shallow_clone()), IValue::Bool(true)];
        let output = tch::no_grad(|| self.module.forward_is(&inputs))?;
        split_outputs(output)
    }
}

/// Unpacks the `(aux, logits, cam)` tuple, dropping the auxiliary output.
pub fn split_outputs(output: IValue) -> Result<CamOutput, EvalError> {
    let items = match output {
        IValue::Tuple(items) | IValue::GenericList(items) => items,
        other => {
            return Err(EvalError::ModelOutput(format!(
                "expected a tuple, got {other:?}"
            )))
        }
    };
    if items.len() != 3 {
        return Err(EvalError::ModelOutput(format!(
            "expected 3 outputs, got {}",
            items.len()
        )));
    }

    let mut tensors = items.into_iter().skip(1).map(|item| match item {
        IValue::Tensor(t) => Ok(t),
        other => Err(EvalError::ModelOutput(format!(
            "expected a tensor, got {other:?}"
        ))),
    });
    let logits = tensors.next().ok_or_else(|| missing("logits"))??;
    let cam = tensors.next().ok_or_else(|| missing("cam"))??;
    Ok(CamOutput { logits, cam })
}

fn missing(name: &str) -> EvalError {
    EvalError::ModelOutput(format!("missing {name} output"))
}
