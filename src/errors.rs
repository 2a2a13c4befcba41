use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("dataset root {0} is not a directory")]
    MissingRoot(PathBuf),
    #[error("no class directories found in {0}")]
    NoClasses(PathBuf),
    #[error("no images found in {0}")]
    NoImages(PathBuf),
    #[error("expected a binary dataset, found {0} classes: {1:?}")]
    NotBinary(usize, Vec<String>),
    #[error("sample index {index} out of range for {len} samples")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid image pattern")]
    Glob(#[from] globwalk::GlobError),
    #[error("error loading image {path}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("error writing mask {path}")]
    MaskWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("error loading model {path}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: tch::TchError,
    },
    #[error("unexpected model output: {0}")]
    ModelOutput(String),
    #[error(transparent)]
    Torch(#[from] tch::TchError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
