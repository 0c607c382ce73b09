use std::io;

use geotile_scene::DataType;

#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("unable to open {path}: {reason}")]
    OpenFailure { path: String, reason: String },
    #[error("datasets are not compatible: {0}")]
    IncompatibleInputs(String),
    #[error("unsupported band layout: {0}")]
    UnsupportedBandLayout(String),
    #[error("multiple input data types not supported: {0:?}")]
    TypeMismatch(Vec<DataType>),
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),
    #[error("band {index} out of range, dataset has {count} bands")]
    BandOutOfRange { index: usize, count: usize },
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("{0}")]
    Image(#[from] image::ImageError),
}

impl RasterError {
    pub(crate) fn open_failure(path: &str, reason: impl ToString) -> Self {
        RasterError::OpenFailure {
            path: path.to_owned(),
            reason: reason.to_string(),
        }
    }
}
