use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid layer sizes, parameters or training settings
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// An input or target vector does not fit the declared layer size
    #[error("{what} shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("label {label} out of range for {classes} classes")]
    InvalidLabel { label: u8, classes: usize },

    /// The summed gradient of a batch contains NaN or infinity
    #[error("non-finite gradient in epoch {epoch}, batch {batch}")]
    NonFinite { epoch: usize, batch: usize },

    #[error("dataset file not found: {}", .0.display())]
    MissingData(PathBuf),
}
