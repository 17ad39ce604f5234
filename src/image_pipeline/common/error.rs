use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("FITS error in '{path}': {source}")]
    Fits {
        path: PathBuf,
        source: fitsio::errors::Error,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image dimensions: rows={0}, cols={1}")]
    InvalidDimensions(usize, usize),

    #[error("Invalid section '{0}'")]
    InvalidSection(String),

    #[error("Section {section} lies outside a {rows}x{cols} image")]
    SectionOutOfBounds {
        section: String,
        rows: usize,
        cols: usize,
    },

    #[error("Missing header keyword: {0}")]
    MissingKeyword(String),

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Nothing to process: {0}")]
    EmptySelection(String),

    #[error("Failed to encode TIFF preview: {0}")]
    EncodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CalibrationError {
    pub(crate) fn fits(path: impl Into<PathBuf>, source: fitsio::errors::Error) -> Self {
        Self::Fits {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
