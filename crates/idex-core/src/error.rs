//! Error types for the idex-core library.
//!
//! Missing detections and unmatched fields are not errors: extractors report
//! them as absent values in the field mapping. The types here cover failures
//! of the external services and of the surrounding I/O.

use thiserror::Error;

/// Main error type for the idex library.
#[derive(Error, Debug)]
pub enum IdexError {
    /// OCR service error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// MRZ parser error.
    #[error("MRZ error: {0}")]
    Mrz(#[from] MrzError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by an OCR service.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Detection or recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Captured OCR output could not be parsed.
    #[error("failed to parse OCR output: {0}")]
    Parse(String),
}

/// Errors raised by an MRZ parser.
///
/// "No MRZ found" is not an error; readers return `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum MrzError {
    /// The parser could not be reached or run.
    #[error("MRZ parser unavailable: {0}")]
    Unavailable(String),

    /// The parser answered with something that is not a field dictionary.
    #[error("failed to parse MRZ result: {0}")]
    Parse(String),
}

/// Result type for the idex library.
pub type Result<T> = std::result::Result<T, IdexError>;
