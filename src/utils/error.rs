//! Error Handling Module
//!
//! Defines the error type shared by every stage of the pipeline.
//! Every variant is fatal: nothing in the library retries, the caller decides
//! whether to abort.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for shadow-robustness training and evaluation
#[derive(Error, Debug)]
pub enum ShadowError {
    /// Missing or malformed setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// A class label has no shadow mask template registered
    #[error("No mask template registered for class label {0}")]
    UnregisteredLabel(usize),

    /// A label outside `0..class_count`
    #[error("Label {label} is out of range for {class_count} classes")]
    LabelOutOfRange { label: usize, class_count: usize },

    /// Data and label sequences of an archive are not index-aligned
    #[error("Archive has {data} images but {labels} labels")]
    DataMismatch { data: usize, labels: usize },

    /// A pixel buffer with the wrong number of bytes
    #[error("Image {index} has {actual} bytes, expected {expected}")]
    InvalidImage {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Required input file does not exist
    #[error("File not found: {0}")]
    MissingFile(PathBuf),

    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// A frame file whose stem is not an integer
    #[error("Frame file name '{0}' does not have a numeric stem")]
    InvalidFrameName(String),

    /// Malformed bounding-box annotation document
    #[error("Annotation error: {0}")]
    Annotation(String),

    /// Failure saving or restoring classifier parameters
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Tensor shape or data conversion failure
    #[error("Tensor error: {0}")]
    Tensor(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Convenience Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ShadowError>;

/// Extension trait for turning foreign errors into configuration errors
pub trait ResultExt<T> {
    /// Add context to an error, classifying it as a configuration error
    fn config_context(self, msg: &str) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn config_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| ShadowError::Config(format!("{}: {}", msg, e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn config_context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| ShadowError::Config(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShadowError::UnregisteredLabel(17);
        assert_eq!(
            format!("{}", err),
            "No mask template registered for class label 17"
        );
    }

    #[test]
    fn test_data_mismatch_display() {
        let err = ShadowError::DataMismatch { data: 3, labels: 2 };
        assert!(err.to_string().contains("3 images but 2 labels"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ShadowError = io_err.into();
        assert!(matches!(err, ShadowError::Io(_)));
    }

    #[test]
    fn test_option_context() {
        let opt: Option<i32> = None;
        let err = opt.config_context("value was None").unwrap_err();
        assert!(matches!(err, ShadowError::Config(_)));
    }
}
