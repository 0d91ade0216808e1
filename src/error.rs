//! Custom error types for restyle.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the restyle library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load an image file from disk.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to fetch an image over HTTP.
    #[error("failed to fetch image from {url}: {source}")]
    ImageFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Fetched bytes could not be decoded as an image.
    #[error("failed to decode image from {url}: {source}")]
    ImageDecode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to download a model.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// No model file where one was expected.
    #[error(
        "feature extractor not found at {path}; export torchvision's vgg19().features to ONNX \
         with dynamic height and width there, or pass a model URL or path"
    )]
    ModelMissing { path: PathBuf },

    /// The model does not have a feature extractor's inputs or outputs.
    #[error("model {name} is not a convolutional feature extractor: {reason}")]
    UnsupportedModel { name: String, reason: String },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// Failed to create cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a parameter file.
    #[error("failed to read parameters from {path}: {source}")]
    ParamsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a parameter file.
    #[error("failed to parse parameters from {path}: {source}")]
    Params {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Result type alias for restyle operations.
pub type Result<T> = std::result::Result<T, Error>;
