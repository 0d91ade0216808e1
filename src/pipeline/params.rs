//! Run parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::InitialImage;

/// Parameters for preparing a style-transfer run.
///
/// Missing keys in a parameter file take the [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Content image, URL or local path.
    pub content_image_path: String,

    /// Style image, URL or local path.
    pub style_image_path: String,

    /// Working width in pixels.
    pub image_width: u32,

    /// Working height in pixels.
    pub image_height: u32,

    /// Seed for every random draw made while building the initial image.
    pub random_seed: u64,

    /// `noise`, `content`, `style`, `hybrid`, or an image URL/path.
    pub input_image: String,

    /// Content weight in hybrid mode (0.0-1.0).
    pub hybrid_weight_content: f64,

    /// Style weight in hybrid mode (0.0-1.0).
    pub hybrid_weight_style: f64,

    /// ONNX feature extractor, URL or local path. `None` uses the cached
    /// VGG-19 export.
    pub model_url: Option<String>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            content_image_path: String::new(),
            style_image_path: String::new(),
            image_width: 512,
            image_height: 512,
            random_seed: 0,
            input_image: "noise".to_string(),
            hybrid_weight_content: 0.0,
            hybrid_weight_style: 0.0,
            model_url: None,
        }
    }
}

impl Params {
    /// Read parameters from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::ParamsRead {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| Error::Params {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the parameters.
    ///
    /// Hybrid weights are checked only when the hybrid initial image is
    /// built.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.content_image_path.is_empty() {
            return Err(Error::InvalidParameter {
                name: "content_image_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.style_image_path.is_empty() {
            return Err(Error::InvalidParameter {
                name: "style_image_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.image_width == 0 {
            return Err(Error::InvalidParameter {
                name: "image_width".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.image_height == 0 {
            return Err(Error::InvalidParameter {
                name: "image_height".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// The initial image mode selected by `input_image`.
    #[must_use]
    pub fn initial_image(&self) -> InitialImage {
        InitialImage::parse(&self.input_image)
    }
}
