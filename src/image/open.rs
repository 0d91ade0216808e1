//! Opening images from URLs or local paths.

use std::fmt;
use std::path::PathBuf;

use image::{DynamicImage, ImageError, ImageReader, RgbImage};

use crate::error::{Error, Result};

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Fetched with an HTTP(S) GET.
    Url(String),
    /// Read from the local filesystem.
    Path(PathBuf),
}

impl ImageSource {
    /// Classify a source string. Anything starting with `http` is a URL.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http") {
            Self::Url(source.to_string())
        } else {
            Self::Path(PathBuf::from(source))
        }
    }

    /// Whether the source lives on the local filesystem.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Path(_))
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Open an image from a URL or a local path and convert it to RGB.
///
/// Grayscale, palette and alpha images are all flattened to three channels.
/// The format is guessed from the content, not the file extension.
///
/// # Errors
///
/// Returns an error if the request fails, the server answers with a
/// non-success status, the file cannot be read, or the bytes cannot be
/// decoded.
pub fn open_image(source: &str) -> Result<RgbImage> {
    let img = match ImageSource::parse(source) {
        ImageSource::Url(url) => fetch_image(&url)?,
        ImageSource::Path(path) => read_image(path)?,
    };

    Ok(img.into_rgb8())
}

fn fetch_image(url: &str) -> Result<DynamicImage> {
    tracing::debug!("Fetching image from {url}");

    let bytes = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::bytes)
        .map_err(|source| Error::ImageFetch {
            url: url.to_string(),
            source,
        })?;

    image::load_from_memory(&bytes).map_err(|source| Error::ImageDecode {
        url: url.to_string(),
        source,
    })
}

fn read_image(path: PathBuf) -> Result<DynamicImage> {
    let decoded = ImageReader::open(&path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(ImageError::IoError)
        .and_then(ImageReader::decode);

    decoded.map_err(|source| Error::ImageLoad { path, source })
}
