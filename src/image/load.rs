//! Content and style image loading.

use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::Array4;

use crate::error::{Error, Result};
use crate::pipeline::Params;

use super::open::{open_image, ImageSource};
use super::{ImageTensor, RGB_CHANNELS};

/// Load the content image and resize it to the working resolution.
///
/// Returns the resized image together with its size before resizing, so the
/// final output can be restored to the original resolution.
///
/// The decoded image is written back to `content_image_path` when that path
/// is local.
///
/// # Errors
///
/// Returns an error if the image cannot be opened or written back.
pub fn load_content_image(params: &Params) -> Result<(RgbImage, (u32, u32))> {
    let content_image = open_image(&params.content_image_path)?;
    let original_size = content_image.dimensions();
    tracing::info!(
        "Original content image size: {}x{}",
        original_size.0,
        original_size.1
    );

    tracing::info!("Saving content image");
    write_back(&content_image, &params.content_image_path)?;

    tracing::info!("Resizing content image");
    let resized = resize_bicubic(&content_image, params.image_width, params.image_height);
    tracing::info!(
        "Resized content image size: {}x{}",
        resized.width(),
        resized.height()
    );

    Ok((resized, original_size))
}

/// Load the style image and resize it to the working resolution.
///
/// # Errors
///
/// Returns an error if the image cannot be opened or written back.
pub fn load_style_image(params: &Params) -> Result<RgbImage> {
    let style_image = open_image(&params.style_image_path)?;
    tracing::info!(
        "Style image size: {}x{}",
        style_image.width(),
        style_image.height()
    );

    tracing::info!("Saving style image");
    write_back(&style_image, &params.style_image_path)?;

    tracing::info!("Resizing style image");
    let resized = resize_bicubic(&style_image, params.image_width, params.image_height);
    tracing::info!(
        "Resized style image size: {}x{}",
        resized.width(),
        resized.height()
    );

    Ok(resized)
}

/// Resize to exactly `width` x `height` with bicubic resampling.
#[must_use]
pub fn resize_bicubic(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    imageops::resize(img, width, height, FilterType::CatmullRom)
}

/// Re-encode the decoded image over its source file.
fn write_back(img: &RgbImage, location: &str) -> Result<()> {
    match ImageSource::parse(location) {
        ImageSource::Path(path) => img
            .save(&path)
            .map_err(|source| Error::ImageSave { path, source }),
        ImageSource::Url(url) => {
            tracing::debug!("Not writing back remote image {url}");
            Ok(())
        }
    }
}

/// Convert an RGB image to an NCHW tensor of shape (1, 3, height, width)
/// with values in [0, 1].
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn image_to_tensor(img: &RgbImage) -> ImageTensor {
    let (width, height) = (img.width() as usize, img.height() as usize);

    // Safe: x and y are bounded by the image dimensions which fit in u32
    Array4::from_shape_fn((1, RGB_CHANNELS, height, width), |(_, c, y, x)| {
        f32::from(img.get_pixel(x as u32, y as u32)[c]) / 255.0
    })
}
