//! Image saving utilities.

use std::path::Path;

use image::{imageops, imageops::FilterType, Rgb, RgbImage};

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Save a tensor as an image file.
///
/// The tensor is:
/// 1. Clamped from [0, 1] to [0, 255]
/// 2. Resized to the original dimensions if provided
/// 3. Saved to the specified path (format inferred from extension)
///
/// # Errors
///
/// Returns an error if the tensor is not an RGB NCHW tensor or the image
/// cannot be saved.
pub fn save_image<P: AsRef<Path>>(
    tensor: &ImageTensor,
    path: P,
    original_dims: Option<(u32, u32)>,
) -> Result<()> {
    let path = path.as_ref();

    let img = tensor_to_image(tensor)?;

    let final_img = match original_dims {
        Some((width, height)) if (width, height) != img.dimensions() => {
            imageops::resize(&img, width, height, FilterType::CatmullRom)
        }
        _ => img,
    };

    tracing::debug!(
        "Writing {}x{} image to {}",
        final_img.width(),
        final_img.height(),
        path.display()
    );

    final_img.save(path).map_err(|source| Error::ImageSave {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert an NCHW tensor with values in [0, 1] to an RGB image.
///
/// Only the first batch entry is used.
///
/// # Errors
///
/// Returns an error if the tensor does not have three channels.
#[allow(clippy::cast_possible_truncation)]
pub fn tensor_to_image(tensor: &ImageTensor) -> Result<RgbImage> {
    let (batch, channels, height, width) = tensor.dim();
    if batch == 0 || channels != RGB_CHANNELS {
        return Err(Error::ShapeMismatch {
            expected: format!("(1, {RGB_CHANNELS}, H, W)"),
            actual: format!("{:?}", tensor.shape()),
        });
    }

    // Safe: width and height come from an image or were checked by the caller
    let img = RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([
            denormalize(tensor[[0, 0, y, x]]),
            denormalize(tensor[[0, 1, y, x]]),
            denormalize(tensor[[0, 2, y, x]]),
        ])
    });

    Ok(img)
}

/// Denormalize a value from [0, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
