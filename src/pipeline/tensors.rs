//! Content and style tensors for the optimizer.

use crate::error::Result;
use crate::image::{image_to_tensor, load_content_image, load_style_image, ImageTensor};

use super::Params;

/// Everything the optimizer needs from the input images.
#[derive(Debug, Clone)]
pub struct ImageTensors {
    /// Resized content image, (1, 3, height, width).
    pub content: ImageTensor,
    /// Resized style image, (1, 3, height, width).
    pub style: ImageTensor,
    /// Content image size before resizing, (width, height).
    pub original_content_size: (u32, u32),
}

/// Load the content and style images and convert them to tensors.
///
/// # Errors
///
/// Returns an error if the parameters are invalid or either image cannot be
/// loaded.
pub fn get_image_tensors(params: &Params) -> Result<ImageTensors> {
    params.validate()?;

    let (content_image, original_content_size) = load_content_image(params)?;
    let style_image = load_style_image(params)?;

    Ok(ImageTensors {
        content: image_to_tensor(&content_image),
        style: image_to_tensor(&style_image),
        original_content_size,
    })
}
