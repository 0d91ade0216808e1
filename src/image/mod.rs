//! Image acquisition, resizing, and tensor conversion.

mod load;
mod open;
mod save;

pub use load::{image_to_tensor, load_content_image, load_style_image, resize_bicubic};
pub use open::{open_image, ImageSource};
pub use save::{save_image, tensor_to_image};

use ndarray::Array4;

/// Image tensor in NCHW format (batch, channels, height, width).
/// Values are in the [0, 1] range.
pub type ImageTensor = Array4<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
