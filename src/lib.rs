//! # restyle
//!
//! Image and model preparation for neural style transfer.
//!
//! The crate loads a content and a style image (from disk or over HTTP),
//! resizes them to a working resolution, converts them to NCHW tensors and
//! builds the initial image an optimizer starts from. It also fetches a
//! pretrained VGG-19 feature extractor together with its ImageNet
//! normalization constants.
//!
//! ## Example
//!
//! ```no_run
//! use restyle::{get_image_tensors, get_initial_image, Params};
//!
//! # fn main() -> restyle::Result<()> {
//! let params = Params {
//!     content_image_path: "content.jpg".to_string(),
//!     style_image_path: "style.jpg".to_string(),
//!     image_width: 256,
//!     image_height: 256,
//!     ..Params::default()
//! };
//!
//! let tensors = get_image_tensors(&params)?;
//! let input = get_initial_image(&params, &tensors.content, &tensors.style)?;
//! assert_eq!(input.shape(), tensors.content.shape());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;

pub use error::{Error, Result};
pub use model::{get_cnn_model, Device, ModelBundle};
pub use pipeline::{
    get_image_tensors, get_initial_image, HybridWeights, ImageTensors, InitialImage, Params,
};
