//! Style-transfer input preparation.

mod initial;
mod params;
mod tensors;

pub use initial::{get_initial_image, HybridWeights, InitialImage, CUSTOM_NOISE_SCALE};
pub use params::Params;
pub use tensors::{get_image_tensors, ImageTensors};
