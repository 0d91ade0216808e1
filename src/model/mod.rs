//! Pretrained feature extractor and its input normalization.

mod device;
mod loader;

pub use device::Device;
pub use loader::{ModelCache, VGG19_FEATURES_FILE};

use std::path::{Path, PathBuf};

use ndarray::{ArrayD, Axis, IxDyn};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::image::{ImageTensor, RGB_CHANNELS};

/// Per-channel ImageNet mean the network was trained with.
pub const IMAGENET_MEAN: [f32; RGB_CHANNELS] = [0.485, 0.456, 0.406];

/// Per-channel ImageNet standard deviation the network was trained with.
pub const IMAGENET_STD: [f32; RGB_CHANNELS] = [0.229, 0.224, 0.225];

/// An inference-only convolutional network.
///
/// ONNX Runtime sessions carry no trainable state, so the weights can never
/// change once loaded.
pub struct FeatureExtractor {
    session: Session,
    device: Device,
}

impl FeatureExtractor {
    /// The device the session was created for.
    #[must_use]
    pub const fn device(&self) -> Device {
        self.device
    }

    /// Run the network on an already normalized NCHW tensor and return its
    /// first output.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the network has no output.
    pub fn forward(&mut self, input: &ImageTensor) -> Result<ArrayD<f32>> {
        let input_value =
            Tensor::from_array(input.clone()).map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|source| Error::Inference { source })?;

        let output = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ShapeMismatch {
                expected: "feature map output".to_string(),
                actual: "no output".to_string(),
            })?;

        extract_array(&output)
    }
}

/// The frozen network together with its normalization constants.
pub struct ModelBundle {
    /// Feature extractor.
    pub network: FeatureExtractor,
    /// Per-channel mean.
    pub mean: [f32; RGB_CHANNELS],
    /// Per-channel standard deviation.
    pub std: [f32; RGB_CHANNELS],
}

impl ModelBundle {
    /// Normalize an image tensor with this bundle's mean and std.
    #[must_use]
    pub fn normalize(&self, image: &ImageTensor) -> ImageTensor {
        normalize(image, &self.mean, &self.std)
    }

    /// Normalize `image` and compute its feature maps.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn features(&mut self, image: &ImageTensor) -> Result<ArrayD<f32>> {
        let input = self.normalize(image);
        self.network.forward(&input)
    }
}

/// Load the pretrained VGG-19 feature extractor on `device`.
///
/// The model is read from [`VGG19_FEATURES_FILE`] in the platform cache
/// directory.
///
/// # Errors
///
/// Returns an error if the model is missing, cannot be loaded, or is not a
/// convolutional feature extractor.
pub fn get_cnn_model(device: Device) -> Result<ModelBundle> {
    let cache = ModelCache::new()?;
    load_bundle(&cache.default_model_path(), device)
}

/// Load a feature extractor exported to ONNX from a URL or a local path.
///
/// URLs are downloaded into the platform cache on first use.
///
/// # Errors
///
/// Returns an error if the model cannot be downloaded or loaded, or is not a
/// convolutional feature extractor.
pub fn get_cnn_model_from(source: &str, device: Device) -> Result<ModelBundle> {
    let path = if source.starts_with("http") {
        ModelCache::new()?.get_model_path(source)?
    } else {
        PathBuf::from(source)
    };

    load_bundle(&path, device)
}

fn load_bundle(path: &Path, device: Device) -> Result<ModelBundle> {
    if !path.exists() {
        return Err(Error::ModelMissing {
            path: path.to_path_buf(),
        });
    }

    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    tracing::info!("Loading feature extractor {name} on {device}");

    let builder = Session::builder().map_err(|source| Error::ModelLoad {
        name: name.clone(),
        source,
    })?;

    let session = device
        .configure(builder)
        .map_err(|source| Error::ModelLoad {
            name: name.clone(),
            source,
        })?
        .commit_from_file(path)
        .map_err(|source| Error::ModelLoad {
            name: name.clone(),
            source,
        })?;

    check_signature(&session, &name)?;

    Ok(ModelBundle {
        network: FeatureExtractor { session, device },
        mean: IMAGENET_MEAN,
        std: IMAGENET_STD,
    })
}

/// Reject sessions that do not map an image of any size to feature maps.
fn check_signature(session: &Session, name: &str) -> Result<()> {
    let input = session
        .inputs
        .first()
        .and_then(|input| input.input_type.tensor_shape())
        .ok_or_else(|| Error::UnsupportedModel {
            name: name.to_string(),
            reason: "first input is not a tensor".to_string(),
        })?;
    check_input_dims(input).map_err(|reason| Error::UnsupportedModel {
        name: name.to_string(),
        reason,
    })?;

    let output = session
        .outputs
        .first()
        .and_then(|output| output.output_type.tensor_shape())
        .ok_or_else(|| Error::UnsupportedModel {
            name: name.to_string(),
            reason: "first output is not a tensor".to_string(),
        })?;
    check_output_dims(output).map_err(|reason| Error::UnsupportedModel {
        name: name.to_string(),
        reason,
    })
}

/// The input must be NCHW with three channels and free height and width.
/// Negative dimensions are dynamic.
fn check_input_dims(dims: &[i64]) -> std::result::Result<(), String> {
    match dims {
        [_, channels, height, width] => {
            if *channels >= 0 && *channels != 3 {
                Err(format!("input has {channels} channels, expected 3"))
            } else if *height >= 0 || *width >= 0 {
                Err(format!(
                    "input size is fixed at {height}x{width}, height and width must be dynamic"
                ))
            } else {
                Ok(())
            }
        }
        _ => Err(format!("input shape {dims:?} is not NCHW")),
    }
}

/// Feature maps are NCHW; anything else means a classifier head is attached.
fn check_output_dims(dims: &[i64]) -> std::result::Result<(), String> {
    if dims.len() == 4 {
        Ok(())
    } else {
        Err(format!(
            "output shape {dims:?} is not a feature map, export only the convolutional layers"
        ))
    }
}

/// Apply `(x - mean[c]) / std[c]` to every channel of an NCHW tensor.
fn normalize(
    image: &ImageTensor,
    mean: &[f32; RGB_CHANNELS],
    std: &[f32; RGB_CHANNELS],
) -> ImageTensor {
    let mut normalized = image.clone();

    for ((mut channel, &m), &s) in normalized.axis_iter_mut(Axis(1)).zip(mean).zip(std) {
        channel.mapv_inplace(|v| (v - m) / s);
    }

    normalized
}

/// Extract an array of any rank from an ONNX value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn extract_array(value: &ort::value::ValueRef<'_>) -> Result<ArrayD<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    // Safe: tensor dimensions are always non-negative and within bounds
    let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

    ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|_| Error::ShapeMismatch {
        expected: format!("{dims:?}"),
        actual: format!("{} elements", data.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn test_imagenet_constants() {
        assert_eq!(IMAGENET_MEAN, [0.485, 0.456, 0.406]);
        assert_eq!(IMAGENET_STD, [0.229, 0.224, 0.225]);
    }

    #[test]
    fn test_normalize_per_channel() {
        let image = Array4::<f32>::from_elem((1, 3, 2, 2), 0.5);
        let normalized = normalize(&image, &IMAGENET_MEAN, &IMAGENET_STD);

        for c in 0..RGB_CHANNELS {
            let expected = (0.5 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            for value in normalized.index_axis(Axis(1), c) {
                assert!((value - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_normalize_leaves_input_untouched() {
        let image = Array4::<f32>::ones((1, 3, 1, 1));
        let _ = normalize(&image, &IMAGENET_MEAN, &IMAGENET_STD);

        assert!(image.iter().all(|&v| (v - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_dynamic_input_accepted() {
        assert!(check_input_dims(&[1, 3, -1, -1]).is_ok());
        assert!(check_input_dims(&[-1, -1, -1, -1]).is_ok());
    }

    #[test]
    fn test_fixed_size_input_rejected() {
        let err = check_input_dims(&[1, 3, 224, 224]).unwrap_err();
        assert!(err.contains("224x224"));
        assert!(check_input_dims(&[1, 3, -1, 224]).is_err());
    }

    #[test]
    fn test_bad_input_layout_rejected() {
        assert!(check_input_dims(&[1, 1, -1, -1]).is_err());
        assert!(check_input_dims(&[3, -1, -1]).is_err());
    }

    #[test]
    fn test_classifier_output_rejected() {
        assert!(check_output_dims(&[1, 1000]).is_err());
        assert!(check_output_dims(&[1, 512, -1, -1]).is_ok());
    }

    #[test]
    fn test_missing_local_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(VGG19_FEATURES_FILE);

        let err = get_cnn_model_from(path.to_str().unwrap(), Device::Cpu)
            .err()
            .unwrap();

        assert!(matches!(err, Error::ModelMissing { path: missing } if missing == path));
    }
}
