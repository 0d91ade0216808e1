//! Initial image construction for the style-transfer optimizer.

use ndarray::Array4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{Error, Result};
use crate::image::{image_to_tensor, open_image, resize_bicubic, ImageTensor, RGB_CHANNELS};

use super::Params;

/// Standard deviation of the noise added to a custom initial image.
pub const CUSTOM_NOISE_SCALE: f32 = 0.05;

/// What the optimizer starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialImage {
    /// Standard-normal noise.
    Noise,
    /// A copy of the content image.
    Content,
    /// A copy of the style image.
    Style,
    /// A weighted blend of noise, content and style.
    Hybrid,
    /// Another image (URL or path) with a little noise added.
    Custom(String),
}

impl InitialImage {
    /// Parse an `input_image` value. Unrecognized values name an image.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "noise" => Self::Noise,
            "content" => Self::Content,
            "style" => Self::Style,
            "hybrid" => Self::Hybrid,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Validated hybrid blend weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    content: f64,
    style: f64,
}

impl HybridWeights {
    /// Check that both weights lie in [0, 1] and leave a non-negative
    /// weight for noise.
    ///
    /// # Errors
    ///
    /// Returns an error if a weight is out of range or the weights sum to
    /// more than 1.
    pub fn new(content: f64, style: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&content) {
            return Err(Error::InvalidParameter {
                name: "hybrid_weight_content".to_string(),
                reason: format!("must be between 0.0 and 1.0, got {content}"),
            });
        }

        if !(0.0..=1.0).contains(&style) {
            return Err(Error::InvalidParameter {
                name: "hybrid_weight_style".to_string(),
                reason: format!("must be between 0.0 and 1.0, got {style}"),
            });
        }

        let weights = Self { content, style };
        if weights.noise() < 0.0 {
            return Err(Error::InvalidParameter {
                name: "hybrid_weight_content + hybrid_weight_style".to_string(),
                reason: format!("must not exceed 1.0, got {}", content + style),
            });
        }

        Ok(weights)
    }

    /// Content weight.
    #[must_use]
    pub const fn content(&self) -> f64 {
        self.content
    }

    /// Style weight.
    #[must_use]
    pub const fn style(&self) -> f64 {
        self.style
    }

    /// Whatever the content and style weights leave over.
    #[must_use]
    pub fn noise(&self) -> f64 {
        1.0 - (self.content + self.style)
    }
}

/// Build the image the optimizer starts from.
///
/// A generator seeded with `random_seed` is created before anything is
/// sampled, so identical parameters and inputs give identical output. The
/// result always has the content tensor's shape.
///
/// # Errors
///
/// Returns an error if the hybrid weights are invalid, the style tensor does
/// not match the content tensor, or a custom image cannot be opened.
pub fn get_initial_image(
    params: &Params,
    content: &ImageTensor,
    style: &ImageTensor,
) -> Result<ImageTensor> {
    let mut rng = StdRng::seed_from_u64(params.random_seed);

    let mode = params.initial_image();
    tracing::debug!("Building initial image: {mode:?}");

    match mode {
        InitialImage::Noise => Ok(standard_normal(content.dim(), &mut rng)),
        InitialImage::Content => Ok(content.clone()),
        InitialImage::Style => {
            check_same_shape(content, style)?;
            Ok(style.clone())
        }
        InitialImage::Hybrid => {
            let weights =
                HybridWeights::new(params.hybrid_weight_content, params.hybrid_weight_style)?;
            check_same_shape(content, style)?;
            let noise = standard_normal(content.dim(), &mut rng);
            Ok(blend(&weights, noise, content, style))
        }
        InitialImage::Custom(source) => custom_image(&source, content, &mut rng),
    }
}

/// `w_noise * noise + w_content * content + w_style * style`.
#[allow(clippy::cast_possible_truncation)]
fn blend(
    weights: &HybridWeights,
    noise: ImageTensor,
    content: &ImageTensor,
    style: &ImageTensor,
) -> ImageTensor {
    let mut blended = noise * weights.noise() as f32;
    blended.scaled_add(weights.content() as f32, content);
    blended.scaled_add(weights.style() as f32, style);
    blended
}

/// Open `source`, fit it to the content tensor and add a little noise.
#[allow(clippy::cast_possible_truncation)]
fn custom_image(source: &str, content: &ImageTensor, rng: &mut StdRng) -> Result<ImageTensor> {
    let (batch, channels, height, width) = content.dim();
    if batch != 1 || channels != RGB_CHANNELS {
        return Err(Error::ShapeMismatch {
            expected: format!("(1, {RGB_CHANNELS}, H, W)"),
            actual: format!("{:?}", content.shape()),
        });
    }

    tracing::info!("Using {source} as the initial image");
    let img = open_image(source)?;
    // Safe: height and width come from a tensor built from a u32-sized image
    let resized = resize_bicubic(&img, width as u32, height as u32);

    let mut tensor = image_to_tensor(&resized);
    let noise = standard_normal(tensor.dim(), rng);
    tensor.scaled_add(CUSTOM_NOISE_SCALE, &noise);

    Ok(tensor)
}

fn standard_normal(dim: (usize, usize, usize, usize), rng: &mut StdRng) -> ImageTensor {
    Array4::from_shape_simple_fn(dim, || rng.sample(StandardNormal))
}

fn check_same_shape(content: &ImageTensor, style: &ImageTensor) -> Result<()> {
    if content.shape() == style.shape() {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            expected: format!("{:?}", content.shape()),
            actual: format!("{:?}", style.shape()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const SHAPE: (usize, usize, usize, usize) = (1, 3, 64, 64);

    fn params(input_image: &str, seed: u64) -> Params {
        Params {
            input_image: input_image.to_string(),
            random_seed: seed,
            hybrid_weight_content: 0.3,
            hybrid_weight_style: 0.3,
            ..Params::default()
        }
    }

    fn inputs() -> (ImageTensor, ImageTensor) {
        let content = Array4::from_shape_fn(SHAPE, |(_, c, y, x)| {
            ((c * 31 + y * 7 + x) % 255) as f32 / 255.0
        });
        let style = Array4::from_shape_fn(SHAPE, |(_, c, y, x)| {
            ((c * 13 + y + x * 5) % 255) as f32 / 255.0
        });
        (content, style)
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!(InitialImage::parse("noise"), InitialImage::Noise);
        assert_eq!(InitialImage::parse("content"), InitialImage::Content);
        assert_eq!(InitialImage::parse("style"), InitialImage::Style);
        assert_eq!(InitialImage::parse("hybrid"), InitialImage::Hybrid);
        assert_eq!(
            InitialImage::parse("start.png"),
            InitialImage::Custom("start.png".to_string())
        );
    }

    #[test]
    fn test_hybrid_weights_exceeding_one_fail() {
        assert!(matches!(
            HybridWeights::new(0.6, 0.5),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_hybrid_weights_leave_noise() {
        let weights = HybridWeights::new(0.3, 0.3).unwrap();
        assert_eq!(weights.noise(), 0.4);
    }

    #[test]
    fn test_hybrid_weights_out_of_range_fail() {
        assert!(HybridWeights::new(-0.1, 0.2).is_err());
        assert!(HybridWeights::new(0.2, 1.5).is_err());
        assert!(HybridWeights::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_invalid_hybrid_params_fail() {
        let (content, style) = inputs();
        let params = Params {
            hybrid_weight_content: 0.6,
            hybrid_weight_style: 0.5,
            ..params("hybrid", 1)
        };

        assert!(get_initial_image(&params, &content, &style).is_err());
    }

    #[test]
    fn test_modes_are_deterministic() {
        let (content, style) = inputs();

        for mode in ["noise", "content", "style", "hybrid"] {
            let first = get_initial_image(&params(mode, 42), &content, &style).unwrap();
            let second = get_initial_image(&params(mode, 42), &content, &style).unwrap();

            assert_eq!(first.shape(), content.shape());
            assert!(
                first
                    .iter()
                    .zip(second.iter())
                    .all(|(a, b)| a.to_bits() == b.to_bits()),
                "mode {mode} is not deterministic"
            );
        }
    }

    #[test]
    fn test_seed_changes_noise() {
        let (content, style) = inputs();
        let a = get_initial_image(&params("noise", 1), &content, &style).unwrap();
        let b = get_initial_image(&params("noise", 2), &content, &style).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_noise_is_standard_normal() {
        let (content, style) = inputs();
        let noise = get_initial_image(&params("noise", 7), &content, &style).unwrap();

        #[allow(clippy::cast_precision_loss)]
        let n = noise.len() as f32;
        let mean = noise.sum() / n;
        let var = noise.mapv(|v| (v - mean).powi(2)).sum() / n;

        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var.sqrt() - 1.0).abs() < 0.05, "std {}", var.sqrt());
    }

    #[test]
    fn test_content_mode_is_an_independent_copy() {
        let (content, style) = inputs();
        let mut initial = get_initial_image(&params("content", 0), &content, &style).unwrap();

        assert_eq!(initial, content);

        initial.fill(9.0);
        assert_ne!(initial, content);
        assert!(content.iter().all(|&v| v <= 1.0));
    }

    #[test]
    fn test_style_mode_copies_style() {
        let (content, style) = inputs();
        let initial = get_initial_image(&params("style", 0), &content, &style).unwrap();

        assert_eq!(initial, style);
    }

    #[test]
    fn test_hybrid_blends_inputs() {
        let (content, style) = inputs();
        let noise = get_initial_image(&params("noise", 5), &content, &style).unwrap();
        let hybrid = get_initial_image(&params("hybrid", 5), &content, &style).unwrap();

        let expected = &noise * 0.4_f32 + &content * 0.3_f32 + &style * 0.3_f32;
        for (actual, expected) in hybrid.iter().zip(expected.iter()) {
            assert!((actual - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mismatched_style_is_rejected() {
        let (content, _) = inputs();
        let style = Array4::<f32>::zeros((1, 3, 8, 8));

        assert!(matches!(
            get_initial_image(&params("style", 0), &content, &style),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_custom_image_is_fitted_and_noised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("start.png");
        RgbImage::from_pixel(100, 40, Rgb([128, 128, 128]))
            .save(&path)
            .unwrap();

        let (content, style) = inputs();
        let initial =
            get_initial_image(&params(path.to_str().unwrap(), 3), &content, &style).unwrap();

        assert_eq!(initial.shape(), content.shape());
        let base = 128.0 / 255.0;
        assert!(initial.iter().all(|v| (v - base).abs() < CUSTOM_NOISE_SCALE * 6.0));
        assert!(initial.iter().any(|v| (v - base).abs() > f32::EPSILON));
    }

    #[test]
    fn test_custom_image_missing_fails() {
        let (content, style) = inputs();
        assert!(get_initial_image(&params("/no/such/start.png", 0), &content, &style).is_err());
    }
}
