//! restyle CLI - Prepare inputs for neural style transfer.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use restyle::image::save_image;
use restyle::model::{get_cnn_model, get_cnn_model_from};
use restyle::{get_image_tensors, get_initial_image, Device, Params};

/// Load content and style images and build the initial image for style transfer.
#[derive(Parser, Debug)]
#[command(name = "restyle")]
#[command(version, about, long_about = None)]
struct Args {
    /// Content image, URL or path. Local files are rewritten as decoded RGB.
    #[arg(short, long, value_name = "SOURCE")]
    content: Option<String>,

    /// Style image, URL or path. Local files are rewritten as decoded RGB.
    #[arg(short, long, value_name = "SOURCE")]
    style: Option<String>,

    /// JSON parameter file. Flags given on the command line take precedence.
    #[arg(short, long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Working width in pixels.
    #[arg(long, value_name = "INT")]
    width: Option<u32>,

    /// Working height in pixels.
    #[arg(long, value_name = "INT")]
    height: Option<u32>,

    /// Random seed for reproducibility.
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,

    /// Initial image: noise, content, style, hybrid, or an image URL/path.
    #[arg(short, long, value_name = "MODE")]
    input_image: Option<String>,

    /// Content weight for the hybrid initial image (0.0-1.0).
    #[arg(long, value_name = "FLOAT")]
    hybrid_weight_content: Option<f64>,

    /// Style weight for the hybrid initial image (0.0-1.0).
    #[arg(long, value_name = "FLOAT")]
    hybrid_weight_style: Option<f64>,

    /// Compute device for the feature extractor: cpu, cuda or cuda:N.
    #[arg(long, default_value = "cpu", value_name = "DEVICE")]
    device: Device,

    /// ONNX feature extractor, URL or path. Defaults to the cached VGG-19 export.
    #[arg(long, value_name = "SOURCE")]
    model_url: Option<String>,

    /// Load the feature extractor and run it on the initial image.
    #[arg(long)]
    load_model: bool,

    /// Write the initial image here, restored to the content image's size.
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Start from the parameter file (or defaults) and apply flag overrides.
    fn to_params(&self) -> Result<Params> {
        let mut params = match &self.params {
            Some(path) => Params::from_file(path)?,
            None => Params::default(),
        };

        if let Some(content) = &self.content {
            params.content_image_path.clone_from(content);
        }
        if let Some(style) = &self.style {
            params.style_image_path.clone_from(style);
        }
        if let Some(width) = self.width {
            params.image_width = width;
        }
        if let Some(height) = self.height {
            params.image_height = height;
        }
        if let Some(seed) = self.seed {
            params.random_seed = seed;
        }
        if let Some(input_image) = &self.input_image {
            params.input_image.clone_from(input_image);
        }
        if let Some(weight) = self.hybrid_weight_content {
            params.hybrid_weight_content = weight;
        }
        if let Some(weight) = self.hybrid_weight_style {
            params.hybrid_weight_style = weight;
        }
        if let Some(source) = &self.model_url {
            params.model_url = Some(source.clone());
        }

        Ok(params)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("restyle={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    let params = args.to_params()?;
    params.validate().context("Invalid parameters")?;

    tracing::debug!("Running with params: {params:?}");

    let tensors = get_image_tensors(&params).context("Failed to load images")?;

    let initial = get_initial_image(&params, &tensors.content, &tensors.style)
        .context("Failed to build initial image")?;

    tracing::info!(
        "Initial image ({}) ready with shape {:?}",
        params.input_image,
        initial.shape()
    );

    if args.load_model {
        let model = match &params.model_url {
            Some(source) => get_cnn_model_from(source, args.device),
            None => get_cnn_model(args.device),
        };
        let mut model = model.context("Failed to load feature extractor")?;

        let features = model
            .features(&initial)
            .context("Failed to run feature extractor")?;

        tracing::info!(
            "Feature extractor on {} produced shape {:?}",
            model.network.device(),
            features.shape()
        );
    }

    if let Some(output) = &args.output {
        save_image(&initial, output, Some(tensors.original_content_size))
            .context("Failed to save initial image")?;

        println!(
            "Saved initial image to {} ({}x{})",
            output.display(),
            tensors.original_content_size.0,
            tensors.original_content_size.1
        );
    }

    Ok(())
}
