//! Model downloading and loading utilities.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// File name of the default VGG-19 feature extractor inside the cache.
///
/// Expected to be torchvision's `vgg19(weights="IMAGENET1K_V1").features`
/// exported to ONNX with dynamic height and width axes.
pub const VGG19_FEATURES_FILE: &str = "vgg19-features.onnx";

/// Hex digits of the URL hash kept in cached file names.
const URL_HASH_LEN: usize = 16;

/// Manages the model cache directory and downloads.
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Uses the platform-appropriate cache directory:
    /// - Windows: `%LOCALAPPDATA%\restyle\models`
    /// - Linux: `~/.cache/restyle/models`
    /// - macOS: `~/Library/Caches/restyle/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_dir(base.join("restyle").join("models"))
    }

    /// Create a model cache rooted at `cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_dir<P: Into<PathBuf>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.into();

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self { cache_dir })
    }

    /// Where the default VGG-19 feature extractor is looked up.
    #[must_use]
    pub fn default_model_path(&self) -> PathBuf {
        self.cache_dir.join(VGG19_FEATURES_FILE)
    }

    /// Where the model behind `url` is stored in this cache.
    ///
    /// The name is prefixed with a hash of the whole URL, so URLs sharing a
    /// last path segment never share a file.
    #[must_use]
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}-{}", url_hash(url), file_name_for(url)))
    }

    /// Get the path to a model file, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be downloaded or accessed.
    pub fn get_model_path(&self, url: &str) -> Result<PathBuf> {
        let path = self.path_for(url);

        if path.exists() {
            tracing::debug!("Using cached model {}", path.display());
        } else {
            download_file(url, &path, &file_name_for(url))?;
        }

        Ok(path)
    }
}

/// File name a URL is cached under: its last path segment.
fn file_name_for(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
        .unwrap_or("model.onnx")
        .to_string()
}

fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..URL_HASH_LEN].to_string()
}

/// Download a file from a URL to a path with progress indication.
fn download_file(url: &str, path: &Path, name: &str) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let client = reqwest::blocking::Client::new();
    let mut response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|source| Error::ModelDownload {
            name: name.to_string(),
            source,
        })?;

    let pb = ProgressBar::new(response.content_length().unwrap_or(0));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    // Renamed into place only once complete, so a partial file is never cached
    let temp_path = path.with_extension("tmp");
    {
        let mut writer = pb.wrap_write(fs::File::create(&temp_path)?);
        io::copy(&mut response, &mut writer)?;
        writer.flush()?;
    }
    pb.finish_with_message(format!("Downloaded {name}"));

    fs::rename(&temp_path, path)?;

    Ok(())
}
