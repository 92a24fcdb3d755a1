use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use contour_frame::BorderConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// Input setting
    pub input: InputConfig,
    /// Border parameters
    pub border: BorderConfig,
    /// Batch processing settings
    pub batch: BatchConfig,
    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct InputConfig {
    /// Input image file path or directory path
    pub input: PathBuf,
    /// Optional cut-out mask; white keeps the pixel
    pub mask: Option<PathBuf>,
    /// Mask values above this are kept (0-255)
    pub mask_threshold: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct BatchConfig {
    /// File patterns to include in batch processing
    pub include_patterns: Vec<String>,
    /// File patterns to exclude from batch processing
    pub exclude_patterns: Vec<String>,
    /// Number of parallel workers for batch processing
    pub workers: usize,
    /// Continue batch processing even if some files fail
    pub continue_on_error: bool,
    /// Time allowed for one image before it is abandoned
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OutputConfig {
    /// Output folder for processed files
    pub output_folder: PathBuf,
    /// Crop the result to its visible content
    pub crop: bool,
    /// Transparent margin kept around the content when cropping
    pub crop_padding: u32,
    /// Skip saving the inner, outer and ring rasters
    pub skip_intermediates: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            input: PathBuf::from("cutout.png"),
            mask: None,
            mask_threshold: 127,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            include_patterns: vec![
                "*.png".to_string(),
                "*.jpg".to_string(),
                "*.jpeg".to_string(),
                "*.webp".to_string(),
                "*.bmp".to_string(),
                "*.tga".to_string(),
            ],
            exclude_patterns: vec![],
            workers: 1,
            continue_on_error: false,
            timeout_secs: contour_frame::DEFAULT_BUDGET.as_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            output_folder: PathBuf::from("output"),
            crop: false,
            crop_padding: 4,
            skip_intermediates: false,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Config> {
        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config {}", config_path.display()))?;
        let config: Config = match config_path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&config_str)
                .with_context(|| format!("invalid JSON config {}", config_path.display()))?,
            Some("toml") => toml::from_str(&config_str)
                .with_context(|| format!("invalid TOML config {}", config_path.display()))?,
            _ => bail!("unsupported config file format, use .json or .toml"),
        };
        Ok(config)
    }

    pub fn save_default(config_path: &Path) -> Result<()> {
        let config = Config::default();
        let config_str = match config_path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::to_string_pretty(&config)?,
            _ => serde_json::to_string_pretty(&config)?,
        };

        fs::write(config_path, config_str)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!("Generated default configuration file: {}", config_path.display());
        Ok(())
    }

    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.batch.timeout_secs.max(1))
    }
}
