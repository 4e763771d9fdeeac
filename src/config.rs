use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{CellFluorError, Result};
use crate::segment::{PeakParams, Segmenter, WatershedParams};

/// Configuration for CellFluor
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    /// Gaussian blur standard deviation; `<= 0` disables the blur
    #[serde(default = "default_sigma")]
    pub sigma: f64,

    /// Minimum seed separation in pixels
    #[serde(default = "default_min_distance")]
    pub min_distance: usize,

    /// Offset added to the background for the watershed foreground threshold
    #[serde(default)]
    pub margin: f64,

    /// Absolute intensity floor for peak-mode seed candidates
    #[serde(default)]
    pub min_intensity: f64,

    /// Segmentation backend
    #[serde(default = "default_backend")]
    pub backend: BackendChoice,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,
}

/// Segmentation backend choice
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Local maxima + Voronoi tessellation
    Peak,
    /// Background threshold + distance-ridge watershed
    Watershed,
}

fn default_sigma() -> f64 {
    2.0
}

fn default_min_distance() -> usize {
    5
}

fn default_backend() -> BackendChoice {
    BackendChoice::Watershed
}

fn default_parallel() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            sigma: default_sigma(),
            min_distance: default_min_distance(),
            margin: 0.0,
            min_intensity: 0.0,
            backend: default_backend(),
            use_parallel: default_parallel(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CellFluorError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            CellFluorError::ConfigLoad {
                source: e,
                path: path.to_path_buf(),
            }
        })?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(CellFluorError::InvalidPath(input_path));
        }

        if self.min_distance < 1 {
            return Err(CellFluorError::Config(
                "min_distance must be >= 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the configured segmentation backend
    pub fn segmenter(&self) -> Segmenter {
        match self.backend {
            BackendChoice::Peak => Segmenter::Peak(PeakParams {
                sigma: self.sigma,
                min_distance: self.min_distance,
                min_intensity: self.min_intensity,
            }),
            BackendChoice::Watershed => Segmenter::Watershed(WatershedParams {
                sigma: self.sigma,
                margin: self.margin,
                min_distance: self.min_distance,
            }),
        }
    }
}
