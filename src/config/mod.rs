use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub correlation: CorrelationConfig,
    pub hotspot: HotspotConfig,
    pub fit: FitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Spectral magnitudes below this are treated as empty bins during
    /// phase-correlation normalization instead of being divided by.
    pub epsilon: f32,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { epsilon: 1e-10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotConfig {
    /// Side length of the square patch extracted around a marked landmark.
    pub box_size: usize,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self { box_size: 20 }
    }
}

/// Nonlinear least-squares controls shared by the Gaussian and sinusoid fits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub lambda_init: f64,
    pub lambda_scale: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-10,
            lambda_init: 1e-3,
            lambda_scale: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub global_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path)?;
        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.correlation.epsilon <= 0.0 {
            errors.push("correlation epsilon must be positive".to_string());
        }
        if self.hotspot.box_size < 2 {
            errors.push("hotspot box_size must be at least 2".to_string());
        }
        if self.fit.max_iterations == 0 {
            errors.push("fit max_iterations must be positive".to_string());
        }
        if self.fit.lambda_scale <= 1.0 {
            errors.push("fit lambda_scale must be greater than 1.0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub fn load_config_or_default(config_path: Option<&str>) -> Config {
    match config_path {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => {
                if let Err(errors) = config.validate() {
                    eprintln!("Configuration validation errors:");
                    for error in errors {
                        eprintln!("  - {}", error);
                    }
                    eprintln!("Using default configuration instead.");
                    Config::default()
                } else {
                    config
                }
            }
            Err(e) => {
                eprintln!("Failed to load config from '{}': {}", path, e);
                eprintln!("Using default configuration.");
                Config::default()
            }
        },
        None => Config::default(),
    }
}
