use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::recognizer::{ScanMode, DATE_CHAR_WHITELIST};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Score deltas applied by [`crate::score::Scorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub base: f32,
    /// Line carries an expiry marker.
    pub keyword_boost: f32,
    /// Month/year-only forms.
    pub month_year_boost: f32,
    /// Date falls within `plausible_window_days` from today.
    pub plausible_boost: f32,
    /// Date is already in the past.
    pub expired_boost: f32,
    /// Date is further out than the window. Subtracted.
    pub far_future_penalty: f32,
    pub plausible_window_days: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 0.5,
            keyword_boost: 0.35,
            month_year_boost: 0.05,
            plausible_boost: 0.1,
            expired_boost: 0.05,
            far_future_penalty: 0.1,
            plausible_window_days: 1095,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Variants with a side shorter than this are upscaled.
    pub min_side: u32,
    pub min_upscale: f32,
    pub clahe_clip_limit: f32,
    /// Tiles per axis for local equalization.
    pub clahe_grid: u32,
    pub blur_sigma: f32,
    /// Half-width of the adaptive threshold window (5 → 11×11).
    pub adaptive_block_radius: u32,
    pub adaptive_offset: i32,
    /// Upper bound on the area of an upscaled variant.
    pub max_pixels: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_side: 800,
            min_upscale: 2.0,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            blur_sigma: 0.8,
            adaptive_block_radius: 5,
            adaptive_offset: 2,
            max_pixels: 40_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub scan_modes: Vec<ScanMode>,
    pub max_concurrent_passes: usize,
    pub char_whitelist: String,
    pub language: String,
    pub tessdata_path: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            scan_modes: ScanMode::DEFAULT_SET.to_vec(),
            max_concurrent_passes: 4,
            char_whitelist: DATE_CHAR_WHITELIST.to_string(),
            language: "eng".to_string(),
            tessdata_path: None,
        }
    }
}

/// Everything tunable about one inference engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum characters of concatenated OCR text echoed in results.
    pub raw_text_limit: usize,
    pub scoring: ScoringWeights,
    pub preprocess: PreprocessConfig,
    pub ocr: OcrConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            raw_text_limit: 500,
            scoring: ScoringWeights::default(),
            preprocess: PreprocessConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.raw_text_limit == 0 {
            return Err(ConfigError::Invalid("raw_text_limit must be positive".into()));
        }
        if self.ocr.scan_modes.is_empty() {
            return Err(ConfigError::Invalid("ocr.scan_modes must not be empty".into()));
        }
        if self.ocr.max_concurrent_passes == 0 {
            return Err(ConfigError::Invalid("ocr.max_concurrent_passes must be positive".into()));
        }
        if self.preprocess.clahe_grid == 0 {
            return Err(ConfigError::Invalid("preprocess.clahe_grid must be positive".into()));
        }
        if self.preprocess.max_pixels == 0 {
            return Err(ConfigError::Invalid("preprocess.max_pixels must be positive".into()));
        }
        if self.preprocess.min_upscale < 1.0 {
            return Err(ConfigError::Invalid("preprocess.min_upscale must be at least 1.0".into()));
        }
        if self.scoring.plausible_window_days < 0 {
            return Err(ConfigError::Invalid("scoring.plausible_window_days must not be negative".into()));
        }
        Ok(())
    }
}
