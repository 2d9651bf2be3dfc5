use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Characters the engine is told to expect: digits, date separators, and the
/// letters of month abbreviations and keyword markers.
pub const DATE_CHAR_WHITELIST: &str =
    "0123456789/-.:, ABCDEFGHIJKLMNOPRSTUVXY";

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to encode variant for the engine: {0}")]
    ImageEncode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available, build with the `tesseract` feature")]
    NotAvailable,
}

/// Engine operating mode. Each variant is read once per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// A single uniform block of text.
    SingleBlock,
    /// As much text as possible, in no particular order.
    SparseText,
    /// Fully automatic page segmentation.
    Auto,
    /// A single column of text of variable sizes.
    SingleColumn,
}

impl ScanMode {
    pub const DEFAULT_SET: [ScanMode; 4] = [
        ScanMode::SingleBlock,
        ScanMode::SparseText,
        ScanMode::Auto,
        ScanMode::SingleColumn,
    ];

    /// Tesseract page segmentation mode number.
    pub fn psm(self) -> &'static str {
        match self {
            ScanMode::SingleBlock => "6",
            ScanMode::SparseText => "11",
            ScanMode::Auto => "3",
            ScanMode::SingleColumn => "4",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::SingleBlock => write!(f, "single_block"),
            ScanMode::SparseText => write!(f, "sparse_text"),
            ScanMode::Auto => write!(f, "auto"),
            ScanMode::SingleColumn => write!(f, "single_column"),
        }
    }
}

/// Abstraction over an OCR backend.
/// Implementations accept one grayscale variant and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &GrayImage, mode: ScanMode) -> Result<String, OcrError>;
}

/// Run one pass, folding any engine failure into empty text.
pub fn recognize_or_empty<B: OcrBackend + ?Sized>(
    backend: &B,
    image: &GrayImage,
    mode: ScanMode,
) -> String {
    match backend.recognize(image, mode) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(%mode, "OCR pass failed, continuing with empty text: {e}");
            String::new()
        }
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string, for exercising the inference pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image: &GrayImage, _mode: ScanMode) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, ScanMode};
    use image::{DynamicImage, GrayImage};
    use leptess::{LepTess, Variable};
    use std::io::Cursor;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
        whitelist: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str, whitelist: &str) -> Self {
            Self {
                data_path,
                lang: lang.to_string(),
                whitelist: whitelist.to_string(),
            }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image: &GrayImage, mode: ScanMode) -> Result<String, OcrError> {
            let mut png = Vec::new();
            DynamicImage::ImageLuma8(image.clone())
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| OcrError::ImageEncode(e.to_string()))?;

            // LepTess is not Sync, so every pass gets its own engine handle.
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, mode.psm())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            if !self.whitelist.is_empty() {
                lt.set_variable(Variable::TesseditCharWhitelist, &self.whitelist)
                    .map_err(|e| OcrError::Engine(e.to_string()))?;
            }
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}
