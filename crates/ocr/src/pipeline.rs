use chrono::NaiveDate;
use expiry_core::{DateCandidate, ExpiryResult};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::catalog::PatternCatalog;
use crate::config::EngineConfig;
use crate::extract::Extractor;
use crate::recognizer::{recognize_or_empty, OcrBackend};
use crate::score::Scorer;
use crate::select::select_best;
use crate::variants::{ImageVariant, VariantGenerator};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Everything one request produced, before it is flattened into an
/// [`ExpiryResult`].
#[derive(Debug, Clone)]
pub struct Inference {
    /// OCR output per pass, variant-major then scan mode.
    pub pass_texts: Vec<String>,
    pub candidates: Vec<DateCandidate>,
    pub selected: Option<DateCandidate>,
}

impl Inference {
    pub fn into_result(self, raw_text_limit: usize) -> ExpiryResult {
        let raw_text: String = self.pass_texts.join("\n").chars().take(raw_text_limit).collect();
        match self.selected {
            Some(best) => ExpiryResult::found(best, raw_text),
            None => ExpiryResult::not_found(raw_text),
        }
    }
}

/// Extract, score and select over already-recognized text.
pub fn infer_from_texts(
    texts: Vec<String>,
    catalog: &PatternCatalog,
    scorer: &Scorer,
    today: NaiveDate,
) -> Inference {
    let extractor = Extractor::new(catalog);
    let candidates: Vec<DateCandidate> = texts
        .iter()
        .flat_map(|t| extractor.candidates(t, scorer, today))
        .collect();
    let selected = select_best(&candidates).cloned();

    match &selected {
        Some(best) => tracing::info!(
            date = %best.normalized,
            confidence = best.confidence,
            kind = %best.pattern_kind,
            "Selected expiry date from {} candidates, context: {}",
            candidates.len(),
            best.source_line
        ),
        None => tracing::info!("No date candidates in {} OCR passes", texts.len()),
    }

    Inference { pass_texts: texts, candidates, selected }
}

/// Orchestrates: decode → variants → OCR passes → extract/score → select.
pub struct ExpiryPipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    config: EngineConfig,
    catalog: &'static PatternCatalog,
    scorer: Scorer,
    reference_date: Option<NaiveDate>,
}

impl<R: OcrBackend + 'static> ExpiryPipeline<R> {
    pub fn new(recognizer: R, config: EngineConfig) -> Self {
        let scorer = Scorer::new(config.scoring.clone());
        Self {
            recognizer: Arc::new(recognizer),
            config,
            catalog: PatternCatalog::shared(),
            scorer,
            reference_date: None,
        }
    }

    /// Score against a fixed date instead of the local clock.
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Infer the expiry date from raw image bytes. Never fails: undecodable
    /// input comes back as a failed result with an error description.
    pub async fn process_bytes(&self, data: &[u8]) -> ExpiryResult {
        match self.try_process_bytes(data).await {
            Ok(inference) => inference.into_result(self.config.raw_text_limit),
            Err(e) => {
                tracing::warn!("Expiry inference failed: {e}");
                ExpiryResult::failure(e.to_string())
            }
        }
    }

    pub async fn try_process_bytes(&self, data: &[u8]) -> Result<Inference, PipelineError> {
        // Fixed once so every pass is scored against the same day.
        let today = self.today();

        let variants = self.generate_variants(data.to_vec()).await?;
        let texts = self.run_passes(variants).await?;

        Ok(infer_from_texts(texts, self.catalog, &self.scorer, today))
    }

    async fn generate_variants(&self, data: Vec<u8>) -> Result<Vec<ImageVariant>, PipelineError> {
        let generator = VariantGenerator::new(self.config.preprocess.clone());
        tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&data)?;
            Ok(generator.generate(&image))
        })
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))?
    }

    /// One pass per (variant, scan mode), at most `max_concurrent_passes` at a
    /// time. Returns only once every pass has finished.
    async fn run_passes(&self, variants: Vec<ImageVariant>) -> Result<Vec<String>, PipelineError> {
        let modes = self.config.ocr.scan_modes.clone();
        let variants = Arc::new(variants);
        let permits = Arc::new(Semaphore::new(self.config.ocr.max_concurrent_passes.max(1)));

        let mut handles = Vec::with_capacity(variants.len() * modes.len());
        for index in 0..variants.len() {
            for &mode in &modes {
                let permit = Arc::clone(&permits)
                    .acquire_owned()
                    .await
                    .map_err(|e| PipelineError::Worker(e.to_string()))?;
                let variants = Arc::clone(&variants);
                let recognizer = Arc::clone(&self.recognizer);
                handles.push(tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    let variant = &variants[index];
                    tracing::debug!(variant = %variant.kind, %mode, "Running OCR pass");
                    recognize_or_empty(recognizer.as_ref(), &variant.image, mode)
                }));
            }
        }

        let mut texts = Vec::with_capacity(handles.len());
        for handle in handles {
            let text = handle.await.unwrap_or_else(|e| {
                tracing::warn!("OCR pass aborted, continuing with empty text: {e}");
                String::new()
            });
            texts.push(text);
        }
        Ok(texts)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
