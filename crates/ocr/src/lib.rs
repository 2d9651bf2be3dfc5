pub mod catalog;
pub mod config;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod recognizer;
pub mod score;
pub mod select;
pub mod variants;

pub use catalog::{month_from_name, PatternCatalog, Signal};
pub use config::{ConfigError, EngineConfig, OcrConfig, PreprocessConfig, ScoringWeights};
pub use extract::{Extractor, RawMatch};
pub use normalize::normalize;
pub use pipeline::{infer_from_texts, ExpiryPipeline, Inference, PipelineError};
pub use recognizer::{
    recognize_or_empty, MockRecognizer, OcrBackend, OcrError, ScanMode, DATE_CHAR_WHITELIST,
};
pub use score::Scorer;
pub use select::select_best;
pub use variants::{ImageVariant, VariantGenerator, VariantKind};
