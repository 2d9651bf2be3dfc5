use anyhow::Context;
use clap::Parser;
use expiry_core::ExpiryResult;
use expiry_ocr::{infer_from_texts, EngineConfig, PatternCatalog, Scorer};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "expiry-scan")]
#[command(about = "Read the expiry date off a photo of product packaging")]
struct Args {
    /// Packaging photo (any format the `image` crate decodes)
    #[arg(required_unless_present = "text")]
    image: Option<PathBuf>,

    /// TOML engine configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Tesseract data directory, overrides `ocr.tessdata_path`
    #[arg(long, value_name = "DIR")]
    tessdata: Option<String>,

    /// Tesseract language, overrides `ocr.language`
    #[arg(long)]
    lang: Option<String>,

    /// Infer from already-recognized text instead of running OCR (repeatable)
    #[arg(long = "text", value_name = "FILE")]
    text: Vec<PathBuf>,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // stdout carries the JSON result, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(2);
        }
    };

    let result = match run(&args, config).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };

    let json = if args.compact {
        serde_json::to_string(&result)
    } else {
        serde_json::to_string_pretty(&result)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("Failed to serialize result: {e}");
            return ExitCode::from(1);
        }
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &args.tessdata {
        config.ocr.tessdata_path = Some(dir.clone());
    }
    if let Some(lang) = &args.lang {
        config.ocr.language = lang.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(args: &Args, config: EngineConfig) -> anyhow::Result<ExpiryResult> {
    if !args.text.is_empty() {
        let texts = args
            .text
            .iter()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<String>>>()?;
        tracing::info!("Inferring from {} text file(s)", texts.len());

        let scorer = Scorer::new(config.scoring.clone());
        let today = chrono::Local::now().date_naive();
        let inference = infer_from_texts(texts, PatternCatalog::shared(), &scorer, today);
        return Ok(inference.into_result(config.raw_text_limit));
    }

    let path = args.image.as_ref().context("No image given")?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::info!("Scanning {} ({} bytes)", path.display(), bytes.len());
    scan_image(&bytes, config).await
}

#[cfg(feature = "tesseract")]
async fn scan_image(bytes: &[u8], config: EngineConfig) -> anyhow::Result<ExpiryResult> {
    use expiry_ocr::recognizer::tesseract_backend::TesseractRecognizer;

    let recognizer = TesseractRecognizer::new(
        config.ocr.tessdata_path.clone(),
        &config.ocr.language,
        &config.ocr.char_whitelist,
    );
    let pipeline = expiry_ocr::ExpiryPipeline::new(recognizer, config);
    Ok(pipeline.process_bytes(bytes).await)
}

#[cfg(not(feature = "tesseract"))]
async fn scan_image(_bytes: &[u8], _config: EngineConfig) -> anyhow::Result<ExpiryResult> {
    Err(expiry_ocr::OcrError::NotAvailable.into())
}
