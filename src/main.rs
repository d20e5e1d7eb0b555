use anyhow::Result;
use docproc::config::AppConfig;
use docproc::dispatcher::{is_pdf, Dispatcher};
use docproc::errors::error_logging;
use docproc::observability;
use docproc::observability_config::ObservabilityConfig;
use docproc::ocr::{block_on_with_shutdown_grace, TesseractEngine};
use docproc::pdf::LopdfReader;
use std::env;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How long a timed-out Tesseract call may delay exit once the outcome is printed
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Start logging before the rest of the configuration is loaded so that
/// configuration errors reach the subscriber
fn init_logging() -> Result<()> {
    // An invalid setting falls back to defaults here; load_configuration reports it.
    let config = ObservabilityConfig::from_env()
        .and_then(|config| config.validate().map(|()| config))
        .unwrap_or_default();
    observability::init_tracing(&config)
}

/// Load and validate configuration at startup
fn load_configuration() -> Result<AppConfig> {
    let config = AppConfig::from_env()
        .inspect_err(|e| error_logging::log_config_error(e, "load_configuration"))
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    config
        .validate()
        .inspect_err(|e| error_logging::log_config_error(e, "validate_configuration"))
        .map_err(|e| {
            anyhow::anyhow!(
                "Configuration validation failed: {}. Please check your environment variables.",
                e
            )
        })?;

    Ok(config)
}

async fn run(file_path: String, config: AppConfig) -> Result<ExitCode> {
    let engine = TesseractEngine::new(config.ocr.clone());
    if !is_pdf(Path::new(&file_path)) {
        // Not fatal: every rotation attempt records the failure.
        if let Err(e) = engine.warm_up() {
            error_logging::log_ocr_error(&e, "warm_up", None, None, None);
            warn!("Tesseract is unavailable, OCR attempts will fail");
        }
    }

    let dispatcher = Dispatcher::new(&config, Arc::new(engine), Arc::new(LopdfReader::new()));
    let outcome = dispatcher.extract(&file_path).await;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string_pretty(&outcome)?)?;
    stdout.flush()?;

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> Result<ExitCode> {
    let Some(file_path) = env::args().nth(1) else {
        eprintln!("Usage: docproc <file>");
        return Ok(ExitCode::FAILURE);
    };

    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    init_logging()?;
    let config = load_configuration()?;
    info!("{}", config.summary());

    block_on_with_shutdown_grace(run(file_path, config), SHUTDOWN_GRACE)?
}
