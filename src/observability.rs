//! Observability module for tracing, logging, and metrics setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Span helpers for the conditioning and OCR stages
//! - Metric recording helpers
//!
//! Logs go to stderr; stdout is reserved for the extraction result. Metrics are
//! emitted through the `metrics` facade and are no-ops unless the host process
//! installs a recorder.

use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::observability_config::{LogFormat, ObservabilityConfig};

/// Initialize structured logging from the given configuration
///
/// `RUST_LOG` directives are honoured and combined with
/// `docproc=<log_level>`. Fails if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("docproc={}", config.log_level.to_lowercase()).parse()?);

    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?,
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );

    Ok(())
}

/// Create a span for OCR operations
pub fn ocr_span(operation: &str) -> tracing::Span {
    tracing::info_span!("ocr_operation", operation = operation, component = "ocr")
}

/// Create a span for image conditioning of one input file
pub fn conditioning_span(path: &str) -> tracing::Span {
    tracing::info_span!("conditioning", path = path, component = "preprocessing")
}

/// Create a span covering one document extraction
pub fn extraction_span(path: &str, method: &str) -> tracing::Span {
    tracing::info_span!("extraction", path = path, method = method)
}

/// Record the duration of one conditioning pass
pub fn record_conditioning_metrics(duration: Duration) {
    metrics::histogram!("conditioning_duration_seconds").record(duration.as_secs_f64());
}

/// Record one rotation attempt; `result` is `success` or an `OcrError` kind
pub fn record_ocr_attempt_metrics(rotation: &'static str, result: &'static str, duration: Duration) {
    metrics::counter!("ocr_attempts_total", "rotation" => rotation, "result" => result)
        .increment(1);
    metrics::histogram!("ocr_attempt_duration_seconds").record(duration.as_secs_f64());
}

/// Record a finished extraction
pub fn record_extraction_metrics(method: &'static str, status: &'static str, duration: Duration) {
    metrics::counter!("extractions_total", "method" => method, "status" => status).increment(1);
    metrics::histogram!("extraction_duration_seconds", "method" => method)
        .record(duration.as_secs_f64());
}
