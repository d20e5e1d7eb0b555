//! # Extraction Dispatcher
//!
//! Routes an input document to the right extractor and wraps the result in an
//! [`ExtractionOutcome`]:
//!
//! - `.pdf` (any case) → embedded text layer via [`PdfTextReader`]
//! - anything else → image conditioning followed by the orientation search
//!
//! Only a missing input file produces `status = error`. Every failure further
//! down is absorbed into degenerate content plus diagnostics, so callers always
//! receive a serializable outcome.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::artifacts::ArtifactLayout;
use crate::config::AppConfig;
use crate::errors::error_logging;
use crate::observability;
use crate::ocr::OcrEngine;
use crate::ocr_config::ConditioningConfig;
use crate::orientation::{OrientationSearch, Rotation, SearchObserver, SearchOutcome};
use crate::pdf::PdfTextReader;
use crate::preprocessing::{self, ConditionedImage, ConditioningError};

/// How the content was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtractionMethod {
    #[serde(rename = "PDF_TEXT_LAYER")]
    PdfTextLayer,
    #[serde(rename = "OCR_PIPELINE")]
    OcrPipeline,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::PdfTextLayer => "PDF_TEXT_LAYER",
            ExtractionMethod::OcrPipeline => "OCR_PIPELINE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Success,
    Error,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Success => "success",
            ExtractionStatus::Error => "error",
        }
    }
}

/// Diagnostics of a single rotation attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationDiagnostic {
    pub rotation: Rotation,
    pub path: String,
    /// Engine confidence, `-1` when the engine failed
    pub conf: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub text_length: usize,
    pub duration_ms: u64,
}

/// Inspection data of one OCR pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub rotations: Vec<RotationDiagnostic>,
    pub best_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_rotation: Option<Rotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditioned_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cancelled: bool,
}

impl Diagnostics {
    fn from_search(conditioned: &ConditionedImage, outcome: &SearchOutcome) -> Self {
        let rotations = outcome
            .attempts
            .iter()
            .map(|attempt| RotationDiagnostic {
                rotation: attempt.rotation,
                path: attempt.image_path.display().to_string(),
                conf: attempt.confidence.as_reported(),
                error: attempt.confidence.failure().map(|e| e.to_string()),
                text_length: attempt.text_length(),
                duration_ms: attempt.duration.as_millis() as u64,
            })
            .collect();

        Self {
            rotations,
            best_image: outcome.best.image_path.display().to_string(),
            best_rotation: outcome.best.rotation,
            conditioned_image: Some(conditioned.path.display().to_string()),
            error: None,
            cancelled: outcome.cancelled,
        }
    }

    fn failed(layout: &ArtifactLayout, conditioned: Option<&ConditionedImage>, error: String) -> Self {
        Self {
            rotations: Vec::new(),
            best_image: layout
                .rotation_image_path(Rotation::Deg0)
                .display()
                .to_string(),
            best_rotation: None,
            conditioned_image: conditioned.map(|c| c.path.display().to_string()),
            error: Some(error),
            cancelled: false,
        }
    }
}

/// Result of one extraction, serialized as the CLI output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutcome {
    pub status: ExtractionStatus,
    pub method: ExtractionMethod,
    pub content: String,
    pub filepath: String,
    /// Present for the OCR pipeline, `null` for PDFs and missing inputs
    pub debug: Option<Diagnostics>,
    pub generated_at: DateTime<Utc>,
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ExtractionStatus::Success
    }
}

/// Whether `path` is routed to the PDF text-layer reader
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Extraction method chosen for `path`
pub fn method_for(path: &Path) -> ExtractionMethod {
    if is_pdf(path) {
        ExtractionMethod::PdfTextLayer
    } else {
        ExtractionMethod::OcrPipeline
    }
}

/// Routes documents to the PDF reader or the OCR pipeline
pub struct Dispatcher {
    conditioning: ConditioningConfig,
    search: OrientationSearch,
    pdf_reader: Arc<dyn PdfTextReader>,
    layout: ArtifactLayout,
}

impl Dispatcher {
    pub fn new(
        config: &AppConfig,
        engine: Arc<dyn OcrEngine>,
        pdf_reader: Arc<dyn PdfTextReader>,
    ) -> Self {
        Self {
            conditioning: config.conditioning.clone(),
            search: OrientationSearch::new(
                engine,
                config.search.clone(),
                config.ocr.operation_timeout(),
            ),
            pdf_reader,
            layout: config.layout(),
        }
    }

    /// Replace the default tracing observer of the orientation search
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.search = self.search.with_observer(observer);
        self
    }

    /// Write artifacts to `layout` instead of the configured output directory
    pub fn with_layout(mut self, layout: ArtifactLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Extract the text of the document at `path`
    pub async fn extract(&self, path: impl AsRef<Path>) -> ExtractionOutcome {
        self.extract_with_cancellation(path, &CancellationToken::new())
            .await
    }

    /// Extract the text of the document at `path`, stopping the orientation
    /// search early when `cancel` fires
    pub async fn extract_with_cancellation(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> ExtractionOutcome {
        let path = path.as_ref();
        let method = method_for(path);
        let span = observability::extraction_span(&path.display().to_string(), method.as_str());

        async move {
            let start = Instant::now();

            let (status, content, debug) = if !path.exists() {
                warn!(path = %path.display(), "Input file does not exist");
                (ExtractionStatus::Error, String::new(), None)
            } else {
                let (content, debug) = match method {
                    ExtractionMethod::PdfTextLayer => (self.read_pdf(path).await, None),
                    ExtractionMethod::OcrPipeline => {
                        let (content, diagnostics) = self.run_ocr_pipeline(path, cancel).await;
                        (content, Some(diagnostics))
                    }
                };
                (ExtractionStatus::Success, content, debug)
            };

            let elapsed = start.elapsed();
            observability::record_extraction_metrics(method.as_str(), status.as_str(), elapsed);
            info!(
                status = status.as_str(),
                characters = content.chars().count(),
                duration_ms = elapsed.as_millis() as u64,
                "Extraction finished"
            );

            ExtractionOutcome {
                status,
                method,
                content,
                filepath: path.display().to_string(),
                debug,
                generated_at: Utc::now(),
            }
        }
        .instrument(span)
        .await
    }

    async fn read_pdf(&self, path: &Path) -> String {
        let reader = Arc::clone(&self.pdf_reader);
        let owned = path.to_path_buf();

        match tokio::task::spawn_blocking(move || reader.extract_text(&owned)).await {
            Ok(text) => text,
            Err(e) => {
                error_logging::log_filesystem_error(
                    &e,
                    "read_pdf_text_layer",
                    Some(&path.display().to_string()),
                );
                String::new()
            }
        }
    }

    async fn run_ocr_pipeline(&self, path: &Path, cancel: &CancellationToken) -> (String, Diagnostics) {
        let conditioned = match self.condition(path).await {
            Ok(conditioned) => conditioned,
            Err(e) => {
                warn!(error = %e, "Conditioning failed, returning empty content");
                return (String::new(), Diagnostics::failed(&self.layout, None, e.to_string()));
            }
        };

        match self.search.search(&conditioned.path, &self.layout, cancel).await {
            Ok(outcome) => {
                let diagnostics = Diagnostics::from_search(&conditioned, &outcome);
                (outcome.best.text, diagnostics)
            }
            Err(e) => {
                warn!(error = %e, "Orientation search failed, returning empty content");
                (
                    String::new(),
                    Diagnostics::failed(&self.layout, Some(&conditioned), e.to_string()),
                )
            }
        }
    }

    async fn condition(&self, path: &Path) -> Result<ConditionedImage, ConditioningError> {
        let input = path.to_path_buf();
        let config = self.conditioning.clone();
        let layout = self.layout.clone();

        tokio::task::spawn_blocking(move || preprocessing::condition(&input, &config, &layout))
            .await
            .map_err(|e| ConditioningError::Processing {
                message: format!("conditioning worker terminated abnormally: {}", e),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_detection_is_case_insensitive() {
        assert!(is_pdf(Path::new("statement.pdf")));
        assert!(is_pdf(Path::new("SCAN.PDF")));
        assert!(is_pdf(Path::new("dir.v2/Report.Pdf")));
        assert!(!is_pdf(Path::new("receipt.jpg")));
        assert!(!is_pdf(Path::new("pdf")));
        assert!(!is_pdf(Path::new("archive.pdf.png")));
    }

    #[test]
    fn test_method_serialization() {
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::PdfTextLayer).unwrap(),
            "\"PDF_TEXT_LAYER\""
        );
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::OcrPipeline).unwrap(),
            "\"OCR_PIPELINE\""
        );
        assert_eq!(
            serde_json::to_string(&ExtractionStatus::Error).unwrap(),
            "\"error\""
        );
    }

    #[test]
    fn test_failed_diagnostics_point_at_zero_degree_image() {
        let layout = ArtifactLayout::new("out");
        let diagnostics = Diagnostics::failed(&layout, None, "decode failed".to_string());

        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(json["best_image"], "out/debug_0_deg.png");
        assert_eq!(json["error"], "decode failed");
        assert!(json.get("conditioned_image").is_none());
        assert_eq!(json["rotations"].as_array().unwrap().len(), 0);
    }
}
