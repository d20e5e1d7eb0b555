//! # Dispatcher Tests
//!
//! End-to-end extraction through conditioning and the orientation search,
//! with fake engines standing in for Tesseract.


#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use docproc::artifacts::ArtifactLayout;
    use docproc::config::AppConfig;
    use docproc::dispatcher::{Dispatcher, ExtractionMethod, ExtractionStatus};
    use docproc::orientation::Rotation;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn dispatcher(dir: &TempDir, engine: Arc<dyn docproc::ocr::OcrEngine>, pdf: Arc<CannedPdfReader>) -> Dispatcher {
        let config = AppConfig {
            output_dir: dir.path().join("output"),
            ..Default::default()
        };
        Dispatcher::new(&config, engine, pdf)
    }

    #[tokio::test]
    async fn test_scan_is_read_at_upright_orientation() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("receipt.png");
        marker_scan().save(&input).unwrap();

        let outcome = dispatcher(&dir, Arc::new(MarkerEngine), Arc::new(CannedPdfReader::new("")))
            .extract(&input)
            .await;

        assert_eq!(outcome.status, ExtractionStatus::Success);
        assert_eq!(outcome.method, ExtractionMethod::OcrPipeline);
        assert_eq!(outcome.content, LONG_TEXT);
        assert_eq!(outcome.filepath, input.display().to_string());

        let debug = outcome.debug.expect("OCR runs carry diagnostics");
        assert_eq!(debug.rotations.len(), 4);
        assert_eq!(debug.best_rotation, Some(Rotation::Deg0));
        assert!(debug.best_image.ends_with("debug_0_deg.png"));
        assert!(debug.error.is_none());
        assert!(!debug.cancelled);
    }

    #[tokio::test]
    async fn test_pre_rotated_scan_selects_inverse_rotation() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("sideways.png");
        image::imageops::rotate90(&marker_scan()).save(&input).unwrap();

        let outcome = dispatcher(&dir, Arc::new(MarkerEngine), Arc::new(CannedPdfReader::new("")))
            .extract(&input)
            .await;

        let debug = outcome.debug.unwrap();
        assert_eq!(debug.best_rotation, Some(Rotation::Deg270));
        assert!(debug.best_image.ends_with("debug_270_deg.png"));
        assert_eq!(outcome.content, LONG_TEXT);
    }

    #[tokio::test]
    async fn test_conditioned_artifact_is_binary_and_upscaled() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("receipt.png");
        marker_scan().save(&input).unwrap();

        let dispatcher = dispatcher(&dir, Arc::new(MarkerEngine), Arc::new(CannedPdfReader::new("")));
        let outcome = dispatcher.extract(&input).await;

        let conditioned_path = dispatcher.layout().conditioned_image_path();
        assert_eq!(
            outcome.debug.unwrap().conditioned_image,
            Some(conditioned_path.display().to_string())
        );

        let conditioned = image::open(&conditioned_path).unwrap().to_luma8();
        assert_eq!(conditioned.dimensions(), (120, 90));
        assert_eq!(levels(&conditioned), vec![0, 255]);
    }

    #[tokio::test]
    async fn test_uppercase_pdf_extension_skips_the_ocr_pipeline() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("STATEMENT.PDF");
        std::fs::write(&input, b"%PDF-1.5 placeholder").unwrap();
        let pdf = Arc::new(CannedPdfReader::new("page one\npage two\n"));
        let engine = Arc::new(BrokenEngine::default());

        let dispatcher = dispatcher(&dir, engine.clone(), pdf.clone());
        let outcome = dispatcher.extract(&input).await;

        assert_eq!(outcome.status, ExtractionStatus::Success);
        assert_eq!(outcome.method, ExtractionMethod::PdfTextLayer);
        assert_eq!(outcome.content, "page one\npage two\n");
        assert!(outcome.debug.is_none());
        assert_eq!(pdf.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
        assert!(!dispatcher.layout().conditioned_image_path().exists());
    }

    #[tokio::test]
    async fn test_missing_file_reports_error() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(BrokenEngine::default());

        let outcome = dispatcher(&dir, engine.clone(), Arc::new(CannedPdfReader::new("")))
            .extract(dir.path().join("nowhere.jpg"))
            .await;

        assert_eq!(outcome.status, ExtractionStatus::Error);
        assert!(!outcome.is_success());
        assert_eq!(outcome.method, ExtractionMethod::OcrPipeline);
        assert_eq!(outcome.content, "");
        assert!(outcome.debug.is_none());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undecodable_image_is_absorbed() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("scan.png");
        std::fs::write(&input, b"definitely not a png").unwrap();
        let engine = Arc::new(BrokenEngine::default());

        let outcome = dispatcher(&dir, engine.clone(), Arc::new(CannedPdfReader::new("")))
            .extract(&input)
            .await;

        assert_eq!(outcome.status, ExtractionStatus::Success);
        assert_eq!(outcome.content, "");
        let debug = outcome.debug.unwrap();
        assert!(debug.error.is_some());
        assert!(debug.rotations.is_empty());
        assert!(debug.best_image.ends_with("debug_0_deg.png"));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_engine_unavailable_still_succeeds_with_diagnostics() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("receipt.png");
        marker_scan().save(&input).unwrap();

        let outcome = dispatcher(&dir, Arc::new(BrokenEngine::default()), Arc::new(CannedPdfReader::new("")))
            .extract(&input)
            .await;

        assert_eq!(outcome.status, ExtractionStatus::Success);
        assert_eq!(outcome.content, "");
        let debug = outcome.debug.unwrap();
        assert_eq!(debug.rotations.len(), 4);
        for rotation in &debug.rotations {
            assert_eq!(rotation.conf, -1);
            assert!(rotation.error.as_deref().unwrap_or("").contains("OCR_INIT"));
        }
    }

    #[tokio::test]
    async fn test_cancelled_extraction_is_flagged() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("receipt.png");
        marker_scan().save(&input).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = dispatcher(&dir, Arc::new(MarkerEngine), Arc::new(CannedPdfReader::new("")))
            .extract_with_cancellation(&input, &cancel)
            .await;

        assert_eq!(outcome.status, ExtractionStatus::Success);
        assert_eq!(outcome.content, "");
        let debug = outcome.debug.unwrap();
        assert!(debug.cancelled);
        assert!(debug.rotations.is_empty());
    }

    #[tokio::test]
    async fn test_outcome_json_field_names() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("receipt.png");
        marker_scan().save(&input).unwrap();

        let outcome = dispatcher(&dir, Arc::new(MarkerEngine), Arc::new(CannedPdfReader::new("")))
            .extract(&input)
            .await;
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["method"], "OCR_PIPELINE");
        assert_eq!(json["content"], LONG_TEXT);
        assert!(json["filepath"].as_str().unwrap().ends_with("receipt.png"));
        assert!(json["generated_at"].is_string());

        let rotations = json["debug"]["rotations"].as_array().unwrap();
        let labels: Vec<&str> = rotations
            .iter()
            .map(|r| r["rotation"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["0_deg", "90_deg", "180_deg", "270_deg"]);
        assert_eq!(rotations[0]["conf"], 88);
        assert!(rotations[0].get("error").is_none());
        assert!(json["debug"]["best_image"].as_str().unwrap().ends_with("debug_0_deg.png"));
    }

    #[tokio::test]
    async fn test_pdf_outcome_serializes_null_debug() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("invoice.pdf");
        std::fs::write(&input, b"%PDF-1.5").unwrap();

        let outcome = dispatcher(&dir, Arc::new(MarkerEngine), Arc::new(CannedPdfReader::new("text\n")))
            .extract(&input)
            .await;
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["method"], "PDF_TEXT_LAYER");
        assert!(json["debug"].is_null());
    }

    #[tokio::test]
    async fn test_per_request_layouts_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("receipt.png");
        marker_scan().save(&input).unwrap();
        let base = dir.path().join("output");

        let first = dispatcher(&dir, Arc::new(MarkerEngine), Arc::new(CannedPdfReader::new("")))
            .with_layout(ArtifactLayout::for_request(&base, "req-1"));
        let second = dispatcher(&dir, Arc::new(MarkerEngine), Arc::new(CannedPdfReader::new("")))
            .with_layout(ArtifactLayout::for_request(&base, "req-2"));

        let (a, b) = tokio::join!(first.extract(&input), second.extract(&input));

        let a = a.debug.unwrap();
        let b = b.debug.unwrap();
        assert_ne!(a.best_image, b.best_image);
        assert!(base.join("req-1").join("debug_0_deg.png").exists());
        assert!(base.join("req-2").join("debug_0_deg.png").exists());
    }
}
