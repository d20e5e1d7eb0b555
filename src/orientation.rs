//! # Orientation Search Module
//!
//! Scans can arrive rotated by any multiple of 90° and no orientation metadata
//! is trustworthy, so the search simply runs OCR on all four axis-aligned
//! orientations and keeps the best reading.
//!
//! ## Algorithm
//!
//! ```text
//! current = conditioned image
//! for rotation in [0°, 90°, 180°, 270°]:
//!     if rotation != 0°: current = rotate90_clockwise(current)   // cumulative
//!     save current to debug_<rotation>.png                        // always
//!     (text, confidence) = ocr(debug_<rotation>.png)
//!     record attempt
//!
//! best_score = -1
//! for attempt in attempts (scan order, first improvement wins):
//!     if attempt.score > best_score and len(attempt.text) > min_text_length:
//!         best = attempt
//! ```
//!
//! Confidence alone is unreliable on sparse or blank rotations (the engine may
//! be very sure about three garbage characters), hence the length floor.
//! When nothing qualifies the result is empty text and the 0° image.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::artifacts::ArtifactLayout;
use crate::errors::error_logging;
use crate::observability;
use crate::ocr::{recognize_with_timeout, OcrEngine};
use crate::ocr_config::SearchConfig;
use crate::ocr_errors::OcrError;
use crate::preprocessing::ConditioningError;

/// Score a candidate has to beat before anything is selected
pub const NO_SCORE: i32 = -1;

/// One of the four axis-aligned orientations tried by the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// All rotations in scan order
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Clockwise rotation in degrees
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Diagnostic label, e.g. `90_deg`
    pub fn label(&self) -> &'static str {
        match self {
            Rotation::Deg0 => "0_deg",
            Rotation::Deg90 => "90_deg",
            Rotation::Deg180 => "180_deg",
            Rotation::Deg270 => "270_deg",
        }
    }

    /// Rotation that undoes this one (360° - self)
    pub fn inverse(&self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg0,
            Rotation::Deg90 => Rotation::Deg270,
            Rotation::Deg180 => Rotation::Deg180,
            Rotation::Deg270 => Rotation::Deg90,
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

impl Serialize for Rotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Outcome of asking the engine to score one rotation
#[derive(Debug, Clone, PartialEq)]
pub enum Confidence {
    /// The engine produced a mean confidence in `[-1, 100]`
    Scored(i32),
    /// The engine could not run on this rotation
    EngineFailed(OcrError),
}

impl Confidence {
    /// The score, if the engine produced one
    pub fn score(&self) -> Option<i32> {
        match self {
            Confidence::Scored(score) => Some(*score),
            Confidence::EngineFailed(_) => None,
        }
    }

    /// Integer form used in diagnostics output; failures map to `-1`
    pub fn as_reported(&self) -> i32 {
        self.score().unwrap_or(NO_SCORE)
    }

    pub fn failure(&self) -> Option<&OcrError> {
        match self {
            Confidence::Scored(_) => None,
            Confidence::EngineFailed(err) => Some(err),
        }
    }
}

/// A single OCR attempt at one rotation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationAttempt {
    pub rotation: Rotation,
    /// Where this rotation's image was persisted
    pub image_path: PathBuf,
    /// Recognized text, empty when the engine failed
    pub text: String,
    pub confidence: Confidence,
    pub duration: Duration,
}

impl RotationAttempt {
    /// Length of the recognized text in characters
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    fn failed(rotation: Rotation, image_path: PathBuf, error: OcrError, duration: Duration) -> Self {
        Self {
            rotation,
            image_path,
            text: String::new(),
            confidence: Confidence::EngineFailed(error),
            duration,
        }
    }
}

/// The reading chosen by the selection policy
#[derive(Debug, Clone, PartialEq)]
pub struct BestResult {
    /// Selected text, empty when no attempt qualified
    pub text: String,
    /// Winning rotation, `None` when no attempt qualified
    pub rotation: Option<Rotation>,
    /// Winning attempt's image, or the 0° image when no attempt qualified
    pub image_path: PathBuf,
    /// Winning score, `None` when no attempt qualified
    pub confidence: Option<i32>,
}

/// Everything the search produced
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Attempts in scan order; all four unless the search was cancelled
    pub attempts: Vec<RotationAttempt>,
    pub best: BestResult,
    /// The search stopped early because its cancellation token fired
    pub cancelled: bool,
}

/// Applies the selection policy to recorded attempts.
///
/// Scans in order; an attempt replaces the current best only if its score is
/// strictly higher than the best so far (starting at -1) and its text is
/// strictly longer than `min_text_length`. Failed attempts never win.
pub fn select_best(
    attempts: &[RotationAttempt],
    min_text_length: usize,
    fallback_image: PathBuf,
) -> BestResult {
    let mut best_score = NO_SCORE;
    let mut best: Option<&RotationAttempt> = None;

    for attempt in attempts {
        let Some(score) = attempt.confidence.score() else {
            continue;
        };
        if score > best_score && attempt.text_length() > min_text_length {
            best_score = score;
            best = Some(attempt);
        }
    }

    match best {
        Some(winner) => BestResult {
            text: winner.text.clone(),
            rotation: Some(winner.rotation),
            image_path: winner.image_path.clone(),
            confidence: Some(best_score),
        },
        None => BestResult {
            text: String::new(),
            rotation: None,
            image_path: fallback_image,
            confidence: None,
        },
    }
}

/// Receives search progress; lets callers capture diagnostics without
/// scraping log output.
pub trait SearchObserver: Send + Sync {
    fn on_attempt(&self, _attempt: &RotationAttempt) {}

    fn on_selected(&self, _best: &BestResult, _attempts: &[RotationAttempt]) {}
}

/// Observer that reports progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_attempt(&self, attempt: &RotationAttempt) {
        match &attempt.confidence {
            Confidence::Scored(score) => info!(
                rotation = attempt.rotation.label(),
                confidence = score,
                text_length = attempt.text_length(),
                duration_ms = attempt.duration.as_millis() as u64,
                path = %attempt.image_path.display(),
                "Rotation attempt recorded"
            ),
            Confidence::EngineFailed(err) => warn!(
                rotation = attempt.rotation.label(),
                error = %err,
                duration_ms = attempt.duration.as_millis() as u64,
                path = %attempt.image_path.display(),
                "Rotation attempt failed"
            ),
        }
    }

    fn on_selected(&self, best: &BestResult, attempts: &[RotationAttempt]) {
        match best.rotation {
            Some(rotation) => info!(
                rotation = rotation.label(),
                confidence = ?best.confidence,
                text_length = best.text.chars().count(),
                attempts = attempts.len(),
                "Selected best orientation"
            ),
            None => warn!(
                attempts = attempts.len(),
                fallback_image = %best.image_path.display(),
                "No orientation produced usable text"
            ),
        }
    }
}

/// Runs OCR at every axis-aligned orientation and selects the best reading
pub struct OrientationSearch {
    engine: Arc<dyn OcrEngine>,
    config: SearchConfig,
    attempt_timeout: Duration,
    observer: Arc<dyn SearchObserver>,
}

impl OrientationSearch {
    pub fn new(engine: Arc<dyn OcrEngine>, config: SearchConfig, attempt_timeout: Duration) -> Self {
        Self {
            engine,
            config,
            attempt_timeout,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the default tracing observer
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search the conditioned image at `conditioned_path`.
    ///
    /// Engine failures never abort the loop: they are recorded on the attempt
    /// as [`Confidence::EngineFailed`] with empty text. Only a conditioned
    /// image that cannot be loaded is an error.
    pub async fn search(
        &self,
        conditioned_path: &Path,
        layout: &ArtifactLayout,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome, ConditioningError> {
        self.run(conditioned_path, layout, cancel)
            .instrument(observability::ocr_span("orientation_search"))
            .await
    }

    async fn run(
        &self,
        conditioned_path: &Path,
        layout: &ArtifactLayout,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome, ConditioningError> {
        let base = image::open(conditioned_path)
            .map_err(|e| ConditioningError::Decode {
                message: format!(
                    "cannot load conditioned image {}: {}",
                    conditioned_path.display(),
                    e
                ),
            })?
            .to_luma8();

        layout
            .ensure_output_dir()
            .map_err(|e| ConditioningError::Persist {
                message: format!(
                    "cannot create output directory {}: {}",
                    layout.output_dir().display(),
                    e
                ),
            })?;

        info!(
            engine = self.engine.name(),
            "Searching orientations of {}",
            conditioned_path.display()
        );

        let mut attempts: Vec<RotationAttempt> = Vec::with_capacity(Rotation::ALL.len());
        let mut cancelled = false;
        let mut init_failed = false;
        let mut current = base;

        for rotation in Rotation::ALL {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            // Each step rotates the previous step's buffer, not the base image.
            if rotation != Rotation::Deg0 {
                current = image::imageops::rotate90(&current);
            }

            let image_path = layout.rotation_image_path(rotation);
            let attempt_start = Instant::now();

            if let Err(e) = current.save(&image_path) {
                error_logging::log_filesystem_error(
                    &e,
                    "persist_rotation_image",
                    Some(&image_path.display().to_string()),
                );
                let attempt = RotationAttempt::failed(
                    rotation,
                    image_path,
                    OcrError::ImageLoad(format!("rotation image could not be written: {}", e)),
                    attempt_start.elapsed(),
                );
                self.record(&mut attempts, attempt);
                continue;
            }

            if init_failed && self.config.short_circuit_on_init_failure {
                let attempt = RotationAttempt::failed(
                    rotation,
                    image_path,
                    OcrError::Initialization(
                        "skipped after an earlier initialization failure".to_string(),
                    ),
                    attempt_start.elapsed(),
                );
                self.record(&mut attempts, attempt);
                continue;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let abandoned = OcrError::Cancelled(format!(
                        "abandoned after {}ms",
                        attempt_start.elapsed().as_millis()
                    ));
                    warn!(rotation = rotation.label(), error = %abandoned, "In-flight attempt dropped");
                    cancelled = true;
                    break;
                }
                result = recognize_with_timeout(
                    Arc::clone(&self.engine),
                    image_path.clone(),
                    self.attempt_timeout,
                ) => result,
            };
            let duration = attempt_start.elapsed();

            let attempt = match result {
                Ok(recognition) => RotationAttempt {
                    rotation,
                    image_path,
                    text: recognition.text,
                    confidence: Confidence::Scored(recognition.mean_confidence),
                    duration,
                },
                Err(err) => {
                    if matches!(err, OcrError::Initialization(_)) {
                        init_failed = true;
                    }
                    error_logging::log_ocr_error(
                        &err,
                        "recognize_rotation",
                        Some(rotation.label()),
                        Some(&image_path.display().to_string()),
                        Some(duration),
                    );
                    RotationAttempt::failed(rotation, image_path, err, duration)
                }
            };
            self.record(&mut attempts, attempt);
        }

        let fallback_image = attempts
            .iter()
            .find(|a| a.rotation == Rotation::Deg0)
            .map(|a| a.image_path.clone())
            .unwrap_or_else(|| layout.rotation_image_path(Rotation::Deg0));
        let best = select_best(&attempts, self.config.min_text_length, fallback_image);

        if cancelled {
            warn!(
                completed_attempts = attempts.len(),
                "Orientation search cancelled"
            );
        }
        self.observer.on_selected(&best, &attempts);

        Ok(SearchOutcome {
            attempts,
            best,
            cancelled,
        })
    }

    fn record(&self, attempts: &mut Vec<RotationAttempt>, attempt: RotationAttempt) {
        observability::record_ocr_attempt_metrics(
            attempt.rotation.label(),
            attempt
                .confidence
                .failure()
                .map(OcrError::kind)
                .unwrap_or("success"),
            attempt.duration,
        );
        self.observer.on_attempt(&attempt);
        attempts.push(attempt);
    }
}
