use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use meallog_core::{EntrySource, MacroRecord, MealDraft};

use crate::extract::Extractor;
use crate::preprocess;
use crate::reconcile::reconcile;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::{ExtractedLabel, DEFAULT_REVIEW_THRESHOLD};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// The result of scanning one nutrition label.
#[derive(Debug)]
pub struct LabelScan {
    /// Raw OCR text output.
    pub ocr_text: String,
    /// Per-field extraction results with confidences.
    pub extracted: ExtractedLabel,
    /// Fully populated record built from `extracted`.
    pub record: MacroRecord,
    /// Whether a person should confirm the values before they are logged.
    pub needs_review: bool,
}

impl LabelScan {
    /// Extract and reconcile text recognized elsewhere. No OCR backend involved.
    pub fn from_text(ocr_text: String, review_threshold: f32) -> Self {
        let extracted = Extractor::parse(&ocr_text);
        let record = reconcile(&extracted);
        let needs_review = extracted.needs_review_at(review_threshold.clamp(0.0, 1.0));
        LabelScan { ocr_text, extracted, record, needs_review }
    }

    /// Start a meal draft from this scan, tagged as OCR-sourced.
    pub fn into_draft(self, food_name: impl Into<String>) -> MealDraft {
        MealDraft::new(food_name, EntrySource::Ocr, self.record)
    }
}

/// Orchestrates: preprocess → OCR → normalize → extract → reconcile.
pub struct LabelPipeline<R: OcrBackend> {
    recognizer: R,
    review_threshold: f32,
}

impl<R: OcrBackend> LabelPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer, review_threshold: DEFAULT_REVIEW_THRESHOLD }
    }

    pub fn with_review_threshold(mut self, threshold: f32) -> Self {
        self.review_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Process a photo on disk.
    pub async fn process_file(&self, path: &Path) -> Result<LabelScan, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        info!("Scanning label photo: {}", path.display());
        self.process_bytes(&bytes)
    }

    /// Process raw photo bytes (from camera capture or file read).
    pub fn process_bytes(&self, data: &[u8]) -> Result<LabelScan, PipelineError> {
        let image_bytes = preprocess::prepare_label_image(data)?;

        let ocr_text = self.recognizer.recognize(&image_bytes).map_err(|e| {
            warn!("OCR failed: {e}");
            e
        })?;

        Ok(self.process_text(ocr_text))
    }

    /// Run the text stages only, for text recognized elsewhere.
    pub fn process_text(&self, ocr_text: String) -> LabelScan {
        LabelScan::from_text(ocr_text, self.review_threshold)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
