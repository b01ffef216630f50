pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod reconcile;
pub mod types;

pub use extract::{rules_for, Extractor, LabelRule};
pub use normalize::normalize;
pub use pipeline::{LabelPipeline, LabelScan, PipelineError};
pub use preprocess::{prepare_label_image, PreprocessError};
pub use recognizer::{configured_backend, MockRecognizer, OcrBackend, OcrError, UnavailableRecognizer};
pub use reconcile::{parse_label, reconcile};
pub use types::{ExtractedField, ExtractedLabel, DEFAULT_REVIEW_THRESHOLD};

pub use meallog_core::derive_energy;
