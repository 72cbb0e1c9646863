//! Progress-callback trait for per-stage analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves from one stage to the next.
//!
//! # Example
//!
//! ```rust
//! use soilsmart::{AnalysisConfig, AnalysisProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl AnalysisProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::language::Language;
use std::fmt;
use std::sync::Arc;

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// PDF text layer, with vision OCR for scanned pages.
    TextExtraction,
    /// Structured parameters from the text.
    ParameterExtraction,
    /// Agronomic interpretation of the canonical parameters.
    Interpretation,
    /// Amendments and crops, with retrieved context.
    Recommendation,
    /// The two regional summaries, run concurrently.
    Summaries,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::TextExtraction => "text extraction",
            Stage::ParameterExtraction => "parameter extraction",
            Stage::Interpretation => "interpretation",
            Stage::Recommendation => "recommendation",
            Stage::Summaries => "summaries",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the pipeline as it runs.
///
/// Implementations must be `Send + Sync`: summary events arrive from the
/// spawned summary tasks. All methods default to no-ops.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when one regional summary fails and is replaced by its
    /// placeholder.
    fn on_summary_error(&self, language: Language, error: &str) {
        let _ = (language, error);
    }

    /// Called once the payload is assembled.
    fn on_analysis_complete(&self, total_ms: u64) {
        let _ = total_ms;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl AnalysisProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage}"));
        }

        fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
            self.events.lock().unwrap().push(format!("done {stage}"));
        }

        fn on_summary_error(&self, language: Language, _error: &str) {
            self.events.lock().unwrap().push(format!("summary error {language}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::TextExtraction);
        cb.on_stage_complete(Stage::TextExtraction, 12);
        cb.on_summary_error(Language::Wo, "boom");
        cb.on_analysis_complete(100);
    }

    #[test]
    fn recorder_receives_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Interpretation);
        rec.on_stage_complete(Stage::Interpretation, 5);
        rec.on_summary_error(Language::Bm, "timeout");
        assert_eq!(
            *rec.events.lock().unwrap(),
            ["start interpretation", "done interpretation", "summary error bm"]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Summaries);
    }
}
