//! Output types returned by the analysis entry points.

use crate::error::SummaryError;
use crate::language::Language;
use crate::params::{CanonicalMap, DisplayRow};
use crate::pipeline::extract::ExtractionOutcome;
use crate::translations::get_translation;
use serde::{Deserialize, Serialize};

/// The payload the HTTP and UI layers depend on.
///
/// Field names are fixed. Both summaries are always present: a failed
/// summary carries its localised placeholder, never an absent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report: String,
    pub summary_wo: String,
    pub summary_bm: String,
}

/// Wall-clock duration of each stage in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub ocr_ms: u64,
    pub extraction_ms: u64,
    pub interpretation_ms: u64,
    pub recommendation_ms: u64,
    pub summaries_ms: u64,
    /// OCR through recommendation; this is what the report header shows.
    pub report_ms: u64,
    pub total_ms: u64,
}

/// One regional summary.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub language: Language,
    /// The summary, or the placeholder when generation failed.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SummaryError>,
}

impl Summary {
    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything one analysis produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    /// The assembled Markdown report.
    pub report: String,
    /// Wolof then Bambara.
    pub summaries: Vec<Summary>,
    /// The canonical parameters the report was built from.
    pub parameters: CanonicalMap,
    /// What the extraction stage returned.
    pub extraction: ExtractionOutcome,
    pub interpretation: String,
    pub recommendations: String,
    pub timings: StageTimings,
    /// Language the report was written in.
    pub report_language: Language,
}

impl AnalysisOutput {
    /// The summary for `language`, if one was generated.
    pub fn summary(&self, language: Language) -> Option<&Summary> {
        self.summaries.iter().find(|s| s.language == language)
    }

    /// Summary errors, if any.
    pub fn summary_errors(&self) -> Vec<&SummaryError> {
        self.summaries.iter().filter_map(|s| s.error.as_ref()).collect()
    }

    /// The fixed-shape payload. A summary that was never produced is
    /// reported as unavailable rather than left blank.
    pub fn payload(&self) -> ReportPayload {
        let text = |lang: Language| match self.summary(lang) {
            Some(s) => s.text.clone(),
            None => get_translation("summary_unavailable", self.report_language)
                .replace("{lang}", lang.name()),
        };
        ReportPayload {
            report: self.report.clone(),
            summary_wo: text(Language::Wo),
            summary_bm: text(Language::Bm),
        }
    }
}

/// Extraction without interpretation: what `--params-only` prints.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterReport {
    pub extraction: ExtractionOutcome,
    pub parameters: CanonicalMap,
    pub rows: Vec<DisplayRow>,
    /// The Markdown table as it would appear in the full report.
    pub table: String,
}
