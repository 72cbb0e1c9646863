//! Error types for the soilsmart library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SoilError`]: **Fatal**: the analysis cannot proceed (bad input file,
//!   unreadable PDF, provider not configured, a report stage's model call
//!   failed). Returned as `Err(SoilError)` from the `analyze*` functions.
//!
//! * [`SummaryError`]: **Non-fatal**: one regional summary failed. The
//!   payload still carries a placeholder for that language and the sibling
//!   summary and main report are unaffected. Stored inside
//!   [`crate::output::AnalysisOutput`] so callers can inspect what went wrong.
//!
//! Malformed extraction output is not an error at all: it is recovered into
//! an empty parameter map (see [`crate::pipeline::extract::ExtractionOutcome`]).

use crate::language::Language;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the soilsmart library.
#[derive(Debug, Error)]
pub enum SoilError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Reading the text layer of a page failed.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Rendering a scanned page for the vision fallback failed.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A model call failed after all retries.
    #[error("LLM call failed during {stage}: {message}")]
    LlmApiError { stage: String, message: String },

    /// A model call did not answer within the configured timeout.
    #[error("LLM call timed out after {secs}s during {stage}")]
    StageTimeout { stage: String, secs: u64 },

    // ── Knowledge base errors ─────────────────────────────────────────────
    /// Loading, indexing or querying the knowledge base failed.
    #[error("Knowledge base error at '{path}': {detail}")]
    KnowledgeBase { path: PathBuf, detail: String },

    /// The embedding model failed.
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of one regional summary.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SummaryError {
    /// The model call failed after retries or timed out.
    #[error("Summary in '{language}' failed: {detail}")]
    Generation { language: Language, detail: String },

    /// The summary task panicked or was cancelled.
    #[error("Summary task for '{language}' aborted: {detail}")]
    TaskAborted { language: Language, detail: String },
}

impl SummaryError {
    /// The language whose summary failed.
    pub fn language(&self) -> Language {
        match self {
            SummaryError::Generation { language, .. } | SummaryError::TaskAborted { language, .. } => {
                *language
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_names_the_stage() {
        let e = SoilError::LlmApiError {
            stage: "interpretation".into(),
            message: "HTTP 500".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("interpretation"), "got: {msg}");
        assert!(msg.contains("HTTP 500"), "got: {msg}");
    }

    #[test]
    fn stage_timeout_display() {
        let e = SoilError::StageTimeout {
            stage: "recommendation".into(),
            secs: 120,
        };
        assert!(e.to_string().contains("120s"));
        assert!(e.to_string().contains("recommendation"));
    }

    #[test]
    fn summary_error_reports_language() {
        let e = SummaryError::Generation {
            language: Language::Bm,
            detail: "rate limited".into(),
        };
        assert_eq!(e.language(), Language::Bm);
        assert!(e.to_string().contains("'bm'"));
    }

    #[test]
    fn knowledge_error_display() {
        let e = SoilError::KnowledgeBase {
            path: PathBuf::from("kb/index.json"),
            detail: "invalid JSON".into(),
        };
        assert!(e.to_string().contains("kb/index.json"));
    }
}
