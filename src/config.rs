//! Configuration for a soil-report analysis.
//!
//! All behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. Every stage reads its knobs from here, so two
//! runs can be compared by diffing their configs.

use crate::error::SoilError;
use crate::knowledge::Retriever;
use crate::language::Language;
use crate::model::LanguageModel;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default chat model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sampling temperatures, one per model-backed stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTemperatures {
    pub ocr: f32,
    pub extraction: f32,
    pub interpretation: f32,
    pub recommendation: f32,
    pub summary: f32,
}

impl Default for StageTemperatures {
    fn default() -> Self {
        Self {
            ocr: 0.1,
            extraction: 0.3,
            interpretation: 0.3,
            recommendation: 0.4,
            summary: 0.2,
        }
    }
}

/// Configuration for one analysis.
///
/// # Example
/// ```rust
/// use soilsmart::{AnalysisConfig, Language};
///
/// let config = AnalysisConfig::builder()
///     .model("gpt-4o-mini")
///     .report_language(Language::Fr)
///     .top_k(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `language_model`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed model. Takes precedence over `provider_name`.
    pub language_model: Option<Arc<dyn LanguageModel>>,

    /// Pre-constructed retriever. Takes precedence over `knowledge_dir`.
    pub retriever: Option<Arc<dyn Retriever>>,

    /// Directory of `.md` / `.txt` agronomy notes, or a saved `.json` index,
    /// used for retrieval. None means recommendations run without context.
    pub knowledge_dir: Option<PathBuf>,

    /// Passages retrieved per recommendation. Default: 3.
    pub top_k: usize,

    /// Language of the full report. Default: French.
    pub report_language: Language,

    /// Per-stage sampling temperatures.
    pub temperatures: StageTemperatures,

    /// Max output tokens for OCR, extraction, interpretation and
    /// recommendation. Default: 4096.
    pub max_tokens: usize,

    /// Max output tokens per regional summary. Default: 500.
    pub summary_max_tokens: usize,

    /// Retry attempts on a failed model call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call model timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Transcribe pages without a text layer with the vision model.
    /// Default: true.
    pub ocr_fallback: bool,

    /// Rendering DPI for scanned pages. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Longest rendered edge in pixels for scanned pages. Default: 2000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// When set, the extracted text and raw extraction JSON are written here.
    pub debug_dir: Option<PathBuf>,

    /// Optional stage-progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            language_model: None,
            retriever: None,
            knowledge_dir: None,
            top_k: 3,
            report_language: Language::Fr,
            temperatures: StageTemperatures::default(),
            max_tokens: 4096,
            summary_max_tokens: 500,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            ocr_fallback: true,
            dpi: 150,
            max_rendered_pixels: 2000,
            password: None,
            download_timeout_secs: 120,
            debug_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field(
                "language_model",
                &self.language_model.as_ref().map(|_| "<dyn LanguageModel>"),
            )
            .field("retriever", &self.retriever.as_ref().map(|_| "<dyn Retriever>"))
            .field("knowledge_dir", &self.knowledge_dir)
            .field("top_k", &self.top_k)
            .field("report_language", &self.report_language)
            .field("temperatures", &self.temperatures)
            .field("max_tokens", &self.max_tokens)
            .field("summary_max_tokens", &self.summary_max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("ocr_fallback", &self.ocr_fallback)
            .field("dpi", &self.dpi)
            .field("debug_dir", &self.debug_dir)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model id to request, falling back to [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.config.language_model = Some(model);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.config.retriever = Some(retriever);
        self
    }

    pub fn knowledge_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.knowledge_dir = Some(dir.into());
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn report_language(mut self, lang: Language) -> Self {
        self.config.report_language = lang;
        self
    }

    pub fn temperatures(mut self, t: StageTemperatures) -> Self {
        self.config.temperatures = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn summary_max_tokens(mut self, n: usize) -> Self {
        self.config.summary_max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr_fallback(mut self, v: bool) -> Self {
        self.config.ocr_fallback = v;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.debug_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, SoilError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(SoilError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.top_k == 0 {
            return Err(SoilError::InvalidConfig("top_k must be ≥ 1".into()));
        }
        let t = c.temperatures;
        for (stage, value) in [
            ("ocr", t.ocr),
            ("extraction", t.extraction),
            ("interpretation", t.interpretation),
            ("recommendation", t.recommendation),
            ("summary", t.summary),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(SoilError::InvalidConfig(format!(
                    "{stage} temperature must be 0.0–2.0, got {value}"
                )));
            }
        }
        if c.api_timeout_secs == 0 {
            return Err(SoilError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
