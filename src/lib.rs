//! # soilsmart
//!
//! Turn a soil-analysis PDF into a structured agronomic report, with short
//! summaries in Wolof and Bambara for farmers who will not read the full
//! French report.
//!
//! ## Why this crate?
//!
//! Lab reports arrive as digital exports or photocopies, with parameters
//! spelled every possible way: `pH`, `Azote total Min` / `Azote total Max`,
//! multi-sample lists, texture split into clay/silt/sand, a catch-all
//! `autres_parametres` bucket. A language model reads the text, and the
//! [`params`] engine folds whatever it returns into one canonical map that
//! drives both the prompts and the Markdown table.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file, URL or bytes
//!  ├─ 2. Text       pdfium text layer; vision OCR for scanned pages
//!  ├─ 3. Extract    LLM → raw parameter JSON (never fatal)
//!  ├─ 4. Aggregate  key normalisation, min/max merging, bucket flattening
//!  ├─ 5. Interpret  LLM agronomic reading of the canonical map
//!  ├─ 6. Recommend  LLM + knowledge-base passages
//!  ├─ 7. Report     title, timings, parameter table, both texts
//!  └─ 8. Summaries  Wolof ∥ Bambara, each fault-isolated
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use soilsmart::{analyze, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = AnalysisConfig::builder()
//!         .knowledge_dir("knowledge/")
//!         .build()?;
//!     let output = analyze("analyse_sol.pdf", &config).await?;
//!     println!("{}", output.report);
//!     let payload = output.payload();
//!     println!("{}\n{}", payload.summary_wo, payload.summary_bm);
//!     Ok(())
//! }
//! ```
//!
//! The normalisation engine needs no model at all:
//!
//! ```rust
//! use soilsmart::{aggregate, render_table, Language};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "pH": {"valeur": "6.5", "unite": ""},
//!     "Azote Min": {"valeur": "0.1", "unite": "%"},
//!     "Azote Max": {"valeur": "0.3", "unite": "%"}
//! });
//! let canonical = aggregate(raw.as_object().unwrap());
//! assert!(render_table(&canonical, Language::Fr).contains("| Azote | 0.1 - 0.3 | % |"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `soilsmart` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! soilsmart = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod language;
pub mod model;
pub mod output;
pub mod params;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod translations;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze, analyze_from_bytes, analyze_sync, analyze_text, analyze_to_file, extract_only,
    resolve_model, resolve_retriever, write_payload,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, StageTemperatures, DEFAULT_MODEL};
pub use error::{SoilError, SummaryError};
pub use knowledge::{KnowledgeBase, NoRetriever, Passage, Retriever, StaticRetriever};
pub use language::Language;
pub use model::{Completion, CompletionRequest, Embedder, LanguageModel, ProviderEmbedder, ProviderModel};
pub use output::{AnalysisOutput, ParameterReport, ReportPayload, StageTimings, Summary};
pub use params::{
    aggregate, display_rows, normalize_key, render_raw, render_table, unwrap_value, CanonicalEntry,
    CanonicalKey, CanonicalMap, DisplayRow, ParamValue, RawParameterMap, Role,
};
pub use pipeline::extract::ExtractionOutcome;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use translations::{get_translation, translate_parameter_name};
