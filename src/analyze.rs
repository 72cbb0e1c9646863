//! Analysis entry points: the pipeline orchestrator.
//!
//! Stages run one after another on the calling task: text extraction,
//! parameter extraction, aggregation, interpretation, recommendation, report
//! assembly. The two regional summaries are the only concurrent step (see
//! [`crate::pipeline::summarize`]).
//!
//! Any failure before the summaries is fatal and returned as
//! `Err(SoilError)`, except extraction, which degrades to an empty
//! parameter map. Summary failures are recorded in the output.

use crate::config::AnalysisConfig;
use crate::error::SoilError;
use crate::knowledge::{KnowledgeBase, NoRetriever, Retriever};
use crate::model::{LanguageModel, ProviderEmbedder, ProviderModel};
use crate::output::{AnalysisOutput, ParameterReport, StageTimings};
use crate::params::{aggregate, display_rows, render_table};
use crate::pipeline::extract::{self, Extraction, ExtractionOutcome};
use crate::pipeline::{input, interpret, recommend, report, summarize, text};
use crate::progress::Stage;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Analyse a soil-report PDF given as a local path or HTTP(S) URL.
///
/// # Errors
/// Returns `Err(SoilError)` for fatal errors only:
/// - file not found, download failure, not a PDF, encrypted PDF
/// - no model provider configured
/// - the OCR, interpretation, recommendation or retrieval step failing
///
/// A failed regional summary is not an error: check
/// [`AnalysisOutput::summary_errors`].
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, SoilError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting analysis: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    run_pdf(resolved.path(), config, total_start).await
}

/// Analyse a PDF held in memory.
///
/// The bytes are written to a managed temp file that is removed on return.
pub async fn analyze_from_bytes(
    bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, SoilError> {
    let total_start = Instant::now();
    info!("Starting analysis of {} in-memory bytes", bytes.len());
    let resolved = input::resolve_bytes(bytes)?;
    run_pdf(resolved.path(), config, total_start).await
}

/// Analyse already-extracted report text, skipping the PDF stage.
///
/// Useful when the text comes from another OCR system, and in tests.
pub async fn analyze_text(
    text: &str,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, SoilError> {
    let total_start = Instant::now();
    let model = resolve_model(config)?;
    let retriever = resolve_retriever(config).await?;
    run_from_text(text.to_string(), 0, model, retriever, config, total_start).await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, SoilError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SoilError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input_str, config))
}

/// Analyse a PDF and write the `{report, summary_wo, summary_bm}` payload
/// as JSON to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, SoilError> {
    let output = analyze(input_str, config).await?;
    write_payload(&output, output_path.as_ref()).await?;
    Ok(output)
}

/// Write the payload JSON of `output` to `path` atomically.
pub async fn write_payload(output: &AnalysisOutput, path: &Path) -> Result<(), SoilError> {
    let json = serde_json::to_string_pretty(&output.payload())
        .map_err(|e| SoilError::Internal(format!("serialise payload: {e}")))?;
    let write_err = |e: std::io::Error| SoilError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    info!("Payload written to {}", path.display());
    Ok(())
}

/// Extract and normalise the parameters of a PDF without interpreting them.
///
/// Runs text extraction and the extraction model call only.
pub async fn extract_only(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<ParameterReport, SoilError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let model = resolve_model(config)?;

    let doc_text = timed_stage(config, Stage::TextExtraction, || {
        text::extract_text(resolved.path(), model.as_ref(), config)
    })
    .await?;
    dump_debug(config, "extracted_text.txt", &doc_text).await;

    let extraction = timed_stage(config, Stage::ParameterExtraction, || async {
        Ok::<_, SoilError>(extract::extract_parameters(model.as_ref(), &doc_text, config).await)
    })
    .await?;
    dump_extraction(config, &extraction).await;

    let parameters = aggregate(&extraction.outcome.raw_map());
    Ok(ParameterReport {
        rows: display_rows(&parameters, config.report_language),
        table: render_table(&parameters, config.report_language),
        extraction: extraction.outcome,
        parameters,
    })
}

// ── Orchestration ────────────────────────────────────────────────────────

async fn run_pdf(
    pdf_path: &Path,
    config: &AnalysisConfig,
    total_start: Instant,
) -> Result<AnalysisOutput, SoilError> {
    let model = resolve_model(config)?;
    let retriever = resolve_retriever(config).await?;

    let ocr_start = Instant::now();
    let doc_text = timed_stage(config, Stage::TextExtraction, || {
        text::extract_text(pdf_path, model.as_ref(), config)
    })
    .await?;
    let ocr_ms = elapsed_ms(ocr_start);

    run_from_text(doc_text, ocr_ms, model, retriever, config, total_start).await
}

async fn run_from_text(
    doc_text: String,
    ocr_ms: u64,
    model: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    config: &AnalysisConfig,
    total_start: Instant,
) -> Result<AnalysisOutput, SoilError> {
    debug!("Document text: {} chars", doc_text.len());
    dump_debug(config, "extracted_text.txt", &doc_text).await;
    let mut timings = StageTimings {
        ocr_ms,
        ..StageTimings::default()
    };

    // ── Parameter extraction + aggregation ───────────────────────────────
    let start = Instant::now();
    let extraction = timed_stage(config, Stage::ParameterExtraction, || async {
        Ok::<_, SoilError>(extract::extract_parameters(model.as_ref(), &doc_text, config).await)
    })
    .await?;
    dump_extraction(config, &extraction).await;
    let parameters = aggregate(&extraction.outcome.raw_map());
    timings.extraction_ms = elapsed_ms(start);
    info!("{} canonical parameters", parameters.len());

    // ── Interpretation ───────────────────────────────────────────────────
    let start = Instant::now();
    let interpretation = timed_stage(config, Stage::Interpretation, || {
        interpret::interpret(model.as_ref(), &parameters, config)
    })
    .await?;
    timings.interpretation_ms = elapsed_ms(start);

    // ── Recommendation ───────────────────────────────────────────────────
    let start = Instant::now();
    let recommendations = timed_stage(config, Stage::Recommendation, || {
        recommend::recommend(
            model.as_ref(),
            retriever.as_ref(),
            &parameters,
            &interpretation,
            config,
        )
    })
    .await?;
    timings.recommendation_ms = elapsed_ms(start);
    timings.report_ms = elapsed_ms(total_start);

    // ── Report ───────────────────────────────────────────────────────────
    let report = report::assemble_report(
        &parameters,
        &interpretation,
        &recommendations,
        &timings,
        config.report_language,
    );

    // ── Regional summaries ───────────────────────────────────────────────
    let start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Summaries);
    }
    let source = summarize::summary_source(&interpretation, &recommendations);
    let summaries = summarize::summarize_all(Arc::clone(&model), source, config).await;
    timings.summaries_ms = elapsed_ms(start);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(Stage::Summaries, timings.summaries_ms);
    }

    timings.total_ms = elapsed_ms(total_start);
    let failed = summaries.iter().filter(|s| s.is_placeholder()).count();
    info!(
        "Analysis complete: {} parameters, {}/{} summaries, {}ms total",
        parameters.len(),
        summaries.len() - failed,
        summaries.len(),
        timings.total_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(timings.total_ms);
    }

    Ok(AnalysisOutput {
        report,
        summaries,
        parameters,
        extraction: extraction.outcome,
        interpretation,
        recommendations,
        timings,
        report_language: config.report_language,
    })
}

/// Run one stage, firing progress events and logging its duration.
async fn timed_stage<T, F, Fut>(config: &AnalysisConfig, stage: Stage, f: F) -> Result<T, SoilError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, SoilError>>,
{
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    let start = Instant::now();
    let result = f().await?;
    let ms = elapsed_ms(start);
    info!("Stage {} done in {}ms", stage, ms);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, ms);
    }
    Ok(result)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

// ── Debug dumps ──────────────────────────────────────────────────────────

async fn dump_debug(config: &AnalysisConfig, name: &str, contents: &str) {
    let Some(ref dir) = config.debug_dir else {
        return;
    };
    let path = dir.join(name);
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, contents).await
    }
    .await;
    match result {
        Ok(()) => debug!("Wrote {}", path.display()),
        Err(e) => warn!("Could not write debug file {}: {}", path.display(), e),
    }
}

async fn dump_extraction(config: &AnalysisConfig, extraction: &Extraction) {
    if config.debug_dir.is_none() {
        return;
    }
    let contents = match &extraction.outcome {
        ExtractionOutcome::Parameters(map) => {
            serde_json::to_string_pretty(map).unwrap_or_else(|_| extraction.response.clone())
        }
        _ if !extraction.response.is_empty() => extraction.response.clone(),
        outcome => serde_json::to_string_pretty(outcome).unwrap_or_default(),
    };
    dump_debug(config, "raw_parameters.json", &contents).await;
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SoilError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SoilError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the language model, from most-specific to least-specific.
///
/// 1. **Pre-built model** (`config.language_model`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_model(config: &AnalysisConfig) -> Result<Arc<dyn LanguageModel>, SoilError> {
    if let Some(ref model) = config.language_model {
        return Ok(Arc::clone(model));
    }

    let wrap = |p: Arc<dyn LLMProvider>| Arc::new(ProviderModel::new(p)) as Arc<dyn LanguageModel>;

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default()).map(wrap);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model).map(wrap);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_or_default()).map(wrap);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SoilError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(wrap(llm_provider))
}

/// Resolve the retriever for the recommendation stage.
///
/// 1. **Pre-built retriever** (`config.retriever`).
/// 2. **Knowledge directory** (`config.knowledge_dir`): a directory of notes
///    (indexed, snapshot cached as `index.json`) or a saved `.json` index.
///    Embeddings come from the auto-detected embedding provider.
/// 3. **No retrieval**.
pub async fn resolve_retriever(config: &AnalysisConfig) -> Result<Arc<dyn Retriever>, SoilError> {
    if let Some(ref retriever) = config.retriever {
        return Ok(Arc::clone(retriever));
    }

    let Some(ref path) = config.knowledge_dir else {
        debug!("No knowledge base configured");
        return Ok(Arc::new(NoRetriever));
    };

    let (_llm, embedding) =
        ProviderFactory::from_env().map_err(|e| SoilError::ProviderNotConfigured {
            provider: "embedding".to_string(),
            hint: format!("The knowledge base needs an embedding provider.\nError: {}", e),
        })?;
    let embedder = Arc::new(ProviderEmbedder::new(embedding));

    let kb = if path.is_file() {
        let kb = KnowledgeBase::new(embedder);
        let n = kb.load(path).await?;
        info!("Loaded {} knowledge chunks from {}", n, path.display());
        kb
    } else {
        KnowledgeBase::open(embedder, path).await?
    };
    Ok(Arc::new(kb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Summary;

    #[tokio::test]
    async fn pre_built_retriever_wins() {
        let config = AnalysisConfig::builder()
            .retriever(Arc::new(crate::knowledge::StaticRetriever::new(["x"])))
            .knowledge_dir("/nonexistent")
            .build()
            .unwrap();
        let r = resolve_retriever(&config).await.unwrap();
        assert_eq!(r.retrieve("q", 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_knowledge_dir_means_no_retrieval() {
        let r = resolve_retriever(&AnalysisConfig::default()).await.unwrap();
        assert!(r.retrieve("q", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn payload_is_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("payload.json");
        let output = AnalysisOutput {
            report: "# r".into(),
            summaries: vec![Summary {
                language: crate::Language::Wo,
                text: "wo".into(),
                error: None,
            }],
            parameters: Default::default(),
            extraction: ExtractionOutcome::NotFound(String::new()),
            interpretation: String::new(),
            recommendations: String::new(),
            timings: StageTimings::default(),
            report_language: crate::Language::Fr,
        };
        write_payload(&output, &path).await.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["summary_wo"], "wo");
        assert_eq!(json["summary_bm"], "Résumé Bambara non disponible.");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
