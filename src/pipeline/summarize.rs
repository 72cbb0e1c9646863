//! Regional summaries: a fixed fan-out of two tokio tasks, Wolof and Bambara.
//!
//! Each task is fault-isolated. A model error, a timeout or a panic inside
//! one task turns into that language's placeholder text plus a
//! [`SummaryError`]; the sibling summary and the report are unaffected.

use crate::config::AnalysisConfig;
use crate::error::{SoilError, SummaryError};
use crate::language::Language;
use crate::model::{CompletionRequest, LanguageModel};
use crate::output::Summary;
use crate::pipeline::{llm, postprocess};
use crate::prompts::{summary_prompt, summary_system_prompt};
use crate::translations::get_translation;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// The text both summaries are written from.
pub fn summary_source(interpretation: &str, recommendations: &str) -> String {
    format!("{interpretation}\n\n{recommendations}")
}

/// Placeholder shown in place of a failed summary, in the report language.
pub fn placeholder(language: Language, report_language: Language) -> String {
    get_translation("summary_failed", report_language).replace("{lang}", language.code())
}

/// Summarise `text` in one regional language.
pub async fn summarize(
    model: &dyn LanguageModel,
    language: Language,
    text: &str,
    config: &AnalysisConfig,
) -> Result<String, SoilError> {
    let system = summary_system_prompt(language).ok_or_else(|| {
        SoilError::InvalidConfig(format!("no summary prompt for language '{language}'"))
    })?;
    let request = CompletionRequest::new(
        format!("summary-{}", language.code()),
        system,
        summary_prompt(text, language),
    )
    .temperature(config.temperatures.summary)
    .max_tokens(config.summary_max_tokens);

    let completion = llm::complete(model, &request, config).await?;
    Ok(postprocess::clean_model_text(&completion.content))
}

/// Run both regional summaries concurrently and wait for both.
///
/// Always returns one [`Summary`] per language in
/// [`Language::SUMMARY_LANGUAGES`] order.
pub async fn summarize_all(
    model: Arc<dyn LanguageModel>,
    text: String,
    config: &AnalysisConfig,
) -> Vec<Summary> {
    let text: Arc<str> = Arc::from(text);

    let handles: Vec<_> = Language::SUMMARY_LANGUAGES
        .iter()
        .map(|&language| {
            let model = Arc::clone(&model);
            let text = Arc::clone(&text);
            let config = config.clone();
            tokio::spawn(async move { summarize(model.as_ref(), language, &text, &config).await })
        })
        .collect();

    let joined = join_all(handles).await;

    Language::SUMMARY_LANGUAGES
        .iter()
        .zip(joined)
        .map(|(&language, result)| {
            let error = match result {
                Ok(Ok(summary)) => {
                    info!("Summary '{}' ready: {} chars", language, summary.len());
                    return Summary {
                        language,
                        text: summary,
                        error: None,
                    };
                }
                Ok(Err(e)) => SummaryError::Generation {
                    language,
                    detail: e.to_string(),
                },
                Err(join_err) => SummaryError::TaskAborted {
                    language,
                    detail: join_err.to_string(),
                },
            };

            warn!("{}", error);
            if let Some(ref cb) = config.progress_callback {
                cb.on_summary_error(language, &error.to_string());
            }
            Summary {
                language,
                text: placeholder(language, config.report_language),
                error: Some(error),
            }
        })
        .collect()
}
