//! Recommendation stage: parameters + interpretation + retrieved notes →
//! amendments and crops.
//!
//! The knowledge base is queried with the compact parameter JSON, the same
//! text the model sees, so retrieval and prompt stay aligned.

use crate::config::AnalysisConfig;
use crate::error::SoilError;
use crate::knowledge::{Passage, Retriever};
use crate::language::Language;
use crate::model::{CompletionRequest, LanguageModel};
use crate::params::CanonicalMap;
use crate::pipeline::interpret::params_json_compact;
use crate::pipeline::{llm, postprocess};
use crate::prompts::{recommendation_prompt, recommendation_system_prompt};
use crate::translations::get_translation;
use tracing::{debug, info};

/// Join retrieved passages, one per line, or the localised
/// "no document" line when there are none.
pub fn format_context(passages: &[Passage], language: Language) -> String {
    if passages.is_empty() {
        return get_translation("no_knowledge", language);
    }
    passages
        .iter()
        .map(|p| p.text.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Produce recommendations for `params` given their interpretation.
pub async fn recommend(
    model: &dyn LanguageModel,
    retriever: &dyn Retriever,
    params: &CanonicalMap,
    interpretation: &str,
    config: &AnalysisConfig,
) -> Result<String, SoilError> {
    let params_text = params_json_compact(params)?;

    let passages = retriever.retrieve(&params_text, config.top_k).await?;
    info!("Retrieved {} knowledge passages", passages.len());
    for p in &passages {
        debug!("  {} (score {:.3})", p.id, p.score);
    }
    let context = format_context(&passages, config.report_language);

    let request = CompletionRequest::new(
        "recommendation",
        recommendation_system_prompt(config.report_language),
        recommendation_prompt(&params_text, interpretation, &context),
    )
    .temperature(config.temperatures.recommendation)
    .max_tokens(config.max_tokens);

    let completion = llm::complete(model, &request, config).await?;
    Ok(postprocess::clean_model_text(&completion.content))
}
