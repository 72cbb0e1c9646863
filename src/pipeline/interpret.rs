//! Interpretation stage: canonical parameters → agronomic reading.

use crate::config::AnalysisConfig;
use crate::error::SoilError;
use crate::model::{CompletionRequest, LanguageModel};
use crate::params::CanonicalMap;
use crate::pipeline::{llm, postprocess};
use crate::prompts::{interpretation_prompt, interpretation_system_prompt};
use tracing::debug;

/// The canonical map as indented JSON (`{"pH": {"valeur": …, "unite": …}}`).
pub fn params_json_pretty(params: &CanonicalMap) -> Result<String, SoilError> {
    serde_json::to_string_pretty(params)
        .map_err(|e| SoilError::Internal(format!("serialise parameters: {e}")))
}

/// The canonical map as single-line JSON.
pub fn params_json_compact(params: &CanonicalMap) -> Result<String, SoilError> {
    serde_json::to_string(params)
        .map_err(|e| SoilError::Internal(format!("serialise parameters: {e}")))
}

/// Interpret `params` in the configured report language.
pub async fn interpret(
    model: &dyn LanguageModel,
    params: &CanonicalMap,
    config: &AnalysisConfig,
) -> Result<String, SoilError> {
    let params_text = params_json_pretty(params)?;
    let request = CompletionRequest::new(
        "interpretation",
        interpretation_system_prompt(config.report_language),
        interpretation_prompt(&params_text),
    )
    .temperature(config.temperatures.interpretation)
    .max_tokens(config.max_tokens);

    let completion = llm::complete(model, &request, config).await?;
    let text = postprocess::clean_model_text(&completion.content);
    debug!("Interpretation: {} chars", text.len());
    Ok(text)
}
