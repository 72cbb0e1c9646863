//! Parameter extraction stage: document text → raw parameter map.
//!
//! The model is asked for a JSON object (see
//! [`crate::prompts::extraction_prompt`]). Whatever comes back is classified
//! into an [`ExtractionOutcome`]; nothing here is fatal. A malformed answer,
//! an error sentinel or even a failed model call still leaves the pipeline
//! with a valid (empty) map to aggregate.

use crate::config::AnalysisConfig;
use crate::model::{CompletionRequest, LanguageModel};
use crate::params::{RawParameterMap, ERROR_KEY, NOT_FOUND_KEY};
use crate::pipeline::{llm, postprocess};
use crate::prompts::{extraction_prompt, EXTRACTION_SYSTEM_PROMPT, NOT_FOUND_MESSAGE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// What the extraction stage produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// A parameter map, in the order the model wrote it.
    Parameters(RawParameterMap),
    /// The model reported that the document holds no parameters.
    NotFound(String),
    /// The answer could not be used.
    Failed(String),
}

impl ExtractionOutcome {
    /// The map to aggregate: the parameters, or an empty map.
    pub fn raw_map(&self) -> RawParameterMap {
        match self {
            ExtractionOutcome::Parameters(map) => map.clone(),
            _ => RawParameterMap::new(),
        }
    }

    pub fn is_parameters(&self) -> bool {
        matches!(self, ExtractionOutcome::Parameters(_))
    }
}

/// The outcome plus the model's verbatim answer (empty if the call failed).
#[derive(Debug, Clone)]
pub struct Extraction {
    pub outcome: ExtractionOutcome,
    pub response: String,
}

/// Classify a model answer.
pub fn parse_extraction(response: &str) -> ExtractionOutcome {
    let candidate = postprocess::extract_json_object(response);
    let value: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(e) => return ExtractionOutcome::Failed(format!("invalid JSON: {e}")),
    };

    let map = match value {
        Value::Object(map) => map,
        other => {
            return ExtractionOutcome::Failed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))
        }
    };

    if let Some(err) = map.get(ERROR_KEY) {
        return ExtractionOutcome::Failed(value_text(err));
    }
    if map.is_empty() {
        return ExtractionOutcome::NotFound(NOT_FOUND_MESSAGE.to_string());
    }
    if map.len() == 1 {
        if let Some(msg) = map.get(NOT_FOUND_KEY) {
            return ExtractionOutcome::NotFound(value_text(msg));
        }
    }
    ExtractionOutcome::Parameters(map)
}

/// Ask the model for the parameters found in `text`.
pub async fn extract_parameters(
    model: &dyn LanguageModel,
    text: &str,
    config: &AnalysisConfig,
) -> Extraction {
    let request = CompletionRequest::new("extraction", EXTRACTION_SYSTEM_PROMPT, extraction_prompt(text))
        .temperature(config.temperatures.extraction)
        .max_tokens(config.max_tokens);

    let response = match llm::complete(model, &request, config).await {
        Ok(c) => c.content,
        Err(e) => {
            warn!("Parameter extraction failed, continuing with no parameters: {}", e);
            return Extraction {
                outcome: ExtractionOutcome::Failed(e.to_string()),
                response: String::new(),
            };
        }
    };
    debug!("Raw extraction response: {}", response);

    let outcome = parse_extraction(&response);
    match &outcome {
        ExtractionOutcome::Parameters(map) => info!("Extracted {} raw parameters", map.len()),
        ExtractionOutcome::NotFound(msg) => info!("No parameters found: {}", msg),
        ExtractionOutcome::Failed(reason) => {
            warn!("Unusable extraction answer, continuing with no parameters: {}", reason)
        }
    }
    Extraction { outcome, response }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
