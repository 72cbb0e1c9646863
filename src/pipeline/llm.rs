//! Model calls with retry, backoff and a per-call timeout.
//!
//! Every model-backed stage goes through [`complete`]. Prompt text lives in
//! [`crate::prompts`]; this module only owns the call discipline.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`) with 500 ms base and 3 retries waits
//! 500 ms → 1 s → 2 s before giving up. A call that exceeds
//! `api_timeout_secs` counts as a failed attempt.

use crate::config::AnalysisConfig;
use crate::error::SoilError;
use crate::model::{Completion, CompletionRequest, LanguageModel};
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Run `request` against `model`, retrying failed attempts.
///
/// Returns the last failure once `config.max_retries` retries are spent:
/// [`SoilError::StageTimeout`] if the final attempt timed out, otherwise the
/// model's own error.
pub async fn complete(
    model: &dyn LanguageModel,
    request: &CompletionRequest,
    config: &AnalysisConfig,
) -> Result<Completion, SoilError> {
    let start = Instant::now();
    let limit = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<SoilError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                request.stage, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(limit, model.complete(request)).await {
            Ok(Ok(completion)) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    request.stage,
                    completion.input_tokens,
                    completion.output_tokens,
                    start.elapsed()
                );
                return Ok(completion);
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", request.stage, attempt + 1, e);
                last_err = Some(e);
            }
            Err(_) => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    request.stage,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(SoilError::StageTimeout {
                    stage: request.stage.clone(),
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| SoilError::LlmApiError {
        stage: request.stage.clone(),
        message: "Unknown error".to_string(),
    }))
}
