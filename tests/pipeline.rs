//! Offline end-to-end tests of the analysis pipeline.
//!
//! A scripted model answers each stage by name, so the whole flow from
//! report text to payload runs without a provider or a PDF.

use async_trait::async_trait;
use soilsmart::{
    analyze_text, AnalysisConfig, AnalysisProgressCallback, Completion, CompletionRequest,
    ExtractionOutcome, Language, LanguageModel, SoilError, Stage, StaticRetriever, SummaryError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const REPORT_TEXT: &str = "Laboratoire de Thiès\npH eau 6,5\nAzote total 0,1 à 0,3 %\n";

const EXTRACTION_JSON: &str = r#"```json
{
  "pH": {"valeur": "6.5", "unite": ""},
  "Azote Min": {"valeur": "0.1", "unite": "%"},
  "Azote Max": {"valeur": "0.3", "unite": "%"},
  "autres_parametres": {"Calcaire": {"valeur": "2", "unite": "%"}}
}
```"#;

/// Answers by stage name; stages listed in `failing` return an API error.
struct ScriptedModel {
    answers: HashMap<&'static str, String>,
    failing: Vec<&'static str>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    fn new(extraction: &str) -> Self {
        let mut answers = HashMap::new();
        answers.insert("extraction", extraction.to_string());
        answers.insert("interpretation", "### Qualité générale\nSol légèrement acide.".to_string());
        answers.insert("recommendation", "Apporter 2 t/ha de compost. Cultiver le mil.".to_string());
        answers.insert("summary-wo", "Suuf bi baax na.".to_string());
        answers.insert("summary-bm", "Dugukolo ka ɲi.".to_string());
        Self {
            answers,
            failing: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(mut self, stage: &'static str) -> Self {
        self.failing.push(stage);
        self
    }

    fn request(&self, stage: &str) -> Option<CompletionRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.stage == stage)
            .cloned()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, SoilError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.stage.as_str()) {
            return Err(SoilError::LlmApiError {
                stage: request.stage.clone(),
                message: "503 Service Unavailable".into(),
            });
        }
        self.answers
            .get(request.stage.as_str())
            .map(|a| Completion::text(a.clone()))
            .ok_or_else(|| SoilError::Internal(format!("unscripted stage {}", request.stage)))
    }
}

fn config_for(model: Arc<ScriptedModel>) -> soilsmart::AnalysisConfigBuilder {
    AnalysisConfig::builder()
        .language_model(model)
        .retriever(Arc::new(StaticRetriever::new([
            "Le mil tolère les sols sableux et légèrement acides.",
        ])))
        .max_retries(0)
        .retry_backoff_ms(0)
}

#[tokio::test]
async fn full_analysis_produces_report_and_both_summaries() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    let output = analyze_text(REPORT_TEXT, &config).await.unwrap();

    assert!(output.extraction.is_parameters());
    assert_eq!(output.parameters.len(), 3);
    assert!(output.report.starts_with("# 🧾 RAPPORT D'ANALYSE DE SOL"));
    assert!(output.report.contains("| Azote | 0.1 - 0.3 | % |"));
    assert!(output.report.contains("Sol légèrement acide."));
    assert!(output.report.contains("Cultiver le mil."));
    assert_eq!(output.timings.ocr_ms, 0);

    let payload = output.payload();
    assert_eq!(payload.report, output.report);
    assert_eq!(payload.summary_wo, "Suuf bi baax na.");
    assert_eq!(payload.summary_bm, "Dugukolo ka ɲi.");
    assert!(output.summary_errors().is_empty());
}

#[tokio::test]
async fn retrieved_passages_reach_the_recommendation_prompt() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    analyze_text(REPORT_TEXT, &config).await.unwrap();

    let request = model.request("recommendation").unwrap();
    assert!(request.user.contains("Le mil tolère les sols sableux"));
    assert!(request.user.contains("Sol légèrement acide."));
}

#[tokio::test]
async fn summaries_read_interpretation_and_recommendations() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    analyze_text(REPORT_TEXT, &config).await.unwrap();

    for stage in ["summary-wo", "summary-bm"] {
        let request = model.request(stage).unwrap();
        assert!(request.user.contains("Sol légèrement acide."), "{stage}");
        assert!(request.user.contains("Cultiver le mil."), "{stage}");
        assert_eq!(request.max_tokens, 500);
    }
}

#[tokio::test]
async fn failed_summary_is_isolated() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON).failing("summary-bm"));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    let output = analyze_text(REPORT_TEXT, &config).await.unwrap();

    let payload = output.payload();
    assert_eq!(payload.summary_wo, "Suuf bi baax na.");
    assert_eq!(payload.summary_bm, "Erreur lors de la génération du résumé bm.");
    assert!(payload.report.contains("| Azote | 0.1 - 0.3 | % |"));

    let errors = output.summary_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], SummaryError::Generation { .. }));
    assert_eq!(errors[0].language(), Language::Bm);
}

#[tokio::test]
async fn not_found_sentinel_yields_an_empty_table() {
    let model = Arc::new(ScriptedModel::new(
        r#"{"texte_brut": "Aucun paramètre trouvé dans le document."}"#,
    ));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    let output = analyze_text(REPORT_TEXT, &config).await.unwrap();

    assert!(matches!(output.extraction, ExtractionOutcome::NotFound(_)));
    assert!(output.parameters.is_empty());
    assert!(output
        .report
        .contains("| Paramètre | Valeur | Unité |\n|-----------|--------|-------|\n\n"));
}

#[tokio::test]
async fn malformed_extraction_is_not_fatal() {
    let model = Arc::new(ScriptedModel::new("Voici les paramètres : pH 6.5, azote 0.2 %"));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    let output = analyze_text(REPORT_TEXT, &config).await.unwrap();

    assert!(matches!(output.extraction, ExtractionOutcome::Failed(_)));
    assert!(output.parameters.is_empty());
    assert!(output.report.contains("Cultiver le mil."));
}

#[tokio::test]
async fn failed_extraction_call_is_not_fatal() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON).failing("extraction"));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    let output = analyze_text(REPORT_TEXT, &config).await.unwrap();

    assert!(matches!(output.extraction, ExtractionOutcome::Failed(_)));
    assert!(output.parameters.is_empty());
}

#[tokio::test]
async fn failed_interpretation_is_fatal() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON).failing("interpretation"));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    let err = analyze_text(REPORT_TEXT, &config).await.unwrap_err();

    assert!(matches!(err, SoilError::LlmApiError { ref stage, .. } if stage == "interpretation"));
    assert!(model.request("summary-wo").is_none());
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl AnalysisProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start {stage}"));
    }

    fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
        self.events.lock().unwrap().push(format!("done {stage}"));
    }

    fn on_summary_error(&self, language: Language, _error: &str) {
        self.events.lock().unwrap().push(format!("summary error {language}"));
    }

    fn on_analysis_complete(&self, _total_ms: u64) {
        self.events.lock().unwrap().push("complete".into());
    }
}

#[tokio::test]
async fn progress_events_follow_the_stages() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON).failing("summary-wo"));
    let recorder = Arc::new(Recorder::default());
    let config = config_for(Arc::clone(&model))
        .progress_callback(Arc::clone(&recorder) as Arc<dyn AnalysisProgressCallback>)
        .build()
        .unwrap();

    analyze_text(REPORT_TEXT, &config).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start parameter extraction",
            "done parameter extraction",
            "start interpretation",
            "done interpretation",
            "start recommendation",
            "done recommendation",
            "start summaries",
            "summary error wo",
            "done summaries",
            "complete",
        ]
    );
}

#[tokio::test]
async fn debug_dir_receives_text_and_raw_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let debug_dir = dir.path().join("debug");
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON));
    let config = config_for(Arc::clone(&model))
        .debug_dir(&debug_dir)
        .build()
        .unwrap();

    analyze_text(REPORT_TEXT, &config).await.unwrap();

    let text = std::fs::read_to_string(debug_dir.join("extracted_text.txt")).unwrap();
    assert_eq!(text, REPORT_TEXT);
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(debug_dir.join("raw_parameters.json")).unwrap())
            .unwrap();
    assert_eq!(raw["Azote Min"]["valeur"], "0.1");
}

#[tokio::test]
async fn report_language_switches_headings() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON));
    let config = config_for(Arc::clone(&model))
        .report_language(Language::Wo)
        .build()
        .unwrap();

    let output = analyze_text(REPORT_TEXT, &config).await.unwrap();

    assert!(!output.report.contains("RAPPORT D'ANALYSE DE SOL"));
    let request = model.request("interpretation").unwrap();
    assert!(request.system.contains("WOLOF"));
}

#[test]
fn analysis_runs_from_sync_code() {
    let model = Arc::new(ScriptedModel::new(EXTRACTION_JSON));
    let config = config_for(Arc::clone(&model)).build().unwrap();

    let output = tokio_test::block_on(analyze_text(REPORT_TEXT, &config)).unwrap();

    assert_eq!(output.summaries.len(), 2);
}

#[test]
fn analyze_sync_reports_missing_files() {
    let err = soilsmart::analyze_sync("/nonexistent/analyse.pdf", &AnalysisConfig::default())
        .unwrap_err();
    assert!(matches!(err, SoilError::FileNotFound { .. }));
}
