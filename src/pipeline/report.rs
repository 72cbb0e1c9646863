//! Final Markdown report assembly.

use crate::language::Language;
use crate::output::StageTimings;
use crate::params::{render_table, CanonicalMap};
use crate::translations::get_translation;

fn secs(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

/// The timing line under the title: total, then each stage.
pub fn timing_line(timings: &StageTimings, language: Language) -> String {
    let t = |key: &str| get_translation(key, language);
    format!(
        "**⏱️ {}:** {} ({}: {} | {}: {} | {}: {} | {}: {})",
        t("analysis_time"),
        secs(timings.report_ms),
        t("timing_ocr"),
        secs(timings.ocr_ms),
        t("timing_extraction"),
        secs(timings.extraction_ms),
        t("timing_analysis"),
        secs(timings.interpretation_ms),
        t("timing_recommendations"),
        secs(timings.recommendation_ms),
    )
}

/// Assemble title, timing line, parameter table, interpretation and
/// recommendations into one Markdown document.
pub fn assemble_report(
    params: &CanonicalMap,
    interpretation: &str,
    recommendations: &str,
    timings: &StageTimings,
    language: Language,
) -> String {
    let t = |key: &str| get_translation(key, language);
    let mut out = String::new();

    out.push_str(&format!("# 🧾 {}\n\n---\n", t("report_title")));
    out.push_str(&timing_line(timings, language));
    out.push_str("\n\n---\n\n");

    out.push_str(&format!("## 🔍 {}\n", t("parameters_title")));
    out.push_str(&render_table(params, language));
    out.push_str("\n\n");

    out.push_str(&format!("## 🌿 {}\n", t("interpretation_title")));
    out.push_str(interpretation.trim());
    out.push_str("\n\n");

    out.push_str(&format!("## 🌾 {}\n", t("recommendations_title")));
    out.push_str(recommendations.trim());
    out.push('\n');
    out
}
