//! The Table Renderer: canonical map → Markdown table.
//!
//! Rendering reads the canonical map only. Raw extractor output goes through
//! [`aggregate`](super::aggregate) first (see [`render_raw`]), so the table and
//! the prompts can never disagree about what a parameter is.

use super::{aggregate, CanonicalMap, RawParameterMap};
use crate::language::Language;
use crate::translations::{get_translation, translate_parameter_name};
use serde::Serialize;

/// One row of the parameter table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub label: String,
    pub value: String,
    pub unit: String,
}

/// Build display rows in canonical-map order.
///
/// Entries whose value renders to nothing are dropped, not shown blank.
pub fn display_rows(params: &CanonicalMap, language: Language) -> Vec<DisplayRow> {
    params
        .iter()
        .filter_map(|(name, entry)| {
            let value = entry.value.to_display_string();
            if value.is_empty() {
                return None;
            }
            Some(DisplayRow {
                label: translate_parameter_name(name, language),
                value: escape_cell(&value),
                unit: escape_cell(entry.unit.trim()),
            })
        })
        .collect()
}

/// Render the canonical map as a Markdown table: header, separator, one row
/// per non-empty parameter.
pub fn render_table(params: &CanonicalMap, language: Language) -> String {
    let mut lines = Vec::with_capacity(params.len() + 2);
    lines.push(format!(
        "| {} | {} | {} |",
        get_translation("parameter", language),
        get_translation("value", language),
        get_translation("unit", language),
    ));
    lines.push("|-----------|--------|-------|".to_string());

    for row in display_rows(params, language) {
        lines.push(format!("| {} | {} | {} |", row.label, row.value, row.unit));
    }

    lines.join("\n")
}

/// Aggregate raw extractor output, then render it.
pub fn render_raw(raw: &RawParameterMap, language: Language) -> String {
    render_table(&aggregate(raw), language)
}

/// A literal `|` would split the cell; newlines would end the row.
fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CanonicalEntry, ParamValue};
    use serde_json::json;

    fn raw(v: serde_json::Value) -> RawParameterMap {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn end_to_end_scenario_row() {
        let table = render_raw(
            &raw(json!({
                "pH": {"valeur": "6.5", "unite": ""},
                "Azote Min": {"valeur": "0.1", "unite": "%"},
                "Azote Max": {"valeur": "0.3", "unite": "%"}
            })),
            Language::Fr,
        );
        assert!(table.contains("| Azote | 0.1 - 0.3 | % |"), "{table}");
        assert!(table.contains("| pH | 6.5 |  |"), "{table}");
    }

    #[test]
    fn header_and_separator_only_for_sentinel() {
        let table = render_raw(&raw(json!({"texte_brut": "rien trouvé"})), Language::Fr);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2, "{table}");
        assert_eq!(lines[0], "| Paramètre | Valeur | Unité |");
        assert_eq!(lines[1], "|-----------|--------|-------|");
    }

    #[test]
    fn localised_header() {
        let table = render_table(&CanonicalMap::new(), Language::Wo);
        assert!(table.starts_with("| Paramètre | Njariñ | Unité |"));
    }

    #[test]
    fn empty_values_are_dropped() {
        let mut params = CanonicalMap::new();
        params.insert("Sodium".into(), CanonicalEntry::new(ParamValue::scalar(""), "meq"));
        params.insert("Calcium".into(), CanonicalEntry::new(ParamValue::scalar("4"), "meq"));
        let rows = display_rows(&params, Language::Fr);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "Calcium");
    }

    #[test]
    fn compound_is_flattened_into_one_cell() {
        let table = render_raw(
            &raw(json!({
                "texture": {
                    "valeur": {
                        "argile": {"valeur": "30", "unite": "%"},
                        "limon": {"valeur": "45", "unite": "%"},
                        "classe": "limoneuse"
                    },
                    "unite": ""
                }
            })),
            Language::Fr,
        );
        assert!(
            table.contains("| Texture | argile: 30%, limon: 45%, classe: limoneuse |  |"),
            "{table}"
        );
    }

    #[test]
    fn lone_bound_renders_alone() {
        let table = render_raw(&raw(json!({"Potassium Max": {"valeur": "7", "unite": "meq/100g"}})), Language::Fr);
        assert!(table.contains("| Potassium | 7 | meq/100g |"), "{table}");
    }

    #[test]
    fn rows_follow_canonical_order() {
        let rows = display_rows(
            &aggregate(&raw(json!({"potassium": "1", "calcium": "2", "sodium": "3"}))),
            Language::Fr,
        );
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Potassium", "Calcium", "Sodium"]);
    }

    #[test]
    fn pipes_are_escaped() {
        let mut params = CanonicalMap::new();
        params.insert("note".into(), CanonicalEntry::new(ParamValue::scalar("a | b"), ""));
        assert!(render_table(&params, Language::Fr).contains("a \\| b"));
    }
}
