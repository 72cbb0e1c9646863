//! The parameter value sum type.
//!
//! The extractor hands us loosely-shaped JSON: bare strings, numbers,
//! multi-sample lists, `{valeur, unite}` wrappers, nested sub-objects. Every
//! shape is folded into one of three variants as soon as it crosses into the
//! crate, and every later stage pattern-matches on [`ParamValue`] instead of
//! poking at JSON.
//!
//! No numeric parsing happens here. `"4.2 - 6.3"` stays the string
//! `"4.2 - 6.3"`; the interpretation model reads it as text.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A normalised parameter value.
///
/// Serialises untagged so the canonical map reads naturally in prompts:
/// a scalar is a JSON string, a range is `{"min": .., "max": ..}`, a compound
/// is a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A single value, a free-form list (`"0.28, 1.53"`) or a textual range.
    Scalar(String),
    /// A lower/upper bound pair. Either side may be missing.
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<String>,
    },
    /// Named sub-values, e.g. texture split into clay / silt / sand.
    Compound(IndexMap<String, ParamValue>),
}

impl ParamValue {
    /// Convenience constructor for scalars.
    pub fn scalar(s: impl Into<String>) -> Self {
        ParamValue::Scalar(s.into())
    }

    /// Build a range, dropping sides that carry nothing.
    pub fn range(min: Option<String>, max: Option<String>) -> Self {
        ParamValue::Range {
            min: min.filter(|s| !s.trim().is_empty()),
            max: max.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Convert an untrusted JSON value.
    ///
    /// Objects become [`ParamValue::Compound`] recursively; arrays are
    /// multi-sample lists and are joined with `", "`; `null` becomes an empty
    /// scalar (which the table later drops).
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ParamValue::Scalar(String::new()),
            Value::Bool(b) => ParamValue::Scalar(b.to_string()),
            Value::Number(n) => ParamValue::Scalar(n.to_string()),
            Value::String(s) => ParamValue::Scalar(s.clone()),
            Value::Array(items) => ParamValue::Scalar(
                items
                    .iter()
                    .map(|item| ParamValue::from_json(item).to_display_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::Object(map) => ParamValue::Compound(
                map.iter()
                    .map(|(k, v)| (k.clone(), ParamValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// True when rendering this value would produce nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Scalar(s) => s.trim().is_empty(),
            ParamValue::Range { min, max } => min.is_none() && max.is_none(),
            ParamValue::Compound(map) => map.is_empty(),
        }
    }

    /// Render to a single display string.
    ///
    /// * range with both sides: `"{min} - {max}"`, otherwise the side present
    /// * compound: `"key: value[unit]"` pairs joined with `", "`
    /// * scalar: verbatim
    pub fn to_display_string(&self) -> String {
        match self {
            ParamValue::Scalar(s) => s.trim().to_string(),
            ParamValue::Range { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => format!("{lo} - {hi}"),
                (Some(side), None) | (None, Some(side)) => side.clone(),
                (None, None) => String::new(),
            },
            ParamValue::Compound(map) => map
                .iter()
                .map(|(k, v)| format!("{k}: {}", render_inner(v)))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// One level into a compound: a `{valeur, unite}` wrapper is shown as the
/// value glued to its unit; anything deeper is stringified as-is.
fn render_inner(value: &ParamValue) -> String {
    if let ParamValue::Compound(map) = value {
        if let Some((inner, unit)) = super::unwrap::split_tagged(map) {
            return format!("{}{}", inner.to_display_string(), unit);
        }
    }
    value.to_display_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_become_strings() {
        assert_eq!(ParamValue::from_json(&json!("6.5")), ParamValue::scalar("6.5"));
        assert_eq!(ParamValue::from_json(&json!(6.5)), ParamValue::scalar("6.5"));
        assert_eq!(ParamValue::from_json(&json!(null)), ParamValue::scalar(""));
    }

    #[test]
    fn json_list_is_joined() {
        let v = ParamValue::from_json(&json!(["4.2", 5.1, null, "6.3"]));
        assert_eq!(v, ParamValue::scalar("4.2, 5.1, 6.3"));
    }

    #[test]
    fn textual_range_is_not_parsed() {
        let v = ParamValue::from_json(&json!("4.2 - 6.3"));
        assert_eq!(v.to_display_string(), "4.2 - 6.3");
    }

    #[test]
    fn range_display() {
        let both = ParamValue::range(Some("0.1".into()), Some("0.3".into()));
        assert_eq!(both.to_display_string(), "0.1 - 0.3");

        let lo = ParamValue::range(Some("0.1".into()), None);
        assert_eq!(lo.to_display_string(), "0.1");

        let hi = ParamValue::range(Some("  ".into()), Some("9".into()));
        assert_eq!(hi.to_display_string(), "9");
    }

    #[test]
    fn compound_display_merges_inner_units() {
        let v = ParamValue::from_json(&json!({
            "argile": {"valeur": "30", "unite": "%"},
            "limon": "45 %",
            "sable": {"detail": "fin"}
        }));
        assert_eq!(
            v.to_display_string(),
            "argile: 30%, limon: 45 %, sable: detail: fin"
        );
    }

    #[test]
    fn emptiness() {
        assert!(ParamValue::scalar("  ").is_empty());
        assert!(ParamValue::range(None, Some(String::new())).is_empty());
        assert!(ParamValue::Compound(IndexMap::new()).is_empty());
        assert!(!ParamValue::scalar("0").is_empty());
    }

    #[test]
    fn serialises_untagged() {
        let v = ParamValue::range(Some("1".into()), Some("2".into()));
        assert_eq!(serde_json::to_value(&v).unwrap(), json!({"min": "1", "max": "2"}));
        assert_eq!(
            serde_json::to_value(ParamValue::scalar("x")).unwrap(),
            json!("x")
        );
    }
}
