//! Value unwrapping: raw extractor value → `(unit, value)`.
//!
//! Rules, applied in order:
//!
//! 1. Anything that is not an object passes through with an empty unit.
//! 2. An object with a value field (`valeur` / `value`) yields its unit field
//!    (`unite` / `unité` / `unit`, default empty). If the value field is itself
//!    an object holding exactly `min` and `max`, that becomes a range;
//!    otherwise the value field passes through untouched, nested objects
//!    included.
//! 3. An object without a value field is an opaque compound with an empty
//!    unit.

use super::value::ParamValue;
use indexmap::IndexMap;
use serde_json::Value;

/// Field names the extractor uses for the wrapped value.
pub const VALUE_FIELDS: &[&str] = &["valeur", "value"];

/// Field names the extractor uses for the unit.
pub const UNIT_FIELDS: &[&str] = &["unite", "unité", "unit"];

/// Unwrap a raw JSON value into its unit and normalised value.
pub fn unwrap_value(raw: &Value) -> (String, ParamValue) {
    unwrap_param(ParamValue::from_json(raw))
}

/// Same rules as [`unwrap_value`], on an already-converted value.
pub fn unwrap_param(value: ParamValue) -> (String, ParamValue) {
    let ParamValue::Compound(map) = value else {
        return (String::new(), value);
    };

    match split_tagged(&map) {
        Some((inner, unit)) => (unit, as_range(inner).unwrap_or_else(|| inner.clone())),
        None => (String::new(), ParamValue::Compound(map)),
    }
}

/// If `map` is a `{valeur, unite}` wrapper, return the wrapped value and its
/// unit (empty when the unit field is absent or blank).
pub(crate) fn split_tagged(map: &IndexMap<String, ParamValue>) -> Option<(&ParamValue, String)> {
    let inner = VALUE_FIELDS.iter().find_map(|f| map.get(*f))?;
    let unit = UNIT_FIELDS
        .iter()
        .find_map(|f| map.get(*f))
        .map(ParamValue::to_display_string)
        .unwrap_or_default();
    Some((inner, unit))
}

/// A compound holding exactly `min` and `max` is a range.
fn as_range(value: &ParamValue) -> Option<ParamValue> {
    let ParamValue::Compound(map) = value else {
        return None;
    };
    if map.len() != 2 {
        return None;
    }
    let min = map.get("min")?;
    let max = map.get("max")?;
    Some(ParamValue::range(
        Some(min.to_display_string()),
        Some(max.to_display_string()),
    ))
}
