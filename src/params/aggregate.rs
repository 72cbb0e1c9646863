//! The Aggregator: raw extractor map → canonical map.
//!
//! One pass over the raw entries (flattening the `autres_parametres` bucket
//! one level), then a flush of the min/max accumulator.
//!
//! Present behaviour worth knowing about:
//!
//! * Plain entries are keyed by their trimmed original spelling; merged
//!   ranges are keyed by the title-cased base. `"pH"` stays `"pH"` while
//!   `"azote min"` lands under `"Azote"`.
//! * A later plain entry with the same spelling replaces an earlier one
//!   (last write wins). A flushed range whose title-cased key collides with a
//!   plain entry replaces it too.

use super::key::{normalize_key, title_case, Role};
use super::unwrap::unwrap_value;
use super::value::ParamValue;
use super::{
    CanonicalEntry, CanonicalMap, RawParameterMap, OTHER_PARAMETERS_KEY, SENTINEL_KEYS,
};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Partial range under construction for one base name.
#[derive(Debug, Default)]
struct RangeBuilder {
    unit: String,
    min: Option<String>,
    max: Option<String>,
}

impl RangeBuilder {
    fn observe(&mut self, role: Role, unit: String, value: ParamValue) {
        // First non-empty unit wins.
        if self.unit.is_empty() && !unit.is_empty() {
            self.unit = unit;
        }
        let side = Some(value.to_display_string()).filter(|s| !s.is_empty());
        match role {
            Role::Min => self.min = side,
            Role::Max => self.max = side,
            Role::Single => {}
        }
    }

    /// Both sides make a range; a lone side is stored as a plain value.
    fn finish(self) -> Option<CanonicalEntry> {
        let value = match ParamValue::range(self.min, self.max) {
            ParamValue::Range {
                min: Some(side),
                max: None,
            }
            | ParamValue::Range {
                min: None,
                max: Some(side),
            } => ParamValue::Scalar(side),
            other => other,
        };
        if value.is_empty() {
            return None;
        }
        Some(CanonicalEntry {
            value,
            unit: self.unit,
        })
    }
}

/// Local state for one `aggregate` call.
#[derive(Debug, Default)]
struct Aggregation {
    out: CanonicalMap,
    ranges: IndexMap<String, RangeBuilder>,
}

impl Aggregation {
    fn ingest(&mut self, raw_key: &str, raw_value: &Value) {
        if SENTINEL_KEYS.contains(&raw_key) {
            debug!(key = raw_key, "skipping sentinel key");
            return;
        }

        let key = normalize_key(raw_key);
        let (unit, value) = unwrap_value(raw_value);

        match key.role {
            Role::Min | Role::Max => self
                .ranges
                .entry(key.base)
                .or_default()
                .observe(key.role, unit, value),
            Role::Single => {
                if self.out.contains_key(&key.display) {
                    debug!(key = %key.display, "duplicate parameter, keeping the later value");
                }
                self.out.insert(key.display, CanonicalEntry { value, unit });
            }
        }
    }

    fn finish(mut self) -> CanonicalMap {
        for (base, builder) in self.ranges {
            if let Some(entry) = builder.finish() {
                self.out.insert(title_case(&base), entry);
            }
        }
        self.out
    }
}

/// Fold a raw parameter map into the canonical, render-ready structure.
///
/// Never fails: sentinel keys are skipped and unknown value shapes pass
/// through as opaque compounds.
pub fn aggregate(raw: &RawParameterMap) -> CanonicalMap {
    let mut agg = Aggregation::default();

    for (key, value) in raw {
        match value {
            Value::Object(bucket) if key == OTHER_PARAMETERS_KEY => {
                for (inner_key, inner_value) in bucket {
                    agg.ingest(inner_key, inner_value);
                }
            }
            _ => agg.ingest(key, value),
        }
    }

    agg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawParameterMap {
        match v {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn end_to_end_scenario() {
        let out = aggregate(&raw(json!({
            "pH": {"valeur": "6.5", "unite": ""},
            "Azote Min": {"valeur": "0.1", "unite": "%"},
            "Azote Max": {"valeur": "0.3", "unite": "%"}
        })));

        assert_eq!(out.len(), 2);
        assert_eq!(out["pH"].value, ParamValue::scalar("6.5"));
        assert_eq!(out["pH"].unit, "");
        assert_eq!(
            out["Azote"].value,
            ParamValue::range(Some("0.1".into()), Some("0.3".into()))
        );
        assert_eq!(out["Azote"].unit, "%");
    }

    #[test]
    fn lone_min_is_kept() {
        let out = aggregate(&raw(json!({
            "Phosphore Min": {"valeur": "12", "unite": "ppm"}
        })));
        assert_eq!(out["Phosphore"].value, ParamValue::scalar("12"));
        assert_eq!(out["Phosphore"].unit, "ppm");
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({"Phosphore": {"valeur": "12", "unite": "ppm"}})
        );
    }

    #[test]
    fn lone_max_is_kept() {
        let out = aggregate(&raw(json!({"calcium_max": "9"})));
        assert_eq!(out["Calcium"].value, ParamValue::scalar("9"));
    }

    #[test]
    fn first_non_empty_unit_wins_either_order() {
        let a = aggregate(&raw(json!({
            "P Min": {"valeur": "1", "unite": ""},
            "P Max": {"valeur": "9", "unite": "ppm"}
        })));
        assert_eq!(a["P"].unit, "ppm");

        let b = aggregate(&raw(json!({
            "P Max": {"valeur": "9", "unite": "ppm"},
            "P Min": {"valeur": "1", "unite": ""}
        })));
        assert_eq!(b["P"].unit, "ppm");

        let c = aggregate(&raw(json!({
            "P Min": {"valeur": "1", "unite": "mg/kg"},
            "P Max": {"valeur": "9", "unite": "ppm"}
        })));
        assert_eq!(c["P"].unit, "mg/kg");
    }

    #[test]
    fn spelling_variants_merge_into_one_range() {
        let out = aggregate(&raw(json!({
            "Azote_Total_Min": "0.1",
            "azote total MAX": "0.3"
        })));
        assert_eq!(out.len(), 1);
        assert_eq!(out["Azote Total"].value.to_display_string(), "0.1 - 0.3");
    }

    #[test]
    fn bucket_is_flattened_like_top_level() {
        let nested = aggregate(&raw(json!({
            "autres_parametres": {
                "Texture Min": {"valeur": "20", "unite": "%"},
                "Texture Max": {"valeur": "40", "unite": "%"}
            }
        })));
        let flat = aggregate(&raw(json!({
            "Texture Min": {"valeur": "20", "unite": "%"},
            "Texture Max": {"valeur": "40", "unite": "%"}
        })));
        assert_eq!(nested, flat);
        assert_eq!(nested["Texture"].value.to_display_string(), "20 - 40");
    }

    #[test]
    fn bucket_flattens_one_level_only() {
        let out = aggregate(&raw(json!({
            "autres_parametres": {
                "sodium": "0.2",
                "autres_parametres": {"pse": "3"}
            }
        })));
        assert_eq!(out["sodium"].value, ParamValue::scalar("0.2"));
        assert!(matches!(
            out["autres parametres"].value,
            ParamValue::Compound(_)
        ));
        assert!(!out.contains_key("pse"));
    }

    #[test]
    fn non_object_bucket_is_a_plain_entry() {
        let out = aggregate(&raw(json!({"autres_parametres": "aucun"})));
        assert_eq!(out["autres parametres"].value, ParamValue::scalar("aucun"));
    }

    #[test]
    fn sentinels_are_skipped() {
        let out = aggregate(&raw(json!({
            "texte_brut": "Désolé, je n'ai pas trouvé de paramètres",
            "error": "boom",
            "pH": "7"
        })));
        assert_eq!(out.keys().collect::<Vec<_>>(), ["pH"]);
    }

    #[test]
    fn no_result_sentinel_alone_gives_empty_map() {
        let out = aggregate(&raw(json!({"texte_brut": "rien"})));
        assert!(out.is_empty());
    }

    #[test]
    fn duplicate_plain_keys_last_write_wins() {
        let out = aggregate(&raw(json!({
            "pH": "6.1",
            "autres_parametres": {"pH": "6.9"}
        })));
        assert_eq!(out.len(), 1);
        assert_eq!(out["pH"].value, ParamValue::scalar("6.9"));
    }

    #[test]
    fn plain_keys_keep_casing_ranges_are_title_cased() {
        let out = aggregate(&raw(json!({
            "matiere_organique": "2.3",
            "carbone organique min": "1.1"
        })));
        assert!(out.contains_key("matiere organique"));
        assert!(out.contains_key("Carbone Organique"));
    }

    #[test]
    fn plain_entries_precede_flushed_ranges() {
        let out = aggregate(&raw(json!({
            "Azote Min": "0.1",
            "pH": "6",
            "Azote Max": "0.3",
            "CEC": "12"
        })));
        assert_eq!(out.keys().collect::<Vec<_>>(), ["pH", "CEC", "Azote"]);
    }

    #[test]
    fn canonical_flat_map_is_stable() {
        let first = aggregate(&raw(json!({
            "pH": {"valeur": "6.5", "unite": ""},
            "Phosphore": {"valeur": "12, 15", "unite": "ppm"},
            "Texture": {"valeur": {"argile": "30"}, "unite": ""}
        })));
        let reencoded = raw(serde_json::to_value(&first).unwrap());
        let second = aggregate(&reencoded);
        assert_eq!(first, second);
    }

    #[test]
    fn merged_ranges_survive_reaggregation() {
        use crate::language::Language;
        use crate::params::{render_raw, render_table};

        let first = aggregate(&raw(json!({
            "Phosphore Min": {"valeur": "12", "unite": "ppm"},
            "Azote Min": {"valeur": "0.1", "unite": "%"},
            "Azote Max": {"valeur": "0.3", "unite": "%"}
        })));
        let reencoded = raw(serde_json::to_value(&first).unwrap());
        let second = aggregate(&reencoded);
        assert_eq!(first, second);
        assert_eq!(
            render_raw(&reencoded, Language::Fr),
            render_table(&first, Language::Fr)
        );
        assert!(render_raw(&reencoded, Language::Fr)
            .contains("| Phosphore | 12 | ppm |"));
    }

    #[test]
    fn tagged_min_max_on_plain_key_is_a_range() {
        let out = aggregate(&raw(json!({
            "potassium": {"valeur": {"min": "0.4", "max": "7.0"}, "unite": "meq/100g"}
        })));
        assert_eq!(out["potassium"].value.to_display_string(), "0.4 - 7.0");
        assert_eq!(out["potassium"].unit, "meq/100g");
    }

    #[test]
    fn empty_input() {
        assert!(aggregate(&RawParameterMap::new()).is_empty());
    }
}
