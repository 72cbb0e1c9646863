//! Parameter normalisation and aggregation.
//!
//! The extraction model returns loosely-structured JSON: arbitrary key
//! spellings, single values, multi-sample lists, textual ranges, `X Min` /
//! `X Max` pairs, nested sub-objects and a catch-all `autres_parametres`
//! bucket. This module folds all of it into one [`CanonicalMap`] that both
//! the prompts and the Markdown table consume.
//!
//! ## Data Flow
//!
//! ```text
//! RawParameterMap ──▶ key::normalize_key ─┐
//!                 └─▶ unwrap::unwrap_value ┴─▶ aggregate ──▶ CanonicalMap ──▶ table
//! ```
//!
//! Everything here is pure and synchronous; no state survives a call.

pub mod aggregate;
pub mod key;
pub mod table;
pub mod unwrap;
pub mod value;

use indexmap::IndexMap;
use serde::Serialize;

pub use aggregate::aggregate;
pub use key::{normalize_key, CanonicalKey, Role};
pub use table::{display_rows, render_raw, render_table, DisplayRow};
pub use unwrap::unwrap_value;
pub use value::ParamValue;

/// The extractor's output, key order preserved.
pub type RawParameterMap = serde_json::Map<String, serde_json::Value>;

/// Canonical parameters keyed by display name, in processing order.
pub type CanonicalMap = IndexMap<String, CanonicalEntry>;

/// Raw key whose object value holds miscellaneous parameters.
pub const OTHER_PARAMETERS_KEY: &str = "autres_parametres";

/// Raw key the extractor uses when it found nothing.
pub const NOT_FOUND_KEY: &str = "texte_brut";

/// Raw key the extractor uses to report a failure.
pub const ERROR_KEY: &str = "error";

/// Keys excluded from normalisation.
pub const SENTINEL_KEYS: &[&str] = &[NOT_FOUND_KEY, ERROR_KEY];

/// One canonical parameter.
///
/// Serialises with the French field names the prompts were written around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalEntry {
    #[serde(rename = "valeur")]
    pub value: ParamValue,
    #[serde(rename = "unite")]
    pub unit: String,
}

impl CanonicalEntry {
    pub fn new(value: ParamValue, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}
