//! Key normalisation: raw extractor key → `(base, role)`.
//!
//! Underscores become spaces, the result is trimmed, and a trailing `" min"`
//! or `" max"` (compared case-insensitively) marks the key as one side of a
//! range. `"Azote_total Min"`, `"azote total min"` and `" AZOTE TOTAL MIN "`
//! all land on the same base.
//!
//! Known ambiguity: a parameter whose name genuinely ends in the word "min"
//! or "max" is indistinguishable from a range bound. None occur in soil
//! reports, so it is not special-cased.

/// Which part of a parameter a raw key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A standalone value.
    Single,
    /// The lower bound of a range (`"X Min"`).
    Min,
    /// The upper bound of a range (`"X Max"`).
    Max,
}

/// A normalised raw key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalKey {
    /// Comparison identity: lowercased, underscores as spaces, trimmed, range
    /// suffix stripped. Two keys name the same parameter iff their bases match.
    pub base: String,
    /// The trimmed original spelling with the range suffix stripped.
    /// Plain entries are stored under this form.
    pub display: String,
    /// Whether the key is a standalone value or a range bound.
    pub role: Role,
}

const MIN_SUFFIX: &str = " min";
const MAX_SUFFIX: &str = " max";

/// Canonicalise a raw parameter name.
pub fn normalize_key(raw_key: &str) -> CanonicalKey {
    let spaced = raw_key.replace('_', " ");
    let trimmed = spaced.trim();
    let lowered = trimmed.to_lowercase();

    let (role, stem_len) = if lowered.ends_with(MIN_SUFFIX) {
        (Role::Min, trimmed.len() - MIN_SUFFIX.len())
    } else if lowered.ends_with(MAX_SUFFIX) {
        (Role::Max, trimmed.len() - MAX_SUFFIX.len())
    } else {
        (Role::Single, trimmed.len())
    };

    // The suffix is pure ASCII, so cutting the same byte count off the
    // original spelling is safe even when lowercasing changed other bytes.
    let display = trimmed
        .get(..stem_len)
        .unwrap_or(trimmed)
        .trim_end()
        .to_string();

    CanonicalKey {
        base: display.to_lowercase(),
        display,
        role,
    }
}

/// Python-style title case: a letter is upper-cased when it does not follow
/// another letter, lower-cased otherwise. `"azote total"` → `"Azote Total"`,
/// `"c/n"` → `"C/N"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
