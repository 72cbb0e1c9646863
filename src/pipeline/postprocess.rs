//! Post-processing: deterministic cleanup of model output.
//!
//! Two consumers with different needs:
//!
//! - Free-text stages (OCR transcription, interpretation, recommendations,
//!   summaries) go through [`clean_model_text`], which strips wrapping
//!   fences and normalises whitespace without touching content.
//! - The extraction stage goes through [`extract_json_object`], which
//!   isolates the JSON object the model was asked to return, even when it
//!   is wrapped in a ```` ```json ```` fence or surrounded by chatter.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence
//! regex sees the raw text; invisible characters go last so no rule
//! re-introduces them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every text rule to a free-text model answer.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Ensure heading lines have a blank line before them
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Trim the whole answer
pub fn clean_model_text(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = normalise_heading_spacing(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md|text)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Normalise heading spacing ────────────────────────────────────────

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with(' ')
}

fn normalise_heading_spacing(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 64);
    for (i, line) in input.lines().enumerate() {
        if is_heading(line) && i > 0 {
            let trimmed = result.trim_end_matches('\n');
            result.truncate(trimmed.len());
            result.push_str("\n\n");
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── JSON isolation ───────────────────────────────────────────────────────────

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Isolate the JSON object inside a model answer.
///
/// 1. A fenced block (```` ```json {…} ``` ````) wins.
/// 2. Otherwise the span from the first `{` to the last `}`.
/// 3. Otherwise the trimmed answer, left for the parser to reject.
pub fn extract_json_object(raw: &str) -> &str {
    if let Some(inner) = RE_JSON_FENCE.captures(raw).and_then(|c| c.get(1)) {
        return inner.as_str();
    }
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n### 1. État\nBon\n```";
        assert_eq!(strip_markdown_fences(input), "### 1. État\nBon");
    }

    #[test]
    fn test_no_fences_passthrough() {
        assert_eq!(strip_markdown_fences("Sól si baax na"), "Sól si baax na");
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_heading_spacing() {
        let result = normalise_heading_spacing("texte\n### 2. Analyse\nsuite");
        assert!(result.contains("texte\n\n### 2. Analyse\n"));
        // "#hashtag" and "####### x" are not headings
        assert!(!is_heading("#pH"));
        assert!(!is_heading("####### x"));
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("a\u{200B}b\u{FEFF}c"), "abc");
    }

    #[test]
    fn test_clean_model_text() {
        let input = "```\n### 1. Corrections\r\n- Chaux   \n\n\n\n\n\n### 2. Cultures\n```\n";
        let out = clean_model_text(input);
        assert!(out.starts_with("### 1. Corrections\n- Chaux\n"));
        assert!(out.ends_with("### 2. Cultures"));
        assert!(!out.contains("\n\n\n\n"));
    }

    #[test]
    fn json_from_fence() {
        let raw = "Voici:\n```json\n{\"pH\": {\"valeur\": \"6.5\"}}\n```\nMerci";
        assert_eq!(extract_json_object(raw), "{\"pH\": {\"valeur\": \"6.5\"}}");
    }

    #[test]
    fn json_from_surrounding_text() {
        let raw = "Résultat : {\"a\": 1} fin";
        assert_eq!(extract_json_object(raw), "{\"a\": 1}");
    }

    #[test]
    fn json_absent_returns_trimmed_text() {
        assert_eq!(extract_json_object("  pas de json  "), "pas de json");
    }
}
