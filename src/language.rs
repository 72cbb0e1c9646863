//! Report and summary languages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A language the report or a summary can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// French, the language of the full report.
    #[default]
    Fr,
    /// Wolof (Senegal).
    Wo,
    /// Bambara (Mali).
    Bm,
}

impl Language {
    /// The two regional languages every analysis is summarised into.
    pub const SUMMARY_LANGUAGES: [Language; 2] = [Language::Wo, Language::Bm];

    /// Two-letter code used in payload field names (`summary_wo`).
    pub fn code(self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::Wo => "wo",
            Language::Bm => "bm",
        }
    }

    /// Name of the language in running French text ("Wolof").
    pub fn name(self) -> &'static str {
        match self {
            Language::Fr => "Français",
            Language::Wo => "Wolof",
            Language::Bm => "Bambara",
        }
    }

    /// Name of the language as written inside French prompts.
    pub fn prompt_name(self) -> &'static str {
        match self {
            Language::Fr => "FRANÇAIS",
            Language::Wo => "WOLOF",
            Language::Bm => "BAMBARA",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fr" | "french" | "francais" | "français" => Ok(Language::Fr),
            "wo" | "wolof" => Ok(Language::Wo),
            "bm" | "bambara" => Ok(Language::Bm),
            other => Err(format!(
                "Unknown language '{other}'. Valid options: fr, wo, bm"
            )),
        }
    }
}
