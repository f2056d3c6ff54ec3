//! Language detection by character class
//!
//! Classification is intentionally coarse: the first matching script wins,
//! and anything unrecognised is treated as English.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Languages the prompt templates and sanitizer know about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
    Ja,
    De,
    Es,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::En,
        Language::Zh,
        Language::Ja,
        Language::De,
        Language::Es,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
            Language::Ja => "ja",
            Language::De => "de",
            Language::Es => "es",
        }
    }

    /// Looks up a language by its two-letter code (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code.trim()))
    }

    /// English name used when a prompt mandates the output language
    pub fn english_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Zh => "Chinese",
            Language::Ja => "Japanese",
            Language::De => "German",
            Language::Es => "Spanish",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Ordered script tests; the first match decides
fn script_tests() -> &'static [(Regex, Language)] {
    static TESTS: OnceLock<Vec<(Regex, Language)>> = OnceLock::new();
    TESTS.get_or_init(|| {
        [
            (r"[\x{3040}-\x{309F}\x{30A0}-\x{30FF}]", Language::Ja),
            (r"[\x{4E00}-\x{9FFF}]", Language::Zh),
            (r"[äöüßÄÖÜ]", Language::De),
            (r"[ñÑáéíóúÁÉÍÓÚ¿¡]", Language::Es),
            (r#"^[A-Za-z0-9\s.,!?'"()\-:;]+$"#, Language::En),
        ]
        .into_iter()
        .map(|(pattern, lang)| (Regex::new(pattern).expect("script pattern"), lang))
        .collect()
    })
}

/// Classifies `text` into one of the supported languages
///
/// Kana is checked before the CJK block so that Japanese containing kanji is
/// not reported as Chinese. German umlauts are checked before Spanish
/// diacritics because `ü` belongs to both sets.
pub fn detect_language(text: &str) -> Language {
    script_tests()
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, lang)| *lang)
        .unwrap_or(Language::En)
}
