//! Static language data: profiles, script ranges, lexical markers
//!
//! Kept apart from the matching logic in the parent module so either can be
//! extended on its own. Compiled structures are built once on first use.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Reference data for one language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageProfile {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    /// Languages easily confused with this one
    pub similar: &'static [&'static str],
    /// Whether the assistant fully supports this language
    pub supported: bool,
}

pub(crate) const DEFAULT_LANGUAGE: &str = "en";

pub(crate) static PROFILES: &[LanguageProfile] = &[
    LanguageProfile { code: "en", name: "English", native_name: "English", similar: &[], supported: true },
    LanguageProfile { code: "hi", name: "Hindi", native_name: "हिन्दी", similar: &["mr", "ne", "sa", "ur"], supported: true },
    LanguageProfile { code: "mr", name: "Marathi", native_name: "मराठी", similar: &["hi", "kok"], supported: true },
    LanguageProfile { code: "ne", name: "Nepali", native_name: "नेपाली", similar: &["hi"], supported: true },
    LanguageProfile { code: "sa", name: "Sanskrit", native_name: "संस्कृतम्", similar: &["hi", "mr"], supported: true },
    LanguageProfile { code: "bn", name: "Bengali", native_name: "বাংলা", similar: &["as"], supported: true },
    LanguageProfile { code: "as", name: "Assamese", native_name: "অসমীয়া", similar: &["bn"], supported: true },
    LanguageProfile { code: "pa", name: "Punjabi", native_name: "ਪੰਜਾਬੀ", similar: &[], supported: true },
    LanguageProfile { code: "gu", name: "Gujarati", native_name: "ગુજરાતી", similar: &[], supported: true },
    LanguageProfile { code: "or", name: "Odia", native_name: "ଓଡ଼ିଆ", similar: &[], supported: true },
    LanguageProfile { code: "ta", name: "Tamil", native_name: "தமிழ்", similar: &[], supported: true },
    LanguageProfile { code: "te", name: "Telugu", native_name: "తెలుగు", similar: &["kn"], supported: true },
    LanguageProfile { code: "kn", name: "Kannada", native_name: "ಕನ್ನಡ", similar: &["te"], supported: true },
    LanguageProfile { code: "ml", name: "Malayalam", native_name: "മലയാളം", similar: &["ta"], supported: true },
    // Recognised but not supported for replies
    LanguageProfile { code: "ur", name: "Urdu", native_name: "اردو", similar: &["hi"], supported: false },
    LanguageProfile { code: "kok", name: "Konkani", native_name: "कोंकणी", similar: &["mr"], supported: false },
    LanguageProfile { code: "mai", name: "Maithili", native_name: "मैथिली", similar: &["hi"], supported: false },
    LanguageProfile { code: "sd", name: "Sindhi", native_name: "سنڌي", similar: &["ur"], supported: false },
    LanguageProfile { code: "si", name: "Sinhala", native_name: "සිංහල", similar: &[], supported: false },
];

static PROFILE_INDEX: Lazy<HashMap<&'static str, &'static LanguageProfile>> =
    Lazy::new(|| PROFILES.iter().map(|p| (p.code, p)).collect());

pub(crate) fn profile(code: &str) -> Option<&'static LanguageProfile> {
    PROFILE_INDEX.get(code).copied()
}

/// Writing systems with a dedicated Unicode block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
}

pub(crate) struct ScriptInfo {
    pub script: Script,
    pub start: u32,
    pub end: u32,
    /// Languages written in this script; the first is the default
    pub languages: &'static [&'static str],
}

pub(crate) static SCRIPTS: &[ScriptInfo] = &[
    ScriptInfo { script: Script::Devanagari, start: 0x0900, end: 0x097F, languages: &["hi", "mr", "ne", "sa"] },
    ScriptInfo { script: Script::Bengali, start: 0x0980, end: 0x09FF, languages: &["bn", "as"] },
    ScriptInfo { script: Script::Gurmukhi, start: 0x0A00, end: 0x0A7F, languages: &["pa"] },
    ScriptInfo { script: Script::Gujarati, start: 0x0A80, end: 0x0AFF, languages: &["gu"] },
    ScriptInfo { script: Script::Oriya, start: 0x0B00, end: 0x0B7F, languages: &["or"] },
    ScriptInfo { script: Script::Tamil, start: 0x0B80, end: 0x0BFF, languages: &["ta"] },
    ScriptInfo { script: Script::Telugu, start: 0x0C00, end: 0x0C7F, languages: &["te"] },
    ScriptInfo { script: Script::Kannada, start: 0x0C80, end: 0x0CFF, languages: &["kn"] },
    ScriptInfo { script: Script::Malayalam, start: 0x0D00, end: 0x0D7F, languages: &["ml"] },
];

/// Function words and grammatical markers for languages sharing a script
static LEXICAL_MARKERS: &[(&str, &[&str])] = &[
    ("hi", &[
        "है", "हैं", "नहीं", "में", "का", "की", "के", "और", "मैं", "क्या", "था", "थी",
        "हूँ", "हूं", "रहा", "रही", "चाहता", "चाहती", "करना", "लेकिन",
    ]),
    ("mr", &[
        "आहे", "आहेत", "नाही", "मी", "आणि", "मला", "तुम्ही", "काय", "होते", "होता",
        "पाहिजे", "आम्ही", "माझे", "माझा", "माझी", "करायचे",
    ]),
    ("ne", &[
        "छ", "छन्", "छैन", "हो", "होइन", "मेरो", "तपाईं", "तपाईंको", "गर्न", "भएको",
        "पनि", "हुन्छ", "थियो", "म",
    ]),
    ("sa", &[
        "अस्ति", "सन्ति", "अहम्", "त्वम्", "भवति", "एव", "इति", "तत्", "किम्", "वयम्",
        "अस्माकम्", "नमः",
    ]),
    ("bn", &[
        "আমি", "এবং", "কিন্তু", "হবে", "করি", "আপনি", "কী", "ছিল", "আমার", "চাই",
        "করতে", "নেই", "আমাকে",
    ]),
    ("as", &[
        "মই", "আৰু", "নাই", "কৰা", "কৰিব", "মোৰ", "নহয়", "আছিল", "এইটো", "কিয়",
        "বিচাৰো", "কৰিছো", "মোক",
    ]),
];

/// One compiled alternation per language, matching whole words only
pub(crate) static LEXICAL_PATTERNS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    LEXICAL_MARKERS
        .iter()
        .filter_map(|(code, words)| {
            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&format!(r"\b(?:{})\b", alternation)) {
                Ok(regex) => Some((*code, regex)),
                Err(e) => {
                    tracing::error!(language = code, "Invalid lexical pattern: {}", e);
                    None
                }
            }
        })
        .collect()
});

/// Language names as reported by Whisper's verbose output
static WHISPER_LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("english", "en"),
    ("hindi", "hi"),
    ("marathi", "mr"),
    ("nepali", "ne"),
    ("sanskrit", "sa"),
    ("bengali", "bn"),
    ("bangla", "bn"),
    ("assamese", "as"),
    ("punjabi", "pa"),
    ("panjabi", "pa"),
    ("gujarati", "gu"),
    ("odia", "or"),
    ("oriya", "or"),
    ("tamil", "ta"),
    ("telugu", "te"),
    ("kannada", "kn"),
    ("malayalam", "ml"),
    ("urdu", "ur"),
    ("sindhi", "sd"),
    ("sinhala", "si"),
    ("sinhalese", "si"),
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("portuguese", "pt"),
    ("arabic", "ar"),
    ("chinese", "zh"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("russian", "ru"),
    ("italian", "it"),
    ("dutch", "nl"),
    ("turkish", "tr"),
    ("polish", "pl"),
    ("ukrainian", "uk"),
    ("persian", "fa"),
    ("indonesian", "id"),
    ("malay", "ms"),
    ("thai", "th"),
    ("vietnamese", "vi"),
    ("swahili", "sw"),
    ("cantonese", "yue"),
];

pub(crate) fn code_for_name(name: &str) -> Option<&'static str> {
    WHISPER_LANGUAGE_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_patterns_compile_for_every_shared_script_language() {
        for info in SCRIPTS.iter().filter(|s| s.languages.len() > 1) {
            for code in info.languages {
                assert!(
                    LEXICAL_PATTERNS.contains_key(code),
                    "missing patterns for {}",
                    code
                );
            }
        }
    }

    #[test]
    fn test_every_script_language_has_supported_profile() {
        for info in SCRIPTS {
            for code in info.languages {
                let profile = profile(code).expect("profile");
                assert!(profile.supported, "{} should be supported", code);
            }
        }
    }

    #[test]
    fn test_similar_codes_have_profiles() {
        for p in PROFILES {
            for similar in p.similar {
                assert!(profile(similar).is_some(), "{} lists unknown {}", p.code, similar);
            }
        }
    }

    #[test]
    fn test_script_ranges_do_not_overlap() {
        for pair in SCRIPTS.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn test_whole_word_matching() {
        let hindi = &LEXICAL_PATTERNS["hi"];
        assert_eq!(hindi.find_iter("यह अच्छा है").count(), 1);
        // "है" inside "हैं" is not a separate match
        assert_eq!(hindi.find_iter("वे अच्छे हैं").count(), 1);
        assert_eq!(hindi.find_iter("नमस्ते").count(), 0);
    }

    #[test]
    fn test_code_for_name() {
        assert_eq!(code_for_name("hindi"), Some("hi"));
        assert_eq!(code_for_name("klingon"), None);
    }
}
