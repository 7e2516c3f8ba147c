//! Language disambiguation for transcripts
//!
//! The transcription endpoint returns its own language guess, which is
//! unreliable for Indian languages that share a script. [`disambiguate`]
//! combines that guess with Unicode script detection and, for shared
//! scripts, lexical marker counts. It is a pure function: the same
//! `(text, upstream_tag)` always yields the same result.
//!
//! Confidence levels:
//! - 0.95: script unique to one supported language
//! - 0.9: upstream tag is a supported language
//! - 0.6–0.9: lexical markers for a shared script (`0.6 + 0.1 × matches`)
//! - 0.8 / 0.6: unsupported upstream tag without / with similar languages
//! - 0.7: shared script, no markers; default language for the script
//! - 0.5: no signal at all; English

mod tables;

pub use tables::{LanguageProfile, Script};

use crate::error::VoiceError;
use tables::{DEFAULT_LANGUAGE, LEXICAL_PATTERNS, PROFILES, SCRIPTS};
use tracing::debug;

const UPSTREAM_CONFIDENCE: f64 = 0.9;
const UNIQUE_SCRIPT_CONFIDENCE: f64 = 0.95;
const SCRIPT_DEFAULT_CONFIDENCE: f64 = 0.7;
const NO_SIGNAL_CONFIDENCE: f64 = 0.5;
const UNSUPPORTED_SIMILAR_CONFIDENCE: f64 = 0.6;
const UNSUPPORTED_CONFIDENCE: f64 = 0.8;

/// How a language was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    /// Upstream tag named a supported language
    UpstreamTag,
    /// Script used by a single supported language
    Script(Script),
    /// Shared script resolved by lexical markers
    Lexical { script: Script, matches: usize },
    /// Shared script with no markers; the script's default language
    ScriptDefault(Script),
    /// Upstream tag kept with reduced confidence
    UpstreamUnsupported,
    /// Nothing to go on
    NoSignal,
}

/// Resolved language with a 0.5–0.95 confidence
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageDetection {
    pub language: String,
    pub confidence: f64,
    pub method: DetectionMethod,
}

impl LanguageDetection {
    fn new(language: &str, confidence: f64, method: DetectionMethod) -> Self {
        Self {
            language: language.to_string(),
            confidence,
            method,
        }
    }

    /// Result used when detection itself cannot run
    pub fn fallback(upstream_tag: Option<&str>) -> Self {
        match upstream_tag.and_then(normalize_tag) {
            Some(code) if is_supported(&code) => {
                Self::new(&code, UPSTREAM_CONFIDENCE, DetectionMethod::UpstreamTag)
            }
            Some(code) => Self {
                confidence: unsupported_confidence(&code),
                language: code,
                method: DetectionMethod::UpstreamUnsupported,
            },
            None => Self::new(DEFAULT_LANGUAGE, NO_SIGNAL_CONFIDENCE, DetectionMethod::NoSignal),
        }
    }
}

/// Resolve the language of `text`, using `upstream_tag` as a hint
pub fn disambiguate(text: &str, upstream_tag: Option<&str>) -> LanguageDetection {
    let tag = upstream_tag.and_then(normalize_tag);

    if let Some(ref code) = tag {
        if is_supported(code) {
            return LanguageDetection::new(code, UPSTREAM_CONFIDENCE, DetectionMethod::UpstreamTag);
        }
    }

    if let Some(info) = dominant_script(text) {
        return match info.languages {
            [only] => LanguageDetection::new(
                only,
                UNIQUE_SCRIPT_CONFIDENCE,
                DetectionMethod::Script(info.script),
            ),
            candidates => resolve_shared_script(text, info.script, candidates),
        };
    }

    match tag {
        Some(code) => {
            let confidence = unsupported_confidence(&code);
            LanguageDetection {
                language: code,
                confidence,
                method: DetectionMethod::UpstreamUnsupported,
            }
        }
        None => LanguageDetection::new(DEFAULT_LANGUAGE, NO_SIGNAL_CONFIDENCE, DetectionMethod::NoSignal),
    }
}

/// Fallible entry point: blank text cannot be detected
pub fn detect_language(
    text: &str,
    upstream_tag: Option<&str>,
) -> Result<LanguageDetection, VoiceError> {
    if text.trim().is_empty() {
        return Err(VoiceError::LanguageDetectionFailed {
            message: "no text to analyse".to_string(),
        });
    }
    Ok(disambiguate(text, upstream_tag))
}

/// Normalize an upstream tag to a lowercase code
///
/// Accepts codes ("hi"), regional tags ("hi-IN") and Whisper's language
/// names ("hindi"). Blank tags, and names that are neither known nor shaped
/// like a two or three letter code, are treated as absent.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return None;
    }
    if let Some(code) = tables::code_for_name(&tag) {
        return Some(code.to_string());
    }
    let primary = tag.split(['-', '_']).next().unwrap_or(&tag);
    let is_code = (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_lowercase());
    if !is_code {
        debug!(tag = %tag, "Ignoring unrecognized language tag");
        return None;
    }
    Some(primary.to_string())
}

pub fn profile(code: &str) -> Option<&'static LanguageProfile> {
    tables::profile(code)
}

pub fn is_supported(code: &str) -> bool {
    profile(code).map(|p| p.supported).unwrap_or(false)
}

/// Supported languages in table order
pub fn supported_languages() -> impl Iterator<Item = &'static LanguageProfile> {
    PROFILES.iter().filter(|p| p.supported)
}

/// Count lexical marker occurrences for `code` in `text`
pub fn lexical_matches(code: &str, text: &str) -> usize {
    LEXICAL_PATTERNS
        .get(code)
        .map(|regex| regex.find_iter(text).count())
        .unwrap_or(0)
}

/// Script with the most characters in `text`; earlier table entries win ties
pub fn detect_script(text: &str) -> Option<Script> {
    dominant_script(text).map(|info| info.script)
}

fn dominant_script(text: &str) -> Option<&'static tables::ScriptInfo> {
    let mut counts = [0usize; 16];
    for c in text.chars() {
        let cp = c as u32;
        if let Some(index) = SCRIPTS.iter().position(|s| (s.start..=s.end).contains(&cp)) {
            counts[index] += 1;
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (index, &count) in counts.iter().enumerate().take(SCRIPTS.len()) {
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((index, count));
        }
    }
    best.map(|(index, _)| &SCRIPTS[index])
}

fn resolve_shared_script(text: &str, script: Script, candidates: &[&str]) -> LanguageDetection {
    let mut best: Option<(&str, usize)> = None;
    for &code in candidates {
        let matches = lexical_matches(code, text);
        if matches > 0 && best.map_or(true, |(_, m)| matches > m) {
            best = Some((code, matches));
        }
    }

    match best {
        Some((code, matches)) => {
            // Tenths as integers so 0.7 is exactly 0.7
            let tenths = (6 + matches).min(9);
            LanguageDetection::new(
                code,
                tenths as f64 / 10.0,
                DetectionMethod::Lexical { script, matches },
            )
        }
        None => LanguageDetection::new(
            candidates[0],
            SCRIPT_DEFAULT_CONFIDENCE,
            DetectionMethod::ScriptDefault(script),
        ),
    }
}

fn unsupported_confidence(code: &str) -> f64 {
    match profile(code) {
        Some(p) if !p.similar.is_empty() => UNSUPPORTED_SIMILAR_CONFIDENCE,
        _ => UNSUPPORTED_CONFIDENCE,
    }
}
