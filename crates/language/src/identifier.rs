use std::collections::HashMap;

use crate::LanguageKey;

/// Text-language classification collaborator.
///
/// Implementations classify a text fragment independently of any speech
/// recognizer. A recognizer biased towards one locale will happily transcribe
/// foreign speech into that locale's script, so this signal is consulted as a
/// second opinion by both the locale detector and the confidence gate.
pub trait LanguageIdentifier: Send + Sync {
    /// The classifier's single best guess, `None` when it has no opinion.
    fn dominant_language(&self, text: &str) -> Option<LanguageKey>;

    /// Up to `max` language hypotheses with scores in `0.0..=1.0`.
    fn hypotheses(&self, text: &str, max: usize) -> HashMap<LanguageKey, f64>;
}

/// Production identifier backed by `whichlang`.
///
/// `whichlang` only reports a single best guess, so the hypothesis map carries
/// that guess at full weight. Anything scoring beyond one hypothesis has to
/// come from a different backend behind the same trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhichLangIdentifier;

impl LanguageIdentifier for WhichLangIdentifier {
    fn dominant_language(&self, text: &str) -> Option<LanguageKey> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(lang_key(whichlang::detect_language(trimmed)))
    }

    fn hypotheses(&self, text: &str, max: usize) -> HashMap<LanguageKey, f64> {
        let mut out = HashMap::new();
        if max == 0 {
            return out;
        }
        if let Some(key) = self.dominant_language(text) {
            out.insert(key, 1.0);
        }
        out
    }
}

fn lang_key(lang: whichlang::Lang) -> LanguageKey {
    use whichlang::Lang;

    let code = match lang {
        Lang::Ara => "ar",
        Lang::Cmn => "zh",
        Lang::Deu => "de",
        Lang::Eng => "en",
        Lang::Fra => "fr",
        Lang::Hin => "hi",
        Lang::Ita => "it",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Nld => "nl",
        Lang::Por => "pt",
        Lang::Rus => "ru",
        Lang::Spa => "es",
        Lang::Swe => "sv",
        Lang::Tur => "tr",
        Lang::Vie => "vi",
    };
    LanguageKey::new(code)
}
