use std::sync::Arc;

use crate::{Language, LanguageIdentifier};

/// Decides which of two candidate languages a text fragment is written in.
///
/// Classification is independent of the recognition engine's own language
/// tagging: the classifier's single best guess and its hypothesis scores are
/// combined per candidate, and the secondary candidate only wins with a
/// strictly higher score. Single language sessions skip classification
/// entirely.
#[derive(Clone)]
pub struct LocaleDetector {
    identifier: Arc<dyn LanguageIdentifier>,
}

impl LocaleDetector {
    pub fn new(identifier: Arc<dyn LanguageIdentifier>) -> Self {
        Self { identifier }
    }

    pub fn detect(&self, text: &str, primary: &Language, secondary: Option<&Language>) -> Language {
        let Some(secondary) = secondary else {
            return primary.clone();
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return primary.clone();
        }

        let best = self.identifier.dominant_language(trimmed);
        let hypotheses = self.identifier.hypotheses(trimmed, 2);

        let score = |candidate: &Language| -> f64 {
            let key = candidate.key();
            let top_pick = if best.as_ref() == Some(&key) { 1.0 } else { 0.0 };
            top_pick + hypotheses.get(&key).copied().unwrap_or(0.0)
        };

        // Ties go to the primary candidate.
        if score(secondary) > score(primary) {
            secondary.clone()
        } else {
            primary.clone()
        }
    }
}
