use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tandem_language::{Language, LanguageKey};

/// One emitted transcription line, draft or final.
///
/// Immutable once emitted; downstream consumers may attach a translation
/// after the fact with [`TranscriptItem::with_translation`]. Consumers must
/// not rely on arrival order across the two recognition workers; use
/// `created_at` and `is_final` for sequencing.
///
/// Finals always carry non-empty text; empty finals are suppressed upstream
/// and never emitted.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptItem {
    pub id: String,
    /// Displayed locale. For drafts this is the arbitration's dominant
    /// detection; for finals it is the worker's configured locale.
    pub locale: Language,
    /// The session's other configured language, when running bilingual.
    pub secondary_locale: Option<Language>,
    pub text: String,
    pub is_final: bool,
    pub translation: Option<TranslationItem>,
    pub created_at: DateTime<Utc>,
    /// Per-language draft counts for the utterance this item belongs to.
    pub locale_confidence: Option<HashMap<LanguageKey, u32>>,
}

impl TranscriptItem {
    pub fn new(
        locale: Language,
        secondary_locale: Option<Language>,
        text: impl Into<String>,
        is_final: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            locale,
            secondary_locale,
            text: text.into(),
            is_final,
            translation: None,
            created_at: Utc::now(),
            locale_confidence: None,
        }
    }

    pub fn with_confidence(mut self, snapshot: Option<HashMap<LanguageKey, u32>>) -> Self {
        self.locale_confidence = snapshot;
        self
    }

    pub fn with_translation(mut self, translation: TranslationItem) -> Self {
        self.translation = Some(translation);
        self
    }
}

/// Produced by the external translation collaborator and attached post-hoc.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranslationItem {
    pub id: String,
    pub locale: Language,
    pub text: String,
}
