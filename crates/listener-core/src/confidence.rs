use std::sync::Arc;

use tandem_language::{Language, LanguageIdentifier};
use tandem_listen_interface::RecognitionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Pass,
    Fail,
}

/// Validates that a finalized result is actually written in the language its
/// worker was configured for.
///
/// A worker biased towards one locale will still transcribe foreign speech
/// into that locale's script; this gate is what keeps such finals off the
/// record. Drafts always pass, since suppressing intermediate output hurts
/// perceived latency more than a briefly wrong draft does. A failing final
/// is dropped entirely: not emitted, not counted, not retried.
#[derive(Clone)]
pub struct ConfidenceEvaluator {
    identifier: Arc<dyn LanguageIdentifier>,
}

impl ConfidenceEvaluator {
    pub fn new(identifier: Arc<dyn LanguageIdentifier>) -> Self {
        Self { identifier }
    }

    pub fn evaluate(&self, result: &RecognitionResult, expected: &Language) -> Confidence {
        if !result.is_final {
            return Confidence::Pass;
        }

        let trimmed = result.text.trim();
        if trimmed.is_empty() {
            return Confidence::Fail;
        }

        match self.identifier.dominant_language(trimmed) {
            Some(detected) if detected == expected.key() => Confidence::Pass,
            Some(_) | None => Confidence::Fail,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tandem_language::{LanguageKey, WhichLangIdentifier};

    use super::*;

    struct Scripted(Option<LanguageKey>);

    impl LanguageIdentifier for Scripted {
        fn dominant_language(&self, _text: &str) -> Option<LanguageKey> {
            self.0.clone()
        }

        fn hypotheses(&self, _text: &str, _max: usize) -> HashMap<LanguageKey, f64> {
            HashMap::new()
        }
    }

    fn ko() -> Language {
        Language::with_region("ko", "KR")
    }

    #[test]
    fn drafts_always_pass() {
        let evaluator = ConfidenceEvaluator::new(Arc::new(Scripted(None)));
        let draft = RecognitionResult::draft("whatever");
        assert_eq!(evaluator.evaluate(&draft, &ko()), Confidence::Pass);
    }

    #[test]
    fn empty_finals_fail() {
        let evaluator = ConfidenceEvaluator::new(Arc::new(Scripted(Some(LanguageKey::new("ko")))));
        let result = RecognitionResult::final_result("   \n ");
        assert_eq!(evaluator.evaluate(&result, &ko()), Confidence::Fail);
    }

    #[test]
    fn classifier_silence_fails_finals() {
        let evaluator = ConfidenceEvaluator::new(Arc::new(Scripted(None)));
        let result = RecognitionResult::final_result("zzzz");
        assert_eq!(evaluator.evaluate(&result, &ko()), Confidence::Fail);
    }

    #[test]
    fn matching_language_passes() {
        let evaluator = ConfidenceEvaluator::new(Arc::new(Scripted(Some(LanguageKey::new("ko")))));
        let result = RecognitionResult::final_result("안녕하세요");
        assert_eq!(evaluator.evaluate(&result, &ko()), Confidence::Pass);
    }

    #[test]
    fn korean_worker_rejects_japanese_final() {
        // Real classifier: a Korean-configured worker fed Japanese speech
        // produces a Japanese-script final, which must never be emitted.
        let evaluator = ConfidenceEvaluator::new(Arc::new(WhichLangIdentifier));
        let result = RecognitionResult::final_result("これはテストです、よろしくお願いします");
        assert_eq!(evaluator.evaluate(&result, &ko()), Confidence::Fail);
    }

    #[test]
    fn korean_worker_accepts_korean_final() {
        let evaluator = ConfidenceEvaluator::new(Arc::new(WhichLangIdentifier));
        let result = RecognitionResult::final_result("안녕하세요 만나서 반갑습니다");
        assert_eq!(evaluator.evaluate(&result, &ko()), Confidence::Pass);
    }
}
