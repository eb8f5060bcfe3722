//! Contracts for the collaborators the transcription core consumes: the
//! speech-recognition engine and the audio-capture device. The core never
//! inspects engine internals; it only drives these traits.

use std::pin::Pin;

use futures_core::Stream;
use tokio::sync::mpsc;

use tandem_audio_utils::{AudioFormat, PcmBuffer};
use tandem_language::Language;

/// One incremental recognition hypothesis. Drafts (`is_final == false`) are
/// revisable; a final terminates the utterance.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecognitionResult {
    pub text: String,
    pub is_final: bool,
    #[serde(default)]
    pub attributes: ResultAttributes,
}

impl RecognitionResult {
    pub fn draft(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            attributes: ResultAttributes::default(),
        }
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            attributes: ResultAttributes::default(),
        }
    }
}

/// Engine-reported metadata carried opaquely alongside each result.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResultAttributes {
    /// The engine's own language tag for this hypothesis, when it emits one.
    pub language: Option<Language>,
    pub confidence: Option<f64>,
}

/// Lazy, unbounded, cancellable sequence of incremental results. Ends with
/// `None` when the engine flushes, or with an `Err` item on pipeline failure.
pub type ResultStream = Pin<Box<dyn Stream<Item = Result<RecognitionResult, PipelineError>> + Send>>;

/// One recognition-engine session bound to a single language.
pub trait RecognitionWorker: Send {
    fn language(&self) -> &Language;

    /// The worker's result sequence. Consumable once; callers own the stream
    /// and end it by dropping it.
    fn take_results(&mut self) -> ResultStream;
}

/// The speech-recognition engine collaborator.
pub trait RecognitionEngine: Send + Sync + 'static {
    type Worker: RecognitionWorker;

    fn create_worker(&self, language: &Language) -> Result<Self::Worker, PipelineError>;

    /// A single audio format every given worker can consume.
    fn best_audio_format(&self, workers: &[&Self::Worker]) -> AudioFormat;

    /// Start the shared recognition pipeline over the given input sequence.
    /// The engine owns the receiver; closing the sender side signals
    /// end-of-input.
    fn start(
        &self,
        input: mpsc::Receiver<PcmBuffer>,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;

    /// Finalize still-open utterances and flush remaining results; worker
    /// streams complete after the flush.
    fn finalize_and_flush(&self) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// The audio-capture collaborator: a continuous tap of raw device buffers.
pub trait CaptureSource: Send + 'static {
    fn native_format(&self) -> AudioFormat;

    /// Install the tap and return the raw buffer sequence.
    fn start(&mut self) -> Result<mpsc::Receiver<PcmBuffer>, CaptureError>;

    /// Remove the tap. Idempotent.
    fn stop(&mut self);
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("language not supported by recognition engine: {0}")]
    UnsupportedLanguage(Language),

    #[error("recognition pipeline failed: {0}")]
    Engine(String),

    #[error("recognition pipeline is not running")]
    NotRunning,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("audio capture device unavailable")]
    DeviceUnavailable,

    #[error("audio capture failed: {0}")]
    Backend(String),
}
