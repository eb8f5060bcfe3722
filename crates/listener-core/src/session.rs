use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use tandem_audio_utils::{AudioFormat, BufferConverter, PcmBuffer};
use tandem_language::{Language, LanguageIdentifier, LocaleDetector, WhichLangIdentifier};
use tandem_listen_interface::{
    CaptureSource, PipelineError, RecognitionEngine, RecognitionWorker, ResultStream,
};
use tandem_transcript::TranscriptItem;

use crate::arbitration::Arbitration;
use crate::capture;
use crate::confidence::{Confidence, ConfidenceEvaluator};
use crate::error::Error;

const INPUT_CHANNEL_CAPACITY: usize = 64;
const OUTPUT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Prepared,
    Running,
    Stopped,
}

/// Live bilingual transcription session.
///
/// Owns one recognition worker per configured language, the shared
/// arbitration state, and the merged output stream. Lock state is scoped to
/// this instance, so concurrent sessions do not interfere.
pub struct Session<E: RecognitionEngine> {
    engine: Arc<E>,
    identifier: Arc<dyn LanguageIdentifier>,
    converter: Arc<BufferConverter>,
    arbitration: Arc<Mutex<Arbitration>>,
    state: State,
    languages: Vec<Language>,
    workers: Vec<E::Worker>,
    pipeline_format: Option<AudioFormat>,
    input_tx: Option<mpsc::Sender<PcmBuffer>>,
    cancel: CancellationToken,
    capture: Option<Box<dyn CaptureSource>>,
    capture_cancel: Option<CancellationToken>,
}

impl<E: RecognitionEngine> Session<E> {
    pub fn new(engine: E) -> Self {
        Self::with_identifier(engine, Arc::new(WhichLangIdentifier))
    }

    pub fn with_identifier(engine: E, identifier: Arc<dyn LanguageIdentifier>) -> Self {
        Self {
            engine: Arc::new(engine),
            identifier,
            converter: Arc::new(BufferConverter::new()),
            arbitration: Arc::new(Mutex::new(Arbitration::default())),
            state: State::Idle,
            languages: Vec::new(),
            workers: Vec::new(),
            pipeline_format: None,
            input_tx: None,
            cancel: CancellationToken::new(),
            capture: None,
            capture_cancel: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Construct the workers, negotiate a common audio format and open the
    /// pipeline's input channel. Re-preparing a non-idle session releases it
    /// first.
    pub async fn prepare(
        &mut self,
        language_a: Language,
        language_b: Option<Language>,
    ) -> Result<(), Error> {
        if self.state != State::Idle {
            self.release();
        }

        let mut languages = vec![language_a];
        if let Some(language_b) = language_b {
            languages.push(language_b);
        }

        let mut workers = Vec::with_capacity(languages.len());
        for language in &languages {
            workers.push(self.engine.create_worker(language)?);
        }

        let worker_refs: Vec<&E::Worker> = workers.iter().collect();
        let format = self.engine.best_audio_format(&worker_refs);

        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        self.engine.start(input_rx).await?;

        *self.lock_arbitration() = Arbitration::new(&languages);

        self.languages = languages;
        self.workers = workers;
        self.pipeline_format = Some(format);
        self.input_tx = Some(input_tx);
        self.cancel = CancellationToken::new();
        self.state = State::Prepared;
        Ok(())
    }

    /// Spawn one task per worker and return the merged output stream.
    ///
    /// Emission across workers is interleaved, not globally ordered; rely on
    /// `created_at` and `is_final`, never on arrival order. Dropping the
    /// stream cancels both worker tasks and the capture tap.
    pub fn transcript(&mut self) -> Result<TranscriptStream, Error> {
        if self.state != State::Prepared {
            return Err(Error::InvalidState("transcript requires a prepared session"));
        }

        let (out_tx, out_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let detector = LocaleDetector::new(self.identifier.clone());
        let evaluator = ConfidenceEvaluator::new(self.identifier.clone());

        for (index, worker) in self.workers.iter_mut().enumerate() {
            let sibling = self
                .languages
                .iter()
                .enumerate()
                .find(|(other, _)| *other != index)
                .map(|(_, language)| language.clone());

            let ctx = WorkerContext {
                language: worker.language().clone(),
                sibling,
                arbitration: self.arbitration.clone(),
                detector: detector.clone(),
                evaluator: evaluator.clone(),
            };
            tokio::spawn(run_worker(
                ctx,
                worker.take_results(),
                out_tx.clone(),
                self.cancel.clone(),
            ));
        }

        self.state = State::Running;
        Ok(TranscriptStream {
            inner: ReceiverStream::new(out_rx),
            cancel: self.cancel.clone(),
        })
    }

    /// Feed one captured buffer into the pipeline, converting it to the
    /// negotiated format first. Before `prepare` completes this fails with
    /// `InvalidState` and the buffer is dropped.
    pub async fn subscribe(&self, buffer: PcmBuffer) -> Result<(), Error> {
        self.input_handle()?.submit(buffer).await
    }

    /// A cloneable handle for feeding audio without borrowing the session,
    /// e.g. from a capture callback context.
    pub fn input_handle(&self) -> Result<InputHandle, Error> {
        match (&self.input_tx, self.pipeline_format) {
            (Some(input_tx), Some(format)) => Ok(InputHandle {
                input_tx: input_tx.clone(),
                converter: self.converter.clone(),
                format,
            }),
            _ => Err(Error::InvalidState("subscribe requires a prepared session")),
        }
    }

    /// Install the capture tap and forward its buffers into the pipeline.
    pub fn attach_capture<S: CaptureSource>(&mut self, mut source: S) -> Result<(), Error> {
        if self.state != State::Prepared && self.state != State::Running {
            return Err(Error::InvalidState("capture requires a prepared session"));
        }

        let handle = self.input_handle()?;
        let tap = source.start()?;
        let cancel = self.cancel.child_token();
        capture::spawn_forward(handle, tap, cancel.clone());

        self.capture = Some(Box::new(source));
        self.capture_cancel = Some(cancel);
        Ok(())
    }

    /// Graceful shutdown: remove the capture tap, close the input channel
    /// and let the engine finalize still-open utterances. The merged stream
    /// completes once the flush is done.
    ///
    /// The flush wait is unbounded; no timeout policy exists for an engine
    /// that never finalizes.
    pub async fn stop(&mut self) -> Result<(), Error> {
        match self.state {
            State::Prepared | State::Running => {}
            _ => return Err(Error::InvalidState("stop requires an active session")),
        }

        self.stop_capture();
        self.input_tx = None;
        self.engine.finalize_and_flush().await?;
        self.state = State::Stopped;
        Ok(())
    }

    /// Tear down without a graceful finalize: cancels worker tasks and the
    /// capture tap, discards workers, returns to `Idle`.
    pub fn release(&mut self) {
        self.cancel.cancel();
        self.stop_capture();
        self.input_tx = None;
        self.pipeline_format = None;
        self.workers.clear();
        self.languages.clear();
        *self.lock_arbitration() = Arbitration::default();
        self.cancel = CancellationToken::new();
        self.state = State::Idle;
    }

    pub fn enable(&self, language: &Language) {
        self.lock_arbitration().enable(language);
    }

    pub fn disable(&self, language: &Language) {
        self.lock_arbitration().disable(language);
    }

    pub fn set_enabled_locales(&self, languages: &[Language]) {
        self.lock_arbitration().set_enabled(languages);
    }

    pub fn enabled_locales(&self) -> Vec<Language> {
        self.lock_arbitration().enabled_locales()
    }

    fn stop_capture(&mut self) {
        if let Some(mut source) = self.capture.take() {
            source.stop();
        }
        if let Some(cancel) = self.capture_cancel.take() {
            cancel.cancel();
        }
    }

    fn lock_arbitration(&self) -> MutexGuard<'_, Arbitration> {
        lock_arbitration(&self.arbitration)
    }
}

/// Merged output sequence of both workers. Dropping it cancels the worker
/// tasks and the capture tap.
pub struct TranscriptStream {
    inner: ReceiverStream<Result<TranscriptItem, Error>>,
    cancel: CancellationToken,
}

impl Stream for TranscriptStream {
    type Item = Result<TranscriptItem, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for TranscriptStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Clone)]
pub struct InputHandle {
    input_tx: mpsc::Sender<PcmBuffer>,
    converter: Arc<BufferConverter>,
    format: AudioFormat,
}

impl InputHandle {
    pub async fn submit(&self, buffer: PcmBuffer) -> Result<(), Error> {
        let converted = self.converter.convert(buffer, self.format)?;
        self.input_tx
            .send(converted)
            .await
            .map_err(|_| Error::Pipeline(PipelineError::NotRunning))
    }
}

struct WorkerContext {
    language: Language,
    sibling: Option<Language>,
    arbitration: Arc<Mutex<Arbitration>>,
    detector: LocaleDetector,
    evaluator: ConfidenceEvaluator,
}

async fn run_worker(
    ctx: WorkerContext,
    mut results: ResultStream,
    out: mpsc::Sender<Result<TranscriptItem, Error>>,
    cancel: CancellationToken,
) {
    let worker_key = ctx.language.key();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = results.next() => next,
        };

        let result = match next {
            None => break,
            Some(Ok(result)) => result,
            Some(Err(error)) => {
                tracing::error!(worker = %worker_key, error = %error, "worker_stream_failed");
                let _ = out.send(Err(error.into())).await;
                // One pipeline failure ends the whole transcription.
                cancel.cancel();
                break;
            }
        };

        // Detection is pure; the gate check and the statistics update share
        // one lock acquisition since the directives do not commute.
        let detected = ctx
            .detector
            .detect(&result.text, &ctx.language, ctx.sibling.as_ref());
        let resolution = {
            let mut arbitration = lock_arbitration(&ctx.arbitration);
            if !arbitration.is_enabled(&worker_key) {
                None
            } else {
                Some(arbitration.update_language_state(&worker_key, result.is_final, &detected))
            }
        };
        let Some(resolution) = resolution else {
            continue;
        };

        if result.is_final
            && ctx.evaluator.evaluate(&result, &ctx.language) == Confidence::Fail
        {
            tracing::debug!(worker = %worker_key, "final_suppressed_language_mismatch");
            continue;
        }

        let locale = if result.is_final {
            ctx.language.clone()
        } else {
            resolution.resolved_locale
        };
        let item = TranscriptItem::new(locale, ctx.sibling.clone(), result.text, result.is_final)
            .with_confidence(resolution.snapshot);

        if out.send(Ok(item)).await.is_err() {
            break;
        }
    }
}

fn lock_arbitration(arbitration: &Mutex<Arbitration>) -> MutexGuard<'_, Arbitration> {
    arbitration.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("arbitration_state_poisoned_recovering");
        poisoned.into_inner()
    })
}
