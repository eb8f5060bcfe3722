use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use tandem_audio_utils::{AudioFormat, PcmBuffer};
use tandem_language::Language;
use tandem_listen_interface::{
    PipelineError, RecognitionEngine, RecognitionResult, RecognitionWorker, ResultStream,
};

#[derive(Default)]
struct EngineState {
    feeds: HashMap<String, mpsc::UnboundedSender<Result<RecognitionResult, PipelineError>>>,
    submitted: Vec<PcmBuffer>,
}

/// Scriptable recognition engine. Tests push results into per-language feeds
/// and observe the audio the pipeline submitted.
#[derive(Clone, Default)]
pub struct MockEngine {
    inner: Arc<Mutex<EngineState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        Self::default()
    }

    /// Push one result into the worker configured for `language`. Returns
    /// false once the worker's stream has been dropped.
    pub fn feed(&self, language: &Language, result: RecognitionResult) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.feeds.get(&language.identifier()) {
            Some(feed) => feed.send(Ok(result)).is_ok(),
            None => false,
        }
    }

    pub fn fail(&self, language: &Language, error: PipelineError) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.feeds.get(&language.identifier()) {
            Some(feed) => feed.send(Err(error)).is_ok(),
            None => false,
        }
    }

    pub fn submitted(&self) -> Vec<PcmBuffer> {
        self.inner.lock().unwrap().submitted.clone()
    }
}

pub struct MockWorker {
    language: Language,
    results: Option<ResultStream>,
}

impl RecognitionWorker for MockWorker {
    fn language(&self) -> &Language {
        &self.language
    }

    fn take_results(&mut self) -> ResultStream {
        self.results.take().expect("results taken twice")
    }
}

impl RecognitionEngine for MockEngine {
    type Worker = MockWorker;

    fn create_worker(&self, language: &Language) -> Result<MockWorker, PipelineError> {
        let (feed, results) = mpsc::unbounded_channel();
        self.inner
            .lock()
            .unwrap()
            .feeds
            .insert(language.identifier(), feed);
        Ok(MockWorker {
            language: language.clone(),
            results: Some(Box::pin(UnboundedReceiverStream::new(results))),
        })
    }

    fn best_audio_format(&self, _workers: &[&MockWorker]) -> AudioFormat {
        AudioFormat::recognition_default()
    }

    async fn start(&self, mut input: mpsc::Receiver<PcmBuffer>) -> Result<(), PipelineError> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            while let Some(buffer) = input.recv().await {
                inner.lock().unwrap().submitted.push(buffer);
            }
        });
        Ok(())
    }

    async fn finalize_and_flush(&self) -> Result<(), PipelineError> {
        // Dropping the feeds completes every worker stream.
        self.inner.lock().unwrap().feeds.clear();
        Ok(())
    }
}
