use tandem_audio_utils::ConversionError;
use tandem_listen_interface::{CaptureError, PipelineError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Converter or buffer setup failure. Fatal to the current buffer only,
    /// never to the session.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Recognition engine or session failure. Terminal for the merged
    /// output sequence.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}
