use tandem_audio_utils::PcmBuffer;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Error;
use crate::session::InputHandle;

/// Forward raw capture buffers into the recognition pipeline.
///
/// Unconvertible buffers are dropped with a warning and the tap keeps
/// running; anything else (pipeline gone, invalid state) ends forwarding.
/// The task exits when the tap closes or the token is cancelled.
pub(crate) fn spawn_forward(
    handle: InputHandle,
    mut tap: mpsc::Receiver<PcmBuffer>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let buffer = tokio::select! {
                _ = cancel.cancelled() => break,
                buffer = tap.recv() => match buffer {
                    Some(buffer) => buffer,
                    None => break,
                },
            };

            match handle.submit(buffer).await {
                Ok(()) => {}
                Err(Error::Conversion(error)) => {
                    tracing::warn!(error = %error, "dropped_unconvertible_capture_buffer");
                }
                Err(error) => {
                    tracing::error!(error = %error, "capture_forwarding_stopped");
                    break;
                }
            }
        }
    })
}
