use std::fmt;

use crate::AudioFormat;

// `thiserror` cannot derive this: it treats any field named `source` as the
// `Error::source()`, which would require `AudioFormat: Error`.
#[derive(Debug)]
pub enum ConversionError {
    ConverterUnavailable {
        source: AudioFormat,
        target: AudioFormat,
    },

    BufferAllocationFailed { frames: usize },

    FormatMismatch,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::ConverterUnavailable { source, target } => {
                write!(f, "no converter available for {source} -> {target}")
            }
            ConversionError::BufferAllocationFailed { frames } => {
                write!(f, "failed to size output buffer for {frames} source frames")
            }
            ConversionError::FormatMismatch => {
                write!(f, "buffer payload does not match its declared format")
            }
        }
    }
}

impl std::error::Error for ConversionError {}
