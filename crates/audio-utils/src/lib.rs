use std::fmt;

mod convert;
mod error;

pub use convert::BufferConverter;
pub use error::ConversionError;

const I16_SCALE: f32 = 32768.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SampleFormat {
    I16,
    F32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
        }
    }

    /// 16kHz mono f32, the format most local recognition engines negotiate.
    pub fn recognition_default() -> Self {
        Self::new(16_000, 1, SampleFormat::F32)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sample = match self.sample_format {
            SampleFormat::I16 => "i16",
            SampleFormat::F32 => "f32",
        };
        write!(f, "{}Hz/{}ch/{}", self.sample_rate, self.channels, sample)
    }
}

/// Interleaved PCM payload. The variant must agree with the declared
/// [`AudioFormat::sample_format`]; the converter rejects mismatches.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    I16(Vec<i16>),
    F32(Vec<f32>),
}

impl SampleData {
    pub fn len(&self) -> usize {
        match self {
            SampleData::I16(samples) => samples.len(),
            SampleData::F32(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn format(&self) -> SampleFormat {
        match self {
            SampleData::I16(_) => SampleFormat::I16,
            SampleData::F32(_) => SampleFormat::F32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub format: AudioFormat,
    pub data: SampleData,
}

impl PcmBuffer {
    pub fn f32(format: AudioFormat, samples: Vec<f32>) -> Self {
        Self {
            format,
            data: SampleData::F32(samples),
        }
    }

    pub fn i16(format: AudioFormat, samples: Vec<i16>) -> Self {
        Self {
            format,
            data: SampleData::I16(samples),
        }
    }

    pub fn frames(&self) -> usize {
        if self.format.channels == 0 {
            return 0;
        }
        self.data.len() / self.format.channels as usize
    }

    /// Payload variant matches the declared sample format and the sample
    /// count divides evenly into frames.
    pub fn is_well_formed(&self) -> bool {
        self.data.format() == self.format.sample_format
            && self.format.channels != 0
            && self.data.len() % self.format.channels as usize == 0
    }
}

pub fn i16_to_f32_samples(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / I16_SCALE)
        .collect()
}

pub fn f32_to_i16_samples(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let scaled = (sample * I16_SCALE).clamp(-I16_SCALE, I16_SCALE);
            scaled as i16
        })
        .collect()
}
