use std::sync::Mutex;

use dasp::Signal;
use dasp::interpolate::linear::Linear;
use dasp::signal;

use crate::{AudioFormat, ConversionError, PcmBuffer, SampleData, SampleFormat};
use crate::{f32_to_i16_samples, i16_to_f32_samples};

/// Normalizes captured PCM buffers to the format the recognition pipeline
/// negotiated.
///
/// The conversion plan is built lazily and cached keyed by the target format
/// alone, rebuilt only when the target changes. Buffers already in the target
/// format pass through untouched. Safe to call from the single audio-callback
/// context; plan access is serialized.
#[derive(Debug, Default)]
pub struct BufferConverter {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    plan: Option<Plan>,
    generation: u64,
}

impl BufferConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert(
        &self,
        buffer: PcmBuffer,
        target: AudioFormat,
    ) -> Result<PcmBuffer, ConversionError> {
        if buffer.format == target {
            return Ok(buffer);
        }
        if !buffer.is_well_formed() {
            return Err(ConversionError::FormatMismatch);
        }

        let plan = self.plan_for(buffer.format, target)?;
        plan.run(buffer)
    }

    /// Number of plan rebuilds so far. Diagnostic only.
    pub fn plan_generation(&self) -> u64 {
        self.lock_state().generation
    }

    fn plan_for(&self, source: AudioFormat, target: AudioFormat) -> Result<Plan, ConversionError> {
        let mut state = self.lock_state();
        if let Some(plan) = state.plan
            && plan.target == target
        {
            return Ok(plan);
        }

        let plan = Plan::build(source, target)?;
        state.plan = Some(plan);
        state.generation += 1;
        Ok(plan)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("buffer_converter_state_poisoned_recovering");
            poisoned.into_inner()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Plan {
    target: AudioFormat,
}

impl Plan {
    fn build(source: AudioFormat, target: AudioFormat) -> Result<Self, ConversionError> {
        let channels_ok = source.channels == target.channels
            || source.channels == 1
            || target.channels == 1;
        let rates_ok = source.sample_rate != 0 && target.sample_rate != 0;

        if !channels_ok || !rates_ok || source.channels == 0 || target.channels == 0 {
            return Err(ConversionError::ConverterUnavailable { source, target });
        }
        Ok(Self { target })
    }

    fn run(&self, buffer: PcmBuffer) -> Result<PcmBuffer, ConversionError> {
        let source = buffer.format;
        let target = self.target;

        // The cache key ignores the source side, so the pair is revalidated
        // against the buffer actually being converted.
        Self::build(source, target)?;

        let frames = buffer.frames();
        let out_frames = frames
            .checked_mul(target.sample_rate as usize)
            .map(|scaled| scaled / source.sample_rate as usize)
            .ok_or(ConversionError::BufferAllocationFailed { frames })?;

        let samples = match buffer.data {
            SampleData::F32(samples) => samples,
            SampleData::I16(samples) => i16_to_f32_samples(&samples),
        };

        let remixed = remix(&samples, source.channels, target.channels);
        let resampled = if source.sample_rate == target.sample_rate {
            remixed
        } else {
            resample(
                &remixed,
                target.channels,
                source.sample_rate,
                target.sample_rate,
                out_frames,
            )
        };

        let data = match target.sample_format {
            SampleFormat::F32 => SampleData::F32(resampled),
            SampleFormat::I16 => SampleData::I16(f32_to_i16_samples(&resampled)),
        };
        Ok(PcmBuffer {
            format: target,
            data,
        })
    }
}

fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to {
        return samples.to_vec();
    }

    if to == 1 {
        // Downmix by averaging each frame.
        return samples
            .chunks_exact(from as usize)
            .map(|frame| frame.iter().sum::<f32>() / from as f32)
            .collect();
    }

    // `Plan::build` only lets mono sources through here.
    let mut out = Vec::with_capacity(samples.len() * to as usize);
    for &sample in samples {
        for _ in 0..to {
            out.push(sample);
        }
    }
    out
}

fn resample(samples: &[f32], channels: u16, from_hz: u32, to_hz: u32, out_frames: usize) -> Vec<f32> {
    if samples.is_empty() || out_frames == 0 {
        return Vec::new();
    }

    let channels = channels.max(1) as usize;
    if channels == 1 {
        return resample_mono(samples, from_hz, to_hz, out_frames);
    }

    let mut planes = Vec::with_capacity(channels);
    for channel in 0..channels {
        let plane: Vec<f32> = samples
            .iter()
            .skip(channel)
            .step_by(channels)
            .copied()
            .collect();
        planes.push(resample_mono(&plane, from_hz, to_hz, out_frames));
    }

    let mut out = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        for plane in &planes {
            out.push(plane.get(frame).copied().unwrap_or(0.0));
        }
    }
    out
}

fn resample_mono(samples: &[f32], from_hz: u32, to_hz: u32, out_frames: usize) -> Vec<f32> {
    let mut source = signal::from_iter(samples.iter().copied());
    let first = source.next();
    let second = source.next();
    let interpolator = Linear::new(first, second);

    source
        .from_hz_to_hz(interpolator, from_hz as f64, to_hz as f64)
        .take(out_frames)
        .collect()
}
