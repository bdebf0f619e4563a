//! Conversion from a capture device's native stream to the session format.
//!
//! Input devices rarely deliver 24kHz mono. Samples are normalized to f32,
//! averaged down to mono, resampled to the target rate and written out as
//! 16-bit little-endian PCM with the target channel count.

use super::device::AudioFormat;

/// Streaming linear-interpolation resampler.
///
/// Keeps the fractional read position and the last input sample between
/// calls, so consecutive buffers resample as one continuous signal.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    /// Input samples consumed per output sample
    step: f64,
    pos: f64,
    last: Option<f32>,
}

impl LinearResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            step: input_rate.max(1) as f64 / output_rate.max(1) as f64,
            pos: 0.0,
            last: None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.step == 1.0
    }

    pub fn process(&mut self, input: &[f32], out: &mut Vec<f32>) {
        if input.is_empty() {
            return;
        }

        // The previous call's last sample sits at index 0 when present
        let last = self.last;
        let offset = usize::from(last.is_some());
        let len = input.len() + offset;
        let sample = |i: usize| match (i, last) {
            (0, Some(last)) => last,
            _ => input[i - offset],
        };

        while self.pos + 1.0 < len as f64 {
            let idx = self.pos.floor() as usize;
            let frac = (self.pos - idx as f64) as f32;
            out.push(sample(idx) * (1.0 - frac) + sample(idx + 1) * frac);
            self.pos += self.step;
        }

        self.pos -= (len - 1) as f64;
        self.last = input.last().copied();
    }
}

/// Average interleaved frames of `channels` samples into mono
pub fn append_downmixed<T, F>(buf: &mut Vec<f32>, data: &[T], channels: usize, mut convert: F)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    for frame in data.chunks(channels) {
        let sum: f32 = frame.iter().copied().map(&mut convert).sum();
        buf.push(sum / frame.len() as f32);
    }
}

/// Native device stream to session-format PCM bytes
#[derive(Debug, Clone)]
pub struct PcmConverter {
    input_channels: usize,
    output_channels: usize,
    resampler: LinearResampler,
    mono: Vec<f32>,
    resampled: Vec<f32>,
}

impl PcmConverter {
    pub fn new(input_rate: u32, input_channels: u16, target: &AudioFormat) -> Self {
        Self {
            input_channels: usize::from(input_channels.max(1)),
            output_channels: usize::from(target.channels.max(1)),
            resampler: LinearResampler::new(input_rate, target.sample_rate),
            mono: Vec::new(),
            resampled: Vec::new(),
        }
    }

    /// Convert one callback buffer. `to_f32` maps a native sample to [-1.0, 1.0].
    pub fn convert<T, F>(&mut self, data: &[T], to_f32: F) -> Vec<u8>
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.mono.clear();
        append_downmixed(&mut self.mono, data, self.input_channels, to_f32);

        let samples = if self.resampler.is_passthrough() {
            &self.mono
        } else {
            self.resampled.clear();
            self.resampler.process(&self.mono, &mut self.resampled);
            &self.resampled
        };

        let mut pcm = Vec::with_capacity(samples.len() * self.output_channels * 2);
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            for _ in 0..self.output_channels {
                pcm.extend_from_slice(&value.to_le_bytes());
            }
        }
        pcm
    }
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32_768.0
}

pub fn u16_to_f32(sample: u16) -> f32 {
    (sample as f32 - 32_768.0) / 32_768.0
}
