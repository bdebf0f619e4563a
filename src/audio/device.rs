use crate::error::DeviceError;
use std::time::Duration;

/// Sample encoding delivered by a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 16-bit little-endian linear PCM
    Pcm16,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Pcm16 => 2,
        }
    }
}

/// Capture parameters requested when opening a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_format: SampleFormat,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Sample rate in Hz (the realtime API expects 24kHz)
    pub sample_rate: u32,
    /// Samples per channel in one frame
    pub frame_samples: usize,
}

impl AudioFormat {
    /// Size in bytes of one fixed-size frame
    pub fn frame_bytes(&self) -> usize {
        self.frame_samples * self.channels as usize * self.sample_format.bytes_per_sample()
    }

    /// Reject formats that would produce empty frames
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.sample_rate == 0 || self.channels == 0 || self.frame_samples == 0 {
            return Err(DeviceError::Format(format!(
                "sample rate, channels and frame size must be non-zero (got {}Hz, {}ch, {} samples)",
                self.sample_rate, self.channels, self.frame_samples
            )));
        }
        Ok(())
    }

    /// Wall-clock duration covered by one frame
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_samples as f64 / self.sample_rate as f64)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_format: SampleFormat::Pcm16,
            channels: 1,
            sample_rate: 24000,
            frame_samples: 1024,
        }
    }
}

/// Opaque handle to an open capture stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u64);

impl DeviceHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Outcome of a single timed read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRead {
    /// One full frame of raw PCM bytes
    Frame(Vec<u8>),
    /// Nothing arrived before the timeout elapsed
    Idle,
    /// The source has no more audio (file replay)
    Exhausted,
}

/// Audio capture boundary
///
/// Implementations:
/// - `WavFileDevice`: replays a WAV file at real-time pace
/// - `MicrophoneDevice`: default input device via cpal (`microphone` feature)
///
/// `read` blocks the calling thread, but never for longer than `timeout`.
pub trait CaptureDevice: Send {
    /// Device name for logging
    fn name(&self) -> &str;

    fn open(&mut self, format: &AudioFormat) -> Result<DeviceHandle, DeviceError>;

    fn read(
        &mut self,
        handle: DeviceHandle,
        frame_bytes: usize,
        timeout: Duration,
    ) -> Result<DeviceRead, DeviceError>;

    fn close(&mut self, handle: DeviceHandle) -> Result<(), DeviceError>;
}
