use super::device::{AudioFormat, CaptureDevice, DeviceHandle, DeviceRead};
use crate::error::DeviceError;
use crate::frame::samples_to_pcm;
use hound::{SampleFormat as WavSampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Capture device that replays a 16-bit PCM WAV file.
///
/// Frames are released at the pace they would arrive from a live device,
/// unless real-time pacing is turned off. The final partial frame is padded
/// with silence.
pub struct WavFileDevice {
    path: PathBuf,
    name: String,
    realtime: bool,
    next_id: u64,
    replay: Option<Replay>,
}

struct Replay {
    handle: DeviceHandle,
    pcm: Vec<u8>,
    cursor: usize,
    frame_duration: Duration,
    next_due: Instant,
}

impl WavFileDevice {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("wav:{}", path.display()),
            path,
            realtime: true,
            next_id: 1,
            replay: None,
        }
    }

    /// Release frames as fast as they are read
    pub fn without_pacing(mut self) -> Self {
        self.realtime = false;
        self
    }

    fn load(&self, format: &AudioFormat) -> Result<Vec<u8>, DeviceError> {
        info!("Opening audio file: {}", self.path.display());

        let reader = WavReader::open(&self.path)
            .map_err(|e| DeviceError::Open(format!("{}: {}", self.path.display(), e)))?;

        let spec = reader.spec();
        if spec.sample_format != WavSampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(DeviceError::Format(format!(
                "expected 16-bit integer PCM, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }
        if spec.sample_rate != format.sample_rate || spec.channels != format.channels {
            return Err(DeviceError::Format(format!(
                "expected {}Hz {}ch, got {}Hz {}ch",
                format.sample_rate, format.channels, spec.sample_rate, spec.channels
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DeviceError::Read(e.to_string()))?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);
        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(samples_to_pcm(&samples))
    }

    fn replay_for(&mut self, handle: DeviceHandle) -> Result<&mut Replay, DeviceError> {
        match self.replay.as_mut() {
            Some(replay) if replay.handle == handle => Ok(replay),
            _ => Err(DeviceError::UnknownHandle(handle)),
        }
    }
}

impl CaptureDevice for WavFileDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, format: &AudioFormat) -> Result<DeviceHandle, DeviceError> {
        if self.replay.is_some() {
            return Err(DeviceError::Open(format!("{} is already open", self.name)));
        }

        let pcm = self.load(format)?;
        let handle = DeviceHandle::new(self.next_id);
        self.next_id += 1;

        self.replay = Some(Replay {
            handle,
            pcm,
            cursor: 0,
            frame_duration: format.frame_duration(),
            next_due: Instant::now(),
        });

        Ok(handle)
    }

    fn read(
        &mut self,
        handle: DeviceHandle,
        frame_bytes: usize,
        timeout: Duration,
    ) -> Result<DeviceRead, DeviceError> {
        let realtime = self.realtime;
        let replay = self.replay_for(handle)?;

        if replay.cursor >= replay.pcm.len() {
            return Ok(DeviceRead::Exhausted);
        }

        if realtime {
            let wait = replay.next_due.saturating_duration_since(Instant::now());
            if wait > timeout {
                std::thread::sleep(timeout);
                return Ok(DeviceRead::Idle);
            }
            std::thread::sleep(wait);
            replay.next_due += replay.frame_duration;
        }

        let end = (replay.cursor + frame_bytes).min(replay.pcm.len());
        let mut frame = replay.pcm[replay.cursor..end].to_vec();
        frame.resize(frame_bytes, 0);
        replay.cursor = end;

        Ok(DeviceRead::Frame(frame))
    }

    fn close(&mut self, handle: DeviceHandle) -> Result<(), DeviceError> {
        self.replay_for(handle)?;
        self.replay = None;
        Ok(())
    }
}
