use super::device::{AudioFormat, CaptureDevice, DeviceHandle, DeviceRead};
use super::convert::{i16_to_f32, u16_to_f32, PcmConverter};
use crate::error::DeviceError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Callback buffers queued between the audio thread and `read`
const QUEUE_DEPTH: usize = 64;

/// Default input device captured through cpal.
///
/// cpal streams are not `Send`, so the stream lives on its own thread for as
/// long as the handle is open. The device runs at its native rate, channel
/// count and sample type; the callback converts to the requested format.
/// Buffers are dropped when the reader falls behind.
pub struct MicrophoneDevice {
    name: String,
    next_id: u64,
    active: Option<ActiveStream>,
}

struct ActiveStream {
    handle: DeviceHandle,
    buffers: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneDevice {
    pub fn new() -> Self {
        Self {
            name: "microphone".to_string(),
            next_id: 1,
            active: None,
        }
    }

    fn active_for(&mut self, handle: DeviceHandle) -> Result<&mut ActiveStream, DeviceError> {
        match self.active.as_mut() {
            Some(active) if active.handle == handle => Ok(active),
            _ => Err(DeviceError::UnknownHandle(handle)),
        }
    }
}

impl Default for MicrophoneDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn build_stream(format: AudioFormat, buffers: SyncSender<Vec<u8>>) -> Result<cpal::Stream, DeviceError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| DeviceError::Open("no default input device".to_string()))?;

    // Capture in the device's native format and convert in the callback
    let default_config = device
        .default_input_config()
        .map_err(|e| DeviceError::Open(e.to_string()))?;
    let sample_format = default_config.sample_format();
    let config: StreamConfig = default_config.into();
    let native_rate = config.sample_rate.0;
    let native_channels = config.channels;

    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
        format = ?sample_format,
        sample_rate = native_rate,
        channels = native_channels,
        target_rate = format.sample_rate,
        "Using input device"
    );

    let mut converter = PcmConverter::new(native_rate, native_channels, &format);
    let err_fn = |err| error!("Input stream error: {}", err);

    // Overflow drops the buffer rather than blocking the audio thread
    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = buffers.try_send(converter.convert(data, |s| s));
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = buffers.try_send(converter.convert(data, i16_to_f32));
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let _ = buffers.try_send(converter.convert(data, u16_to_f32));
            },
            err_fn,
            None,
        ),
        other => {
            return Err(DeviceError::Format(format!(
                "unsupported input sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| DeviceError::Open(e.to_string()))?;

    stream.play().map_err(|e| DeviceError::Open(e.to_string()))?;
    Ok(stream)
}

impl CaptureDevice for MicrophoneDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, format: &AudioFormat) -> Result<DeviceHandle, DeviceError> {
        if self.active.is_some() {
            return Err(DeviceError::Open("microphone is already open".to_string()));
        }

        let (buffer_tx, buffer_rx) = mpsc::sync_channel(QUEUE_DEPTH);
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let format = *format;

        let thread = std::thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || match build_stream(format, buffer_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Blocks until close() signals or drops the sender
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| DeviceError::Open(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| DeviceError::Open("capture thread exited during startup".to_string()))??;

        let handle = DeviceHandle::new(self.next_id);
        self.next_id += 1;
        self.active = Some(ActiveStream {
            handle,
            buffers: buffer_rx,
            pending: Vec::new(),
            stop: stop_tx,
            thread: Some(thread),
        });

        Ok(handle)
    }

    fn read(
        &mut self,
        handle: DeviceHandle,
        frame_bytes: usize,
        timeout: Duration,
    ) -> Result<DeviceRead, DeviceError> {
        let active = self.active_for(handle)?;
        let deadline = Instant::now() + timeout;

        while active.pending.len() < frame_bytes {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match active.buffers.recv_timeout(remaining) {
                Ok(buffer) => active.pending.extend_from_slice(&buffer),
                Err(RecvTimeoutError::Timeout) => return Ok(DeviceRead::Idle),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(DeviceError::Read("input stream stopped".to_string()))
                }
            }
        }

        let frame: Vec<u8> = active.pending.drain(..frame_bytes).collect();
        Ok(DeviceRead::Frame(frame))
    }

    fn close(&mut self, handle: DeviceHandle) -> Result<(), DeviceError> {
        self.active_for(handle)?;
        if let Some(mut active) = self.active.take() {
            let _ = active.stop.send(());
            if let Some(thread) = active.thread.take() {
                if thread.join().is_err() {
                    warn!("Microphone thread panicked");
                }
            }
        }
        Ok(())
    }
}
