use super::device::{AudioFormat, CaptureDevice, DeviceHandle, DeviceRead};
use crate::error::DeviceError;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Owns one capture device and its open handle for the length of a session.
///
/// The handle is closed exactly once: by an explicit [`AudioCapture::release`]
/// or, failing that, when the capture is dropped.
pub struct AudioCapture {
    device: Box<dyn CaptureDevice>,
    handle: Option<DeviceHandle>,
    format: AudioFormat,
    read_timeout: Duration,
}

impl AudioCapture {
    /// Open `device` with the requested format
    pub fn open(
        mut device: Box<dyn CaptureDevice>,
        format: AudioFormat,
        read_timeout: Duration,
    ) -> Result<Self, DeviceError> {
        format.validate()?;
        let handle = device.open(&format)?;

        info!(
            device = device.name(),
            sample_rate = format.sample_rate,
            channels = format.channels,
            frame_bytes = format.frame_bytes(),
            "Capture device opened"
        );

        Ok(Self {
            device,
            handle: Some(handle),
            format,
            read_timeout,
        })
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Read one frame on the current thread, waiting at most the read timeout
    pub fn read_blocking(&mut self) -> Result<DeviceRead, DeviceError> {
        let handle = self.handle.ok_or(DeviceError::Released)?;
        self.device
            .read(handle, self.format.frame_bytes(), self.read_timeout)
    }

    /// Read one frame on the blocking pool.
    ///
    /// The capture travels with the read and is handed back when it finishes.
    /// `None` means the read task itself died; the device was released when
    /// the capture was dropped with it.
    pub async fn read_frame(self) -> (Option<Self>, Result<DeviceRead, DeviceError>) {
        let joined = tokio::task::spawn_blocking(move || {
            let mut capture = self;
            let read = capture.read_blocking();
            (capture, read)
        })
        .await;

        match joined {
            Ok((capture, read)) => (Some(capture), read),
            Err(e) => (None, Err(DeviceError::Read(format!("read task failed: {}", e)))),
        }
    }

    /// Close the device handle. Safe to call more than once.
    pub fn release(&mut self) {
        let Some(handle) = self.handle.take() else {
            debug!("Capture device already released");
            return;
        };

        match self.device.close(handle) {
            Ok(()) => info!(device = self.device.name(), "Capture device released"),
            Err(e) => warn!(device = self.device.name(), error = %e, "Failed to close capture device"),
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.release();
    }
}
