use super::signal::RunFlag;
use super::stats::SessionCounters;
use crate::audio::{AudioCapture, DeviceRead};
use crate::error::SessionError;
use crate::frame;
use crate::transport::Sender;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// How the uplink ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkExit {
    Stopped,
    InputExhausted,
}

/// Capture → encode → send, paced, until the run flag drops.
///
/// Owns the capture device and releases it on every exit path.
pub struct Uplink {
    pub(crate) sender: Sender,
    pub(crate) capture: AudioCapture,
    pub(crate) flag: RunFlag,
    pub(crate) pacing: Duration,
    pub(crate) counters: Arc<SessionCounters>,
}

impl Uplink {
    pub async fn run(self) -> Result<UplinkExit, SessionError> {
        let Uplink {
            sender,
            capture,
            mut flag,
            pacing,
            counters,
        } = self;

        info!(device = capture.device_name(), "Uplink started");
        let mut slot = Some(capture);

        let result = loop {
            if !flag.is_running() {
                break Ok(UplinkExit::Stopped);
            }
            let Some(capture) = slot.take() else {
                break Ok(UplinkExit::Stopped);
            };

            let pending = capture.read_frame();
            tokio::pin!(pending);

            let (returned, read) = tokio::select! {
                out = &mut pending => out,
                _ = flag.stopped() => {
                    // Reads are bounded by the device timeout; wait for the
                    // device to come back so it is released here.
                    let (returned, _) = pending.await;
                    slot = returned;
                    break Ok(UplinkExit::Stopped);
                }
            };
            slot = returned;

            let pcm = match read {
                Ok(DeviceRead::Frame(pcm)) => pcm,
                Ok(DeviceRead::Idle) => continue,
                Ok(DeviceRead::Exhausted) => {
                    info!("Audio input exhausted");
                    break Ok(UplinkExit::InputExhausted);
                }
                Err(e) => {
                    error!(error = %e, "Capture device failed, stopping uplink");
                    break Err(SessionError::Device(e));
                }
            };

            let sent = match frame::append_command(&pcm).encode() {
                Ok(text) => sender.send(text).await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                error!(error = %e, "Failed to send audio frame, stopping uplink");
                break Err(SessionError::Connection(e));
            }

            counters.frame_sent(pcm.len());
            if counters.frames_sent() % 100 == 0 {
                debug!(frames = counters.frames_sent(), "Audio frames sent");
            }

            tokio::select! {
                _ = tokio::time::sleep(pacing) => {}
                _ = flag.stopped() => break Ok(UplinkExit::Stopped),
            }
        };

        if let Some(mut capture) = slot {
            capture.release();
        }

        info!("Uplink stopped");
        result
    }
}
