use super::config::SessionConfig;
use super::downlink::{Downlink, DownlinkExit};
use super::signal::RunSignal;
use super::stats::{EndReason, SessionCounters, SessionStats};
use super::uplink::{Uplink, UplinkExit};
use crate::assembler::{TranscriptAssembler, DEFAULT_MAX_OPEN_ITEMS};
use crate::audio::{AudioCapture, AudioFormat, CaptureDevice};
use crate::codec::ClientCommand;
use crate::dispatch::{EventDispatcher, SessionObserver};
use crate::error::SessionError;
use crate::transport::{ConnectionGuard, Connector, Sender, WireStream};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, info_span, warn, Instrument};

/// Timing and sizing knobs for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Capture format; one frame is read and sent per uplink iteration
    pub audio: AudioFormat,

    /// Upper bound on a single device read
    pub read_timeout: Duration,

    /// Delay between two sent frames
    pub pacing: Duration,

    /// How long a loop may take to observe the stop before it is cancelled
    pub shutdown_grace: Duration,

    /// How long to keep receiving after a file input runs out
    pub drain: Duration,

    /// Cap on transcript items tracked at once
    pub max_open_items: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            audio: AudioFormat::default(),
            read_timeout: Duration::from_millis(250),
            pacing: Duration::from_millis(10),
            shutdown_grace: Duration::from_secs(2),
            drain: Duration::from_secs(3),
            max_open_items: DEFAULT_MAX_OPEN_ITEMS,
        }
    }
}

/// One realtime transcription session over one connection.
///
/// [`Session::run`] owns the whole lifecycle: connect, configure, stream
/// audio up and events down concurrently, then tear everything down once the
/// stop trigger fires or either direction ends on its own.
pub struct Session {
    id: String,
    connector: Box<dyn Connector>,
    device: Box<dyn CaptureDevice>,
    observer: Box<dyn SessionObserver>,
    config: SessionConfig,
    options: SessionOptions,
}

impl Session {
    pub fn new(
        connector: Box<dyn Connector>,
        device: Box<dyn CaptureDevice>,
        observer: Box<dyn SessionObserver>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            connector,
            device,
            observer,
            config: SessionConfig::default(),
            options: SessionOptions::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run until `stop` resolves or the session ends on its own.
    ///
    /// The connection is closed and the capture device released on every
    /// path out of this call.
    pub async fn run<F>(self, stop: F) -> Result<SessionStats, SessionError>
    where
        F: Future<Output = ()>,
    {
        let span = info_span!("session", id = %self.id);
        self.run_inner(stop).instrument(span).await
    }

    async fn run_inner<F>(self, stop: F) -> Result<SessionStats, SessionError>
    where
        F: Future<Output = ()>,
    {
        let Session {
            id,
            connector,
            device,
            observer,
            config,
            options,
        } = self;

        let started_at = Utc::now();
        let counters = Arc::new(SessionCounters::default());

        let connection = connector.connect().await.map_err(|e| {
            error!(error = %e, "Failed to open connection");
            SessionError::Connection(e)
        })?;
        let (sink, stream) = connection.split();
        let (guard, sender) = ConnectionGuard::new(sink);

        let close_limit = options.shutdown_grace;
        let outcome = drive(
            Streaming {
                sender,
                stream,
                device,
                observer,
                config,
                options,
                counters: Arc::clone(&counters),
            },
            stop,
        )
        .await;

        guard.close(close_limit).await;

        let end_reason = outcome?;
        let stats = counters.snapshot(id, started_at, end_reason);
        info!(
            frames_sent = stats.frames_sent,
            events_received = stats.events_received,
            transcripts = stats.transcripts_emitted,
            duration_secs = stats.duration_secs,
            reason = ?stats.end_reason,
            "Session finished"
        );

        Ok(stats)
    }
}

struct Streaming {
    sender: Sender,
    stream: Box<dyn WireStream>,
    device: Box<dyn CaptureDevice>,
    observer: Box<dyn SessionObserver>,
    config: SessionConfig,
    options: SessionOptions,
    counters: Arc<SessionCounters>,
}

async fn drive<F>(parts: Streaming, stop: F) -> Result<EndReason, SessionError>
where
    F: Future<Output = ()>,
{
    let Streaming {
        sender,
        stream,
        device,
        observer,
        config,
        options,
        counters,
    } = parts;

    // The configuration goes out before the sender is handed to the uplink,
    // so it always precedes the first audio frame.
    let model = config.input_audio_transcription.model.clone();
    let command = ClientCommand::SessionUpdate { session: config };
    let update = command.encode().map_err(SessionError::Config)?;
    sender.send(update).await.map_err(|e| {
        error!(command = command.kind(), error = %e, "Failed to send session configuration");
        SessionError::Config(e)
    })?;
    info!(command = command.kind(), model = %model, "Session configuration sent");

    let capture = AudioCapture::open(device, options.audio, options.read_timeout)?;

    let signal = RunSignal::start();
    let dispatcher = EventDispatcher::new(
        TranscriptAssembler::new(options.max_open_items),
        observer,
        Arc::clone(&counters),
    );

    let mut uplink = tokio::spawn(
        Uplink {
            sender,
            capture,
            flag: signal.flag(),
            pacing: options.pacing,
            counters: Arc::clone(&counters),
        }
        .run()
        .in_current_span(),
    );
    let mut downlink = tokio::spawn(
        Downlink {
            stream,
            dispatcher,
            flag: signal.flag(),
            counters,
        }
        .run()
        .in_current_span(),
    );

    tokio::pin!(stop);
    let mut uplink_done = None;
    let mut downlink_done = None;
    let mut reason = EndReason::StopRequested;

    tokio::select! {
        _ = &mut stop => info!("Stop requested"),
        joined = &mut uplink => {
            if matches!(joined, Ok(Ok(UplinkExit::InputExhausted))) {
                reason = EndReason::InputExhausted;
                info!(drain_ms = options.drain.as_millis() as u64, "Waiting for final transcripts");
                tokio::select! {
                    _ = &mut stop => info!("Stop requested"),
                    joined = &mut downlink => downlink_done = Some(joined),
                    _ = tokio::time::sleep(options.drain) => {}
                }
            }
            uplink_done = Some(joined);
        }
        joined = &mut downlink => {
            if matches!(joined, Ok(Ok(DownlinkExit::ConnectionClosed))) {
                reason = EndReason::ConnectionClosed;
            }
            downlink_done = Some(joined);
        }
    }

    signal.stop();

    let grace = options.shutdown_grace;
    let (uplink_result, downlink_result) = tokio::join!(
        settle("uplink", uplink, uplink_done, grace),
        settle("downlink", downlink, downlink_done, grace),
    );

    uplink_result?;
    downlink_result?;
    Ok(reason)
}

type Joined<T> = Result<Result<T, SessionError>, JoinError>;

/// Wait for a loop to finish after the stop, cancelling it once `grace` runs out.
/// `Ok(None)` means the task had to be cancelled.
async fn settle<T>(
    task: &'static str,
    mut handle: JoinHandle<Result<T, SessionError>>,
    done: Option<Joined<T>>,
    grace: Duration,
) -> Result<Option<T>, SessionError> {
    let joined = match done {
        Some(joined) => joined,
        None => match tokio::time::timeout(grace, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    task,
                    grace_ms = grace.as_millis() as u64,
                    "Task did not stop within grace period, cancelling"
                );
                handle.abort();
                handle.await
            }
        },
    };

    match joined {
        Ok(result) => result.map(Some),
        Err(e) if e.is_cancelled() => Ok(None),
        Err(_) => {
            error!(task, "Task panicked");
            Err(SessionError::TaskPanicked { task })
        }
    }
}
