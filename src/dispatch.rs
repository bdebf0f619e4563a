//! Routes decoded server events to their handlers.

use crate::assembler::{TranscriptAssembler, TranscriptRecord};
use crate::codec::{RemoteError, ServerEvent, TranscriptionFragment};
use crate::session::SessionCounters;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Receives everything a session surfaces to the outside world
pub trait SessionObserver: Send {
    fn on_transcript(&mut self, record: &TranscriptRecord);

    fn on_remote_error(&mut self, _error: &RemoteError) {}
}

/// Prints each record as `Output: {json}` on stdout
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_transcript(&mut self, record: &TranscriptRecord) {
        match serde_json::to_string(record) {
            Ok(json) => {
                println!("Output: {}", json);
                std::io::stdout().flush().ok();
            }
            Err(e) => warn!("Failed to serialize transcript record: {}", e),
        }
    }

    fn on_remote_error(&mut self, error: &RemoteError) {
        eprintln!("Error: {}", error.message);
    }
}

/// Observer output forwarded over a channel
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    Transcript(TranscriptRecord),
    RemoteError(RemoteError),
}

/// Forwards observer output to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionOutput>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionOutput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionObserver for ChannelObserver {
    fn on_transcript(&mut self, record: &TranscriptRecord) {
        let _ = self.tx.send(SessionOutput::Transcript(record.clone()));
    }

    fn on_remote_error(&mut self, error: &RemoteError) {
        let _ = self.tx.send(SessionOutput::RemoteError(error.clone()));
    }
}

/// Maps each event kind to its handler. Never fails: unknown kinds and
/// remote errors are logged and absorbed.
pub struct EventDispatcher {
    assembler: TranscriptAssembler,
    observer: Box<dyn SessionObserver>,
    counters: Arc<SessionCounters>,
}

impl EventDispatcher {
    pub fn new(
        assembler: TranscriptAssembler,
        observer: Box<dyn SessionObserver>,
        counters: Arc<SessionCounters>,
    ) -> Self {
        Self {
            assembler,
            observer,
            counters,
        }
    }

    pub fn assembler(&self) -> &TranscriptAssembler {
        &self.assembler
    }

    pub fn dispatch(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::SessionCreated(created) => {
                info!(
                    remote_session = created.session_id().unwrap_or("unknown"),
                    model = created.model().unwrap_or("unknown"),
                    "Session created"
                );
            }
            ServerEvent::SpeechStarted(marker) => {
                info!(
                    item_id = marker.item_id.as_deref().unwrap_or(""),
                    audio_start_ms = ?marker.audio_start_ms,
                    "Speech started"
                );
            }
            ServerEvent::SpeechStopped(marker) => {
                info!(
                    item_id = marker.item_id.as_deref().unwrap_or(""),
                    audio_end_ms = ?marker.audio_end_ms,
                    "Speech stopped"
                );
            }
            ServerEvent::TranscriptionDelta(fragment) => self.transcript(fragment, false),
            ServerEvent::TranscriptionCompleted(fragment) => self.transcript(fragment, true),
            ServerEvent::Error(remote) => {
                self.counters.remote_error();
                error!(
                    kind = remote.kind.as_deref().unwrap_or(""),
                    code = remote.code.as_deref().unwrap_or(""),
                    "Service reported an error: {}",
                    remote.message
                );
                self.observer.on_remote_error(&remote);
            }
            ServerEvent::Unknown { kind, .. } => {
                debug!(kind = %kind, "Ignoring unhandled event");
            }
        }
    }

    fn transcript(&mut self, fragment: TranscriptionFragment, completed: bool) {
        if let Some(record) = self.assembler.accept(fragment, completed) {
            self.counters.transcript_emitted();
            self.observer.on_transcript(&record);
        }
    }
}
