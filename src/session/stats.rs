use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The external stop trigger fired
    StopRequested,
    /// The service closed the connection
    ConnectionClosed,
    /// A file input ran out of audio
    InputExhausted,
}

/// Statistics about a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Local identifier used in logs
    pub session_id: String,

    /// When the connection was opened
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio frames sent upstream
    pub frames_sent: u64,

    /// Raw PCM bytes sent upstream (before base64)
    pub audio_bytes_sent: u64,

    /// Wire messages received
    pub events_received: u64,

    /// Messages that could not be decoded
    pub decode_failures: u64,

    /// `error` events reported by the service
    pub remote_errors: u64,

    /// Output records emitted
    pub transcripts_emitted: u64,

    pub end_reason: EndReason,
}

/// Counters shared by the uplink and downlink tasks.
///
/// Atomics rather than task return values, so a force-cancelled task still
/// leaves accurate numbers behind.
#[derive(Debug, Default)]
pub struct SessionCounters {
    frames_sent: AtomicU64,
    audio_bytes_sent: AtomicU64,
    events_received: AtomicU64,
    decode_failures: AtomicU64,
    remote_errors: AtomicU64,
    transcripts_emitted: AtomicU64,
}

impl SessionCounters {
    pub fn frame_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.audio_bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn remote_error(&self) {
        self.remote_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transcript_emitted(&self) {
        self.transcripts_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn transcripts_emitted(&self) -> u64 {
        self.transcripts_emitted.load(Ordering::Relaxed)
    }

    pub fn snapshot(
        &self,
        session_id: String,
        started_at: DateTime<Utc>,
        end_reason: EndReason,
    ) -> SessionStats {
        let duration = Utc::now().signed_duration_since(started_at);

        SessionStats {
            session_id,
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            audio_bytes_sent: self.audio_bytes_sent.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            transcripts_emitted: self.transcripts_emitted.load(Ordering::Relaxed),
            end_reason,
        }
    }
}
