//! Error taxonomy for a transcription session.
//!
//! Only [`SessionError`] ends a session. Decode failures and remote `error`
//! events are handled inside the downlink and never surface here.

use crate::audio::DeviceHandle;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failure of the full-duplex connection to the speech service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("invalid connection request: {0}")]
    Request(String),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection is closed")]
    Closed,
}

/// Failure of the audio capture device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open capture device: {0}")]
    Open(String),

    #[error("unsupported audio input: {0}")]
    Format(String),

    #[error("capture read failed: {0}")]
    Read(String),

    #[error("unknown device handle {0:?}")]
    UnknownHandle(DeviceHandle),

    #[error("capture device already released")]
    Released,
}

/// An inbound message that could not be turned into a [`crate::codec::ServerEvent`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("message has no string `type` field")]
    MissingKind,

    #[error("invalid `{kind}` payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that end a session early.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection error: {0}")]
    Connection(#[source] TransportError),

    #[error("session configuration could not be sent: {0}")]
    Config(#[source] TransportError),

    #[error("capture device error: {0}")]
    Device(#[from] DeviceError),

    #[error("{task} task panicked")]
    TaskPanicked { task: &'static str },
}
