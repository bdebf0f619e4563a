//! Wire codec for the realtime transcription protocol.
//!
//! Every message is a JSON object with a `type` discriminator. Outbound
//! commands serialize straight from [`ClientCommand`]. Inbound messages decode
//! into the closed [`ServerEvent`] enum; well-formed messages of a kind this
//! client does not handle become [`ServerEvent::Unknown`] instead of failing.

use crate::error::{DecodeError, TransportError};
use crate::session::SessionConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Inbound event kinds this client understands
pub mod kinds {
    pub const SESSION_CREATED: &str = "session.created";
    pub const SPEECH_STARTED: &str = "input_audio_buffer.speech_started";
    pub const SPEECH_STOPPED: &str = "input_audio_buffer.speech_stopped";
    pub const TRANSCRIPTION_DELTA: &str = "conversation.item.input_audio_transcription.delta";
    pub const TRANSCRIPTION_COMPLETED: &str =
        "conversation.item.input_audio_transcription.completed";
    pub const ERROR: &str = "error";
}

/// Commands sent from the client to the service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Session configuration; always the first message on a connection
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// One base64-encoded PCM frame
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
}

impl ClientCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::SessionUpdate { .. } => "session.update",
            ClientCommand::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
        }
    }

    /// Serialize to the text frame sent on the wire
    pub fn encode(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `session.created`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionCreated {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub session: Value,
}

impl SessionCreated {
    pub fn session_id(&self) -> Option<&str> {
        self.session.get("id").and_then(Value::as_str)
    }

    pub fn model(&self) -> Option<&str> {
        self.session.get("model").and_then(Value::as_str)
    }
}

/// `input_audio_buffer.speech_started` / `input_audio_buffer.speech_stopped`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeechMarker {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub audio_start_ms: Option<u64>,
    #[serde(default)]
    pub audio_end_ms: Option<u64>,
}

/// Payload shared by transcription delta and completed events.
///
/// A delta normally carries `delta` and a completed event `transcript`;
/// when both are present the final `transcript` wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptionFragment {
    pub item_id: String,
    #[serde(default)]
    pub content_index: Option<u32>,
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

/// Error reported by the service in an `error` event.
///
/// Usually nested under `error`, but a flat body is accepted too. Scalar
/// fields take strings or numbers, so a numeric `code` such as `429` is kept
/// as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_message")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub param: Option<String>,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_message<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    lenient_text(deserializer).map(Option::unwrap_or_default)
}

fn remote_error(kind: &str, mut value: Value) -> Result<RemoteError, DecodeError> {
    let body = match value.get_mut("error").map(Value::take) {
        Some(inner @ Value::Object(_)) => inner,
        Some(Value::String(message)) => {
            return Ok(RemoteError {
                message,
                ..RemoteError::default()
            })
        }
        _ => {
            if let Value::Object(fields) = &mut value {
                fields.remove("type");
                fields.remove("error");
            }
            value
        }
    };

    let mut remote: RemoteError = payload(kind, body.clone())?;
    if remote.message.is_empty() {
        remote.message = body.to_string();
    }
    Ok(remote)
}

/// Events received from the service
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SessionCreated(SessionCreated),
    SpeechStarted(SpeechMarker),
    SpeechStopped(SpeechMarker),
    TranscriptionDelta(TranscriptionFragment),
    TranscriptionCompleted(TranscriptionFragment),
    Error(RemoteError),
    /// Any other well-formed event, kept verbatim
    Unknown { kind: String, raw: Value },
}

impl ServerEvent {
    pub fn kind(&self) -> &str {
        match self {
            ServerEvent::SessionCreated(_) => kinds::SESSION_CREATED,
            ServerEvent::SpeechStarted(_) => kinds::SPEECH_STARTED,
            ServerEvent::SpeechStopped(_) => kinds::SPEECH_STOPPED,
            ServerEvent::TranscriptionDelta(_) => kinds::TRANSCRIPTION_DELTA,
            ServerEvent::TranscriptionCompleted(_) => kinds::TRANSCRIPTION_COMPLETED,
            ServerEvent::Error(_) => kinds::ERROR,
            ServerEvent::Unknown { kind, .. } => kind,
        }
    }
}

/// Decode one inbound wire message
pub fn decode(bytes: &[u8]) -> Result<ServerEvent, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::Malformed)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingKind)?
        .to_owned();

    let event = match kind.as_str() {
        kinds::SESSION_CREATED => ServerEvent::SessionCreated(payload(&kind, value)?),
        kinds::SPEECH_STARTED => ServerEvent::SpeechStarted(payload(&kind, value)?),
        kinds::SPEECH_STOPPED => ServerEvent::SpeechStopped(payload(&kind, value)?),
        kinds::TRANSCRIPTION_DELTA => ServerEvent::TranscriptionDelta(payload(&kind, value)?),
        kinds::TRANSCRIPTION_COMPLETED => {
            ServerEvent::TranscriptionCompleted(payload(&kind, value)?)
        }
        kinds::ERROR => ServerEvent::Error(remote_error(&kind, value)?),
        _ => ServerEvent::Unknown {
            kind: kind.clone(),
            raw: value,
        },
    };

    Ok(event)
}

fn payload<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::Payload {
        kind: kind.to_owned(),
        source,
    })
}
