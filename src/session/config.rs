use serde::{Deserialize, Serialize};

/// Session configuration sent as the `session` field of `session.update`.
///
/// Field names follow the wire format, so the same struct is read from the
/// `[session]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Output modalities requested from the service
    pub modalities: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Encoding of the appended audio (`pcm16`)
    pub input_audio_format: String,

    pub input_audio_transcription: TranscriptionSettings,

    pub turn_detection: TurnDetection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub model: String,

    /// ISO-639-1 hint; the service auto-detects when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Server-side voice activity detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnDetection {
    /// Detector kind (`server_vad`)
    #[serde(rename = "type")]
    pub kind: String,

    /// Energy threshold, 0.0 to 1.0
    pub threshold: f32,

    /// Audio kept before detected speech
    pub prefix_padding_ms: u32,

    /// Trailing silence that ends an utterance
    pub silence_duration_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            modalities: vec!["text".to_string()],
            instructions: Some(
                "You are a helpful assistant that transcribes audio.".to_string(),
            ),
            input_audio_format: "pcm16".to_string(),
            input_audio_transcription: TranscriptionSettings::default(),
            turn_detection: TurnDetection::default(),
        }
    }
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-transcribe".to_string(),
            language: None,
        }
    }
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            kind: "server_vad".to_string(),
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}
