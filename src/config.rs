use crate::audio::{AudioFormat, SampleFormat};
use crate::session::{SessionConfig, SessionOptions};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for overrides, e.g. `TRANSCRIBE_RUNTIME__PACING_MS=20`
pub const ENV_PREFIX: &str = "TRANSCRIBE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub audio: AudioConfig,
    pub session: SessionConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub url: String,
    /// Sent as the `OpenAI-Beta` header; empty disables it
    pub beta_header: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel in one uplink frame
    pub frame_samples: usize,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub pacing_ms: u64,
    pub shutdown_grace_ms: u64,
    pub drain_ms: u64,
    pub max_open_items: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "wss://api.openai.com/v1/realtime?model=gpt-4o-mini-realtime-preview-2024-12-17"
                .to_string(),
            beta_header: "realtime=v1".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000, // realtime API expects 24kHz pcm16
            channels: 1,
            frame_samples: 1024,
            read_timeout_ms: 250,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 10,
            shutdown_grace_ms: 2000,
            drain_ms: 3000,
            max_open_items: 256,
        }
    }
}

impl Config {
    /// Defaults, then the optional file, then `TRANSCRIBE_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let cfg: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.audio_format()
            .validate()
            .context("Invalid [audio] configuration")?;

        Ok(cfg)
    }

    pub fn beta_header(&self) -> Option<String> {
        let value = self.connection.beta_header.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            sample_format: SampleFormat::Pcm16,
            channels: self.audio.channels,
            sample_rate: self.audio.sample_rate,
            frame_samples: self.audio.frame_samples,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            audio: self.audio_format(),
            read_timeout: Duration::from_millis(self.audio.read_timeout_ms),
            pacing: Duration::from_millis(self.runtime.pacing_ms),
            shutdown_grace: Duration::from_millis(self.runtime.shutdown_grace_ms),
            drain: Duration::from_millis(self.runtime.drain_ms),
            max_open_items: self.runtime.max_open_items,
        }
    }
}
