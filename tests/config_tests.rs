// Tests for layered configuration loading

use anyhow::Result;
use realtime_transcribe::Config;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let cfg = Config::default();

    assert!(cfg.connection.url.starts_with("wss://"));
    assert_eq!(cfg.beta_header().as_deref(), Some("realtime=v1"));
    assert_eq!(cfg.audio.sample_rate, 24000);
    assert_eq!(cfg.audio.channels, 1);
    assert_eq!(cfg.session.input_audio_format, "pcm16");
    assert_eq!(cfg.session.input_audio_transcription.model, "gpt-4o-transcribe");
    assert_eq!(cfg.session.turn_detection.kind, "server_vad");

    let options = cfg.session_options();
    assert_eq!(options.audio.frame_bytes(), 2048);
    assert_eq!(options.read_timeout, Duration::from_millis(250));
    assert_eq!(options.shutdown_grace, Duration::from_secs(2));
    assert_eq!(options.max_open_items, 256);
}

#[test]
fn test_load_from_file() -> Result<()> {
    let mut file = NamedTempFile::with_suffix(".toml")?;
    writeln!(
        file,
        r#"
[connection]
url = "wss://example.test/realtime"
beta_header = ""

[audio]
frame_samples = 480

[session]
instructions = "Transcribe verbatim."

[session.input_audio_transcription]
model = "whisper-1"
language = "de"

[session.turn_detection]
threshold = 0.7
silence_duration_ms = 800

[runtime]
pacing_ms = 20
"#
    )?;

    let cfg = Config::load(Some(file.path()))?;

    assert_eq!(cfg.connection.url, "wss://example.test/realtime");
    assert_eq!(cfg.beta_header(), None, "Empty header disables it");
    assert_eq!(cfg.audio.frame_samples, 480);
    assert_eq!(cfg.audio.sample_rate, 24000, "Unset keys keep their defaults");
    assert_eq!(cfg.session.instructions.as_deref(), Some("Transcribe verbatim."));
    assert_eq!(cfg.session.input_audio_transcription.model, "whisper-1");
    assert_eq!(
        cfg.session.input_audio_transcription.language.as_deref(),
        Some("de")
    );
    assert!((cfg.session.turn_detection.threshold - 0.7).abs() < f32::EPSILON);
    assert_eq!(cfg.session.turn_detection.silence_duration_ms, 800);
    assert_eq!(cfg.session.turn_detection.prefix_padding_ms, 300);
    assert_eq!(cfg.runtime.pacing_ms, 20);
    assert_eq!(cfg.session_options().pacing, Duration::from_millis(20));

    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let result = Config::load(Some(std::path::Path::new("/nonexistent/transcribe.toml")));
    assert!(result.is_err());
}

#[test]
fn test_environment_overrides() -> Result<()> {
    std::env::set_var("TRANSCRIBE_RUNTIME__DRAIN_MS", "1500");
    let cfg = Config::load(None);
    std::env::remove_var("TRANSCRIBE_RUNTIME__DRAIN_MS");

    let cfg = cfg?;
    assert_eq!(cfg.runtime.drain_ms, 1500);
    assert_eq!(cfg.session_options().drain, Duration::from_millis(1500));

    Ok(())
}

#[test]
fn test_zero_frame_size_is_rejected() -> Result<()> {
    let mut file = NamedTempFile::with_suffix(".toml")?;
    writeln!(file, "[audio]\nframe_samples = 0")?;

    let err = Config::load(Some(file.path())).unwrap_err();

    assert!(
        format!("{:#}", err).contains("frame size must be non-zero"),
        "unexpected error: {:#}",
        err
    );
    Ok(())
}

#[test]
fn test_zero_sample_rate_is_rejected() -> Result<()> {
    let mut file = NamedTempFile::with_suffix(".toml")?;
    writeln!(file, "[audio]\nsample_rate = 0\nchannels = 0")?;

    assert!(Config::load(Some(file.path())).is_err());
    Ok(())
}
