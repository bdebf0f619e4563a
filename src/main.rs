use anyhow::{Context, Result};
use clap::Parser;
use realtime_transcribe::{CaptureDevice, Config, ConsoleObserver, Session, WavFileDevice, WebSocketConnector};
use secrecy::SecretString;
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Stream live audio to a realtime speech service and print transcripts
#[derive(Debug, Parser)]
#[command(name = "realtime-transcribe", version)]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay a WAV file instead of capturing from the microphone
    #[arg(long)]
    input: Option<PathBuf>,

    /// Transcription model override
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(model) = args.model {
        cfg.session.input_audio_transcription.model = model;
    }

    let connector = WebSocketConnector::new(cfg.connection.url.clone(), api_key()?)
        .with_beta_header(cfg.beta_header());

    let device: Box<dyn CaptureDevice> = match &args.input {
        Some(path) => Box::new(WavFileDevice::new(path)),
        None => microphone()?,
    };

    let session = Session::new(Box::new(connector), device, Box::new(ConsoleObserver))
        .with_config(cfg.session.clone())
        .with_options(cfg.session_options());

    info!("Starting session {}", session.id());
    println!("Press Enter to stop recording...\n");

    let stats = session.run(stop_trigger()).await?;
    info!(
        "Session {} ended ({:?}): {} frames sent, {} transcripts in {:.1}s",
        stats.session_id,
        stats.end_reason,
        stats.frames_sent,
        stats.transcripts_emitted,
        stats.duration_secs
    );

    Ok(())
}

fn api_key() -> Result<SecretString> {
    let key = std::env::var("OPENAI_API_KEY")
        .or_else(|_| std::env::var("API_KEY"))
        .context("OPENAI_API_KEY (or API_KEY) environment variable is required")?;
    Ok(SecretString::from(key))
}

#[cfg(feature = "microphone")]
fn microphone() -> Result<Box<dyn CaptureDevice>> {
    Ok(Box::new(realtime_transcribe::MicrophoneDevice::new()))
}

#[cfg(not(feature = "microphone"))]
fn microphone() -> Result<Box<dyn CaptureDevice>> {
    anyhow::bail!("Microphone capture requires the `microphone` feature; pass --input <file.wav> instead")
}

/// Resolves on Enter or Ctrl-C, whichever comes first
async fn stop_trigger() {
    // A plain thread so a pending stdin read never holds up runtime shutdown
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });

    tokio::select! {
        Ok(()) = rx => info!("Stop requested from console"),
        _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
    }
}
