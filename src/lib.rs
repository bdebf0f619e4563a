pub mod assembler;
pub mod audio;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod session;
pub mod transport;

pub use assembler::{TranscriptAssembler, TranscriptRecord};
pub use audio::{
    AudioCapture, AudioFormat, CaptureDevice, DeviceHandle, DeviceRead, SampleFormat,
    WavFileDevice,
};
pub use codec::{ClientCommand, RemoteError, ServerEvent, TranscriptionFragment};
pub use crate::config::Config;
pub use dispatch::{
    ChannelObserver, ConsoleObserver, EventDispatcher, SessionObserver, SessionOutput,
};
pub use error::{DecodeError, DeviceError, SessionError, TransportError};
pub use session::{
    EndReason, RunFlag, RunSignal, Session, SessionConfig, SessionOptions, SessionStats,
};
pub use transport::{Connection, ConnectionGuard, Connector, WebSocketConnector, WireSink, WireStream};

#[cfg(feature = "microphone")]
pub use audio::MicrophoneDevice;
