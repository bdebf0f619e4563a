//! Realtime transcription session
//!
//! This module provides the `Session` abstraction that manages:
//! - The connection lifecycle and the `session.update` handshake
//! - The uplink loop (capture, encode, send)
//! - The downlink loop (receive, decode, dispatch)
//! - Cooperative shutdown with a bounded grace period

mod config;
mod coordinator;
mod downlink;
mod signal;
mod stats;
mod uplink;

pub use config::{SessionConfig, TranscriptionSettings, TurnDetection};
pub use coordinator::{Session, SessionOptions};
pub use downlink::DownlinkExit;
pub use signal::{RunFlag, RunSignal};
pub use stats::{EndReason, SessionCounters, SessionStats};
pub use uplink::UplinkExit;
