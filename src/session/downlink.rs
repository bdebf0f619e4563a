use super::signal::RunFlag;
use super::stats::SessionCounters;
use crate::codec;
use crate::dispatch::EventDispatcher;
use crate::error::SessionError;
use crate::transport::WireStream;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How the downlink ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownlinkExit {
    Stopped,
    ConnectionClosed,
}

/// Receive → decode → dispatch, until the connection closes or the run flag drops
pub struct Downlink {
    pub(crate) stream: Box<dyn WireStream>,
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) flag: RunFlag,
    pub(crate) counters: Arc<SessionCounters>,
}

impl Downlink {
    pub async fn run(self) -> Result<DownlinkExit, SessionError> {
        let Downlink {
            mut stream,
            mut dispatcher,
            mut flag,
            counters,
        } = self;

        info!("Downlink started");

        let result = loop {
            let message = tokio::select! {
                message = stream.recv() => message,
                _ = flag.stopped() => break Ok(DownlinkExit::Stopped),
            };

            let bytes = match message {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    error!(error = %e, "Failed to receive from connection");
                    break Err(SessionError::Connection(e));
                }
                None => {
                    info!("Connection closed by remote");
                    break Ok(DownlinkExit::ConnectionClosed);
                }
            };

            counters.event_received();
            match codec::decode(&bytes) {
                Ok(event) => dispatcher.dispatch(event),
                Err(e) => {
                    counters.decode_failed();
                    warn!(error = %e, "Discarding undecodable message");
                }
            }
        };

        let open = dispatcher.assembler().open_items();
        if open > 0 {
            info!(open_items = open, "Downlink stopped with unfinished transcript items");
        } else {
            info!("Downlink stopped");
        }
        result
    }
}
