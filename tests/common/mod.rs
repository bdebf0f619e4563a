// Shared test doubles: an in-memory connection and a scripted capture device.

#![allow(dead_code)]

use async_trait::async_trait;
use realtime_transcribe::audio::{AudioFormat, CaptureDevice, DeviceHandle, DeviceRead};
use realtime_transcribe::session::SessionOptions;
use realtime_transcribe::transport::{Connection, Connector, WireSink, WireStream};
use realtime_transcribe::{DeviceError, TransportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything the client wrote to, or did with, the mock connection
#[derive(Default)]
pub struct WireLog {
    sent: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

impl WireLog {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct MockConnector {
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    log: Arc<WireLog>,
    refuse: bool,
    /// Sends succeed this many times, then fail
    send_budget: Option<usize>,
    /// Receives succeed this many times, then fail
    recv_budget: Option<usize>,
    hang_on_close: bool,
}

impl MockConnector {
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn failing_after(mut self, sends: usize) -> Self {
        self.send_budget = Some(sends);
        self
    }

    pub fn receive_failing_after(mut self, receives: usize) -> Self {
        self.recv_budget = Some(receives);
        self
    }

    /// A peer that never acknowledges the close
    pub fn hanging_on_close(mut self) -> Self {
        self.hang_on_close = true;
        self
    }
}

/// A connector plus the handle used to push inbound messages
pub fn mock_connection() -> (MockConnector, mpsc::UnboundedSender<Vec<u8>>, Arc<WireLog>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let log = Arc::new(WireLog::default());
    let connector = MockConnector {
        inbound: Mutex::new(Some(rx)),
        log: Arc::clone(&log),
        refuse: false,
        send_budget: None,
        recv_budget: None,
        hang_on_close: false,
    };
    (connector, tx, log)
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        if self.refuse {
            return Err(TransportError::Request("connection refused".into()));
        }
        let rx = self.inbound.lock().unwrap().take().ok_or(TransportError::Closed)?;
        Ok(Connection {
            sink: Box::new(MockSink {
                log: Arc::clone(&self.log),
                budget: self.send_budget,
                hang_on_close: self.hang_on_close,
            }),
            stream: Box::new(MockStream {
                rx,
                budget: self.recv_budget,
            }),
        })
    }
}

struct MockSink {
    log: Arc<WireLog>,
    budget: Option<usize>,
    hang_on_close: bool,
}

#[async_trait]
impl WireSink for MockSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if let Some(budget) = self.budget.as_mut() {
            if *budget == 0 {
                return Err(TransportError::Closed);
            }
            *budget -= 1;
        }
        self.log.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_close {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

struct MockStream {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    budget: Option<usize>,
}

#[async_trait]
impl WireStream for MockStream {
    async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        if let Some(budget) = self.budget.as_mut() {
            if *budget == 0 {
                return Some(Err(TransportError::Request("connection reset by peer".into())));
            }
            *budget -= 1;
        }
        self.rx.recv().await.map(Ok)
    }
}

/// What the mock device does on each read
#[derive(Debug, Clone, Copy)]
pub enum ReadBehavior {
    /// Return a silent frame immediately
    Silence,
    /// Wait out the whole timeout, then report nothing
    Block,
    /// Sleep this long regardless of the timeout
    Hang(Duration),
    /// Silent frames, then a read error
    FailAfter(usize),
    /// Silent frames, then end of input
    ExhaustAfter(usize),
}

#[derive(Default)]
pub struct DeviceLog {
    opens: AtomicUsize,
    reads: AtomicUsize,
    closes: AtomicUsize,
}

impl DeviceLog {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct MockDevice {
    behavior: ReadBehavior,
    log: Arc<DeviceLog>,
    reads: usize,
}

impl MockDevice {
    pub fn new(behavior: ReadBehavior) -> (Self, Arc<DeviceLog>) {
        let log = Arc::new(DeviceLog::default());
        (
            Self {
                behavior,
                log: Arc::clone(&log),
                reads: 0,
            },
            log,
        )
    }
}

impl CaptureDevice for MockDevice {
    fn name(&self) -> &str {
        "mock"
    }

    fn open(&mut self, _format: &AudioFormat) -> Result<DeviceHandle, DeviceError> {
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        Ok(DeviceHandle::new(7))
    }

    fn read(
        &mut self,
        _handle: DeviceHandle,
        frame_bytes: usize,
        timeout: Duration,
    ) -> Result<DeviceRead, DeviceError> {
        self.log.reads.fetch_add(1, Ordering::SeqCst);
        self.reads += 1;

        match self.behavior {
            ReadBehavior::Silence => Ok(DeviceRead::Frame(vec![0; frame_bytes])),
            ReadBehavior::Block => {
                std::thread::sleep(timeout);
                Ok(DeviceRead::Idle)
            }
            ReadBehavior::Hang(duration) => {
                std::thread::sleep(duration);
                Ok(DeviceRead::Idle)
            }
            ReadBehavior::FailAfter(n) if self.reads > n => {
                Err(DeviceError::Read("microphone unplugged".into()))
            }
            ReadBehavior::ExhaustAfter(n) if self.reads > n => Ok(DeviceRead::Exhausted),
            ReadBehavior::FailAfter(_) | ReadBehavior::ExhaustAfter(_) => {
                Ok(DeviceRead::Frame(vec![0; frame_bytes]))
            }
        }
    }

    fn close(&mut self, _handle: DeviceHandle) -> Result<(), DeviceError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Session options scaled down for tests
pub fn fast_options() -> SessionOptions {
    SessionOptions {
        read_timeout: Duration::from_millis(20),
        pacing: Duration::from_millis(1),
        shutdown_grace: Duration::from_millis(500),
        drain: Duration::from_millis(50),
        ..SessionOptions::default()
    }
}
