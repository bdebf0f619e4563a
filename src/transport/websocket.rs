//! WebSocket transport for the realtime API.

use super::{Connection, Connector, WireSink, WireStream};
use crate::error::TransportError;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects with a bearer token and an optional `OpenAI-Beta` header
pub struct WebSocketConnector {
    url: String,
    api_key: SecretString,
    beta_header: Option<String>,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            url: url.into(),
            api_key,
            beta_header: None,
        }
    }

    pub fn with_beta_header(mut self, value: Option<String>) -> Self {
        self.beta_header = value;
        self
    }

    fn request(&self) -> Result<tungstenite::http::Request<()>, TransportError> {
        let mut request = self.url.as_str().into_client_request()?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose_secret()))
            .map_err(|_| TransportError::Request("API key is not a valid header value".into()))?;
        request.headers_mut().insert("Authorization", bearer);

        if let Some(beta) = &self.beta_header {
            let value = HeaderValue::from_str(beta)
                .map_err(|e| TransportError::Request(format!("invalid beta header: {}", e)))?;
            request.headers_mut().insert("OpenAI-Beta", value);
        }

        Ok(request)
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        info!("Connecting to {}", self.url);

        let (ws_stream, response) = connect_async(self.request()?).await?;
        info!(status = %response.status(), "Connected to realtime API");

        let (tx, rx) = ws_stream.split();
        Ok(Connection {
            sink: Box::new(WsSink(tx)),
            stream: Box::new(WsSource(rx)),
        })
    }
}

struct WsSink(SplitSink<WsStream, Message>);

#[async_trait]
impl WireSink for WsSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.0.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.0.close().await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

struct WsSource(SplitStream<WsStream>);

#[async_trait]
impl WireStream for WsSource {
    async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.into_bytes())),
                Ok(Message::Binary(data)) => return Some(Ok(data)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Close frame received");
                    return None;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                    return None
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
