//! Pub/sub transport session over WebSocket.
//!
//! The coordination service speaks a small JSON frame protocol:
//! `{"type": "publish", "channel": ..., "payload": ..., "qos": ...}` plus
//! `subscribe` requests and `sub_ack`/`pub_ack` acknowledgements. This
//! module owns the socket; everything above it sees only the [`JobBus`]
//! trait for outbound traffic and a single queue of [`Inbound`] events for
//! the rest.
//!
//! Certificate material (client cert, key, CA) is validated at startup and
//! provisioned to the TLS layer underneath the WebSocket stack; this module
//! never parses PEM itself.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::AgentConfig;

/// Depth of the single-consumer inbound event queue.
const INBOUND_QUEUE_DEPTH: usize = 32;

/// Delivery guarantee requested for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
}

impl Qos {
    pub fn as_u8(self) -> u8 {
        match self {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
        }
    }
}

/// Wire frames exchanged with the coordination service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Subscribe {
        channel: String,
        qos: u8,
    },
    SubAck {
        channel: String,
    },
    Publish {
        channel: String,
        payload: serde_json::Value,
        qos: u8,
    },
    PubAck {
        channel: String,
    },
}

/// A notification delivered on a subscribed channel.
///
/// Inbound frames are pushed onto one single-consumer queue in arrival
/// order; the session loop dispatches them by channel.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub channel: String,
    pub payload: serde_json::Value,
}

/// Errors that can occur when working with the transport session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to establish the initial connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failed to send a frame on an established connection.
    #[error("Send error: {0}")]
    Send(String),

    /// A frame could not be encoded as JSON.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound half of a pub/sub session.
///
/// The session loop is generic over this trait so it can be driven by an
/// in-memory bus in tests.
#[async_trait]
pub trait JobBus: Send {
    async fn subscribe(&mut self, channel: &str, qos: Qos) -> Result<(), TransportError>;

    async fn publish(
        &mut self,
        channel: &str,
        payload: serde_json::Value,
        qos: Qos,
    ) -> Result<(), TransportError>;
}

/// Outbound half of a live WebSocket session.
pub struct WsBus {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
}

impl WsBus {
    async fn send_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let json = serde_json::to_string(frame)?;
        self.sink
            .send(Message::Text(json))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

#[async_trait]
impl JobBus for WsBus {
    async fn subscribe(&mut self, channel: &str, qos: Qos) -> Result<(), TransportError> {
        tracing::debug!(channel = %channel, "Subscribing");
        self.send_frame(&Frame::Subscribe {
            channel: channel.to_string(),
            qos: qos.as_u8(),
        })
        .await
    }

    async fn publish(
        &mut self,
        channel: &str,
        payload: serde_json::Value,
        qos: Qos,
    ) -> Result<(), TransportError> {
        self.send_frame(&Frame::Publish {
            channel: channel.to_string(),
            payload,
            qos: qos.as_u8(),
        })
        .await
    }
}

/// Connect to the coordination service.
///
/// Returns the outbound bus plus the single-consumer queue of inbound
/// notifications. A background read pump routes `publish` frames into the
/// queue and logs acknowledgements as they arrive; the queue closing means
/// the session is over.
pub async fn connect(
    config: &AgentConfig,
) -> Result<(WsBus, mpsc::Receiver<Inbound>), TransportError> {
    let url = format!(
        "wss://{}/?client-id={}&clean-session={}",
        config.endpoint, config.client_id, config.clean_session,
    );

    let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
        TransportError::Connection(format!("Failed to connect to {}: {e}", config.endpoint))
    })?;

    tracing::info!(
        endpoint = %config.endpoint,
        client_id = %config.client_id,
        clean_session = config.clean_session,
        "Connected to coordination service",
    );

    let (sink, stream) = ws_stream.split();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
    tokio::spawn(read_pump(stream, inbound_tx));

    Ok((WsBus { sink }, inbound_rx))
}

/// Read frames off the socket until it closes, errors, or the session loop
/// drops its end of the queue.
async fn read_pump(
    mut stream: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    inbound: mpsc::Sender<Inbound>,
) {
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if !route_frame(&text, &inbound).await {
                    break;
                }
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Coordination service closed the connection");
                break;
            }
            Ok(_) => {
                // Binary / Frame: not part of the protocol.
            }
            Err(e) => {
                tracing::error!(error = %e, "Transport receive error");
                break;
            }
        }
    }
}

/// Parse one text frame and route it. Returns `false` only when the
/// session loop has gone away and the pump should stop.
async fn route_frame(text: &str, inbound: &mpsc::Sender<Inbound>) -> bool {
    match serde_json::from_str::<Frame>(text) {
        Ok(Frame::Publish { channel, payload, .. }) => inbound
            .send(Inbound { channel, payload })
            .await
            .is_ok(),
        Ok(Frame::SubAck { channel }) => {
            tracing::debug!(channel = %channel, "Subscription acknowledged");
            true
        }
        Ok(Frame::PubAck { channel }) => {
            tracing::debug!(channel = %channel, "Publish acknowledged");
            true
        }
        Ok(Frame::Subscribe { channel, .. }) => {
            tracing::warn!(channel = %channel, "Unexpected subscribe frame from service");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, raw = %text, "Malformed frame from service");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn publish_frame_wire_shape() {
        let frame = Frame::Publish {
            channel: "jobs/device-1/update".to_string(),
            payload: serde_json::json!({"jobId": "job-42"}),
            qos: Qos::AtMostOnce.as_u8(),
        };

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "publish");
        assert_eq!(value["channel"], "jobs/device-1/update");
        assert_eq!(value["payload"]["jobId"], "job-42");
        assert_eq!(value["qos"], 0);
    }

    #[test]
    fn acknowledgement_frames_parse() {
        let frame: Frame =
            serde_json::from_str(r#"{"type": "sub_ack", "channel": "jobs/device-1/pending/accepted"}"#)
                .unwrap();
        assert_matches!(frame, Frame::SubAck { channel } if channel.ends_with("/accepted"));

        let frame: Frame =
            serde_json::from_str(r#"{"type": "pub_ack", "channel": "jobs/device-1/update"}"#)
                .unwrap();
        assert_matches!(frame, Frame::PubAck { .. });
    }

    #[test]
    fn unknown_frame_types_are_errors_not_panics() {
        let result = serde_json::from_str::<Frame>(r#"{"type": "mystery"}"#);
        assert!(result.is_err());
    }
}
